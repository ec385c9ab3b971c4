//! Math functions
//!
//! Domain errors follow IEEE semantics: `SQRT(-1)` is NaN, not an error.
//! Only division-like operations by zero fail.

use super::{number_arg, opt_int_arg, opt_number_arg};
use crate::error::{EvalError, EvalResult};
use crate::evaluator::EvaluationContext;
use crate::value::Value;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

fn unary(args: &[Value], f: fn(f64) -> f64) -> EvalResult<Value> {
    Ok(Value::Number(f(number_arg(args, 0)?)))
}

pub fn fn_abs(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    unary(args, f64::abs)
}

pub fn fn_sqrt(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    unary(args, f64::sqrt)
}

pub fn fn_power(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let base = number_arg(args, 0)?;
    let exponent = number_arg(args, 1)?;
    Ok(Value::Number(base.powf(exponent)))
}

pub fn fn_exp(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    unary(args, f64::exp)
}

pub fn fn_ln(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    unary(args, f64::ln)
}

/// LOG(number, [base]) - base defaults to 10
pub fn fn_log(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let number = number_arg(args, 0)?;
    let base = opt_number_arg(args, 1, 10.0)?;
    let result = if base == 10.0 {
        number.log10()
    } else if base == 2.0 {
        number.log2()
    } else if base == 1.0 {
        return Err(EvalError::DivisionByZero);
    } else {
        number.log(base)
    };
    Ok(Value::Number(result))
}

pub fn fn_log10(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    unary(args, f64::log10)
}

/// Round `number` to `digits` decimal places (negative digits round to the
/// left of the decimal point) using decimal arithmetic, so that
/// `ROUND(2.675, 2)` gives 2.68 as written rather than 2.67 as stored.
fn round_decimal(number: f64, digits: i64, strategy: RoundingStrategy) -> f64 {
    if !number.is_finite() {
        return number;
    }
    // shortest round-trip text is the value the user wrote
    let Ok(value) = Decimal::from_str(&number.to_string()) else {
        return round_float(number, digits, strategy);
    };

    let rounded = if digits >= 0 {
        value.round_dp_with_strategy(digits.min(28) as u32, strategy)
    } else {
        let Some(scale) = 10_i64
            .checked_pow(digits.unsigned_abs().min(18) as u32)
            .map(Decimal::from)
        else {
            return 0.0;
        };
        match value.checked_div(scale) {
            Some(shifted) => shifted.round_dp_with_strategy(0, strategy) * scale,
            None => return round_float(number, digits, strategy),
        }
    };
    rounded.to_f64().unwrap_or_else(|| round_float(number, digits, strategy))
}

fn round_float(number: f64, digits: i64, strategy: RoundingStrategy) -> f64 {
    // an f64 carries about 15 significant digits; beyond them there is nothing to round
    if number == 0.0 || digits as f64 > 15.0 - number.abs().log10().floor() {
        return number;
    }
    let multiplier = 10_f64.powi(digits.clamp(-308, 308) as i32);
    let scaled = number * multiplier;
    if scaled.is_infinite() {
        return number;
    }
    let rounded = match strategy {
        RoundingStrategy::AwayFromZero => {
            if scaled >= 0.0 {
                scaled.ceil()
            } else {
                scaled.floor()
            }
        }
        RoundingStrategy::ToZero => scaled.trunc(),
        _ => scaled.round(),
    };
    rounded / multiplier
}

/// ROUND(number, [num_digits]) - half away from zero
pub fn fn_round(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let number = number_arg(args, 0)?;
    let digits = opt_int_arg(args, 1, 0)?;
    Ok(Value::Number(round_decimal(
        number,
        digits,
        RoundingStrategy::MidpointAwayFromZero,
    )))
}

pub fn fn_roundup(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let number = number_arg(args, 0)?;
    let digits = opt_int_arg(args, 1, 0)?;
    Ok(Value::Number(round_decimal(
        number,
        digits,
        RoundingStrategy::AwayFromZero,
    )))
}

pub fn fn_rounddown(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let number = number_arg(args, 0)?;
    let digits = opt_int_arg(args, 1, 0)?;
    Ok(Value::Number(round_decimal(number, digits, RoundingStrategy::ToZero)))
}

/// INT(number) - rounds toward negative infinity
pub fn fn_int(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    unary(args, f64::floor)
}

/// TRUNC(number, [num_digits])
pub fn fn_trunc(args: &[Value], ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    fn_rounddown(args, ctx)
}

/// MOD(number, divisor) - result has the sign of the divisor, unlike `%`
pub fn fn_mod(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let number = number_arg(args, 0)?;
    let divisor = number_arg(args, 1)?;
    if divisor == 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    Ok(Value::Number(number - divisor * (number / divisor).floor()))
}

pub fn fn_sign(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let n = number_arg(args, 0)?;
    let sign = if n.is_nan() {
        f64::NAN
    } else if n > 0.0 {
        1.0
    } else if n < 0.0 {
        -1.0
    } else {
        0.0
    };
    Ok(Value::Number(sign))
}

pub fn fn_pi(_args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Number(std::f64::consts::PI))
}

pub fn fn_sin(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    unary(args, f64::sin)
}

pub fn fn_cos(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    unary(args, f64::cos)
}

pub fn fn_tan(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    unary(args, f64::tan)
}

pub fn fn_asin(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    unary(args, f64::asin)
}

pub fn fn_acos(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    unary(args, f64::acos)
}

pub fn fn_atan(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    unary(args, f64::atan)
}

/// ATAN2(x, y) - spreadsheet argument order: x first
pub fn fn_atan2(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let x = number_arg(args, 0)?;
    let y = number_arg(args, 1)?;
    if x == 0.0 && y == 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    Ok(Value::Number(y.atan2(x)))
}

pub fn fn_degrees(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    unary(args, f64::to_degrees)
}

pub fn fn_radians(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    unary(args, f64::to_radians)
}

fn significance_args(args: &[Value]) -> EvalResult<(f64, f64)> {
    let number = number_arg(args, 0)?;
    let significance = opt_number_arg(args, 1, 1.0)?.abs();
    Ok((number, significance))
}

/// CEILING(number, [significance]) - rounds up to a multiple of significance
pub fn fn_ceiling(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let (number, significance) = significance_args(args)?;
    if significance == 0.0 {
        return Ok(Value::Number(0.0));
    }
    Ok(Value::Number((number / significance).ceil() * significance))
}

/// FLOOR(number, [significance]) - rounds down to a multiple of significance
pub fn fn_floor(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let (number, significance) = significance_args(args)?;
    if significance == 0.0 {
        return Ok(Value::Number(0.0));
    }
    Ok(Value::Number((number / significance).floor() * significance))
}

pub fn fn_sinh(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    unary(args, f64::sinh)
}

pub fn fn_cosh(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    unary(args, f64::cosh)
}

pub fn fn_tanh(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    unary(args, f64::tanh)
}

pub fn fn_cbrt(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    unary(args, f64::cbrt)
}

pub fn fn_hypot(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let x = number_arg(args, 0)?;
    let y = number_arg(args, 1)?;
    Ok(Value::Number(x.hypot(y)))
}

/// RINT(number) - nearest integer, ties to even
pub fn fn_rint(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let n = number_arg(args, 0)?;
    let rounded = n.round();
    let rint = if (n - n.trunc()).abs() == 0.5 && rounded % 2.0 != 0.0 {
        rounded - n.signum()
    } else {
        rounded
    };
    Ok(Value::Number(rint))
}

/// ISNAN(value) - TRUE only for the NaN number
pub fn fn_isnan(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Boolean(args.first().map_or(false, Value::is_nan)))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{eval, eval_err, eval_expr, num};
    use crate::error::EvalError;
    use crate::value::Value;

    #[test]
    fn test_round() {
        assert_eq!(num("ROUND(2.675, 2)"), 2.68);
        assert_eq!(num("ROUND(2.5)"), 3.0);
        assert_eq!(num("ROUND(-2.5)"), -3.0);
        assert_eq!(num("ROUND(1234.5678, -2)"), 1200.0);
        assert_eq!(num("ROUNDUP(3.141, 1)"), 3.2);
        assert_eq!(num("ROUNDDOWN(-3.19, 1)"), -3.1);
        assert_eq!(num("TRUNC(8.9)"), 8.0);
        assert_eq!(num("INT(-8.9)"), -9.0);
    }

    #[test]
    fn test_round_beyond_decimal_range() {
        assert_eq!(num("ROUND(1e30, 400)"), 1e30);
        assert_eq!(num("ROUNDUP(-1e30, 400)"), -1e30);
        assert_eq!(num("ROUND(1e30, -400)"), 0.0);
        assert_eq!(num("ROUND(0, 400)"), 0.0);
    }

    #[test]
    fn test_mod_follows_divisor_sign() {
        assert_eq!(num("MOD(-3, 2)"), 1.0);
        assert_eq!(num("MOD(3, -2)"), -1.0);
        assert_eq!(eval_err("MOD(3, 0)"), EvalError::DivisionByZero);
    }

    #[test]
    fn test_domain_errors_are_nan() {
        assert!(eval("SQRT(-1)").unwrap().is_nan());
        assert!(eval("LN(-1)").unwrap().is_nan());
        assert_eq!(
            eval_expr("ISNAN(SQRT(-4))").unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(eval_expr("ISNAN(4)").unwrap(), Value::Boolean(false));
    }

    #[test]
    fn test_log_and_power() {
        assert_eq!(num("LOG(100)"), 2.0);
        assert_eq!(num("LOG(8, 2)"), 3.0);
        assert_eq!(num("POWER(2, 10)"), 1024.0);
        assert_eq!(num("SQRT(16)"), 4.0);
        assert_eq!(eval_err("LOG(8, 1)"), EvalError::DivisionByZero);
    }

    #[test]
    fn test_ceiling_floor() {
        assert_eq!(num("CEILING(4.3)"), 5.0);
        assert_eq!(num("CEILING(4.3, 0.5)"), 4.5);
        assert_eq!(num("FLOOR(4.7, 2)"), 4.0);
        assert_eq!(num("FLOOR(-4.3)"), -5.0);
    }

    #[test]
    fn test_trig() {
        assert!((num("DEGREES(PI())") - 180.0).abs() < 1e-9);
        assert!((num("SIN(RADIANS(30))") - 0.5).abs() < 1e-12);
        assert!((num("ATAN2(1, 1)") - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
    }

    #[test]
    fn test_expression_only_math() {
        assert_eq!(eval_expr("HYPOT(3, 4)").unwrap(), Value::Number(5.0));
        assert_eq!(eval_expr("CBRT(27)").unwrap(), Value::Number(3.0));
        assert_eq!(eval_expr("RINT(2.5)").unwrap(), Value::Number(2.0));
        assert_eq!(eval_expr("RINT(3.5)").unwrap(), Value::Number(4.0));
        assert_eq!(eval_expr("RINT(-2.5)").unwrap(), Value::Number(-2.0));
    }

    #[test]
    fn test_text_argument_is_type_mismatch() {
        assert_eq!(
            eval_err("ABS(\"x\")"),
            EvalError::TypeMismatch {
                expected: "number",
                found: "text"
            }
        );
        assert_eq!(num("ABS(-TRUE)"), 1.0);
    }
}
