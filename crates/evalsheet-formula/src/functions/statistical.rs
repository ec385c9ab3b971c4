//! Aggregate functions
//!
//! Arguments arrive either as scalars or, for range arguments, as
//! `Value::Array` in row-major order. Values inside a range are filtered:
//! only numbers take part in numeric aggregates, while text, booleans, blanks
//! and date-times are skipped. Scalar arguments are strict: booleans count as
//! 0/1 and anything else is a type mismatch.

use super::criteria::CriteriaMatcher;
use crate::error::{EvalError, EvalResult};
use crate::evaluator::EvaluationContext;
use crate::value::Value;

/// Numbers from a mix of scalar and range arguments
fn collect_numbers(args: &[Value]) -> EvalResult<Vec<f64>> {
    let mut numbers = Vec::new();
    for arg in args {
        match arg {
            Value::Array(items) => numbers.extend(items.iter().filter_map(|v| match v {
                Value::Number(n) => Some(*n),
                _ => None,
            })),
            scalar => numbers.push(scalar.to_number()?),
        }
    }
    Ok(numbers)
}

/// Elements of an argument that may be a range or a single scalar
fn elements(arg: &Value) -> &[Value] {
    match arg {
        Value::Array(items) => items,
        scalar => std::slice::from_ref(scalar),
    }
}

pub fn fn_sum(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Number(collect_numbers(args)?.iter().sum()))
}

/// MIN of nothing numeric is 0
pub fn fn_min(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let numbers = collect_numbers(args)?;
    let min = numbers.iter().copied().reduce(f64::min).unwrap_or(0.0);
    Ok(Value::Number(min))
}

/// MAX of nothing numeric is 0
pub fn fn_max(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let numbers = collect_numbers(args)?;
    let max = numbers.iter().copied().reduce(f64::max).unwrap_or(0.0);
    Ok(Value::Number(max))
}

pub fn fn_average(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let numbers = collect_numbers(args)?;
    if numbers.is_empty() {
        return Err(EvalError::DivisionByZero);
    }
    Ok(Value::Number(mean(&numbers)))
}

/// COUNT - numeric values only; never fails on other kinds
pub fn fn_count(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let mut count = 0;
    for arg in args {
        match arg {
            Value::Array(items) => {
                count += items
                    .iter()
                    .filter(|v| matches!(v, Value::Number(_)))
                    .count()
            }
            Value::Number(_) | Value::Boolean(_) => count += 1,
            _ => {}
        }
    }
    Ok(Value::Number(count as f64))
}

/// COUNTA - non-blank values
pub fn fn_counta(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let count = args
        .iter()
        .flat_map(elements)
        .filter(|v| !v.is_blank())
        .count();
    Ok(Value::Number(count as f64))
}

/// COUNTBLANK - blank cells and empty text
pub fn fn_countblank(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let count = args
        .iter()
        .flat_map(elements)
        .filter(|v| v.is_blank())
        .count();
    Ok(Value::Number(count as f64))
}

/// COUNTIF(range, criterion)
pub fn fn_countif(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let range = elements(arg_at(args, 0)?);
    let matcher = CriteriaMatcher::new(criterion(args)?)?;
    let count = range.iter().filter(|v| matcher.matches(v)).count();
    Ok(Value::Number(count as f64))
}

/// SUMIF(range, criterion, [sum_range])
///
/// When `sum_range` is given it must have as many cells as `range`; each
/// matching position contributes its `sum_range` value.
pub fn fn_sumif(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let range = elements(arg_at(args, 0)?);
    let matcher = CriteriaMatcher::new(criterion(args)?)?;
    let sum_range = match args.get(2) {
        Some(arg) => elements(arg),
        None => range,
    };
    if sum_range.len() != range.len() {
        return Err(EvalError::invalid_argument(
            "SUMIF",
            format!(
                "sum range has {} cells but the criteria range has {}",
                sum_range.len(),
                range.len()
            ),
        ));
    }

    let total: f64 = range
        .iter()
        .zip(sum_range)
        .filter(|(candidate, _)| matcher.matches(candidate))
        .filter_map(|(_, value)| match value {
            Value::Number(n) => Some(*n),
            _ => None,
        })
        .sum();
    Ok(Value::Number(total))
}

fn criterion(args: &[Value]) -> EvalResult<&Value> {
    args.get(1)
        .ok_or_else(|| EvalError::MalformedPredicate(String::new()))
}

fn arg_at(args: &[Value], index: usize) -> EvalResult<&Value> {
    args.get(index)
        .ok_or_else(|| EvalError::type_mismatch("range", "nothing"))
}

pub fn fn_median(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let mut numbers = collect_numbers(args)?;
    if numbers.is_empty() {
        return Err(EvalError::invalid_argument("MEDIAN", "no numeric values"));
    }
    numbers.sort_by(|a, b| a.total_cmp(b));
    let mid = numbers.len() / 2;
    let median = if numbers.len() % 2 == 0 {
        (numbers[mid - 1] + numbers[mid]) / 2.0
    } else {
        numbers[mid]
    };
    Ok(Value::Number(median))
}

fn mean(numbers: &[f64]) -> f64 {
    numbers.iter().sum::<f64>() / numbers.len() as f64
}

fn sum_of_squares(numbers: &[f64]) -> f64 {
    let m = mean(numbers);
    numbers.iter().map(|x| (x - m).powi(2)).sum()
}

/// STDEV - sample standard deviation (n - 1)
pub fn fn_stdev(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let numbers = collect_numbers(args)?;
    if numbers.len() < 2 {
        return Err(EvalError::DivisionByZero);
    }
    let variance = sum_of_squares(&numbers) / (numbers.len() - 1) as f64;
    Ok(Value::Number(variance.sqrt()))
}

/// STDEVP - population standard deviation (n)
pub fn fn_stdevp(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let numbers = collect_numbers(args)?;
    if numbers.is_empty() {
        return Err(EvalError::DivisionByZero);
    }
    let variance = sum_of_squares(&numbers) / numbers.len() as f64;
    Ok(Value::Number(variance.sqrt()))
}

/// Numeric (y, x) pairs for SLOPE/INTERCEPT, skipping positions where either
/// side is not a number
fn paired_numbers(function: &'static str, args: &[Value]) -> EvalResult<(Vec<f64>, Vec<f64>)> {
    let ys = elements(arg_at(args, 0)?);
    let xs = elements(arg_at(args, 1)?);
    if ys.len() != xs.len() {
        return Err(EvalError::invalid_argument(
            function,
            format!("ranges differ in size ({} and {})", ys.len(), xs.len()),
        ));
    }

    Ok(ys
        .iter()
        .zip(xs)
        .filter_map(|pair| match pair {
            (Value::Number(y), Value::Number(x)) => Some((*y, *x)),
            _ => None,
        })
        .unzip())
}

/// Least-squares slope and intercept
fn regression(function: &'static str, args: &[Value]) -> EvalResult<(f64, f64)> {
    let (ys, xs) = paired_numbers(function, args)?;
    if xs.is_empty() {
        return Err(EvalError::DivisionByZero);
    }
    let x_mean = mean(&xs);
    let y_mean = mean(&ys);
    let sxx = sum_of_squares(&xs);
    if sxx == 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    let sxy: f64 = xs
        .iter()
        .zip(&ys)
        .map(|(x, y)| (x - x_mean) * (y - y_mean))
        .sum();
    let slope = sxy / sxx;
    Ok((slope, y_mean - slope * x_mean))
}

/// SLOPE(known_ys, known_xs)
pub fn fn_slope(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    regression("SLOPE", args).map(|(slope, _)| Value::Number(slope))
}

/// INTERCEPT(known_ys, known_xs)
pub fn fn_intercept(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    regression("INTERCEPT", args).map(|(_, intercept)| Value::Number(intercept))
}
