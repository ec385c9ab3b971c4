//! Date and time functions
//!
//! The only clock is [`EvaluationContext::now`], so results are reproducible
//! for a given context.

use super::{int_arg, opt_int_arg, text_arg};
use crate::error::{EvalError, EvalResult};
use crate::evaluator::EvaluationContext;
use crate::value::Value;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse `YYYY-MM-DD` with an optional time part
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::default()))
        })
}

/// A date-time argument; ISO text is accepted as well
fn datetime_arg(function: &'static str, args: &[Value], index: usize) -> EvalResult<NaiveDateTime> {
    match args.get(index) {
        Some(Value::DateTime(dt)) => Ok(*dt),
        Some(Value::Text(s)) => parse_datetime(s).ok_or_else(|| {
            EvalError::invalid_argument(function, format!("'{}' is not a date", s))
        }),
        Some(other) => Err(EvalError::type_mismatch("datetime", other.type_name())),
        None => Err(EvalError::type_mismatch("datetime", "nothing")),
    }
}

pub fn fn_now(_args: &[Value], ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::DateTime(ctx.now()))
}

/// TODAY() - the context clock truncated to midnight
pub fn fn_today(_args: &[Value], ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::DateTime(ctx.now().date().and_time(NaiveTime::default())))
}

pub fn fn_year(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Number(datetime_arg("YEAR", args, 0)?.year() as f64))
}

pub fn fn_month(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Number(datetime_arg("MONTH", args, 0)?.month() as f64))
}

pub fn fn_day(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Number(datetime_arg("DAY", args, 0)?.day() as f64))
}

pub fn fn_hour(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Number(datetime_arg("HOUR", args, 0)?.hour() as f64))
}

pub fn fn_minute(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Number(datetime_arg("MINUTE", args, 0)?.minute() as f64))
}

pub fn fn_second(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Number(datetime_arg("SECOND", args, 0)?.second() as f64))
}

/// WEEKDAY(date, [return_type])
///
/// - 1 (default): Sunday = 1 .. Saturday = 7
/// - 2: Monday = 1 .. Sunday = 7
/// - 3: Monday = 0 .. Sunday = 6
pub fn fn_weekday(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let weekday = datetime_arg("WEEKDAY", args, 0)?.weekday();
    let n = match opt_int_arg(args, 1, 1)? {
        1 => weekday.number_from_sunday(),
        2 => weekday.number_from_monday(),
        3 => weekday.num_days_from_monday(),
        other => {
            return Err(EvalError::invalid_argument(
                "WEEKDAY",
                format!("unsupported return type {}", other),
            ))
        }
    };
    Ok(Value::Number(n as f64))
}

/// WEEKNUM(date) - weeks start on Sunday; the week containing January 1 is week 1
pub fn fn_weeknum(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let date = datetime_arg("WEEKNUM", args, 0)?.date();
    let offset = NaiveDate::from_ymd_opt(date.year(), 1, 1)
        .map_or(0, |jan1| jan1.weekday().num_days_from_sunday());
    Ok(Value::Number(((date.ordinal0() + offset) / 7 + 1) as f64))
}

/// DATE(year, month, day) or DATE("YYYY-MM-DD[ HH:MM:SS]")
///
/// Months and days outside their usual range roll over, so
/// `DATE(2024, 13, 1)` is 2025-01-01 and `DATE(2024, 3, 0)` is 2024-02-29.
pub fn fn_date(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    match args.len() {
        1 => {
            let text = text_arg(args, 0)?;
            parse_datetime(&text).map(Value::DateTime).ok_or_else(|| {
                EvalError::invalid_argument("DATE", format!("'{}' is not a date", text))
            })
        }
        3 => {
            let year = int_arg(args, 0)?;
            let month = int_arg(args, 1)?;
            let day = int_arg(args, 2)?;
            build_date(year, month, day)
                .map(|d| Value::DateTime(d.and_time(NaiveTime::default())))
                .ok_or_else(|| {
                    EvalError::invalid_argument(
                        "DATE",
                        format!("{}-{}-{} is out of range", year, month, day),
                    )
                })
        }
        n => Err(EvalError::ArgumentCount {
            function: "DATE".to_string(),
            expected: "1 or 3".to_string(),
            actual: n,
        }),
    }
}

fn build_date(year: i64, month: i64, day: i64) -> Option<NaiveDate> {
    let months = year.checked_mul(12)?.checked_add(month.checked_sub(1)?)?;
    let year = i32::try_from(months.div_euclid(12)).ok()?;
    let month = months.rem_euclid(12) as u32 + 1;
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    first.checked_add_signed(Duration::try_days(day.checked_sub(1)?)?)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{eval, eval_err, eval_expr, num};
    use super::*;
    use crate::value::Value;

    fn datetime(s: &str) -> Value {
        Value::DateTime(parse_datetime(s).unwrap())
    }

    #[test]
    fn test_parse_datetime() {
        assert!(parse_datetime("2024-03-15").is_some());
        assert!(parse_datetime("2024-03-15 10:20:30").is_some());
        assert!(parse_datetime("2024-03-15T10:20").is_some());
        assert!(parse_datetime("15/03/2024").is_none());
    }

    #[test]
    fn test_now_and_today_use_context_clock() {
        assert_eq!(eval("NOW()").unwrap(), datetime("2024-03-15 14:30:45"));
        assert_eq!(eval("TODAY()").unwrap(), datetime("2024-03-15"));
        assert_eq!(eval_expr("HOUR(NOW())").unwrap(), Value::Number(14.0));
    }

    #[test]
    fn test_components() {
        assert_eq!(num("YEAR(DATE(2023, 7, 4))"), 2023.0);
        assert_eq!(num("MONTH(\"2023-07-04\")"), 7.0);
        assert_eq!(num("DAY(DATE(\"2023-07-04 08:09:10\"))"), 4.0);
        assert_eq!(num("MINUTE(DATE(\"2023-07-04 08:09:10\"))"), 9.0);
        assert_eq!(num("SECOND(DATE(\"2023-07-04 08:09:10\"))"), 10.0);
    }

    #[test]
    fn test_date_rollover() {
        assert_eq!(eval("DATE(2024, 13, 1)").unwrap(), datetime("2025-01-01"));
        assert_eq!(eval("DATE(2024, 3, 0)").unwrap(), datetime("2024-02-29"));
        assert!(matches!(
            eval_err("DATE(\"yesterday\")"),
            EvalError::InvalidArgument { function: "DATE", .. }
        ));
        assert!(matches!(
            eval_err("DATE(2024, 1)"),
            EvalError::ArgumentCount { .. }
        ));
    }

    #[test]
    fn test_date_out_of_range_parts() {
        for source in [
            "DATE(2024, -1e300, 1)",
            "DATE(2024, 1, -1e300)",
            "DATE(1e300, 1, 1)",
            "DATE(2024, 1, 1e300)",
        ] {
            assert!(
                matches!(
                    eval_err(source),
                    EvalError::InvalidArgument { function: "DATE", .. }
                ),
                "{}",
                source
            );
        }
    }

    #[test]
    fn test_weekday_and_weeknum() {
        // 2024-03-15 is a Friday
        assert_eq!(num("WEEKDAY(TODAY())"), 6.0);
        assert_eq!(num("WEEKDAY(TODAY(), 2)"), 5.0);
        assert_eq!(num("WEEKDAY(TODAY(), 3)"), 4.0);
        assert_eq!(num("WEEKNUM(TODAY())"), 11.0);
        assert_eq!(num("WEEKNUM(DATE(2024, 1, 1))"), 1.0);
    }

    #[test]
    fn test_non_date_argument() {
        assert_eq!(
            eval_err("YEAR(2024)"),
            EvalError::TypeMismatch {
                expected: "datetime",
                found: "number"
            }
        );
    }
}
