//! Text functions
//!
//! Positions are 1-based and counted in characters. Out-of-range positions
//! and lengths clamp to the string instead of failing.

use super::{int_arg, number_arg, opt_int_arg, text_arg};
use crate::error::{EvalError, EvalResult};
use crate::evaluator::EvaluationContext;
use crate::value::Value;
use regex::Regex;

/// Result of `FIND`/`SEARCH` when the needle is absent
pub const NOT_FOUND: f64 = -1.0;

/// Upper bound on strings built by `REPT`
const MAX_TEXT_LENGTH: usize = 1 << 20;

/// Characters `start..start + count` (0-based start), clamped
fn char_slice(text: &str, start: usize, count: usize) -> String {
    text.chars().skip(start).take(count).collect()
}

fn clamp_count(n: i64) -> usize {
    n.max(0) as usize
}

/// LEN(text)
pub fn fn_len(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let text = text_arg(args, 0)?;
    Ok(Value::Number(text.chars().count() as f64))
}

/// LEFT(text, [num_chars])
pub fn fn_left(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let text = text_arg(args, 0)?;
    let count = clamp_count(opt_int_arg(args, 1, 1)?);
    Ok(Value::Text(char_slice(&text, 0, count)))
}

/// RIGHT(text, [num_chars])
pub fn fn_right(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let text = text_arg(args, 0)?;
    let count = clamp_count(opt_int_arg(args, 1, 1)?);
    let len = text.chars().count();
    Ok(Value::Text(char_slice(&text, len.saturating_sub(count), count)))
}

/// MID(text, start_num, num_chars)
pub fn fn_mid(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let text = text_arg(args, 0)?;
    let start = clamp_count(int_arg(args, 1)?.saturating_sub(1));
    let count = clamp_count(int_arg(args, 2)?);
    Ok(Value::Text(char_slice(&text, start, count)))
}

/// 1-based character position of `needle` in `haystack` at or after `start`
fn find_position(needle: &str, haystack: &str, start: i64) -> f64 {
    let start = clamp_count(start.saturating_sub(1));
    let chars: Vec<char> = haystack.chars().collect();
    if start > chars.len() {
        return NOT_FOUND;
    }
    let tail: String = chars[start..].iter().collect();
    match tail.find(needle) {
        Some(byte_pos) => (start + tail[..byte_pos].chars().count() + 1) as f64,
        None => NOT_FOUND,
    }
}

/// FIND(find_text, within_text, [start_num]) - case-sensitive
pub fn fn_find(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let needle = text_arg(args, 0)?;
    let haystack = text_arg(args, 1)?;
    let start = opt_int_arg(args, 2, 1)?;
    Ok(Value::Number(find_position(&needle, &haystack, start)))
}

/// SEARCH(find_text, within_text, [start_num]) - case-insensitive
pub fn fn_search(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let needle = text_arg(args, 0)?.to_lowercase();
    let haystack = text_arg(args, 1)?.to_lowercase();
    let start = opt_int_arg(args, 2, 1)?;
    Ok(Value::Number(find_position(&needle, &haystack, start)))
}

/// SUBSTITUTE(text, old_text, new_text, [instance_num])
pub fn fn_substitute(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let text = text_arg(args, 0)?;
    let old = text_arg(args, 1)?;
    let new = text_arg(args, 2)?;

    if old.is_empty() {
        return Ok(Value::Text(text));
    }

    match args.get(3) {
        None => Ok(Value::Text(text.replace(&old, &new))),
        Some(_) => {
            let instance = int_arg(args, 3)?;
            if instance < 1 {
                return Err(EvalError::invalid_argument(
                    "SUBSTITUTE",
                    "instance number must be at least 1",
                ));
            }
            let replaced = match text.match_indices(&old).nth((instance - 1) as usize) {
                Some((pos, _)) => format!("{}{}{}", &text[..pos], new, &text[pos + old.len()..]),
                None => text,
            };
            Ok(Value::Text(replaced))
        }
    }
}

pub fn fn_upper(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Text(text_arg(args, 0)?.to_uppercase()))
}

pub fn fn_lower(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Text(text_arg(args, 0)?.to_lowercase()))
}

/// TRIM(text) - strips the ends and collapses inner runs of spaces to one
pub fn fn_trim(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let text = text_arg(args, 0)?;
    Ok(Value::Text(
        text.split(' ')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    ))
}

pub fn fn_concat(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let mut out = String::new();
    for i in 0..args.len() {
        out.push_str(&text_arg(args, i)?);
    }
    Ok(Value::Text(out))
}

/// REPT(text, number_times)
pub fn fn_rept(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let text = text_arg(args, 0)?;
    let times = int_arg(args, 1)?;
    if times < 0 {
        return Err(EvalError::invalid_argument(
            "REPT",
            "repeat count must not be negative",
        ));
    }
    let times = times as usize;
    if text.chars().count().saturating_mul(times) > MAX_TEXT_LENGTH {
        return Err(EvalError::invalid_argument("REPT", "result is too long"));
    }
    Ok(Value::Text(text.repeat(times)))
}

/// EXACT(text1, text2) - case-sensitive equality
pub fn fn_exact(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Boolean(text_arg(args, 0)? == text_arg(args, 1)?))
}

/// PROPER(text) - capitalizes the first letter of every word
pub fn fn_proper(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let text = text_arg(args, 0)?;
    let mut out = String::with_capacity(text.len());
    let mut after_letter = false;
    for c in text.chars() {
        if after_letter {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        after_letter = c.is_alphabetic();
    }
    Ok(Value::Text(out))
}

/// VALUE(text) - parses a number out of text
pub fn fn_value(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    match args.first() {
        Some(Value::Number(n)) => Ok(Value::Number(*n)),
        Some(Value::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| EvalError::invalid_argument("VALUE", format!("'{}' is not a number", s))),
        Some(other) => Err(EvalError::type_mismatch("text", other.type_name())),
        None => Err(EvalError::type_mismatch("text", "nothing")),
    }
}

/// TEXT(value, [decimals]) - canonical text, or fixed decimals for numbers
pub fn fn_text(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    if args.len() < 2 {
        return Ok(Value::Text(text_arg(args, 0)?));
    }
    let n = number_arg(args, 0)?;
    let decimals = int_arg(args, 1)?.clamp(0, 20) as usize;
    Ok(Value::Text(format!("{:.*}", decimals, n)))
}

/// SUBSTR(text, start, [end]) - characters `start..=end`, both 1-based
pub fn fn_substr(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let text = text_arg(args, 0)?;
    let len = text.chars().count() as i64;
    let start = int_arg(args, 1)?.max(1);
    let end = opt_int_arg(args, 2, len)?.min(len);
    if end < start {
        return Ok(Value::text(""));
    }
    Ok(Value::Text(char_slice(
        &text,
        (start - 1) as usize,
        (end - start + 1) as usize,
    )))
}

pub fn fn_contains(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Boolean(text_arg(args, 0)?.contains(&text_arg(args, 1)?)))
}

pub fn fn_startswith(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Boolean(text_arg(args, 0)?.starts_with(&text_arg(args, 1)?)))
}

pub fn fn_endswith(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Boolean(text_arg(args, 0)?.ends_with(&text_arg(args, 1)?)))
}

fn compile(function: &'static str, pattern: &str) -> EvalResult<Regex> {
    Regex::new(pattern).map_err(|e| EvalError::invalid_argument(function, e.to_string()))
}

/// MATCHES(text, pattern) - whether the regular expression matches anywhere
pub fn fn_matches(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let text = text_arg(args, 0)?;
    let re = compile("MATCHES", &text_arg(args, 1)?)?;
    Ok(Value::Boolean(re.is_match(&text)))
}

/// REPLACEALL(text, pattern, replacement) - `$1` refers to capture groups
pub fn fn_replaceall(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let text = text_arg(args, 0)?;
    let re = compile("REPLACEALL", &text_arg(args, 1)?)?;
    let replacement = text_arg(args, 2)?;
    Ok(Value::Text(re.replace_all(&text, replacement.as_str()).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{eval, eval_err, eval_expr, num, text};
    use crate::error::EvalError;
    use crate::value::Value;

    #[test]
    fn test_left_right_mid() {
        assert_eq!(text("LEFT(\"hello world\", 5)"), "hello");
        assert_eq!(text("LEFT(\"hello\")"), "h");
        assert_eq!(text("RIGHT(\"hello\", 3)"), "llo");
        assert_eq!(text("RIGHT(\"hi\", 10)"), "hi");
        assert_eq!(text("MID(\"hello\", 2, 3)"), "ell");
        assert_eq!(text("MID(\"ab\", 5, 2)"), "");
        assert_eq!(text("MID(\"abc\", 0, 2)"), "ab");
        assert_eq!(text("LEFT(\"abc\", -1)"), "");
        assert_eq!(text("LEFT(12345, 2)"), "12");
    }

    #[test]
    fn test_find_and_search() {
        assert_eq!(num("FIND(\"ll\", \"hello world\")"), 3.0);
        assert_eq!(num("FIND(\"o\", \"hello world\", 6)"), 8.0);
        assert_eq!(num("FIND(\"L\", \"hello\")"), -1.0);
        assert_eq!(num("SEARCH(\"L\", \"hello\")"), 3.0);
        assert_eq!(num("FIND(\"x\", \"abc\", 99)"), -1.0);
        assert_eq!(num("FIND(\"é\", \"café au lait\")"), 4.0);
    }

    #[test]
    fn test_huge_positions_clamp() {
        assert_eq!(text("MID(\"ab\", -1e300, 2)"), "ab");
        assert_eq!(text("MID(\"ab\", 1e300, 2)"), "");
        assert_eq!(num("FIND(\"a\", \"b\", -1e300)"), -1.0);
        assert_eq!(num("SEARCH(\"B\", \"abc\", -1e300)"), 2.0);
    }

    #[test]
    fn test_substitute() {
        assert_eq!(text("SUBSTITUTE(\"aXbXc\", \"X\", \",\")"), "a,b,c");
        assert_eq!(text("SUBSTITUTE(\"aXbXc\", \"X\", \",\", 2)"), "aXb,c");
        assert_eq!(text("SUBSTITUTE(\"abc\", \"\", \"-\")"), "abc");
        assert!(matches!(
            eval_err("SUBSTITUTE(\"a\", \"a\", \"b\", 0)"),
            EvalError::InvalidArgument { function: "SUBSTITUTE", .. }
        ));
    }

    #[test]
    fn test_case_and_whitespace() {
        assert_eq!(text("UPPER(\"abc\")"), "ABC");
        assert_eq!(text("LOWER(\"ÀBC\")"), "àbc");
        assert_eq!(text("TRIM(\"  a   b  \")"), "a b");
        assert_eq!(text("PROPER(\"hello wORLD-wide\")"), "Hello World-Wide");
        assert_eq!(num("LEN(\"héllo\")"), 5.0);
    }

    #[test]
    fn test_concat_rept_exact() {
        assert_eq!(text("CONCAT(\"a\", 1, TRUE)"), "a1TRUE");
        assert_eq!(text("REPT(\"ab\", 3)"), "ababab");
        assert_eq!(eval("EXACT(\"a\", \"A\")").unwrap(), Value::Boolean(false));
    }

    #[test]
    fn test_value_and_text() {
        assert_eq!(num("VALUE(\" 42.5 \")"), 42.5);
        assert!(matches!(
            eval_err("VALUE(\"abc\")"),
            EvalError::InvalidArgument { function: "VALUE", .. }
        ));
        assert_eq!(text("TEXT(3.14159, 2)"), "3.14");
        assert_eq!(text("TEXT(10)"), "10");
    }

    #[test]
    fn test_expression_text_functions() {
        assert_eq!(eval_expr("SUBSTR(\"hello\", 2, 4)").unwrap(), Value::text("ell"));
        assert_eq!(eval_expr("SUBSTR(\"hello\", 3)").unwrap(), Value::text("llo"));
        assert_eq!(eval_expr("SUBSTR(\"hello\", 4, 2)").unwrap(), Value::text(""));
        assert_eq!(eval_expr("CONTAINS(\"hello\", \"ell\")").unwrap(), Value::Boolean(true));
        assert_eq!(eval_expr("STARTSWITH(\"hello\", \"he\")").unwrap(), Value::Boolean(true));
        assert_eq!(eval_expr("ENDSWITH(\"hello\", \"he\")").unwrap(), Value::Boolean(false));
    }

    #[test]
    fn test_regex_functions() {
        assert_eq!(
            eval_expr("MATCHES(\"order-123\", \"^order-\\\\d+$\")").unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            eval_expr("REPLACEALL(\"a1b22c\", \"[0-9]+\", \"#\")").unwrap(),
            Value::text("a#b#c")
        );
        let err = eval_expr("MATCHES(\"a\", \"(\")").unwrap_err();
        assert!(matches!(
            err.eval_error(),
            Some(EvalError::InvalidArgument { function: "MATCHES", .. })
        ));
    }
}
