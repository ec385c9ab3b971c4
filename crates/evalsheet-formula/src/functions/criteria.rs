//! Criteria matching for COUNTIF and SUMIF
//!
//! A criterion can be:
//! - A number or boolean: exact match against numeric values
//! - A text string: case-insensitive match, `*` and `?` wildcards
//! - A comparison expression: `">5"`, `">=10"`, `"<100"`, `"<=50"`, `"<>0"`, `"=5"`
//!   (text operands compare case-insensitively)
//! - Empty text or `"="`: matches blank values; `"<>"` matches non-blank values

use crate::error::{EvalError, EvalResult};
use crate::value::Value;
use chrono::NaiveDateTime;
use lazy_regex::regex_captures;
use std::cmp::Ordering;

const EPSILON: f64 = 1e-10;

/// Compiled criterion, reusable across every cell of a range
#[derive(Debug)]
pub struct CriteriaMatcher {
    criteria_type: CriteriaType,
}

#[derive(Debug)]
enum CriteriaType {
    /// Comparison with a number
    Number(ComparisonOp, f64),
    /// Comparison with a date-time
    DateTime(ComparisonOp, NaiveDateTime),
    /// Comparison with text (lower-cased); `=`/`<>` honour wildcards
    Text(ComparisonOp, String),
    /// Blank values
    Blank,
    /// Anything but blank values
    NotBlank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl ComparisonOp {
    fn parse(s: &str) -> Self {
        match s {
            "<>" | "!=" => ComparisonOp::NotEqual,
            "<" => ComparisonOp::LessThan,
            "<=" => ComparisonOp::LessEqual,
            ">" => ComparisonOp::GreaterThan,
            ">=" => ComparisonOp::GreaterEqual,
            _ => ComparisonOp::Equal,
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            ComparisonOp::Equal => ordering == Ordering::Equal,
            ComparisonOp::NotEqual => ordering != Ordering::Equal,
            ComparisonOp::LessThan => ordering == Ordering::Less,
            ComparisonOp::LessEqual => ordering != Ordering::Greater,
            ComparisonOp::GreaterThan => ordering == Ordering::Greater,
            ComparisonOp::GreaterEqual => ordering != Ordering::Less,
        }
    }
}

impl CriteriaMatcher {
    /// Compile a criterion value
    pub fn new(criteria: &Value) -> EvalResult<Self> {
        let criteria_type = match criteria {
            Value::Number(n) => CriteriaType::Number(ComparisonOp::Equal, *n),
            Value::Boolean(b) => {
                CriteriaType::Number(ComparisonOp::Equal, if *b { 1.0 } else { 0.0 })
            }
            Value::DateTime(dt) => CriteriaType::DateTime(ComparisonOp::Equal, *dt),
            Value::Text(s) => Self::parse_string_criteria(s)?,
            Value::Array(_) => {
                return Err(EvalError::MalformedPredicate(
                    "a range cannot be used as a criterion".to_string(),
                ))
            }
        };

        Ok(Self { criteria_type })
    }

    fn parse_string_criteria(s: &str) -> EvalResult<CriteriaType> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(CriteriaType::Blank);
        }

        let (op, operand) = match regex_captures!(r"^(<>|!=|>=|<=|==|=|<|>)\s*(.*)$", trimmed) {
            Some((_, op, operand)) => (Some(ComparisonOp::parse(op)), operand),
            None => (None, trimmed),
        };

        if operand.is_empty() {
            return match op {
                Some(ComparisonOp::Equal) => Ok(CriteriaType::Blank),
                Some(ComparisonOp::NotEqual) => Ok(CriteriaType::NotBlank),
                _ => Err(EvalError::MalformedPredicate(s.to_string())),
            };
        }

        let op = op.unwrap_or(ComparisonOp::Equal);
        // "inf"/"nan" parse as f64 but stay text criteria
        if let Some(n) = operand.parse::<f64>().ok().filter(|n| n.is_finite()) {
            return Ok(CriteriaType::Number(op, n));
        }
        if let Some(dt) = super::date::parse_datetime(operand) {
            return Ok(CriteriaType::DateTime(op, dt));
        }
        Ok(CriteriaType::Text(op, operand.to_lowercase()))
    }

    /// Check if a value matches the criterion
    pub fn matches(&self, value: &Value) -> bool {
        match &self.criteria_type {
            // Only actual numbers match numeric criteria, never text that looks numeric
            CriteriaType::Number(op, criteria_num) => {
                let n = match value {
                    Value::Number(n) => *n,
                    Value::Boolean(b) => {
                        if *b {
                            1.0
                        } else {
                            0.0
                        }
                    }
                    _ => return false,
                };
                if n.is_nan() {
                    return *op == ComparisonOp::NotEqual;
                }
                let ordering = if (n - criteria_num).abs() < EPSILON {
                    Ordering::Equal
                } else if n < *criteria_num {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
                op.holds(ordering)
            }

            CriteriaType::DateTime(op, criteria_dt) => match value {
                Value::DateTime(dt) => op.holds(dt.cmp(criteria_dt)),
                _ => false,
            },

            CriteriaType::Text(op, pattern) => {
                let text = match value {
                    Value::Text(s) => s.to_lowercase(),
                    _ => return *op == ComparisonOp::NotEqual,
                };
                match op {
                    ComparisonOp::Equal => wildcard_match(pattern, &text),
                    ComparisonOp::NotEqual => !wildcard_match(pattern, &text),
                    _ => op.holds(text.as_str().cmp(pattern.as_str())),
                }
            }

            CriteriaType::Blank => value.is_blank(),

            CriteriaType::NotBlank => !value.is_blank(),
        }
    }
}

/// Match with wildcards: `*` = any characters, `?` = single character
fn wildcard_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains('*') && !pattern.contains('?') {
        return pattern == text;
    }

    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let mut pi = 0; // pattern index
    let mut ti = 0; // text index
    let mut star_pi = None; // position of last * in pattern
    let mut star_ti = 0; // text position when that * was taken

    while ti < text.len() {
        if pi < pattern.len() && (pattern[pi] == '?' || pattern[pi] == text[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < pattern.len() && pattern[pi] == '*' {
            star_pi = Some(pi);
            star_ti = ti;
            pi += 1;
        } else if let Some(sp) = star_pi {
            // backtrack: let the last * swallow one more character
            pi = sp + 1;
            star_ti += 1;
            ti = star_ti;
        } else {
            return false;
        }
    }

    while pi < pattern.len() && pattern[pi] == '*' {
        pi += 1;
    }

    pi == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(criteria: &str) -> CriteriaMatcher {
        CriteriaMatcher::new(&Value::text(criteria)).unwrap()
    }

    #[test]
    fn test_numeric_comparisons() {
        let gt = matcher(">2");
        assert!(gt.matches(&Value::Number(3.0)));
        assert!(!gt.matches(&Value::Number(2.0)));
        assert!(!gt.matches(&Value::text("5")));

        let ne = matcher("<>0");
        assert!(ne.matches(&Value::Number(1.0)));
        assert!(!ne.matches(&Value::Number(0.0)));

        let exact = CriteriaMatcher::new(&Value::Number(5.0)).unwrap();
        assert!(exact.matches(&Value::Number(5.0)));
        assert!(!exact.matches(&Value::text("5")));

        assert!(matcher("<= 10").matches(&Value::Number(10.0)));
    }

    #[test]
    fn test_non_finite_operands_are_text() {
        assert!(!matcher(">inf").matches(&Value::Number(f64::MAX)));
        assert!(!matcher("nan").matches(&Value::Number(f64::NAN)));
        assert!(matcher("inf").matches(&Value::text("INF")));
        assert!(matcher("<nan").matches(&Value::text("apple")));
    }

    #[test]
    fn test_text_and_wildcards() {
        let apple = matcher("apple");
        assert!(apple.matches(&Value::text("APPLE")));
        assert!(!apple.matches(&Value::text("apples")));

        let prefix = matcher("a*");
        assert!(prefix.matches(&Value::text("avocado")));
        assert!(!prefix.matches(&Value::text("banana")));

        let single = matcher("b?t");
        assert!(single.matches(&Value::text("bat")));
        assert!(!single.matches(&Value::text("boat")));

        assert!(matcher("<>a*").matches(&Value::text("pear")));
        assert!(matcher(">m").matches(&Value::text("pear")));
        assert!(!matcher(">m").matches(&Value::text("apple")));
    }

    #[test]
    fn test_blank_criteria() {
        let blank = matcher("");
        assert!(blank.matches(&Value::text("")));
        assert!(!blank.matches(&Value::Number(0.0)));

        assert!(matcher("=").matches(&Value::text("")));
        assert!(matcher("<>").matches(&Value::Number(0.0)));
        assert!(!matcher("<>").matches(&Value::text("")));
    }

    #[test]
    fn test_malformed_predicates() {
        for bad in [">", ">=", "<"] {
            assert_eq!(
                CriteriaMatcher::new(&Value::text(bad)).unwrap_err(),
                EvalError::MalformedPredicate(bad.to_string())
            );
        }
        assert!(matches!(
            CriteriaMatcher::new(&Value::Array(vec![])),
            Err(EvalError::MalformedPredicate(_))
        ));
    }

    #[test]
    fn test_date_criteria() {
        let after = matcher(">2024-01-01");
        let dt = super::super::date::parse_datetime("2024-02-01").unwrap();
        assert!(after.matches(&Value::DateTime(dt)));
        assert!(!after.matches(&Value::Number(1.0)));
    }
}
