//! Logical functions
//!
//! `IF`, `HAS` and `IFMISSING` are special forms handled by the evaluator.

use super::bool_arg;
use crate::error::EvalResult;
use crate::evaluator::EvaluationContext;
use crate::value::Value;

fn truth_values(args: &[Value]) -> EvalResult<Vec<bool>> {
    args.iter().map(Value::to_bool).collect()
}

pub fn fn_and(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Boolean(truth_values(args)?.into_iter().all(|b| b)))
}

pub fn fn_or(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Boolean(truth_values(args)?.into_iter().any(|b| b)))
}

/// XOR - true when an odd number of arguments are true
pub fn fn_xor(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    let trues = truth_values(args)?.into_iter().filter(|b| *b).count();
    Ok(Value::Boolean(trues % 2 == 1))
}

pub fn fn_not(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Boolean(!bool_arg(args, 0)?))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{eval, eval_err};
    use crate::error::EvalError;
    use crate::value::Value;

    #[test]
    fn test_logical_functions() {
        assert_eq!(eval("AND(TRUE, 1, 2 > 1)").unwrap(), Value::Boolean(true));
        assert_eq!(eval("AND(TRUE, 0)").unwrap(), Value::Boolean(false));
        assert_eq!(eval("OR(FALSE, 0, 1)").unwrap(), Value::Boolean(true));
        assert_eq!(eval("XOR(TRUE, TRUE, TRUE)").unwrap(), Value::Boolean(true));
        assert_eq!(eval("XOR(TRUE, TRUE)").unwrap(), Value::Boolean(false));
        assert_eq!(eval("NOT(0)").unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_text_is_not_a_truth_value() {
        assert_eq!(
            eval_err("AND(TRUE, \"yes\")"),
            EvalError::TypeMismatch {
                expected: "boolean",
                found: "text"
            }
        );
    }
}
