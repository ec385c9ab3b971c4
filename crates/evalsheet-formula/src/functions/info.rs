//! Information functions

use crate::error::EvalResult;
use crate::evaluator::EvaluationContext;
use crate::value::Value;

pub fn fn_isnumber(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Boolean(matches!(args.first(), Some(Value::Number(_)))))
}

/// ISTEXT - true for non-blank text
pub fn fn_istext(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Boolean(
        matches!(args.first(), Some(Value::Text(s)) if !s.is_empty()),
    ))
}

/// ISBLANK - true for empty cells and empty text
pub fn fn_isblank(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Boolean(args.first().map_or(false, Value::is_blank)))
}

pub fn fn_islogical(args: &[Value], _ctx: &dyn EvaluationContext) -> EvalResult<Value> {
    Ok(Value::Boolean(matches!(args.first(), Some(Value::Boolean(_)))))
}
