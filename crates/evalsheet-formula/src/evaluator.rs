//! Formula evaluator
//!
//! Walks an AST once, resolving names through an [`EvaluationContext`].
//! Nothing is mutated: the same tree may be evaluated concurrently against
//! different contexts.

use crate::ast::{BinaryOperator, Expr, ExprKind, Name, UnaryOperator};
use crate::dialect::Dialect;
use crate::error::{EvalError, EvalResult, FormulaError, FormulaResult};
use crate::functions::{self, FunctionKind, FunctionRegistry, SpecialForm};
use crate::value::Value;
use chrono::{Duration, NaiveDateTime};
use evalsheet_core::{CellAddress, CellRange, CellValue};
use std::cmp::Ordering;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Read-only access to the data a formula refers to
///
/// `None` means "not found" and surfaces as [`EvalError::UnresolvedName`];
/// `Some(CellValue::Empty)` is a cell that exists but holds nothing.
pub trait EvaluationContext {
    /// Value of a `[name]` variable
    fn resolve_variable(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Value of a single cell
    fn resolve_cell(&self, _address: &CellAddress) -> Option<CellValue> {
        None
    }

    /// Values of a range in row-major order
    ///
    /// The default resolves every cell individually and gives up if any is missing.
    fn resolve_range(&self, range: &CellRange) -> Option<Vec<CellValue>> {
        range.cells().map(|addr| self.resolve_cell(&addr)).collect()
    }

    /// The clock used by `NOW`/`TODAY`
    fn now(&self) -> NaiveDateTime;
}

/// Evaluate an AST against a context
///
/// # Example
/// ```rust
/// use chrono::NaiveDateTime;
/// use evalsheet_formula::{evaluate, parse_formula, Dialect, EvaluationContext, Value};
///
/// struct Prices;
///
/// impl EvaluationContext for Prices {
///     fn resolve_variable(&self, name: &str) -> Option<Value> {
///         (name == "price").then(|| Value::Number(20.0))
///     }
///
///     fn now(&self) -> NaiveDateTime {
///         NaiveDateTime::default()
///     }
/// }
///
/// let ast = parse_formula("[price] * 1.5", Dialect::Expression).unwrap();
/// assert_eq!(evaluate(&ast, &Prices, Dialect::Expression).unwrap(), Value::Number(30.0));
/// ```
pub fn evaluate(expr: &Expr, ctx: &dyn EvaluationContext, dialect: Dialect) -> FormulaResult<Value> {
    Evaluator::new(ctx, dialect).evaluate(expr)
}

/// Tree-walking evaluator bound to one context
pub struct Evaluator<'c> {
    ctx: &'c dyn EvaluationContext,
    registry: &'static FunctionRegistry,
}

impl<'c> Evaluator<'c> {
    pub fn new(ctx: &'c dyn EvaluationContext, dialect: Dialect) -> Self {
        Self {
            ctx,
            registry: functions::registry(dialect),
        }
    }

    pub fn evaluate(&self, expr: &Expr) -> FormulaResult<Value> {
        log::trace!("evaluate: {}", expr);
        self.eval(expr)
    }

    fn eval(&self, expr: &Expr) -> FormulaResult<Value> {
        let at = |error: EvalError| FormulaError::at(expr.offset, error);

        match &expr.kind {
            ExprKind::Literal(value) => Ok(value.clone()),

            ExprKind::Reference(Name::Variable(name)) => self
                .ctx
                .resolve_variable(name)
                .ok_or_else(|| at(EvalError::UnresolvedName(name.clone()))),

            ExprKind::Reference(Name::Cell(addr)) => self
                .ctx
                .resolve_cell(addr)
                .map(Value::from)
                .ok_or_else(|| at(EvalError::UnresolvedName(addr.to_string()))),

            ExprKind::RangeReference(_) => Err(at(EvalError::InvalidRangeUsage)),

            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand)?;
                evaluate_unary_op(*op, &value).map_err(at)
            }

            ExprKind::Binary {
                op: BinaryOperator::And,
                left,
                right,
            } => {
                if !self.eval(left)?.to_bool().map_err(|e| FormulaError::at(left.offset, e))? {
                    return Ok(Value::Boolean(false));
                }
                let r = self.eval(right)?.to_bool();
                Ok(Value::Boolean(r.map_err(|e| FormulaError::at(right.offset, e))?))
            }

            ExprKind::Binary {
                op: BinaryOperator::Or,
                left,
                right,
            } => {
                if self.eval(left)?.to_bool().map_err(|e| FormulaError::at(left.offset, e))? {
                    return Ok(Value::Boolean(true));
                }
                let r = self.eval(right)?.to_bool();
                Ok(Value::Boolean(r.map_err(|e| FormulaError::at(right.offset, e))?))
            }

            ExprKind::Binary { op, left, right } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                evaluate_binary_op(*op, &l, &r).map_err(at)
            }

            ExprKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => self.eval_conditional(condition, then_branch, else_branch),

            ExprKind::Call { name, args } => self.eval_call(name, args, expr.offset),
        }
    }

    fn eval_conditional(&self, condition: &Expr, then_branch: &Expr, else_branch: &Expr) -> FormulaResult<Value> {
        let chosen = self
            .eval(condition)?
            .to_bool()
            .map_err(|e| FormulaError::at(condition.offset, e))?;
        if chosen {
            self.eval(then_branch)
        } else {
            self.eval(else_branch)
        }
    }

    fn eval_call(&self, name: &str, args: &[Expr], offset: usize) -> FormulaResult<Value> {
        let at = |error: EvalError| FormulaError::at(offset, error);

        let def = self
            .registry
            .get(name)
            .ok_or_else(|| at(EvalError::UnknownFunction(name.to_string())))?;

        if !def.accepts(args.len()) {
            return Err(at(EvalError::ArgumentCount {
                function: def.name.to_string(),
                expected: def.arity_description(),
                actual: args.len(),
            }));
        }

        match def.kind {
            FunctionKind::Special(form) => self.eval_special(def.name, form, args, offset),
            FunctionKind::Scalar(implementation) => {
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<FormulaResult<Vec<_>>>()?;
                implementation(&values, self.ctx).map_err(at)
            }
            FunctionKind::Aggregate(implementation) => {
                let values = args
                    .iter()
                    .map(|arg| self.eval_aggregate_arg(arg))
                    .collect::<FormulaResult<Vec<_>>>()?;
                implementation(&values, self.ctx).map_err(at)
            }
        }
    }

    /// Ranges expand to arrays here and nowhere else
    fn eval_aggregate_arg(&self, arg: &Expr) -> FormulaResult<Value> {
        match &arg.kind {
            ExprKind::RangeReference(range) => self
                .ctx
                .resolve_range(range)
                .map(|cells| Value::Array(cells.into_iter().map(Value::from).collect()))
                .ok_or_else(|| {
                    FormulaError::at(
                        arg.offset,
                        EvalError::UnresolvedName(format!("{}:{}", range.start, range.end)),
                    )
                }),
            _ => self.eval(arg),
        }
    }

    fn eval_special(
        &self,
        name: &'static str,
        form: SpecialForm,
        args: &[Expr],
        offset: usize,
    ) -> FormulaResult<Value> {
        match (form, args) {
            (SpecialForm::If, [condition, then_branch, else_branch]) => {
                self.eval_conditional(condition, then_branch, else_branch)
            }

            (SpecialForm::Has, [arg]) => match &arg.kind {
                ExprKind::Reference(Name::Variable(var)) => {
                    Ok(Value::Boolean(self.ctx.resolve_variable(var).is_some()))
                }
                ExprKind::Reference(Name::Cell(addr)) => {
                    Ok(Value::Boolean(self.ctx.resolve_cell(addr).is_some()))
                }
                _ => Err(FormulaError::at(
                    arg.offset,
                    EvalError::invalid_argument(name, "expected a variable reference"),
                )),
            },

            (SpecialForm::IfMissing, [value, default]) => match self.eval(value) {
                Err(FormulaError::Eval {
                    error: EvalError::UnresolvedName(missing),
                    ..
                }) => {
                    log::debug!("IFMISSING: '{}' unresolved, using default", missing);
                    self.eval(default)
                }
                other => other,
            },

            (SpecialForm::Cell, [arg]) => {
                let text = match self.eval(arg)? {
                    Value::Text(s) => s,
                    other => {
                        return Err(FormulaError::at(
                            arg.offset,
                            EvalError::type_mismatch("text", other.type_name()),
                        ))
                    }
                };
                let addr = CellAddress::parse(&text).map_err(|e| {
                    FormulaError::at(arg.offset, EvalError::invalid_argument(name, e.to_string()))
                })?;
                self.ctx
                    .resolve_cell(&addr)
                    .map(Value::from)
                    .ok_or_else(|| FormulaError::at(offset, EvalError::UnresolvedName(addr.to_string())))
            }

            (_, args) => Err(FormulaError::at(
                offset,
                EvalError::ArgumentCount {
                    function: name.to_string(),
                    expected: "a different number".to_string(),
                    actual: args.len(),
                },
            )),
        }
    }
}

/// Evaluate a unary operation
pub fn evaluate_unary_op(op: UnaryOperator, value: &Value) -> EvalResult<Value> {
    match op {
        UnaryOperator::Negate => Ok(Value::Number(-value.to_number()?)),
        UnaryOperator::Not => Ok(Value::Boolean(!value.to_bool()?)),
    }
}

/// Evaluate a binary operation on two already-evaluated operands
///
/// `AND`/`OR` are accepted here without short-circuiting.
pub fn evaluate_binary_op(op: BinaryOperator, left: &Value, right: &Value) -> EvalResult<Value> {
    match op {
        BinaryOperator::Add => add(left, right),
        BinaryOperator::Subtract => subtract(left, right),
        BinaryOperator::Multiply => Ok(Value::Number(left.to_number()? * right.to_number()?)),
        BinaryOperator::Divide => {
            let (l, r) = (left.to_number()?, right.to_number()?);
            if r == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Value::Number(l / r))
        }
        BinaryOperator::Modulo => {
            let (l, r) = (left.to_number()?, right.to_number()?);
            if r == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            // truncated remainder, sign of the dividend
            Ok(Value::Number(l % r))
        }
        BinaryOperator::Power => Ok(Value::Number(left.to_number()?.powf(right.to_number()?))),
        BinaryOperator::Concat => {
            if let Value::Array(_) = left {
                return Err(EvalError::type_mismatch("text", "range"));
            }
            if let Value::Array(_) = right {
                return Err(EvalError::type_mismatch("text", "range"));
            }
            Ok(Value::Text(format!("{}{}", left.as_text(), right.as_text())))
        }
        BinaryOperator::And => Ok(Value::Boolean(left.to_bool()? && right.to_bool()?)),
        BinaryOperator::Or => Ok(Value::Boolean(left.to_bool()? || right.to_bool()?)),
        BinaryOperator::Equal
        | BinaryOperator::NotEqual
        | BinaryOperator::LessThan
        | BinaryOperator::LessEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterEqual => {
            let ordering = compare(left, right)?;
            let result = match op {
                BinaryOperator::Equal => ordering == Some(Ordering::Equal),
                BinaryOperator::NotEqual => ordering != Some(Ordering::Equal),
                BinaryOperator::LessThan => ordering == Some(Ordering::Less),
                BinaryOperator::LessEqual => {
                    matches!(ordering, Some(Ordering::Less | Ordering::Equal))
                }
                BinaryOperator::GreaterThan => ordering == Some(Ordering::Greater),
                _ => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            };
            Ok(Value::Boolean(result))
        }
    }
}

fn days_to_duration(days: f64) -> EvalResult<Duration> {
    let millis = (days * MILLIS_PER_DAY).round();
    if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
        return Err(EvalError::invalid_argument("date arithmetic", "day offset out of range"));
    }
    Duration::try_milliseconds(millis as i64)
        .ok_or_else(|| EvalError::invalid_argument("date arithmetic", "day offset out of range"))
}

fn shift(dt: &NaiveDateTime, days: f64) -> EvalResult<Value> {
    dt.checked_add_signed(days_to_duration(days)?)
        .map(Value::DateTime)
        .ok_or_else(|| EvalError::invalid_argument("date arithmetic", "result out of range"))
}

fn add(left: &Value, right: &Value) -> EvalResult<Value> {
    match (left, right) {
        (Value::DateTime(dt), other) | (other, Value::DateTime(dt)) => {
            if let Value::DateTime(_) = other {
                return Err(EvalError::type_mismatch("number", "datetime"));
            }
            shift(dt, other.to_number()?)
        }
        _ => Ok(Value::Number(left.to_number()? + right.to_number()?)),
    }
}

fn subtract(left: &Value, right: &Value) -> EvalResult<Value> {
    match (left, right) {
        (Value::DateTime(a), Value::DateTime(b)) => {
            let millis = a.signed_duration_since(*b).num_milliseconds();
            Ok(Value::Number(millis as f64 / MILLIS_PER_DAY))
        }
        (Value::DateTime(dt), other) => shift(dt, -other.to_number()?),
        (_, Value::DateTime(_)) => Err(EvalError::type_mismatch("number", "datetime")),
        _ => Ok(Value::Number(left.to_number()? - right.to_number()?)),
    }
}

/// Order two values of the same kind; `None` when either side is NaN
pub fn compare(left: &Value, right: &Value) -> EvalResult<Option<Ordering>> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(a.partial_cmp(b)),
        (Value::Text(a), Value::Text(b)) => Ok(Some(a.cmp(b))),
        (Value::Boolean(a), Value::Boolean(b)) => Ok(Some(a.cmp(b))),
        (Value::DateTime(a), Value::DateTime(b)) => Ok(Some(a.cmp(b))),
        (l, r) => Err(EvalError::type_mismatch(l.type_name(), r.type_name())),
    }
}
