//! Formula Abstract Syntax Tree types

use crate::dialect::Dialect;
use crate::functions;
use crate::value::{format_number, Value, DATETIME_FORMAT};
use evalsheet_core::{CellAddress, CellRange};
use std::fmt;

/// A node of the syntax tree with the source offset of the token that introduced it
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    /// 0-based character offset (operator for unary/binary, name for calls)
    pub offset: usize,
}

/// Formula expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Literal value
    Literal(Value),

    // === References ===
    /// Variable or single cell
    Reference(Name),
    /// Rectangular cell range, only meaningful as an aggregate argument
    RangeReference(CellRange),

    // === Operators ===
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// `IF(condition, then, else)`; only the chosen branch is evaluated
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// Built-in function call, `name` in canonical upper case
    Call { name: String, args: Vec<Expr> },
}

/// Something a reference resolves through the context
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Name {
    Variable(String),
    Cell(CellAddress),
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Name::Variable(name) => write!(f, "[{}]", name),
            Name::Cell(addr) => write!(f, "{}", addr),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,

    // Text
    Concat,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Logical
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Power => "^",
            BinaryOperator::Concat => "&",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterEqual
        )
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Not,
}

impl Expr {
    pub fn new(kind: ExprKind, offset: usize) -> Self {
        Self { kind, offset }
    }

    pub fn literal<V: Into<Value>>(value: V, offset: usize) -> Self {
        Self::new(ExprKind::Literal(value.into()), offset)
    }

    pub fn variable<S: Into<String>>(name: S, offset: usize) -> Self {
        Self::new(ExprKind::Reference(Name::Variable(name.into())), offset)
    }

    pub fn cell(address: CellAddress, offset: usize) -> Self {
        Self::new(ExprKind::Reference(Name::Cell(address)), offset)
    }

    pub fn binary(op: BinaryOperator, left: Expr, right: Expr, offset: usize) -> Self {
        Self::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            offset,
        )
    }

    pub fn unary(op: UnaryOperator, operand: Expr, offset: usize) -> Self {
        Self::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            offset,
        )
    }

    pub fn call<S: Into<String>>(name: S, args: Vec<Expr>, offset: usize) -> Self {
        Self::new(
            ExprKind::Call {
                name: name.into(),
                args,
            },
            offset,
        )
    }

    /// Direct children, left to right
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Literal(_) | ExprKind::Reference(_) | ExprKind::RangeReference(_) => {
                Vec::new()
            }
            ExprKind::Unary { operand, .. } => vec![operand.as_ref()],
            ExprKind::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            ExprKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => vec![condition.as_ref(), then_branch.as_ref(), else_branch.as_ref()],
            ExprKind::Call { args, .. } => args.iter().collect(),
        }
    }

    /// Whether the result depends on the context clock (`NOW`, `TODAY`)
    pub fn is_volatile(&self) -> bool {
        if let ExprKind::Call { name, .. } = &self.kind {
            let volatile = Dialect::ALL
                .iter()
                .filter_map(|d| functions::registry(*d).get(name))
                .any(|def| def.volatile);
            if volatile {
                return true;
            }
        }
        self.children().into_iter().any(Expr::is_volatile)
    }
}

fn write_text_literal(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Number(n) if n.is_nan() => f.write_str("SQRT(-1)"),
        Value::Number(n) if n.is_infinite() => {
            f.write_str(if *n > 0.0 { "(1e308*10)" } else { "(-1e308*10)" })
        }
        Value::Number(n) if *n < 0.0 => write!(f, "(-{})", format_number(-n)),
        Value::Number(n) => f.write_str(&format_number(*n)),
        Value::Text(s) => write_text_literal(f, s),
        Value::Boolean(true) => f.write_str("TRUE"),
        Value::Boolean(false) => f.write_str("FALSE"),
        Value::DateTime(dt) => write!(f, "DATE(\"{}\")", dt.format(DATETIME_FORMAT)),
        Value::Array(items) => {
            f.write_str("{")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_literal(f, item)?;
            }
            f.write_str("}")
        }
    }
}

/// Prints source text that parses back (in the originating dialect) to an
/// equivalent tree. Compound expressions are fully parenthesized.
///
/// Neither dialect has date-time literal syntax, so a `DateTime` literal
/// prints as `DATE("YYYY-MM-DD HH:MM:SS")`. `DATE` exists only in the
/// spreadsheet dialect; the parser never yields such literals, and a
/// hand-built expression-dialect tree holding one does not re-parse.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(value) => write_literal(f, value),
            ExprKind::Reference(name) => write!(f, "{}", name),
            ExprKind::RangeReference(range) => write!(f, "{}:{}", range.start, range.end),
            ExprKind::Unary {
                op: UnaryOperator::Negate,
                operand,
            } => write!(f, "(-({}))", operand),
            ExprKind::Unary {
                op: UnaryOperator::Not,
                operand,
            } => write!(f, "(!({}))", operand),
            ExprKind::Binary { op, left, right } => match op {
                BinaryOperator::And | BinaryOperator::Or => {
                    write!(f, "({} {} {})", left, op.symbol(), right)
                }
                _ => write!(f, "({}{}{})", left, op.symbol(), right),
            },
            ExprKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => write!(f, "IF({}, {}, {})", condition, then_branch, else_branch),
            ExprKind::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_parenthesizes() {
        let expr = Expr::binary(
            BinaryOperator::Multiply,
            Expr::binary(
                BinaryOperator::Add,
                Expr::literal(1.0, 0),
                Expr::literal(2.0, 2),
                1,
            ),
            Expr::variable("x", 5),
            4,
        );
        assert_eq!(expr.to_string(), "((1+2)*[x])");
    }

    #[test]
    fn test_display_literals() {
        assert_eq!(Expr::literal(-3.5, 0).to_string(), "(-3.5)");
        assert_eq!(Expr::literal("a\"b\\c", 0).to_string(), r#""a\"b\\c""#);
        assert_eq!(Expr::literal(true, 0).to_string(), "TRUE");
        assert_eq!(Expr::literal(f64::NAN, 0).to_string(), "SQRT(-1)");
    }

    #[test]
    fn test_display_datetime_literal() {
        use crate::dialect::Dialect;
        use crate::parser::parse_formula;

        let dt = chrono::NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(10, 20, 30)
            .unwrap();
        let printed = Expr::literal(Value::DateTime(dt), 0).to_string();
        assert_eq!(printed, "DATE(\"2024-03-15 10:20:30\")");
        assert!(parse_formula(&printed, Dialect::Spreadsheet).is_ok());
        assert!(parse_formula(&printed, Dialect::Expression).is_err());
    }

    #[test]
    fn test_display_logical_keeps_spaces() {
        let expr = Expr::binary(
            BinaryOperator::And,
            Expr::literal(true, 0),
            Expr::unary(UnaryOperator::Not, Expr::literal(false, 10), 9),
            5,
        );
        assert_eq!(expr.to_string(), "(TRUE AND (!(FALSE)))");
    }

    #[test]
    fn test_volatility() {
        let now = Expr::call("NOW", vec![], 0);
        let year = Expr::call("YEAR", vec![now], 0);
        assert!(year.is_volatile());
        assert!(!Expr::call("ABS", vec![Expr::literal(1.0, 4)], 0).is_volatile());
    }
}
