//! # evalsheet-formula
//!
//! Formula language engine for evalsheet.
//!
//! This crate provides:
//! - Tokenizing and parsing (text → AST) for two dialects
//! - Evaluation (AST + context → value)
//! - Built-in functions (math, text, date/time, logical, aggregates)
//! - An AST cache and reference extraction
//!
//! ## Dialects
//!
//! - [`Dialect::Spreadsheet`]: `=SUM(A1:A4) / COUNT(A1:A4)`, cells and ranges
//! - [`Dialect::Expression`]: `IFMISSING([price], 0) * 1.2`, named variables
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDateTime;
//! use evalsheet_formula::{evaluate, parse_formula, Dialect, EvaluationContext, Value};
//!
//! struct Empty;
//!
//! impl EvaluationContext for Empty {
//!     fn now(&self) -> NaiveDateTime {
//!         NaiveDateTime::default()
//!     }
//! }
//!
//! let ast = parse_formula("=LEFT(\"hello world\", 5) & \"!\"", Dialect::Spreadsheet).unwrap();
//! let value = evaluate(&ast, &Empty, Dialect::Spreadsheet).unwrap();
//! assert_eq!(value, Value::text("hello!"));
//! ```

pub mod ast;
pub mod cache;
pub mod dialect;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod references;
pub mod value;

pub use ast::{BinaryOperator, Expr, ExprKind, Name, UnaryOperator};
pub use cache::FormulaCache;
pub use dialect::Dialect;
pub use error::{
    ErrorCategory, EvalError, EvalResult, FormulaError, FormulaResult, LexError, ParseError,
};
pub use evaluator::{evaluate, EvaluationContext, Evaluator};
pub use functions::{registry, FunctionDef, FunctionKind, FunctionRegistry};
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{parse, parse_formula};
pub use references::{references, References};
pub use value::Value;
