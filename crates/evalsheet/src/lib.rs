//! # evalsheet
//!
//! An embeddable formula engine for two small languages:
//!
//! - **Spreadsheet formulas** with cell and range references:
//!   `=IF(SUM(B2:B10) > 100, "high", "low")`
//! - **Expressions** over named variables:
//!   `IFMISSING([discount], 0) * [price]`
//!
//! ## Features
//!
//! - Precedence-aware parser producing a typed AST with source offsets
//! - Tree-walking evaluator with math, text, date/time, logical and
//!   aggregate functions
//! - Errors classified as lexical, syntactic or semantic, each with an offset
//! - Pluggable data access through [`EvaluationContext`]
//! - Thread-safe AST cache
//! - CSV loading into a [`Grid`] (feature `csv`, on by default)
//!
//! ## Example
//!
//! ```rust
//! use evalsheet::prelude::*;
//!
//! let mut grid = Grid::new();
//! grid.set("A1", 1.0).unwrap();
//! grid.set("A2", 2.0).unwrap();
//! grid.set("A3", 3.0).unwrap();
//! grid.set("A4", 4.0).unwrap();
//!
//! let ctx = SheetContext::new(grid);
//! let engine = Engine::default();
//!
//! assert_eq!(engine.evaluate("=SUM(A1:A4)", &ctx).unwrap(), Value::Number(10.0));
//! assert_eq!(engine.evaluate("=COUNTIF(A1:A4, \">2\")", &ctx).unwrap(), Value::Number(2.0));
//!
//! let err = engine.evaluate("=A1 / 0", &ctx).unwrap_err();
//! assert_eq!(err.category(), ErrorCategory::Semantic);
//! assert_eq!(err.offset(), 4);
//! ```

pub mod context;
pub mod engine;
pub mod prelude;

pub use context::{SheetContext, VariableContext};
pub use engine::{Engine, EngineOptions};

// Re-export core types
pub use evalsheet_core::{CellAddress, CellRange, CellValue, Grid, MAX_COLS, MAX_ROWS};

// Re-export formula types
pub use evalsheet_formula::{
    evaluate, parse, parse_formula, references, registry, tokenize, BinaryOperator, Dialect,
    ErrorCategory, EvalError, EvaluationContext, Evaluator, Expr, ExprKind, FormulaCache,
    FormulaError, FormulaResult, FunctionDef, FunctionKind, FunctionRegistry, LexError, Name,
    ParseError, References, Token, TokenKind, UnaryOperator, Value,
};

// Re-export I/O types
#[cfg(feature = "csv")]
pub use evalsheet_csv::{CsvError, CsvReadOptions, CsvReader};
