//! Prelude module - common imports for evalsheet users
//!
//! ```rust
//! use evalsheet::prelude::*;
//! ```

pub use crate::{
    CellAddress,
    CellRange,
    CellValue,
    Dialect,

    // Engine
    Engine,
    EngineOptions,

    // Errors
    ErrorCategory,
    EvalError,
    EvaluationContext,
    FormulaError,

    Grid,
    SheetContext,
    Value,
    VariableContext,
};

#[cfg(feature = "csv")]
pub use crate::{CsvReadOptions, CsvReader};
