//! Formula error types
//!
//! Errors fall into three categories that mirror the pipeline stages:
//! lexical ([`LexError`]), syntactic ([`ParseError`]) and semantic
//! ([`EvalError`], wrapped with the offset of the failing node).

use std::fmt;
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Result type for function implementations and operators
///
/// These have no position information; the evaluator attaches the offset of
/// the node being evaluated when converting to [`FormulaError`].
pub type EvalResult<T> = std::result::Result<T, EvalError>;

/// Failure while splitting source text into tokens
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message} at offset {offset}")]
pub struct LexError {
    /// 0-based character offset
    pub offset: usize,
    pub message: String,
}

impl LexError {
    pub(crate) fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Failure while building the AST
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("expected {expected}, found {found} at offset {offset}")]
pub struct ParseError {
    /// 0-based character offset of the offending token
    pub offset: usize,
    /// What the parser was looking for
    pub expected: String,
    /// Description of what it saw instead
    pub found: String,
}

impl ParseError {
    pub(crate) fn new(offset: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self {
            offset,
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Semantic errors raised while evaluating an AST
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    /// The context has no value for a variable, cell or range
    #[error("unresolved name '{0}'")]
    UnresolvedName(String),

    /// An operand or argument has the wrong kind of value
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Division or remainder by zero
    #[error("division by zero")]
    DivisionByZero,

    /// A range appeared outside an aggregate function argument
    #[error("range reference is only allowed as an aggregate function argument")]
    InvalidRangeUsage,

    /// Call to a function the dialect does not know
    #[error("unknown function {0}")]
    UnknownFunction(String),

    /// A criterion string that cannot be interpreted
    #[error("malformed predicate '{0}'")]
    MalformedPredicate(String),

    /// Wrong number of arguments
    #[error("wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Argument has the right kind but an unusable value
    #[error("invalid argument to {function}: {message}")]
    InvalidArgument {
        function: &'static str,
        message: String,
    },
}

impl EvalError {
    pub(crate) fn type_mismatch(expected: &'static str, found: &'static str) -> Self {
        EvalError::TypeMismatch { expected, found }
    }

    pub(crate) fn invalid_argument(function: &'static str, message: impl Into<String>) -> Self {
        EvalError::InvalidArgument {
            function,
            message: message.into(),
        }
    }
}

/// Error category reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Lexical,
    Syntactic,
    Semantic,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorCategory::Lexical => "lexical error",
            ErrorCategory::Syntactic => "syntax error",
            ErrorCategory::Semantic => "evaluation error",
        })
    }
}

/// Any error produced while turning source text into a value
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{error} at offset {offset}")]
    Eval { offset: usize, error: EvalError },
}

impl FormulaError {
    /// Which pipeline stage failed
    pub fn category(&self) -> ErrorCategory {
        match self {
            FormulaError::Lex(_) => ErrorCategory::Lexical,
            FormulaError::Parse(_) => ErrorCategory::Syntactic,
            FormulaError::Eval { .. } => ErrorCategory::Semantic,
        }
    }

    /// 0-based character offset in the source text
    pub fn offset(&self) -> usize {
        match self {
            FormulaError::Lex(e) => e.offset,
            FormulaError::Parse(e) => e.offset,
            FormulaError::Eval { offset, .. } => *offset,
        }
    }

    /// The semantic error, if evaluation failed
    pub fn eval_error(&self) -> Option<&EvalError> {
        match self {
            FormulaError::Eval { error, .. } => Some(error),
            _ => None,
        }
    }

    pub(crate) fn at(offset: usize, error: EvalError) -> Self {
        FormulaError::Eval { offset, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_and_offset() {
        let err: FormulaError = LexError::new(4, "unterminated string").into();
        assert_eq!(err.category(), ErrorCategory::Lexical);
        assert_eq!(err.offset(), 4);
        assert_eq!(err.to_string(), "unterminated string at offset 4");

        let err: FormulaError = ParseError::new(2, "')'", "end of input").into();
        assert_eq!(err.category(), ErrorCategory::Syntactic);
        assert_eq!(err.to_string(), "expected ')', found end of input at offset 2");

        let err = FormulaError::at(1, EvalError::DivisionByZero);
        assert_eq!(err.category(), ErrorCategory::Semantic);
        assert_eq!(err.eval_error(), Some(&EvalError::DivisionByZero));
        assert_eq!(err.to_string(), "division by zero at offset 1");
    }
}
