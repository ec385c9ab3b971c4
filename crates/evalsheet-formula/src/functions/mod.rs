//! Built-in functions
//!
//! Each dialect gets its own [`FunctionRegistry`], composed from a shared core
//! plus dialect-specific extras, and built once on first use.

pub mod criteria;
pub mod date;
pub mod info;
pub mod logical;
pub mod math;
pub mod statistical;
pub mod text;

use crate::dialect::Dialect;
use crate::error::{EvalError, EvalResult};
use crate::evaluator::EvaluationContext;
use crate::value::Value;
use ahash::AHashMap;
use once_cell::sync::Lazy;

/// Function implementation signature
///
/// Functions receive already-evaluated arguments and may consult the context
/// (only the date functions do, for the clock).
pub type FunctionImpl = fn(&[Value], &dyn EvaluationContext) -> EvalResult<Value>;

/// Forms the evaluator handles itself because their arguments must not be
/// evaluated up front
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    /// `IF` / `IFELSE`; the parser turns these into conditionals
    If,
    /// `HAS([name])`
    Has,
    /// `IFMISSING(expr, default)`
    IfMissing,
    /// `CELL(address_text)`
    Cell,
}

/// How the evaluator prepares a function's arguments
#[derive(Clone, Copy)]
pub enum FunctionKind {
    /// Every argument is evaluated to a scalar
    Scalar(FunctionImpl),
    /// Range arguments are expanded to `Value::Array`
    Aggregate(FunctionImpl),
    Special(SpecialForm),
}

/// Function definition
#[derive(Clone)]
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    pub kind: FunctionKind,
    /// Reads the clock
    pub volatile: bool,
}

impl FunctionDef {
    pub fn scalar(name: &'static str, min_args: usize, max_args: Option<usize>, f: FunctionImpl) -> Self {
        Self {
            name,
            min_args,
            max_args,
            kind: FunctionKind::Scalar(f),
            volatile: false,
        }
    }

    pub fn aggregate(name: &'static str, min_args: usize, max_args: Option<usize>, f: FunctionImpl) -> Self {
        Self {
            name,
            min_args,
            max_args,
            kind: FunctionKind::Aggregate(f),
            volatile: false,
        }
    }

    pub fn special(name: &'static str, min_args: usize, max_args: Option<usize>, form: SpecialForm) -> Self {
        Self {
            name,
            min_args,
            max_args,
            kind: FunctionKind::Special(form),
            volatile: false,
        }
    }

    fn volatile(mut self) -> Self {
        self.volatile = true;
        self
    }

    /// Whether `count` arguments satisfy the arity
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }

    /// "2 arguments", "1 to 3 arguments", "at least 1 argument"
    pub fn arity_description(&self) -> String {
        let plural = |n: usize| if n == 1 { "argument" } else { "arguments" };
        match self.max_args {
            Some(max) if max == self.min_args => format!("{} {}", max, plural(max)),
            Some(max) => format!("{} to {} {}", self.min_args, max, plural(max)),
            None => format!("at least {} {}", self.min_args, plural(self.min_args)),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.kind, FunctionKind::Aggregate(_))
    }
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<&'static str, FunctionDef>,
}

static SPREADSHEET_FUNCTIONS: Lazy<FunctionRegistry> =
    Lazy::new(|| FunctionRegistry::new(Dialect::Spreadsheet));
static EXPRESSION_FUNCTIONS: Lazy<FunctionRegistry> =
    Lazy::new(|| FunctionRegistry::new(Dialect::Expression));

/// The process-wide registry for a dialect
pub fn registry(dialect: Dialect) -> &'static FunctionRegistry {
    match dialect {
        Dialect::Spreadsheet => &SPREADSHEET_FUNCTIONS,
        Dialect::Expression => &EXPRESSION_FUNCTIONS,
    }
}

impl FunctionRegistry {
    /// Create a registry with the built-in functions of `dialect`
    pub fn new(dialect: Dialect) -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };

        registry.register_math_functions();
        registry.register_aggregate_functions();
        registry.register_text_functions();
        registry.register_logical_functions();
        registry.register_info_functions();
        registry.register_date_functions();

        match dialect {
            Dialect::Spreadsheet => registry.register_spreadsheet_functions(),
            Dialect::Expression => registry.register_expression_functions(),
        }

        registry
    }

    /// Look up a function by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        match self.functions.get(name) {
            Some(def) => Some(def),
            None => self.functions.get(name.to_ascii_uppercase().as_str()),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Register a function, replacing any previous definition of the same name
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name, def);
    }

    /// All definitions sorted by name
    pub fn definitions(&self) -> Vec<&FunctionDef> {
        let mut defs: Vec<_> = self.functions.values().collect();
        defs.sort_by_key(|d| d.name);
        defs
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn register_math_functions(&mut self) {
        use math::*;
        self.register(FunctionDef::scalar("ABS", 1, Some(1), fn_abs));
        self.register(FunctionDef::scalar("SQRT", 1, Some(1), fn_sqrt));
        self.register(FunctionDef::scalar("POWER", 2, Some(2), fn_power));
        self.register(FunctionDef::scalar("EXP", 1, Some(1), fn_exp));
        self.register(FunctionDef::scalar("LN", 1, Some(1), fn_ln));
        self.register(FunctionDef::scalar("LOG", 1, Some(2), fn_log));
        self.register(FunctionDef::scalar("LOG10", 1, Some(1), fn_log10));
        self.register(FunctionDef::scalar("ROUND", 1, Some(2), fn_round));
        self.register(FunctionDef::scalar("ROUNDUP", 1, Some(2), fn_roundup));
        self.register(FunctionDef::scalar("ROUNDDOWN", 1, Some(2), fn_rounddown));
        self.register(FunctionDef::scalar("INT", 1, Some(1), fn_int));
        self.register(FunctionDef::scalar("TRUNC", 1, Some(2), fn_trunc));
        self.register(FunctionDef::scalar("MOD", 2, Some(2), fn_mod));
        self.register(FunctionDef::scalar("SIGN", 1, Some(1), fn_sign));
        self.register(FunctionDef::scalar("PI", 0, Some(0), fn_pi));
        self.register(FunctionDef::scalar("SIN", 1, Some(1), fn_sin));
        self.register(FunctionDef::scalar("COS", 1, Some(1), fn_cos));
        self.register(FunctionDef::scalar("TAN", 1, Some(1), fn_tan));
        self.register(FunctionDef::scalar("ASIN", 1, Some(1), fn_asin));
        self.register(FunctionDef::scalar("ACOS", 1, Some(1), fn_acos));
        self.register(FunctionDef::scalar("ATAN", 1, Some(1), fn_atan));
        self.register(FunctionDef::scalar("ATAN2", 2, Some(2), fn_atan2));
        self.register(FunctionDef::scalar("DEGREES", 1, Some(1), fn_degrees));
        self.register(FunctionDef::scalar("RADIANS", 1, Some(1), fn_radians));
        self.register(FunctionDef::scalar("CEILING", 1, Some(2), fn_ceiling));
        self.register(FunctionDef::scalar("FLOOR", 1, Some(2), fn_floor));
    }

    fn register_aggregate_functions(&mut self) {
        use statistical::*;
        self.register(FunctionDef::aggregate("SUM", 1, None, fn_sum));
        self.register(FunctionDef::aggregate("MIN", 1, None, fn_min));
        self.register(FunctionDef::aggregate("MAX", 1, None, fn_max));
        self.register(FunctionDef::aggregate("AVERAGE", 1, None, fn_average));
        self.register(FunctionDef::aggregate("COUNT", 1, None, fn_count));
        self.register(FunctionDef::aggregate("MEDIAN", 1, None, fn_median));
        self.register(FunctionDef::aggregate("STDEV", 1, None, fn_stdev));
        self.register(FunctionDef::aggregate("STDEVP", 1, None, fn_stdevp));
    }

    fn register_text_functions(&mut self) {
        use text::*;
        self.register(FunctionDef::scalar("LEN", 1, Some(1), fn_len));
        self.register(FunctionDef::scalar("LEFT", 1, Some(2), fn_left));
        self.register(FunctionDef::scalar("RIGHT", 1, Some(2), fn_right));
        self.register(FunctionDef::scalar("MID", 3, Some(3), fn_mid));
        self.register(FunctionDef::scalar("FIND", 2, Some(3), fn_find));
        self.register(FunctionDef::scalar("SEARCH", 2, Some(3), fn_search));
        self.register(FunctionDef::scalar("SUBSTITUTE", 3, Some(4), fn_substitute));
        self.register(FunctionDef::scalar("UPPER", 1, Some(1), fn_upper));
        self.register(FunctionDef::scalar("LOWER", 1, Some(1), fn_lower));
        self.register(FunctionDef::scalar("TRIM", 1, Some(1), fn_trim));
        self.register(FunctionDef::scalar("CONCAT", 1, None, fn_concat));
        self.register(FunctionDef::scalar("REPT", 2, Some(2), fn_rept));
        self.register(FunctionDef::scalar("EXACT", 2, Some(2), fn_exact));
        self.register(FunctionDef::scalar("PROPER", 1, Some(1), fn_proper));
        self.register(FunctionDef::scalar("VALUE", 1, Some(1), fn_value));
        self.register(FunctionDef::scalar("TEXT", 1, Some(2), fn_text));
    }

    fn register_logical_functions(&mut self) {
        use logical::*;
        self.register(FunctionDef::special("IF", 3, Some(3), SpecialForm::If));
        self.register(FunctionDef::special("IFELSE", 3, Some(3), SpecialForm::If));
        self.register(FunctionDef::scalar("AND", 1, None, fn_and));
        self.register(FunctionDef::scalar("OR", 1, None, fn_or));
        self.register(FunctionDef::scalar("XOR", 1, None, fn_xor));
        self.register(FunctionDef::scalar("NOT", 1, Some(1), fn_not));
    }

    fn register_info_functions(&mut self) {
        use info::*;
        self.register(FunctionDef::scalar("ISNUMBER", 1, Some(1), fn_isnumber));
        self.register(FunctionDef::scalar("ISTEXT", 1, Some(1), fn_istext));
        self.register(FunctionDef::scalar("ISBLANK", 1, Some(1), fn_isblank));
        self.register(FunctionDef::scalar("ISLOGICAL", 1, Some(1), fn_islogical));
    }

    fn register_date_functions(&mut self) {
        use date::*;
        self.register(FunctionDef::scalar("NOW", 0, Some(0), fn_now).volatile());
        self.register(FunctionDef::scalar("TODAY", 0, Some(0), fn_today).volatile());
        self.register(FunctionDef::scalar("YEAR", 1, Some(1), fn_year));
        self.register(FunctionDef::scalar("MONTH", 1, Some(1), fn_month));
        self.register(FunctionDef::scalar("DAY", 1, Some(1), fn_day));
        self.register(FunctionDef::scalar("HOUR", 1, Some(1), fn_hour));
        self.register(FunctionDef::scalar("MINUTE", 1, Some(1), fn_minute));
        self.register(FunctionDef::scalar("SECOND", 1, Some(1), fn_second));
        self.register(FunctionDef::scalar("WEEKDAY", 1, Some(2), fn_weekday));
        self.register(FunctionDef::scalar("WEEKNUM", 1, Some(1), fn_weeknum));
    }

    fn register_spreadsheet_functions(&mut self) {
        self.register(FunctionDef::aggregate("COUNTA", 1, None, statistical::fn_counta));
        self.register(FunctionDef::aggregate("COUNTIF", 2, Some(2), statistical::fn_countif));
        self.register(FunctionDef::aggregate("COUNTBLANK", 1, None, statistical::fn_countblank));
        self.register(FunctionDef::aggregate("SUMIF", 2, Some(3), statistical::fn_sumif));
        self.register(FunctionDef::aggregate("SLOPE", 2, Some(2), statistical::fn_slope));
        self.register(FunctionDef::aggregate("INTERCEPT", 2, Some(2), statistical::fn_intercept));
        self.register(FunctionDef::scalar("DATE", 1, Some(3), date::fn_date));
        self.register(FunctionDef::special("CELL", 1, Some(1), SpecialForm::Cell));
    }

    fn register_expression_functions(&mut self) {
        use math::*;
        use text::*;
        self.register(FunctionDef::scalar("SINH", 1, Some(1), fn_sinh));
        self.register(FunctionDef::scalar("COSH", 1, Some(1), fn_cosh));
        self.register(FunctionDef::scalar("TANH", 1, Some(1), fn_tanh));
        self.register(FunctionDef::scalar("CBRT", 1, Some(1), fn_cbrt));
        self.register(FunctionDef::scalar("HYPOT", 2, Some(2), fn_hypot));
        self.register(FunctionDef::scalar("RINT", 1, Some(1), fn_rint));
        self.register(FunctionDef::scalar("ISNAN", 1, Some(1), fn_isnan));

        self.register(FunctionDef::scalar("SUBSTR", 2, Some(3), fn_substr));
        self.register(FunctionDef::scalar("CONTAINS", 2, Some(2), fn_contains));
        self.register(FunctionDef::scalar("STARTSWITH", 2, Some(2), fn_startswith));
        self.register(FunctionDef::scalar("ENDSWITH", 2, Some(2), fn_endswith));
        self.register(FunctionDef::scalar("MATCHES", 2, Some(2), fn_matches));
        self.register(FunctionDef::scalar("REPLACEALL", 3, Some(3), fn_replaceall));

        self.register(FunctionDef::special("HAS", 1, Some(1), SpecialForm::Has));
        self.register(FunctionDef::special("IFMISSING", 2, Some(2), SpecialForm::IfMissing));
    }
}

// === Argument helpers shared by the function modules ===

pub(crate) fn number_arg(args: &[Value], index: usize) -> EvalResult<f64> {
    match args.get(index) {
        Some(v) => v.to_number(),
        None => Err(EvalError::type_mismatch("number", "nothing")),
    }
}

pub(crate) fn opt_number_arg(args: &[Value], index: usize, default: f64) -> EvalResult<f64> {
    match args.get(index) {
        Some(v) => v.to_number(),
        None => Ok(default),
    }
}

/// Integer argument, truncated toward zero
pub(crate) fn int_arg(args: &[Value], index: usize) -> EvalResult<i64> {
    number_arg(args, index).map(|n| n.trunc() as i64)
}

pub(crate) fn opt_int_arg(args: &[Value], index: usize, default: i64) -> EvalResult<i64> {
    match args.get(index) {
        Some(v) => v.to_number().map(|n| n.trunc() as i64),
        None => Ok(default),
    }
}

/// Any scalar converted to its text form; ranges are rejected
pub(crate) fn text_arg(args: &[Value], index: usize) -> EvalResult<String> {
    match args.get(index) {
        Some(Value::Array(_)) => Err(EvalError::type_mismatch("text", "range")),
        Some(v) => Ok(v.as_text()),
        None => Err(EvalError::type_mismatch("text", "nothing")),
    }
}

pub(crate) fn bool_arg(args: &[Value], index: usize) -> EvalResult<bool> {
    match args.get(index) {
        Some(v) => v.to_bool(),
        None => Err(EvalError::type_mismatch("boolean", "nothing")),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_composition() {
        let sheet = registry(Dialect::Spreadsheet);
        let expr = registry(Dialect::Expression);

        for name in ["SUM", "LEFT", "IF", "NOW", "ROUND"] {
            assert!(sheet.contains(name), "{}", name);
            assert!(expr.contains(name), "{}", name);
        }
        for name in ["COUNTIF", "SUMIF", "DATE", "CELL", "SLOPE"] {
            assert!(sheet.contains(name), "{}", name);
            assert!(!expr.contains(name), "{}", name);
        }
        for name in ["HAS", "IFMISSING", "MATCHES", "ISNAN", "HYPOT"] {
            assert!(expr.contains(name), "{}", name);
            assert!(!sheet.contains(name), "{}", name);
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let def = registry(Dialect::Spreadsheet).get("sum").unwrap();
        assert_eq!(def.name, "SUM");
        assert!(def.is_aggregate());
    }

    #[test]
    fn test_arity_description() {
        let reg = registry(Dialect::Spreadsheet);
        assert_eq!(reg.get("MID").unwrap().arity_description(), "3 arguments");
        assert_eq!(reg.get("LEFT").unwrap().arity_description(), "1 to 2 arguments");
        assert_eq!(reg.get("SUM").unwrap().arity_description(), "at least 1 argument");
        assert_eq!(reg.get("PI").unwrap().arity_description(), "0 arguments");
    }

    #[test]
    fn test_volatile_flags() {
        let reg = registry(Dialect::Expression);
        assert!(reg.get("NOW").unwrap().volatile);
        assert!(reg.get("TODAY").unwrap().volatile);
        assert!(!reg.get("YEAR").unwrap().volatile);
    }
}
