//! Formula engine
//!
//! Bundles a dialect with an optional AST cache so callers can go straight
//! from source text to a value.
//!
//! # Example
//!
//! ```rust
//! use evalsheet::prelude::*;
//!
//! let engine = Engine::new(EngineOptions {
//!     dialect: Dialect::Expression,
//!     ..EngineOptions::default()
//! });
//!
//! let ctx = VariableContext::new().with("qty", 3.0).with("price", 2.5);
//! assert_eq!(engine.evaluate("[qty] * [price]", &ctx).unwrap(), Value::Number(7.5));
//! ```

use std::sync::Arc;

use evalsheet_formula::{
    evaluate, parse_formula, references, Dialect, EvaluationContext, Expr, FormulaCache,
    FormulaResult, References, Value,
};

/// Options for an [`Engine`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineOptions {
    /// Formula language (default: spreadsheet)
    pub dialect: Dialect,
    /// Keep parsed formulas for reuse (default: true)
    pub cache_enabled: bool,
    /// Cached formulas before the cache is cleared (default: 1024, None = unbounded)
    pub cache_capacity: Option<usize>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::Spreadsheet,
            cache_enabled: true,
            cache_capacity: Some(1024),
        }
    }
}

/// Parses and evaluates formulas of one dialect
#[derive(Debug)]
pub struct Engine {
    options: EngineOptions,
    cache: Option<FormulaCache>,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        let cache = options.cache_enabled.then(|| match options.cache_capacity {
            Some(capacity) => FormulaCache::with_capacity(capacity),
            None => FormulaCache::new(),
        });
        Self { options, cache }
    }

    /// Engine with default options for `dialect`
    pub fn with_dialect(dialect: Dialect) -> Self {
        Self::new(EngineOptions {
            dialect,
            ..EngineOptions::default()
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.options.dialect
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Parse `source`, reusing a cached tree when possible
    pub fn parse(&self, source: &str) -> FormulaResult<Arc<Expr>> {
        match &self.cache {
            Some(cache) => cache.get_or_parse(source, self.options.dialect),
            None => parse_formula(source, self.options.dialect).map(Arc::new),
        }
    }

    /// Parse and evaluate `source` against `ctx`
    pub fn evaluate(&self, source: &str, ctx: &dyn EvaluationContext) -> FormulaResult<Value> {
        let expr = self.parse(source)?;
        evaluate(&expr, ctx, self.options.dialect)
    }

    /// Parse once, then evaluate against each context in turn
    ///
    /// A parse failure is returned as the outer error; evaluation failures are
    /// reported per row.
    pub fn evaluate_rows<'c, I>(&self, source: &str, contexts: I) -> FormulaResult<Vec<FormulaResult<Value>>>
    where
        I: IntoIterator<Item = &'c dyn EvaluationContext>,
    {
        let expr = self.parse(source)?;
        Ok(contexts
            .into_iter()
            .map(|ctx| evaluate(&expr, ctx, self.options.dialect))
            .collect())
    }

    /// Variables, cells and ranges `source` reads
    pub fn references(&self, source: &str) -> FormulaResult<References> {
        self.parse(source).map(|expr| references(&expr))
    }

    /// Number of cached trees (0 when caching is disabled)
    pub fn cached_formulas(&self) -> usize {
        self.cache.as_ref().map_or(0, FormulaCache::len)
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{SheetContext, VariableContext};
    use evalsheet_core::Grid;
    use evalsheet_formula::EvalError;

    #[test]
    fn test_cache_reuse() {
        let engine = Engine::default();
        let a = engine.parse("=1+2").unwrap();
        let b = engine.parse("=1+2").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(engine.cached_formulas(), 1);

        engine.clear_cache();
        assert_eq!(engine.cached_formulas(), 0);
    }

    #[test]
    fn test_cache_disabled() {
        let engine = Engine::new(EngineOptions {
            cache_enabled: false,
            ..EngineOptions::default()
        });
        let a = engine.parse("=1+2").unwrap();
        let b = engine.parse("=1+2").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(engine.cached_formulas(), 0);
    }

    #[test]
    fn test_evaluate_against_grid() {
        let mut grid = Grid::new();
        for (i, n) in [1.0, 2.0, 3.0, 4.0].into_iter().enumerate() {
            grid.set_at(i as u32, 0, n);
        }
        let ctx = SheetContext::new(grid);
        let engine = Engine::default();

        assert_eq!(engine.evaluate("=SUM(A1:A4)", &ctx).unwrap(), Value::Number(10.0));
        assert_eq!(engine.evaluate("=AVERAGE(A1:A4)", &ctx).unwrap(), Value::Number(2.5));
        assert_eq!(
            engine.evaluate("=COUNTIF(A1:A4, \">2\")", &ctx).unwrap(),
            Value::Number(2.0)
        );
    }

    #[test]
    fn test_evaluate_rows() {
        let engine = Engine::with_dialect(Dialect::Expression);
        let rows = [
            VariableContext::new().with("x", 2.0),
            VariableContext::new().with("x", 0.0),
            VariableContext::new(),
        ];
        let results = engine
            .evaluate_rows("10 / [x]", rows.iter().map(|c| c as &dyn EvaluationContext))
            .unwrap();

        assert_eq!(results[0], Ok(Value::Number(5.0)));
        assert_eq!(
            results[1].as_ref().unwrap_err().eval_error(),
            Some(&EvalError::DivisionByZero)
        );
        assert_eq!(
            results[2].as_ref().unwrap_err().eval_error(),
            Some(&EvalError::UnresolvedName("x".into()))
        );
        assert_eq!(engine.cached_formulas(), 1);

        assert!(engine
            .evaluate_rows("10 /", rows.iter().map(|c| c as &dyn EvaluationContext))
            .is_err());
    }

    #[test]
    fn test_references() {
        let engine = Engine::with_dialect(Dialect::Expression);
        let refs = engine.references("[b] + [a]").unwrap();
        assert_eq!(refs.variables, vec!["a", "b"]);
    }
}
