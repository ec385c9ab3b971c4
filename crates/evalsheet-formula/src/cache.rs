//! Parsed-AST cache
//!
//! Keyed by (dialect, source text). Values are shared `Arc<Expr>` so many
//! evaluations can hold the same tree.

use crate::ast::Expr;
use crate::dialect::Dialect;
use crate::error::FormulaResult;
use crate::parser::parse_formula;
use ahash::AHashMap;
use std::sync::{Arc, PoisonError, RwLock};

type Entries = AHashMap<String, Arc<Expr>>;

/// Thread-safe cache of parsed formulas
///
/// Errors are not cached. With a capacity set, the cache is emptied
/// wholesale when an insert would exceed it.
#[derive(Debug, Default)]
pub struct FormulaCache {
    /// One map per dialect, indexed by `Dialect::index`
    entries: [RwLock<Entries>; 2],
    capacity: Option<usize>,
}

impl FormulaCache {
    /// Create an unbounded cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache holding at most `capacity` trees; 0 disables storage
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Return the cached tree for `source`, parsing it on a miss
    pub fn get_or_parse(&self, source: &str, dialect: Dialect) -> FormulaResult<Arc<Expr>> {
        let slot = &self.entries[dialect.index()];

        if let Some(expr) = slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source)
        {
            log::debug!("formula cache hit ({}): {}", dialect, source);
            return Ok(Arc::clone(expr));
        }

        log::debug!("formula cache miss ({}): {}", dialect, source);
        let expr = Arc::new(parse_formula(source, dialect)?);

        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return Ok(expr);
            }
            if self.len() >= capacity {
                log::warn!("formula cache reached capacity {}, clearing", capacity);
                self.clear();
            }
        }

        slot.write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(source.to_string(), Arc::clone(&expr));
        Ok(expr)
    }

    /// Number of cached trees across all dialects
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .map(|slot| slot.read().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        for slot in &self.entries {
            slot.write().unwrap_or_else(PoisonError::into_inner).clear();
        }
    }
}
