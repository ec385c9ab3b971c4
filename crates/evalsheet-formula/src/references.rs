//! Reference extraction
//!
//! Lists what an expression reads from its context without evaluating it,
//! so callers can check inputs up front or decide what to recompute.

use crate::ast::{Expr, ExprKind, Name};
use evalsheet_core::{CellAddress, CellRange};
use std::collections::BTreeSet;

/// Everything an expression reads, sorted and deduplicated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct References {
    pub variables: Vec<String>,
    pub cells: Vec<CellAddress>,
    pub ranges: Vec<CellRange>,
}

impl References {
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() && self.cells.is_empty() && self.ranges.is_empty()
    }

    /// Whether `addr` is read directly or through one of the ranges
    pub fn reads_cell(&self, addr: &CellAddress) -> bool {
        self.cells
            .iter()
            .any(|c| c.row == addr.row && c.col == addr.col)
            || self.ranges.iter().any(|r| r.contains(addr))
    }
}

#[derive(Default)]
struct Collector {
    variables: BTreeSet<String>,
    cells: BTreeSet<CellAddress>,
    ranges: BTreeSet<CellRange>,
}

impl Collector {
    fn visit(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Reference(Name::Variable(name)) => {
                self.variables.insert(name.clone());
            }
            ExprKind::Reference(Name::Cell(addr)) => {
                // $A$1 and A1 read the same cell
                self.cells.insert(addr.relative());
            }
            ExprKind::RangeReference(range) => {
                self.ranges
                    .insert(range.start.relative().to(range.end.relative()));
            }
            _ => {}
        }
        for child in expr.children() {
            self.visit(child);
        }
    }
}

/// Collect the variables, cells and ranges `expr` refers to
///
/// `CELL(...)` computes its address at run time and is not included.
pub fn references(expr: &Expr) -> References {
    let mut collector = Collector::default();
    collector.visit(expr);
    References {
        variables: collector.variables.into_iter().collect(),
        cells: collector.cells.into_iter().collect(),
        ranges: collector.ranges.into_iter().collect(),
    }
}
