//! Sparse cell storage
//!
//! Only cells that were explicitly set are stored, in a row-keyed `BTreeMap` so
//! that row-major iteration comes for free.

use std::collections::BTreeMap;

use crate::cell::{CellAddress, CellRange, CellValue};
use crate::error::Result;

/// A sparse table of cell values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: BTreeMap<u32, BTreeMap<u16, CellValue>>,
}

impl Grid {
    /// Create an empty grid
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cell by A1-style address
    pub fn set<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_at(addr.row, addr.col, value);
        Ok(())
    }

    /// Set a cell by 0-based row/column
    pub fn set_at<V: Into<CellValue>>(&mut self, row: u32, col: u16, value: V) {
        self.rows.entry(row).or_default().insert(col, value.into());
    }

    /// Get a cell by A1-style address; `None` when the cell was never set
    pub fn get(&self, address: &str) -> Result<Option<&CellValue>> {
        let addr = CellAddress::parse(address)?;
        Ok(self.get_at(addr.row, addr.col))
    }

    /// Get a cell by 0-based row/column
    pub fn get_at(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.rows.get(&row).and_then(|cells| cells.get(&col))
    }

    /// Remove a cell, returning its previous value
    pub fn clear_at(&mut self, row: u32, col: u16) -> Option<CellValue> {
        let cells = self.rows.get_mut(&row)?;
        let old = cells.remove(&col);
        if cells.is_empty() {
            self.rows.remove(&row);
        }
        old
    }

    /// Number of stored cells
    pub fn len(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    /// Whether no cell is stored
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows spanned by the used range
    pub fn row_count(&self) -> u32 {
        match (self.rows.keys().next(), self.rows.keys().next_back()) {
            (Some(first), Some(last)) => last - first + 1,
            _ => 0,
        }
    }

    /// Smallest range covering every stored cell
    pub fn used_range(&self) -> Option<CellRange> {
        let first_row = *self.rows.keys().next()?;
        let last_row = *self.rows.keys().next_back()?;
        let mut first_col = u16::MAX;
        let mut last_col = 0;
        for cells in self.rows.values() {
            if let (Some(lo), Some(hi)) = (cells.keys().next(), cells.keys().next_back()) {
                first_col = first_col.min(*lo);
                last_col = last_col.max(*hi);
            }
        }
        Some(CellRange::from_indices(first_row, first_col, last_row, last_col))
    }

    /// Values of a range in row-major order, unset cells reported as `Empty`
    pub fn range_values(&self, range: &CellRange) -> Vec<CellValue> {
        range
            .cells()
            .map(|addr| self.get_at(addr.row, addr.col).cloned().unwrap_or_default())
            .collect()
    }

    /// Iterate stored cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (CellAddress, &CellValue)> + '_ {
        self.rows.iter().flat_map(|(row, cells)| {
            cells
                .iter()
                .map(move |(col, value)| (CellAddress::new(*row, *col), value))
        })
    }
}
