//! # evalsheet-core
//!
//! Core data structures shared by the evalsheet crates.
//!
//! This crate provides:
//! - [`CellAddress`] and [`CellRange`] - A1-style cell addressing
//! - [`CellValue`] - A value as stored by a tabular data source
//! - [`Grid`] - A sparse in-memory table of cell values
//!
//! ## Example
//!
//! ```rust
//! use evalsheet_core::{CellValue, Grid};
//!
//! let mut grid = Grid::new();
//! grid.set("A1", 10.0).unwrap();
//! grid.set("B1", "label").unwrap();
//!
//! assert_eq!(grid.get("A1").unwrap(), Some(&CellValue::Number(10.0)));
//! assert_eq!(grid.get("C9").unwrap(), None);
//! ```

pub mod cell;
pub mod error;
pub mod grid;

pub use cell::{CellAddress, CellRange, CellRangeIterator, CellValue};
pub use error::{Error, Result};
pub use grid::Grid;

/// Maximum number of rows addressable by a cell reference
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns addressable by a cell reference
pub const MAX_COLS: u16 = 16_384;
