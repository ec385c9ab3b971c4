//! # evalsheet-csv
//!
//! Loads CSV data into an evalsheet [`Grid`](evalsheet_core::Grid) so that
//! spreadsheet formulas can refer to it by cell address.
//!
//! The first CSV row becomes row 1 (`A1`, `B1`, ...); a header row is kept as
//! text so the data starts at row 2.

mod error;
mod options;
mod reader;

pub use error::{CsvError, CsvResult};
pub use options::CsvReadOptions;
pub use reader::{detect_type, CsvReader};
