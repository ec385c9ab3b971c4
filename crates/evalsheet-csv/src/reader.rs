//! CSV reader

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::options::CsvReadOptions;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use evalsheet_core::{CellValue, Grid, MAX_COLS, MAX_ROWS};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// CSV reader
pub struct CsvReader;

impl CsvReader {
    /// Read a CSV file into a grid
    pub fn read_file<P: AsRef<Path>>(path: P, options: &CsvReadOptions) -> CsvResult<Grid> {
        let path = path.as_ref();
        log::debug!("reading CSV from {}", path.display());
        let file = File::open(path)?;
        Self::read(file, options)
    }

    /// Read CSV from a reader into a grid
    pub fn read<R: Read>(reader: R, options: &CsvReadOptions) -> CsvResult<Grid> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .has_headers(options.has_header)
            .flexible(true)
            .from_reader(reader);

        let mut grid = Grid::new();
        let mut row_idx = 0usize;

        // Header cells stay text
        if options.has_header {
            let headers = csv_reader.headers()?.clone();
            if !headers.is_empty() {
                for (col, name) in headers.iter().enumerate() {
                    if !name.is_empty() {
                        let col = Self::column(row_idx, col)?;
                        grid.set_at(0, col, CellValue::text(name));
                    }
                }
                row_idx += 1;
            }
        }

        for result in csv_reader.records() {
            let record = result?;
            let row = Self::row(row_idx)?;

            for (col, field) in record.iter().enumerate() {
                let value = if options.auto_detect_types {
                    detect_type(field)
                } else if field.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::text(field)
                };
                grid.set_at(row, Self::column(row_idx, col)?, value);
            }

            row_idx += 1;
        }

        log::debug!("read {} CSV rows into {} cells", row_idx, grid.len());
        Ok(grid)
    }

    fn row(row_idx: usize) -> CsvResult<u32> {
        u32::try_from(row_idx)
            .ok()
            .filter(|r| *r < MAX_ROWS)
            .ok_or_else(|| CsvError::Parse {
                row: row_idx + 1,
                column: 1,
                message: format!("more than {} rows", MAX_ROWS),
            })
    }

    fn column(row_idx: usize, col: usize) -> CsvResult<u16> {
        u16::try_from(col)
            .ok()
            .filter(|c| *c < MAX_COLS)
            .ok_or_else(|| CsvError::Parse {
                row: row_idx + 1,
                column: col + 1,
                message: format!("more than {} columns", MAX_COLS),
            })
    }
}

/// Detect the type of a field value
///
/// Numbers, `TRUE`/`FALSE` (any case) and ISO dates are recognized; an empty
/// field is `Empty`; everything else is text, untrimmed.
pub fn detect_type(field: &str) -> CellValue {
    let trimmed = field.trim();

    if trimmed.is_empty() {
        return CellValue::Empty;
    }

    if trimmed.eq_ignore_ascii_case("true") {
        return CellValue::Boolean(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return CellValue::Boolean(false);
    }

    // "inf"/"nan" parse as f64 but are text here
    if trimmed.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '.')) {
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return CellValue::Number(n);
            }
        }
    }

    if let Some(dt) = parse_datetime(trimmed) {
        return CellValue::DateTime(dt);
    }

    CellValue::text(field)
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::default()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_detect_type() {
        assert_eq!(detect_type("42"), CellValue::Number(42.0));
        assert_eq!(detect_type(" -1.5 "), CellValue::Number(-1.5));
        assert_eq!(detect_type("TRUE"), CellValue::Boolean(true));
        assert_eq!(detect_type("false"), CellValue::Boolean(false));
        assert_eq!(detect_type(""), CellValue::Empty);
        assert_eq!(detect_type("nan"), CellValue::text("nan"));
        assert_eq!(detect_type("apple"), CellValue::text("apple"));
        assert!(matches!(detect_type("2024-03-15"), CellValue::DateTime(_)));
        assert!(matches!(
            detect_type("2024-03-15 08:00:00"),
            CellValue::DateTime(_)
        ));
    }

    #[test]
    fn test_read_with_header() {
        let data = "name,qty\napple,3\npear,\n";
        let grid = CsvReader::read(data.as_bytes(), &CsvReadOptions::default()).unwrap();

        assert_eq!(grid.get("A1").unwrap(), Some(&CellValue::text("name")));
        assert_eq!(grid.get("B1").unwrap(), Some(&CellValue::text("qty")));
        assert_eq!(grid.get("B2").unwrap(), Some(&CellValue::Number(3.0)));
        assert_eq!(grid.get("B3").unwrap(), Some(&CellValue::Empty));
        assert_eq!(grid.row_count(), 3);
    }

    #[test]
    fn test_read_without_header_or_detection() {
        let options = CsvReadOptions {
            auto_detect_types: false,
            ..CsvReadOptions::default().without_header()
        };
        let grid = CsvReader::read("1;x\n2;y\n".as_bytes(), &options.with_delimiter(b';')).unwrap();

        assert_eq!(grid.get("A1").unwrap(), Some(&CellValue::text("1")));
        assert_eq!(grid.get("B2").unwrap(), Some(&CellValue::text("y")));
    }

    #[test]
    fn test_ragged_rows() {
        let options = CsvReadOptions::default().without_header();
        let grid = CsvReader::read("1\n2,3,4\n".as_bytes(), &options).unwrap();
        assert_eq!(grid.get("C2").unwrap(), Some(&CellValue::Number(4.0)));
        assert_eq!(grid.get("C1").unwrap(), None);
    }

    #[test]
    fn test_read_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "value").unwrap();
        writeln!(file, "1").unwrap();
        writeln!(file, "2").unwrap();

        let grid = CsvReader::read_file(file.path(), &CsvReadOptions::default()).unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid.get("A3").unwrap(), Some(&CellValue::Number(2.0)));
    }

    #[test]
    fn test_missing_file() {
        let err = CsvReader::read_file("/nonexistent/data.csv", &CsvReadOptions::default());
        assert!(matches!(err, Err(CsvError::Io(_))));
    }
}
