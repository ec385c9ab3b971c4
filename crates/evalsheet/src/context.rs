//! Ready-made evaluation contexts
//!
//! [`SheetContext`] serves cell references from a [`Grid`]; [`VariableContext`]
//! serves `[name]` variables from a map. Both read a clock fixed at
//! construction, so repeated evaluations agree.

use ahash::AHashMap;
use chrono::{Local, NaiveDateTime};
use evalsheet_core::{CellAddress, CellRange, CellValue, Grid};
use evalsheet_formula::{EvaluationContext, Value};

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Context backed by a sparse grid of cells
///
/// A cell that was never set is missing (`UnresolvedName`); inside a range it
/// counts as blank.
#[derive(Debug, Clone)]
pub struct SheetContext {
    grid: Grid,
    now: NaiveDateTime,
}

impl SheetContext {
    /// Wrap a grid, fixing the clock at the current local time
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            now: local_now(),
        }
    }

    /// Replace the clock used by `NOW()`/`TODAY()`
    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    /// Load a CSV file as the grid
    #[cfg(feature = "csv")]
    pub fn from_csv<P: AsRef<std::path::Path>>(
        path: P,
        options: &evalsheet_csv::CsvReadOptions,
    ) -> evalsheet_csv::CsvResult<Self> {
        evalsheet_csv::CsvReader::read_file(path, options).map(Self::new)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn into_grid(self) -> Grid {
        self.grid
    }
}

impl Default for SheetContext {
    fn default() -> Self {
        Self::new(Grid::new())
    }
}

impl From<Grid> for SheetContext {
    fn from(grid: Grid) -> Self {
        Self::new(grid)
    }
}

impl EvaluationContext for SheetContext {
    fn resolve_cell(&self, address: &CellAddress) -> Option<CellValue> {
        self.grid.get_at(address.row, address.col).cloned()
    }

    fn resolve_range(&self, range: &CellRange) -> Option<Vec<CellValue>> {
        Some(self.grid.range_values(range))
    }

    fn now(&self) -> NaiveDateTime {
        self.now
    }
}

/// Context backed by a map of named variables
#[derive(Debug, Clone)]
pub struct VariableContext {
    vars: AHashMap<String, Value>,
    now: NaiveDateTime,
}

impl VariableContext {
    /// Empty context with the clock fixed at the current local time
    pub fn new() -> Self {
        Self {
            vars: AHashMap::new(),
            now: local_now(),
        }
    }

    /// Replace the clock used by `NOW()`/`TODAY()`
    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    /// Builder form of [`set`](Self::set)
    pub fn with<S: Into<String>, V: Into<Value>>(mut self, name: S, value: V) -> Self {
        self.set(name, value);
        self
    }

    /// Set a variable, returning the previous value
    pub fn set<S: Into<String>, V: Into<Value>>(&mut self, name: S, value: V) -> Option<Value> {
        self.vars.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.vars.remove(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl Default for VariableContext {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Into<String>, V: Into<Value>> FromIterator<(S, V)> for VariableContext {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        let mut ctx = Self::new();
        for (name, value) in iter {
            ctx.set(name, value);
        }
        ctx
    }
}

impl EvaluationContext for VariableContext {
    fn resolve_variable(&self, name: &str) -> Option<Value> {
        self.vars.get(name).cloned()
    }

    fn now(&self) -> NaiveDateTime {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sheet_context_lookup() {
        let mut grid = Grid::new();
        grid.set("A1", 1.0).unwrap();
        grid.set("A3", 3.0).unwrap();
        let ctx = SheetContext::new(grid);

        assert_eq!(
            ctx.resolve_cell(&CellAddress::parse("A1").unwrap()),
            Some(CellValue::Number(1.0))
        );
        assert_eq!(ctx.resolve_cell(&CellAddress::parse("A2").unwrap()), None);
        assert_eq!(
            ctx.resolve_range(&CellRange::parse("A1:A3").unwrap()),
            Some(vec![
                CellValue::Number(1.0),
                CellValue::Empty,
                CellValue::Number(3.0)
            ])
        );
        assert_eq!(ctx.resolve_variable("A1"), None);
    }

    #[test]
    fn test_variable_context() {
        let ctx: VariableContext = [("a", 1.0), ("b", 2.0)].into_iter().collect();
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.resolve_variable("b"), Some(Value::Number(2.0)));
        assert_eq!(ctx.resolve_variable("B"), None);

        let mut ctx = ctx.with("name", "x");
        assert_eq!(ctx.set("a", true), Some(Value::Number(1.0)));
        assert_eq!(ctx.get("name"), Some(&Value::text("x")));
    }

    #[test]
    fn test_fixed_clock() {
        let now = NaiveDate::from_ymd_opt(2020, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(VariableContext::new().with_now(now).now(), now);
        assert_eq!(SheetContext::default().with_now(now).now(), now);
    }
}
