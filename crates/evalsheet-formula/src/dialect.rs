//! Language dialects
//!
//! Both dialects share one grammar core; they differ in how names are written
//! and which functions are available.

use std::fmt;
use std::str::FromStr;

/// Which surface syntax a formula is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Dialect {
    /// Spreadsheet formulas: `=SUM(A1:B3) * 2`, cell references, optional leading `=`
    #[default]
    Spreadsheet,
    /// Free-standing expressions over named variables: `[price] * (1 + [tax])`
    Expression,
}

impl Dialect {
    pub const ALL: [Dialect; 2] = [Dialect::Spreadsheet, Dialect::Expression];

    pub fn name(self) -> &'static str {
        match self {
            Dialect::Spreadsheet => "spreadsheet",
            Dialect::Expression => "expression",
        }
    }

    /// Whether bare `A1` / `A1:B3` words are cell references
    pub fn has_cell_references(self) -> bool {
        matches!(self, Dialect::Spreadsheet)
    }

    /// Whether `[name]` variables are recognized
    pub fn has_variables(self) -> bool {
        matches!(self, Dialect::Expression)
    }

    /// Whether a leading `=` is accepted and ignored
    pub fn allows_leading_equals(self) -> bool {
        matches!(self, Dialect::Spreadsheet)
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Dialect::Spreadsheet => 0,
            Dialect::Expression => 1,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spreadsheet" | "sheet" | "excel" => Ok(Dialect::Spreadsheet),
            "expression" | "expr" => Ok(Dialect::Expression),
            other => Err(format!(
                "unknown dialect '{}' (expected 'spreadsheet' or 'expression')",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dialect() {
        assert_eq!("Spreadsheet".parse::<Dialect>(), Ok(Dialect::Spreadsheet));
        assert_eq!(" expr ".parse::<Dialect>(), Ok(Dialect::Expression));
        assert!("lisp".parse::<Dialect>().is_err());
        assert_eq!(Dialect::default().to_string(), "spreadsheet");
    }
}
