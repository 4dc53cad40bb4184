//! Cell contents

use crate::style::Alignment;

/// What kind of value a cell's text represents.
///
/// Cells are read and written as text; the kind is kept so that a workbook
/// round-trips without turning numbers into strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellKind {
    /// Plain text (the default for anything written by a query run)
    #[default]
    Text,
    /// Numeric value, stored in its textual form
    Number,
    /// Boolean value, stored as `TRUE` / `FALSE`
    Boolean,
    /// Error value such as `#N/A`
    Error,
}

/// A single cell
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    /// Text value (for formulas, the cached result)
    pub value: String,
    /// Kind of the value
    pub kind: CellKind,
    /// Formula text without the leading `=`, if the cell holds one
    pub formula: Option<String>,
    /// Presentation hints
    pub alignment: Alignment,
    /// Index into the workbook's cell formats, 0 for the default format
    pub style: u32,
}

impl Cell {
    /// Create an empty cell
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a text cell
    pub fn text<S: Into<String>>(value: S) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    /// Create a numeric cell from its textual form
    pub fn number<S: Into<String>>(value: S) -> Self {
        Self {
            value: value.into(),
            kind: CellKind::Number,
            ..Self::default()
        }
    }

    /// Create a boolean cell
    pub fn boolean(value: bool) -> Self {
        Self {
            value: if value { "TRUE" } else { "FALSE" }.to_string(),
            kind: CellKind::Boolean,
            ..Self::default()
        }
    }

    /// Check whether the cell holds nothing worth protecting
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.formula.is_none()
    }

    /// Get the text value
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Replace the contents with plain text, dropping any formula
    pub fn set_text<S: Into<String>>(&mut self, value: S) {
        self.value = value.into();
        self.kind = CellKind::Text;
        self.formula = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cell() {
        let cell = Cell::new();
        assert!(cell.is_empty());
        assert_eq!(cell.as_str(), "");
        assert_eq!(cell.kind, CellKind::Text);
    }

    #[test]
    fn test_formula_cell_is_not_empty() {
        let cell = Cell {
            formula: Some("A1&B1".into()),
            ..Cell::default()
        };
        assert!(!cell.is_empty());
    }

    #[test]
    fn test_set_text_drops_formula() {
        let mut cell = Cell {
            value: "3".into(),
            kind: CellKind::Number,
            formula: Some("1+2".into()),
            ..Cell::default()
        };
        cell.set_text("three");
        assert_eq!(cell.as_str(), "three");
        assert_eq!(cell.kind, CellKind::Text);
        assert!(cell.formula.is_none());
    }

    #[test]
    fn test_boolean_text() {
        assert_eq!(Cell::boolean(true).as_str(), "TRUE");
        assert_eq!(Cell::boolean(false).as_str(), "FALSE");
    }
}
