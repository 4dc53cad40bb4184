//! Workbook type - the main document structure

use crate::error::{Error, Result};
use crate::worksheet::Worksheet;
use crate::MAX_SHEET_NAME_LEN;

/// A workbook (spreadsheet document)
///
/// An ordered collection of worksheets whose names are unique, compared
/// case-insensitively.
#[derive(Debug, Clone)]
pub struct Workbook {
    /// Worksheets in the workbook
    worksheets: Vec<Worksheet>,
    /// Style sheet XML carried over from a loaded file
    styles_part: Option<String>,
}

impl Workbook {
    /// Create a new workbook with one empty worksheet named `Sheet1`
    pub fn new() -> Self {
        Self {
            worksheets: vec![Worksheet::new("Sheet1")],
            styles_part: None,
        }
    }

    /// Create an empty workbook with no worksheets
    pub fn empty() -> Self {
        Self {
            worksheets: Vec::new(),
            styles_part: None,
        }
    }

    /// Get the number of worksheets
    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    /// Check if the workbook has no worksheets
    pub fn is_empty(&self) -> bool {
        self.worksheets.is_empty()
    }

    /// Get a worksheet by index
    pub fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    /// Get a mutable worksheet by index
    pub fn worksheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.worksheets.get_mut(index)
    }

    /// Get a worksheet by name, compared case-insensitively
    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.sheet_index(name).and_then(|i| self.worksheets.get(i))
    }

    /// Get the index of a worksheet by name, compared case-insensitively
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        let name_lower = name.to_lowercase();
        self.worksheets
            .iter()
            .position(|ws| ws.name().to_lowercase() == name_lower)
    }

    /// Get the index of a worksheet by name, failing with [`Error::SheetNotFound`]
    pub fn require_sheet(&self, name: &str) -> Result<usize> {
        self.sheet_index(name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }

    /// Iterate over all worksheets
    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    /// Add a new empty worksheet with the specified name
    pub fn add_worksheet_with_name(&mut self, name: &str) -> Result<usize> {
        self.add_existing_worksheet(Worksheet::new(name))
    }

    /// Add an existing worksheet to the workbook
    pub fn add_existing_worksheet(&mut self, worksheet: Worksheet) -> Result<usize> {
        self.validate_sheet_name(worksheet.name())?;
        let index = self.worksheets.len();
        self.worksheets.push(worksheet);
        Ok(index)
    }

    /// Raw style sheet XML the workbook was loaded with, if any
    ///
    /// Cell [`style`](crate::Cell::style) indices refer into this part.
    pub fn styles_part(&self) -> Option<&str> {
        self.styles_part.as_deref()
    }

    /// Replace the carried style sheet XML
    pub fn set_styles_part(&mut self, xml: Option<String>) {
        self.styles_part = xml;
    }

    /// Validate a sheet name
    fn validate_sheet_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name too long (max {} characters)",
                MAX_SHEET_NAME_LEN
            )));
        }

        const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name cannot contain '{}'",
                c
            )));
        }

        if self.sheet_index(name).is_some() {
            return Err(Error::DuplicateSheetName(name.into()));
        }

        Ok(())
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_workbook() {
        let wb = Workbook::new();
        assert_eq!(wb.sheet_count(), 1);
        assert_eq!(wb.worksheet(0).unwrap().name(), "Sheet1");
        assert!(Workbook::empty().is_empty());
    }

    #[test]
    fn test_add_worksheet() {
        let mut wb = Workbook::new();
        let idx = wb.add_worksheet_with_name("Result").unwrap();
        assert_eq!(idx, 1);
        assert_eq!(wb.sheet_index("Result"), Some(1));
        assert_eq!(wb.worksheet(1).unwrap().name(), "Result");
    }

    #[test]
    fn test_duplicate_name() {
        let mut wb = Workbook::new();
        assert!(matches!(
            wb.add_worksheet_with_name("SHEET1"),
            Err(Error::DuplicateSheetName(_))
        ));
        assert!(wb.add_worksheet_with_name("sheet1").is_err());
        assert_eq!(wb.sheet_count(), 1);
    }

    #[test]
    fn test_invalid_sheet_name() {
        let mut wb = Workbook::new();
        assert!(wb.add_worksheet_with_name("").is_err());
        assert!(wb.add_worksheet_with_name("Sheet/1").is_err());
        assert!(wb.add_worksheet_with_name("Sheet[1]").is_err());

        let long_name = "A".repeat(MAX_SHEET_NAME_LEN + 1);
        assert!(wb.add_worksheet_with_name(&long_name).is_err());
    }

    #[test]
    fn test_require_sheet() {
        let wb = Workbook::new();
        assert_eq!(wb.require_sheet("Sheet1").unwrap(), 0);
        assert!(matches!(
            wb.require_sheet("Missing"),
            Err(Error::SheetNotFound(name)) if name == "Missing"
        ));
    }

    #[test]
    fn test_lookup_ignores_case() {
        let mut wb = Workbook::new();
        wb.add_worksheet_with_name("Result").unwrap();

        assert_eq!(wb.sheet_index("result"), Some(1));
        assert_eq!(wb.require_sheet("RESULT").unwrap(), 1);
        assert_eq!(wb.worksheet_by_name("sheet1").unwrap().name(), "Sheet1");
    }

    #[test]
    fn test_present_but_empty_sheet_is_found() {
        let wb = Workbook::new();
        let sheet = wb.worksheet_by_name("Sheet1").unwrap();
        assert!(sheet.is_empty());
        assert!(wb.worksheet_by_name("NonExistent").is_none());
    }
}
