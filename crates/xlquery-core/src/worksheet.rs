//! Worksheet type

use crate::cell::{Cell, CellAddress};
use crate::error::Result;
use crate::row::Row;

/// Worksheet XML that the cell model does not interpret
///
/// Filled in when a sheet is loaded from a file so that column widths, merged
/// ranges, views and similar settings survive a save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetLayout {
    /// Attributes of the root element, in source order
    pub root_attributes: Vec<(String, String)>,
    /// Raw top-level elements that precede the cell data
    pub before_data: String,
    /// Raw top-level elements that follow the cell data
    pub after_data: String,
}

/// A worksheet (single sheet in a workbook)
///
/// Rows are stored densely in order; a missing row or a short row reads as
/// empty cells, and writing past the end extends the sheet.
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    /// Sheet name
    name: String,
    /// Rows, indexed 0-based
    rows: Vec<Row>,
    /// Uninterpreted sheet XML
    layout: SheetLayout,
}

impl Worksheet {
    /// Create a new worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
            layout: SheetLayout::default(),
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the carried sheet layout
    pub fn layout(&self) -> &SheetLayout {
        &self.layout
    }

    /// Replace the carried sheet layout
    pub fn set_layout(&mut self, layout: SheetLayout) {
        self.layout = layout;
    }

    // === Rows ===

    /// Number of rows in the sheet
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the sheet has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get a row by index
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Get a mutable row by index, appending empty rows until it exists
    pub fn row_mut(&mut self, index: usize) -> &mut Row {
        if self.rows.len() <= index {
            self.rows.resize_with(index + 1, Row::new);
        }
        &mut self.rows[index]
    }

    /// Append an empty row and return it
    pub fn add_row(&mut self) -> &mut Row {
        self.rows.push(Row::new());
        let last = self.rows.len() - 1;
        &mut self.rows[last]
    }

    /// Append a row of text cells
    pub fn push_row<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(Row::from_texts(values));
    }

    /// Iterate over the rows
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    /// Width of the widest row
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Row::len).max().unwrap_or(0)
    }

    // === Cell Access ===

    /// Get a cell by address string (e.g., "A1")
    pub fn cell(&self, address: &str) -> Result<Option<&Cell>> {
        let addr = CellAddress::parse(address)?;
        Ok(self.cell_at(addr.row, addr.col))
    }

    /// Get a cell by row and column indices
    pub fn cell_at(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.cell(col))
    }

    /// Get a mutable cell, extending rows and cells until it exists
    pub fn cell_at_mut(&mut self, row: usize, col: usize) -> &mut Cell {
        self.row_mut(row).cell_mut(col)
    }

    /// Get a cell's text by indices, empty if the cell does not exist
    pub fn text_at(&self, row: usize, col: usize) -> &str {
        self.cell_at(row, col).map(Cell::as_str).unwrap_or("")
    }

    /// Get a cell's text by address string
    pub fn text(&self, address: &str) -> Result<&str> {
        Ok(self.cell(address)?.map(Cell::as_str).unwrap_or(""))
    }
}
