//! Row type

use crate::cell::Cell;

/// A row of cells, addressed by 0-based column index.
///
/// A row can be shorter than the widest row of its sheet; cells past the end
/// read as empty and are created on demand by [`Row::cell_mut`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<Cell>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a row of text cells
    pub fn from_texts<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cells: values.into_iter().map(Cell::text).collect(),
        }
    }

    /// Number of cells physically present in the row
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the row has no cells
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Get a cell by column index
    pub fn cell(&self, col: usize) -> Option<&Cell> {
        self.cells.get(col)
    }

    /// Get a mutable cell, appending empty cells until `col` exists
    pub fn cell_mut(&mut self, col: usize) -> &mut Cell {
        if self.cells.len() <= col {
            self.cells.resize_with(col + 1, Cell::new);
        }
        &mut self.cells[col]
    }

    /// Append an empty cell and return it
    pub fn add_cell(&mut self) -> &mut Cell {
        self.cells.push(Cell::new());
        let last = self.cells.len() - 1;
        &mut self.cells[last]
    }

    /// Iterate over the cells
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }
}
