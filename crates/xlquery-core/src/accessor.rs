//! Cell access with an overwrite policy
//!
//! Reads never fail: a cell that does not exist reads as the empty string.
//! Writes refuse to replace non-empty text unless overwriting is allowed, and
//! mark the written cell to wrap long text.

use crate::cell::CellAddress;
use crate::error::{Error, Result};
use crate::worksheet::Worksheet;
use crate::{MAX_COLS, MAX_ROWS};

/// Read a cell's text, or the empty string if the cell does not exist
pub fn read_cell(sheet: &Worksheet, row: usize, col: usize) -> &str {
    sheet.text_at(row, col)
}

/// Write `text` into a cell, subject to the overwrite policy.
///
/// With `overwrite == false` a cell that already holds something fails with
/// [`Error::CellOccupied`] and the sheet is left untouched. Otherwise the row
/// is extended with empty cells up to `col` if needed, the text is stored and
/// the cell is set to wrap. Positions outside the sheet fail with
/// [`Error::InvalidAddress`].
pub fn write_cell(
    sheet: &mut Worksheet,
    row: usize,
    col: usize,
    text: &str,
    overwrite: bool,
) -> Result<()> {
    if row >= MAX_ROWS || col >= MAX_COLS {
        return Err(Error::InvalidAddress(format!(
            "row {} column {} is outside the sheet",
            row + 1,
            col + 1
        )));
    }

    if !overwrite {
        if let Some(existing) = sheet.cell_at(row, col).filter(|c| !c.is_empty()) {
            return Err(Error::CellOccupied {
                address: CellAddress::new(row, col).to_string(),
                existing: existing.as_str().to_string(),
            });
        }
    }

    let cell = sheet.cell_at_mut(row, col);
    cell.set_text(text);
    cell.alignment.wrap_text = true;
    Ok(())
}
