//! Cell address type and column label conversion

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A cell address (e.g., "A1", "BF12")
///
/// Both coordinates are 0-based internally; rows display 1-based and columns
/// display as base-26 letters (A-Z, AA, AB, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    /// Row index (0-based internally, 1-based in display)
    pub row: usize,
    /// Column index (0-based, A=0, B=1, ..., AA=26)
    pub col: usize,
}

impl CellAddress {
    /// Create a new cell address
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Parse a cell address from A1-style notation
    ///
    /// # Examples
    /// ```
    /// use xlquery_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("B2").unwrap();
    /// assert_eq!(addr.row, 1);
    /// assert_eq!(addr.col, 1);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let split = s
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(s.len());
        if split == 0 {
            return Err(Error::InvalidAddress(format!(
                "no column letters in '{}'",
                s
            )));
        }

        let col = Self::letters_to_column(&s[..split]).map_err(|_| {
            Error::InvalidAddress(format!("invalid column in '{}'", s))
        })?;

        let row_str = &s[split..];
        if row_str.is_empty() {
            return Err(Error::InvalidAddress(format!("no row number in '{}'", s)));
        }

        let row: usize = row_str
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;

        // Rows are 1-based in A1 notation
        if row == 0 {
            return Err(Error::InvalidAddress(format!(
                "row number must be >= 1 in '{}'",
                s
            )));
        }
        if row > MAX_ROWS || col >= MAX_COLS {
            return Err(Error::InvalidAddress(format!(
                "'{}' is outside the sheet",
                s
            )));
        }

        Ok(Self { row: row - 1, col })
    }

    /// Convert column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
    pub fn column_to_letters(col: usize) -> String {
        let mut result = Vec::new();
        let mut n = col + 1; // 1-based for calculation

        while n > 0 {
            n -= 1;
            result.push((n % 26) as u8 + b'A');
            n /= 26;
        }

        result.reverse();
        // Only ASCII letters were pushed
        String::from_utf8(result).unwrap_or_default()
    }

    /// Convert column letters to index (A = 0, Z = 25, AA = 26, etc.)
    ///
    /// Letters are case-insensitive. Empty or whitespace-only input and any
    /// character outside A-Z is rejected with [`Error::InvalidLabel`].
    pub fn letters_to_column(letters: &str) -> Result<usize> {
        if letters.trim().is_empty() {
            return Err(Error::invalid_label(letters, "no column letter provided"));
        }

        let mut col: usize = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::invalid_label(
                    letters,
                    format!("invalid column letter '{}'", c),
                ));
            }
            let digit = (c.to_ascii_uppercase() as u8 - b'A' + 1) as usize;
            col = col
                .checked_mul(26)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(|| Error::invalid_label(letters, "column label is too long"))?;
        }

        Ok(col - 1)
    }

    /// Convert column letters to an index that fits on a sheet
    ///
    /// Like [`letters_to_column`](Self::letters_to_column), but labels past
    /// `XFD` are rejected with [`Error::InvalidLabel`].
    pub fn sheet_column(letters: &str) -> Result<usize> {
        let col = Self::letters_to_column(letters)?;
        if col >= MAX_COLS {
            return Err(Error::invalid_label(
                letters,
                format!("beyond the last column {}", Self::column_to_letters(MAX_COLS - 1)),
            ));
        }
        Ok(col)
    }

    /// Column label of this address
    pub fn column_label(&self) -> String {
        Self::column_to_letters(self.col)
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        format!("{}{}", self.column_label(), self.row + 1)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
