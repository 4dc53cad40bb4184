//! # xlquery-core
//!
//! Core data structures for xlquery.
//!
//! This crate provides the in-memory workbook that a query run mutates:
//! - [`Workbook`], [`Worksheet`], [`Row`] - The document structures
//! - [`Cell`] - A cell's text plus its presentation hints
//! - [`CellAddress`] - Column label arithmetic (`"A"` <-> `0`, `"AA"` <-> `26`)
//! - [`read_cell`] and [`write_cell`] - Cell access with an overwrite policy
//!
//! ## Example
//!
//! ```rust
//! use xlquery_core::{read_cell, write_cell, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//!
//! write_cell(sheet, 1, 2, "http://example.org/123", false).unwrap();
//! assert_eq!(read_cell(sheet, 1, 2), "http://example.org/123");
//!
//! // A second write without permission to overwrite is refused
//! assert!(write_cell(sheet, 1, 2, "other", false).is_err());
//! ```

pub mod accessor;
pub mod cell;
pub mod error;
pub mod row;
pub mod style;
pub mod workbook;
pub mod worksheet;

// Re-exports for convenience
pub use accessor::{read_cell, write_cell};
pub use cell::{Cell, CellAddress, CellKind};
pub use error::{Error, Result};
pub use row::Row;
pub use style::Alignment;
pub use workbook::Workbook;
pub use worksheet::{SheetLayout, Worksheet};

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Number of columns in a sheet (`A` through `XFD`)
pub const MAX_COLS: usize = 16_384;

/// Number of rows in a sheet
pub const MAX_ROWS: usize = 1_048_576;
