//! # xlquery-xlsx
//!
//! XLSX (Office Open XML) reader and writer for xlquery workbooks.
//!
//! A round trip keeps cell text exactly, the value kind (text, number,
//! boolean, error), formulas with their cached values and each cell's format.
//! The style sheet and the worksheet settings around the cell data (column
//! widths, merged ranges, views) are carried over as raw XML. Parts reached
//! through relationships, such as drawings, comments and VBA projects, are not
//! kept.

pub mod error;
pub mod reader;
pub mod writer;

mod styles;

pub use error::{XlsxError, XlsxResult};
pub use reader::XlsxReader;
pub use writer::XlsxWriter;
