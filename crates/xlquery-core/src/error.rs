//! Error types for xlquery-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in xlquery-core
#[derive(Debug, Error)]
pub enum Error {
    /// Column label is empty or contains something other than A-Z
    #[error("Invalid column label {label:?}: {reason}")]
    InvalidLabel { label: String, reason: String },

    /// Invalid cell address format
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Sheet not found by name
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Invalid sheet name
    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Duplicate sheet name
    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),

    /// A write was refused because the target cell already holds text
    #[error("Cell {address} already has a value {existing:?}")]
    CellOccupied { address: String, existing: String },

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    pub(crate) fn invalid_label<L: Into<String>, R: Into<String>>(label: L, reason: R) -> Self {
        Error::InvalidLabel {
            label: label.into(),
            reason: reason.into(),
        }
    }
}
