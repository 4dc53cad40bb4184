//! Run errors
//!
//! Per-row problems are recorded in an [`ErrorLog`] and never stop the run.
//! Anything that does stop it is a [`FatalError`], returned together with
//! the log gathered so far as a [`RunFailure`].

use std::fmt;

use thiserror::Error;

/// What went wrong with a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The search request failed
    Fetch,
    /// The response was not a usable feed
    Parse,
    /// A data path could not be evaluated
    Extract,
    /// The destination cell already had a value
    CellOccupied,
    /// Any other failure writing the result
    Write,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Fetch => "fetch",
            ErrorKind::Parse => "parse",
            ErrorKind::Extract => "extract",
            ErrorKind::CellOccupied => "cell occupied",
            ErrorKind::Write => "write",
        };
        f.write_str(name)
    }
}

/// A recoverable error tied to one row
///
/// `row` is zero-based; it is displayed one-based, as spreadsheets number
/// their rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub row: usize,
    pub kind: ErrorKind,
    pub message: String,
}

impl RowError {
    pub fn new<S: Into<String>>(row: usize, kind: ErrorKind, message: S) -> Self {
        Self {
            row,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row + 1, self.message)
    }
}

impl std::error::Error for RowError {}

/// Recoverable errors in the order they happened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLog {
    entries: Vec<RowError>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: RowError) {
        self.entries.push(error);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RowError> {
        self.entries.iter()
    }

    /// Entries of one kind
    pub fn of_kind(&self, kind: ErrorKind) -> impl Iterator<Item = &RowError> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }
}

impl fmt::Display for ErrorLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ErrorLog {
    type Item = &'a RowError;
    type IntoIter = std::slice::Iter<'a, RowError>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Errors that stop a run
#[derive(Debug, Error)]
pub enum FatalError {
    /// The workbook could not be opened
    #[error("Can't open {path}, {source}")]
    Open {
        path: String,
        #[source]
        source: xlquery_core::Error,
    },

    /// The query sheet does not exist
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// A configured column label is not valid
    #[error("Can't find column {label}, {source}")]
    InvalidColumn {
        label: String,
        #[source]
        source: xlquery_core::Error,
    },

    /// The search URL does not parse
    #[error("Can't parse search URL {url}, {source}")]
    InvalidSearchUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Nothing to extract
    #[error("No data paths configured")]
    NoDataPaths,

    /// The results sheet must exist but does not
    #[error("Results sheet not found: {0}")]
    ResultsSheetMissing(String),

    /// The results sheet would overwrite the queries
    #[error("Results sheet {0} is the query sheet")]
    ResultsSheetIsQuerySheet(String),

    /// Workbook model error while setting up the destination
    #[error(transparent)]
    Sheet(#[from] xlquery_core::Error),

    /// The workbook could not be saved
    #[error("Can't save workbook, {0}")]
    Save(#[source] xlquery_core::Error),
}

/// A fatal error plus everything logged before it
#[derive(Debug)]
pub struct RunFailure {
    pub error: FatalError,
    pub log: ErrorLog,
}

impl RunFailure {
    pub fn new(error: FatalError, log: ErrorLog) -> Self {
        Self { error, log }
    }
}

impl From<FatalError> for RunFailure {
    fn from(error: FatalError) -> Self {
        Self::new(error, ErrorLog::new())
    }
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if !self.log.is_empty() {
            write!(f, "\n{}", self.log)?;
        }
        Ok(())
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
