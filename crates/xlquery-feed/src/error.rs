//! Feed error types

use thiserror::Error;

/// Result type for feed operations
pub type FeedResult<T> = std::result::Result<T, FeedError>;

/// Errors that can occur while parsing feeds or data paths
#[derive(Debug, Error)]
pub enum FeedError {
    /// XML error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Well-formed XML that is not a usable feed
    #[error("Malformed feed: {0}")]
    MalformedFeed(String),

    /// Data path does not follow the `.name(.name | [])*` grammar
    #[error("Invalid data path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },
}

impl FeedError {
    pub(crate) fn invalid_path<P: Into<String>, R: Into<String>>(path: P, reason: R) -> Self {
        FeedError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
