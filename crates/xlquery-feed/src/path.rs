//! Data-path expressions
//!
//! A data path is a sequence of `.name` steps, each optionally followed by
//! `[]` to iterate over every repeated child with that name:
//!
//! ```text
//! .item[].link        every item's link
//! .channel.title      the channel title
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{FeedError, FeedResult};

/// One `.name` or `.name[]` step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub repeat: bool,
}

/// A parsed data path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPath {
    raw: String,
    steps: Vec<Step>,
}

impl DataPath {
    /// Parse a data path
    pub fn parse(input: &str) -> FeedResult<Self> {
        let bytes = input.as_bytes();
        if bytes.is_empty() {
            return Err(FeedError::invalid_path(input, "path is empty"));
        }
        if bytes[0] != b'.' {
            return Err(FeedError::invalid_path(input, "path must start with '.'"));
        }

        let mut steps = Vec::new();
        let mut pos = 0;

        while pos < bytes.len() {
            // bytes[pos] is always '.' here
            let start = pos + 1;
            let mut end = start;
            while end < bytes.len() && !matches!(bytes[end], b'.' | b'[' | b']') {
                end += 1;
            }
            if end == start {
                return Err(FeedError::invalid_path(
                    input,
                    format!("empty segment at offset {}", pos),
                ));
            }

            let mut step = Step {
                name: input[start..end].to_string(),
                repeat: false,
            };
            pos = end;

            while pos < bytes.len() && bytes[pos] == b'[' {
                if bytes.get(pos + 1) != Some(&b']') {
                    return Err(FeedError::invalid_path(
                        input,
                        format!("unbalanced '[' at offset {}", pos),
                    ));
                }
                if step.repeat {
                    return Err(FeedError::invalid_path(
                        input,
                        format!("segment {:?} repeats '[]'", step.name),
                    ));
                }
                step.repeat = true;
                pos += 2;
            }

            if pos < bytes.len() && bytes[pos] != b'.' {
                return Err(FeedError::invalid_path(
                    input,
                    format!("unexpected {:?} at offset {}", bytes[pos] as char, pos),
                ));
            }

            steps.push(step);
        }

        Ok(Self {
            raw: input.to_string(),
            steps,
        })
    }

    /// The path as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

impl FromStr for DataPath {
    type Err = FeedError;

    fn from_str(s: &str) -> FeedResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A data path paired with the label its results are reported under
///
/// The path is kept as written; it is only compiled when a document is
/// extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedPath {
    pub label: String,
    pub path: String,
}

impl NamedPath {
    pub fn new<L: Into<String>, P: Into<String>>(label: L, path: P) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }

    /// A path labelled with itself
    pub fn unlabelled<P: Into<String>>(path: P) -> Self {
        let path = path.into();
        Self {
            label: path.clone(),
            path,
        }
    }

    /// Parse `label=path` or a bare `path`, validating the path
    pub fn parse(input: &str) -> FeedResult<Self> {
        let input = input.trim();
        let (label, path) = match input.split_once('=') {
            Some((label, path)) => (label.trim(), path.trim()),
            None => (input, input),
        };
        if label.is_empty() {
            return Err(FeedError::invalid_path(input, "label is empty"));
        }
        DataPath::parse(path)?;
        Ok(Self::new(label, path))
    }
}

impl FromStr for NamedPath {
    type Err = FeedError;

    fn from_str(s: &str) -> FeedResult<Self> {
        Self::parse(s)
    }
}
