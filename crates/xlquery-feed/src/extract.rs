//! Projecting data paths out of documents

use crate::document::{Document, Element};
use crate::error::FeedResult;
use crate::path::{DataPath, NamedPath};

/// Values extracted from one document, one entry per requested path
///
/// Entries line up with the paths passed to [`extract`], so two paths that
/// share a label still get separate entries. A path that matched nothing has
/// an empty list; a label that was never requested is absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractionResult {
    entries: Vec<(String, Vec<String>)>,
}

impl ExtractionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the values for the next path
    pub fn push<S: Into<String>>(&mut self, label: S, values: Vec<String>) {
        self.entries.push((label.into(), values));
    }

    /// Values of the first entry with a label
    pub fn get(&self, label: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_slice())
    }

    /// Values of the entry at a position
    pub fn values(&self, index: usize) -> Option<&[String]> {
        self.entries.get(index).map(|(_, v)| v.as_slice())
    }

    /// Entries in the order they were requested
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(l, v)| (l.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Elements matched by a path, in document order
///
/// The root is the context for the first step. A `[]` step matches every
/// child with that name, a plain step only the first.
pub fn select<'a>(doc: &'a Document, path: &DataPath) -> Vec<&'a Element> {
    let mut current: Vec<&Element> = vec![doc.root()];

    for step in path.steps() {
        current = if step.repeat {
            current
                .into_iter()
                .flat_map(|e| e.children().iter().filter(move |c| c.name() == step.name))
                .collect()
        } else {
            current
                .into_iter()
                .filter_map(|e| e.first_child(&step.name))
                .collect()
        };
        if current.is_empty() {
            break;
        }
    }

    current
}

/// Extract labelled paths from a document
pub fn extract(doc: &Document, paths: &[NamedPath]) -> FeedResult<ExtractionResult> {
    let mut result = ExtractionResult::new();
    for named in paths {
        let path = DataPath::parse(&named.path)?;
        let values = select(doc, &path)
            .into_iter()
            .map(|e| e.text().to_string())
            .collect();
        result.push(named.label.clone(), values);
    }
    Ok(result)
}

/// Extract paths from a document, keyed by the path strings themselves
pub fn extract_paths(doc: &Document, paths: &[&str]) -> FeedResult<ExtractionResult> {
    let named: Vec<_> = paths.iter().map(|p| NamedPath::unlabelled(*p)).collect();
    extract(doc, &named)
}
