//! # xlquery-feed
//!
//! Search-result feeds as generic document trees, and the data-path
//! expressions that project fields out of them.
//!
//! ## Example
//!
//! ```rust
//! use xlquery_feed::{extract_paths, parse_feed};
//!
//! let xml = br#"<rss version="2.0"><channel><title>Search</title>
//!     <item><title>First</title><link>http://example.org/1</link></item>
//!     <item><title>Second</title><link>http://example.org/2</link></item>
//! </channel></rss>"#;
//!
//! let doc = parse_feed(xml).unwrap();
//! let result = extract_paths(&doc, &[".item[].link", ".channel.title"]).unwrap();
//!
//! assert_eq!(
//!     result.get(".item[].link").unwrap(),
//!     ["http://example.org/1", "http://example.org/2"]
//! );
//! assert_eq!(result.get(".channel.title").unwrap(), ["Search"]);
//! ```

pub mod document;
pub mod error;
pub mod extract;
pub mod parser;
pub mod path;

pub use document::{Document, Element};
pub use error::{FeedError, FeedResult};
pub use extract::{extract, extract_paths, select, ExtractionResult};
pub use parser::{parse_feed, parse_xml};
pub use path::{DataPath, NamedPath, Step};
