//! # xlquery
//!
//! Treat the rows of a spreadsheet as search queries, run each one against a
//! search service that answers with a feed, and write what comes back into
//! the workbook.
//!
//! ## Example
//!
//! ```rust,no_run
//! use xlquery::{run_file, Destination, HttpFetcher, RunConfig};
//!
//! let config = RunConfig::builder("A", Destination::Column("B".into())).build();
//! let fetcher = HttpFetcher::new(None).unwrap();
//!
//! match run_file("titles.xlsx", &config, &fetcher) {
//!     Ok(report) => println!("{} cells written", report.cells_written),
//!     Err(failure) => eprintln!("{}", failure),
//! }
//! ```

pub mod config;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod pipeline;
pub mod query;
pub mod store;

pub use config::{
    Destination, EmptyQueryPolicy, RunConfig, RunConfigBuilder, DEFAULT_DATA_PATH,
    DEFAULT_DATA_PATH_LABEL, DEFAULT_RESULTS_SHEET, DEFAULT_SEARCH_URL, DEFAULT_SHEET_NAME,
};
pub use error::{ErrorKind, ErrorLog, FatalError, RowError, RunFailure};
pub use feed::{FeedParser, XmlFeedParser};
pub use fetch::{Fetch, FetchError, HttpFetcher};
pub use pipeline::{RowPipeline, RunReport, QUERY_HEADER};
pub use query::merge_params;
pub use store::{WorkbookStore, XlsxFileStore};

pub use xlquery_core::{
    read_cell, write_cell, Cell, CellAddress, CellKind, Error, Result, Workbook, Worksheet,
};
pub use xlquery_feed::{DataPath, Document, ExtractionResult, FeedError, NamedPath};
pub use xlquery_xlsx::{XlsxError, XlsxReader, XlsxWriter};

use std::path::Path;

/// Extension trait for Workbook to add file I/O
pub trait WorkbookExt {
    /// Open a workbook from a file
    fn open<P: AsRef<Path>>(path: P) -> Result<Workbook>;

    /// Save the workbook to a file
    ///
    /// Only `.xlsx` is written. Macro-enabled `.xlsm` files can be opened but
    /// not saved, since their VBA project is not kept.
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()>;
}

impl WorkbookExt for Workbook {
    fn open<P: AsRef<Path>>(path: P) -> Result<Workbook> {
        let path = path.as_ref();
        match extension(path).as_deref() {
            Some("xlsx") | Some("xlsm") => {
                XlsxReader::read_file(path).map_err(|e| Error::other(e.to_string()))
            }
            _ => Err(Error::other(format!(
                "Unsupported file format: {}",
                path.display()
            ))),
        }
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        check_writable(path)?;
        XlsxWriter::write_file(self, path).map_err(|e| Error::other(e.to_string()))
    }
}

/// Fail unless a workbook can be saved to `path`
fn check_writable(path: &Path) -> Result<()> {
    match extension(path).as_deref() {
        Some("xlsx") => Ok(()),
        Some("xlsm") => Err(Error::other(format!(
            "Can't save macro-enabled workbook {}, its macros would be lost",
            path.display()
        ))),
        _ => Err(Error::other(format!(
            "Unsupported file format: {}",
            path.display()
        ))),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Open a workbook, run the pipeline over it and save it back in place
pub fn run_file<P, F>(path: P, config: &RunConfig, fetcher: &F) -> std::result::Result<RunReport, RunFailure>
where
    P: AsRef<Path>,
    F: Fetch + ?Sized,
{
    let path = path.as_ref();
    let open_error = |source| FatalError::Open {
        path: path.display().to_string(),
        source,
    };
    // Refuse before any searching when the results could not be saved
    check_writable(path).map_err(open_error)?;
    let mut workbook = Workbook::open(path).map_err(open_error)?;
    let mut store = XlsxFileStore::new(path);

    RowPipeline::new(config, fetcher, &XmlFeedParser).run(&mut workbook, &mut store)
}
