//! The row-by-row search pass
//!
//! A run resolves the query sheet, its columns and the destination up
//! front, then visits every row once: build the search URL, fetch, parse,
//! extract, write. A failure in any of those steps is logged against the
//! row and the pass moves on. The workbook is saved once at the end, and
//! only if some cell was written.

use tracing::{debug, info, warn};
use url::Url;
use xlquery_core::{read_cell, write_cell, CellAddress, Error as CoreError, Workbook};
use xlquery_feed::extract;

use crate::config::{Destination, EmptyQueryPolicy, RunConfig};
use crate::error::{ErrorKind, ErrorLog, FatalError, RowError, RunFailure};
use crate::feed::FeedParser;
use crate::fetch::Fetch;
use crate::query::merge_params;
use crate::store::WorkbookStore;

/// Header of the query column in a results sheet
pub const QUERY_HEADER: &str = "Query";

/// Outcome of a run that did not fail
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Rows that were searched
    pub rows_processed: usize,
    /// Header and skipped empty-query rows
    pub rows_skipped: usize,
    /// Successful cell writes
    pub cells_written: usize,
    /// Whether the workbook was saved
    pub saved: bool,
    /// Recoverable errors
    pub log: ErrorLog,
}

/// Resolved sheets and columns for one run
#[derive(Debug)]
struct Plan {
    search_url: Url,
    query_sheet: usize,
    query_col: usize,
    dest_sheet: usize,
    /// Column of the first data path
    result_col: usize,
    /// Column to copy the query into, in results-sheet mode
    echo_col: Option<usize>,
}

/// Runs configured searches over a workbook
pub struct RowPipeline<'a, F: ?Sized, P: ?Sized> {
    config: &'a RunConfig,
    fetcher: &'a F,
    parser: &'a P,
}

impl<'a, F, P> RowPipeline<'a, F, P>
where
    F: Fetch + ?Sized,
    P: FeedParser + ?Sized,
{
    pub fn new(config: &'a RunConfig, fetcher: &'a F, parser: &'a P) -> Self {
        Self {
            config,
            fetcher,
            parser,
        }
    }

    /// Process every row of the query sheet, then save through `store` if
    /// anything was written.
    pub fn run<S>(&self, workbook: &mut Workbook, store: &mut S) -> Result<RunReport, RunFailure>
    where
        S: WorkbookStore + ?Sized,
    {
        let plan = self.prepare(workbook)?;
        let mut report = RunReport::default();

        let row_count = workbook
            .worksheet(plan.query_sheet)
            .map(|s| s.row_count())
            .unwrap_or(0);

        for row in 0..row_count {
            if row == 0 && self.config.skip_header() {
                debug!("Skipping header row");
                report.rows_skipped += 1;
                continue;
            }

            let query = workbook
                .worksheet(plan.query_sheet)
                .map(|s| read_cell(s, row, plan.query_col).to_string())
                .unwrap_or_default();

            if query.is_empty() && self.config.empty_query() == EmptyQueryPolicy::Skip {
                debug!(row, "Skipping row with empty query");
                report.rows_skipped += 1;
                continue;
            }

            report.rows_processed += 1;
            self.process_row(workbook, &plan, row, &query, &mut report);
        }

        if report.cells_written > 0 {
            if let Err(e) = store.save(workbook) {
                return Err(RunFailure::new(FatalError::Save(e), report.log));
            }
            info!(cells = report.cells_written, "Saved workbook");
            report.saved = true;
        } else {
            debug!("Nothing written, workbook not saved");
        }

        Ok(report)
    }

    fn prepare(&self, workbook: &mut Workbook) -> Result<Plan, FatalError> {
        let config = self.config;

        let search_url =
            Url::parse(config.search_url()).map_err(|source| FatalError::InvalidSearchUrl {
                url: config.search_url().to_string(),
                source,
            })?;

        if config.data_paths().is_empty() {
            return Err(FatalError::NoDataPaths);
        }

        let query_sheet = workbook
            .require_sheet(config.sheet_name())
            .map_err(|_| FatalError::SheetNotFound(config.sheet_name().to_string()))?;
        let query_col = column_index(config.query_column())?;

        let plan = match config.destination() {
            Destination::Column(label) => {
                let result_col = column_index(label)?;
                check_span(label, result_col, config.data_paths().len())?;
                Plan {
                    search_url,
                    query_sheet,
                    query_col,
                    dest_sheet: query_sheet,
                    result_col,
                    echo_col: None,
                }
            }
            Destination::ResultsSheet {
                name,
                require_existing,
            } => {
                // Sheet names match case-insensitively
                let dest_sheet = match workbook.sheet_index(name) {
                    Some(index) if index == query_sheet => {
                        return Err(FatalError::ResultsSheetIsQuerySheet(name.clone()))
                    }
                    Some(index) => index,
                    None if *require_existing => {
                        return Err(FatalError::ResultsSheetMissing(name.clone()))
                    }
                    None => self.create_results_sheet(workbook, name)?,
                };
                Plan {
                    search_url,
                    query_sheet,
                    query_col,
                    dest_sheet,
                    result_col: 1,
                    echo_col: Some(0),
                }
            }
        };

        debug!(
            sheet = config.sheet_name(),
            query_col = plan.query_col,
            result_col = plan.result_col,
            "Prepared run"
        );
        Ok(plan)
    }

    fn create_results_sheet(&self, workbook: &mut Workbook, name: &str) -> Result<usize, FatalError> {
        let index = workbook.add_worksheet_with_name(name)?;
        info!(sheet = name, "Created results sheet");

        if self.config.skip_header() {
            if let Some(sheet) = workbook.worksheet_mut(index) {
                let labels = self.config.data_paths().iter().map(|p| p.label.as_str());
                sheet.push_row(std::iter::once(QUERY_HEADER).chain(labels));
            }
        }
        Ok(index)
    }

    fn process_row(
        &self,
        workbook: &mut Workbook,
        plan: &Plan,
        row: usize,
        query: &str,
        report: &mut RunReport,
    ) {
        let config = self.config;
        let (output_key, output_value) = config.output_param();
        let url = merge_params(
            &plan.search_url,
            [(config.query_param(), query), (output_key, output_value)],
        );
        debug!(row, %url, "Requesting");

        let bytes = match self.fetcher.fetch(&url, config.headers()) {
            Ok(bytes) => bytes,
            Err(e) => {
                let message = format!("{} request failed, {}", url, e);
                return record(&mut report.log, RowError::new(row, ErrorKind::Fetch, message));
            }
        };

        let document = match self.parser.parse(&bytes) {
            Ok(document) => document,
            Err(e) => {
                let message = format!("Can't parse response {}, {}", url, e);
                return record(&mut report.log, RowError::new(row, ErrorKind::Parse, message));
            }
        };

        let results = match extract(&document, config.data_paths()) {
            Ok(results) => results,
            Err(e) => {
                let message = format!("Can't extract results for {:?}, {}", query, e);
                return record(&mut report.log, RowError::new(row, ErrorKind::Extract, message));
            }
        };

        let mut writes = Vec::new();
        for (k, named) in config.data_paths().iter().enumerate() {
            let values = results.values(k).unwrap_or_default();
            let joined = values.join(config.separator());
            if joined.is_empty() {
                debug!(row, path = %named.path, "No results");
                continue;
            }
            writes.push((plan.result_col + k, joined));
        }

        info!(row, query, matched = writes.len(), "Searched");
        if writes.is_empty() {
            return;
        }

        let Some(sheet) = workbook.worksheet_mut(plan.dest_sheet) else {
            return;
        };

        if let Some(col) = plan.echo_col {
            if read_cell(sheet, row, col) != query {
                writes.insert(0, (col, query.to_string()));
            }
        }

        for (col, text) in writes {
            match write_cell(sheet, row, col, &text, config.overwrite()) {
                Ok(()) => report.cells_written += 1,
                Err(e @ CoreError::CellOccupied { .. }) => {
                    let message = format!("Failed to update cell results for {:?}, {}", query, e);
                    record(&mut report.log, RowError::new(row, ErrorKind::CellOccupied, message));
                }
                Err(e) => {
                    let message = format!(
                        "Failed to write {} for {:?}, {}",
                        CellAddress::new(row, col),
                        query,
                        e
                    );
                    record(&mut report.log, RowError::new(row, ErrorKind::Write, message));
                }
            }
        }
    }
}

/// Column index for a label, refusing columns past the edge of a sheet
fn column_index(label: &str) -> Result<usize, FatalError> {
    CellAddress::sheet_column(label).map_err(|source| FatalError::InvalidColumn {
        label: label.to_string(),
        source,
    })
}

/// Fail unless the `count` columns starting at `first` all fit on a sheet
fn check_span(label: &str, first: usize, count: usize) -> Result<(), FatalError> {
    let last = CellAddress::column_to_letters(first + count.saturating_sub(1));
    CellAddress::sheet_column(&last)
        .map(|_| ())
        .map_err(|source| FatalError::InvalidColumn {
            label: label.to_string(),
            source,
        })
}

fn record(log: &mut ErrorLog, error: RowError) {
    warn!(row = error.row, kind = %error.kind, "{}", error.message);
    log.push(error);
}
