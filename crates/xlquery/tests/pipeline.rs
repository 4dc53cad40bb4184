//! End-to-end runs against an in-memory search service

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use pretty_assertions::assert_eq;
use url::Url;
use xlquery::{
    Destination, EmptyQueryPolicy, ErrorKind, FatalError, Fetch, FetchError, NamedPath,
    RowPipeline, RunConfig, Workbook, WorkbookStore, Worksheet, XmlFeedParser,
};

/// Answers by the `title` parameter; unknown titles fail like a dead server
#[derive(Default)]
struct MockSearch {
    responses: HashMap<String, String>,
    requests: RefCell<Vec<Url>>,
}

impl MockSearch {
    fn answer(mut self, title: &str, body: String) -> Self {
        self.responses.insert(title.to_string(), body);
        self
    }

    fn requested_titles(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .filter_map(|url| {
                url.query_pairs()
                    .find(|(k, _)| k == "title")
                    .map(|(_, v)| v.into_owned())
            })
            .collect()
    }
}

impl Fetch for MockSearch {
    fn fetch(&self, url: &Url, _headers: &BTreeMap<String, String>) -> Result<Vec<u8>, FetchError> {
        self.requests.borrow_mut().push(url.clone());
        let title = url
            .query_pairs()
            .find(|(k, _)| k == "title")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        self.responses
            .get(&title)
            .map(|body| body.clone().into_bytes())
            .ok_or_else(|| FetchError::Other("connection refused".into()))
    }
}

#[derive(Default)]
struct RecordingStore {
    saves: usize,
    fail: bool,
}

impl WorkbookStore for RecordingStore {
    fn save(&mut self, _workbook: &Workbook) -> xlquery::Result<()> {
        if self.fail {
            return Err(xlquery::Error::other("disk full"));
        }
        self.saves += 1;
        Ok(())
    }
}

fn rss(items: &[(&str, &str)]) -> String {
    let items: String = items
        .iter()
        .map(|(title, link)| format!("<item><title>{}</title><link>{}</link></item>", title, link))
        .collect();
    format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Search</title>{}</channel></rss>"#,
        items
    )
}

fn query_book(rows: &[&[&str]]) -> Workbook {
    let mut sheet = Worksheet::new("Sheet1");
    for row in rows {
        sheet.push_row(row.iter().copied());
    }
    let mut workbook = Workbook::empty();
    workbook.add_existing_worksheet(sheet).unwrap();
    workbook
}

fn column_config() -> RunConfig {
    RunConfig::builder("A", Destination::Column("B".into()))
        .search_url("http://example.org/cgi/search/advanced/")
        .build()
}

fn sheet1(workbook: &Workbook) -> &Worksheet {
    workbook.worksheet_by_name("Sheet1").unwrap()
}

#[test]
fn test_single_result_written_and_saved_once() {
    let search = MockSearch::default().answer(
        "gravitational waves",
        rss(&[("GW150914", "http://example.org/123")]),
    );
    let mut workbook = query_book(&[&["Query", "Result"], &["gravitational waves", ""]]);
    let mut store = RecordingStore::default();
    let config = column_config();

    let report = RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook, &mut store)
        .unwrap();

    let sheet = sheet1(&workbook);
    assert_eq!(sheet.text("B2").unwrap(), "http://example.org/123");
    assert!(sheet.cell_at(1, 1).unwrap().alignment.wrap_text);
    assert_eq!(sheet.text("B1").unwrap(), "Result");
    assert_eq!(store.saves, 1);
    assert!(report.saved);
    assert_eq!(report.rows_processed, 1);
    assert_eq!(report.rows_skipped, 1);
    assert_eq!(report.cells_written, 1);
    assert!(report.log.is_empty());

    let requests = search.requests.borrow();
    assert_eq!(
        requests[0].as_str(),
        "http://example.org/cgi/search/advanced/?title=gravitational+waves&output=RSS2"
    );
}

#[test]
fn test_occupied_cell_is_logged_and_kept() {
    let search = MockSearch::default().answer(
        "gravitational waves",
        rss(&[("GW150914", "http://example.org/123")]),
    );
    let mut workbook = query_book(&[&["Query", "Result"], &["gravitational waves", "existing"]]);
    let mut store = RecordingStore::default();
    let config = column_config();

    let report = RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook, &mut store)
        .unwrap();

    assert_eq!(sheet1(&workbook).text("B2").unwrap(), "existing");
    assert_eq!(store.saves, 0);
    assert!(!report.saved);
    assert_eq!(report.log.len(), 1);
    let entry = report.log.iter().next().unwrap();
    assert_eq!(entry.kind, ErrorKind::CellOccupied);
    assert_eq!(entry.row, 1);
    assert!(entry.message.contains("existing"), "{}", entry.message);
}

#[test]
fn test_occupied_cell_does_not_block_other_rows() {
    let search = MockSearch::default()
        .answer("first", rss(&[("One", "http://example.org/1")]))
        .answer("second", rss(&[("Two", "http://example.org/2")]));
    let mut workbook = query_book(&[
        &["Query", "Result"],
        &["first", "existing"],
        &["second"],
    ]);
    let mut store = RecordingStore::default();
    let config = column_config();

    let report = RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook, &mut store)
        .unwrap();

    let sheet = sheet1(&workbook);
    assert_eq!(sheet.text("B2").unwrap(), "existing");
    assert_eq!(sheet.text("B3").unwrap(), "http://example.org/2");
    assert_eq!(sheet.row(2).unwrap().len(), 2);
    assert_eq!(store.saves, 1);
    assert_eq!(report.log.of_kind(ErrorKind::CellOccupied).count(), 1);
}

#[test]
fn test_overwrite_replaces_existing_text() {
    let search = MockSearch::default().answer("q", rss(&[("T", "http://example.org/new")]));
    let mut workbook = query_book(&[&["Query", "Result"], &["q", "old"]]);
    let mut store = RecordingStore::default();
    let config = RunConfig::builder("A", Destination::Column("B".into()))
        .overwrite(true)
        .build();

    RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook, &mut store)
        .unwrap();

    assert_eq!(sheet1(&workbook).text("B2").unwrap(), "http://example.org/new");
    assert_eq!(store.saves, 1);
}

#[test]
fn test_fetch_failure_does_not_stop_the_run() {
    let search = MockSearch::default().answer("works", rss(&[("T", "http://example.org/ok")]));
    let mut workbook = query_book(&[&["Query", "Result"], &["unreachable"], &["works"]]);
    let mut store = RecordingStore::default();
    let config = column_config();

    let report = RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook, &mut store)
        .unwrap();

    assert_eq!(search.requested_titles(), vec!["unreachable", "works"]);
    assert_eq!(sheet1(&workbook).text("B2").unwrap(), "");
    assert_eq!(sheet1(&workbook).text("B3").unwrap(), "http://example.org/ok");
    assert_eq!(report.rows_processed, 2);
    assert_eq!(report.log.len(), 1);
    let entry = report.log.iter().next().unwrap();
    assert_eq!(entry.kind, ErrorKind::Fetch);
    assert!(entry.message.contains("connection refused"));
    assert_eq!(store.saves, 1);
}

#[test]
fn test_unparseable_response_is_logged() {
    let search = MockSearch::default().answer("q", "<html><body>Oops".to_string());
    let mut workbook = query_book(&[&["Query", "Result"], &["q"]]);
    let mut store = RecordingStore::default();
    let config = column_config();

    let report = RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook, &mut store)
        .unwrap();

    assert_eq!(report.log.of_kind(ErrorKind::Parse).count(), 1);
    assert_eq!(store.saves, 0);
}

#[test]
fn test_invalid_data_path_is_logged_per_row() {
    let search = MockSearch::default()
        .answer("a", rss(&[("A", "http://example.org/a")]))
        .answer("b", rss(&[("B", "http://example.org/b")]));
    let mut workbook = query_book(&[&["Query", "Result"], &["a"], &["b"]]);
    let mut store = RecordingStore::default();
    let config = RunConfig::builder("A", Destination::Column("B".into()))
        .data_paths([NamedPath::new("link", "item[].link")])
        .build();

    let report = RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook, &mut store)
        .unwrap();

    assert_eq!(report.log.of_kind(ErrorKind::Extract).count(), 2);
    assert_eq!(report.cells_written, 0);
    assert_eq!(store.saves, 0);
}

#[test]
fn test_multiple_matches_are_joined() {
    let search = MockSearch::default().answer(
        "q",
        rss(&[
            ("One", "http://example.org/1"),
            ("Two", "http://example.org/2"),
            ("Three", "http://example.org/3"),
        ]),
    );
    let mut workbook = query_book(&[&["Query", "Result"], &["q"]]);
    let config = column_config();

    RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook, &mut RecordingStore::default())
        .unwrap();

    assert_eq!(
        sheet1(&workbook).text("B2").unwrap(),
        "http://example.org/1\nhttp://example.org/2\nhttp://example.org/3"
    );

    let mut workbook = workbook_with_query("q");
    let config = RunConfig::builder("A", Destination::Column("B".into()))
        .separator("\r")
        .build();
    RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook, &mut RecordingStore::default())
        .unwrap();
    assert_eq!(
        sheet1(&workbook).text("B2").unwrap(),
        "http://example.org/1\rhttp://example.org/2\rhttp://example.org/3"
    );
}

fn workbook_with_query(query: &str) -> Workbook {
    query_book(&[&["Query", "Result"], &[query]])
}

#[test]
fn test_zero_matches_write_nothing() {
    let search = MockSearch::default().answer("nothing", rss(&[]));
    let mut workbook = workbook_with_query("nothing");
    let mut store = RecordingStore::default();
    let config = column_config();

    let report = RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook, &mut store)
        .unwrap();

    assert_eq!(sheet1(&workbook).row(1).unwrap().len(), 1);
    assert!(report.log.is_empty());
    assert_eq!(report.rows_processed, 1);
    assert_eq!(store.saves, 0);
}

#[test]
fn test_several_paths_fill_adjacent_columns() {
    let search = MockSearch::default().answer(
        "q",
        rss(&[("One", "http://example.org/1"), ("Two", "http://example.org/2")]),
    );
    let mut workbook = workbook_with_query("q");
    let config = RunConfig::builder("A", Destination::Column("C".into()))
        .data_paths([
            NamedPath::new("title", ".item[].title"),
            NamedPath::new("link", ".item[].link"),
        ])
        .build();

    let report = RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook, &mut RecordingStore::default())
        .unwrap();

    let sheet = sheet1(&workbook);
    assert_eq!(sheet.text("C2").unwrap(), "One\nTwo");
    assert_eq!(sheet.text("D2").unwrap(), "http://example.org/1\nhttp://example.org/2");
    assert_eq!(report.cells_written, 2);
}

#[test]
fn test_paths_sharing_a_label_keep_their_own_columns() {
    let search = MockSearch::default().answer(
        "q",
        rss(&[("One", "http://example.org/1"), ("Two", "http://example.org/2")]),
    );
    let mut workbook = workbook_with_query("q");
    let config = RunConfig::builder("A", Destination::Column("C".into()))
        .data_paths([
            NamedPath::parse("x=.item[].title").unwrap(),
            NamedPath::parse("x=.item[].link").unwrap(),
        ])
        .build();

    RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook, &mut RecordingStore::default())
        .unwrap();

    let sheet = sheet1(&workbook);
    assert_eq!(sheet.text("C2").unwrap(), "One\nTwo");
    assert_eq!(sheet.text("D2").unwrap(), "http://example.org/1\nhttp://example.org/2");
}

#[test]
fn test_results_sheet_created_with_header() {
    let search = MockSearch::default()
        .answer("first", rss(&[("One", "http://example.org/1")]))
        .answer("second", rss(&[("Two", "http://example.org/2")]));
    let mut workbook = query_book(&[&["Query"], &["first"], &["second"]]);
    let mut store = RecordingStore::default();
    let config = RunConfig::builder(
        "A",
        Destination::ResultsSheet {
            name: "Result".into(),
            require_existing: false,
        },
    )
    .build();

    let report = RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook, &mut store)
        .unwrap();

    let results = workbook.worksheet_by_name("Result").unwrap();
    assert_eq!(results.text("A1").unwrap(), "Query");
    assert_eq!(results.text("B1").unwrap(), "link");
    assert_eq!(results.text("A2").unwrap(), "first");
    assert_eq!(results.text("B2").unwrap(), "http://example.org/1");
    assert_eq!(results.text("A3").unwrap(), "second");
    assert_eq!(results.text("B3").unwrap(), "http://example.org/2");

    assert_eq!(sheet1(&workbook).column_count(), 1);
    assert_eq!(report.cells_written, 4);
    assert_eq!(store.saves, 1);
}

#[test]
fn test_existing_results_sheet_keeps_row_positions() {
    let search = MockSearch::default().answer("second", rss(&[("Two", "http://example.org/2")]));
    let mut workbook = query_book(&[&["Query"], &["first"], &["second"]]);
    let mut results = Worksheet::new("Result");
    results.push_row(["Query", "link"]);
    results.push_row(["first", "http://example.org/old"]);
    workbook.add_existing_worksheet(results).unwrap();

    let config = RunConfig::builder(
        "A",
        Destination::ResultsSheet {
            name: "Result".into(),
            require_existing: true,
        },
    )
    .overwrite(true)
    .build();

    let report = RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook, &mut RecordingStore::default())
        .unwrap();

    let results = workbook.worksheet_by_name("Result").unwrap();
    assert_eq!(results.text("B2").unwrap(), "http://example.org/old");
    assert_eq!(results.text("A3").unwrap(), "second");
    assert_eq!(results.text("B3").unwrap(), "http://example.org/2");
    assert_eq!(report.log.of_kind(ErrorKind::Fetch).count(), 1);
}

#[test]
fn test_results_sheet_name_ignores_case() {
    let search = MockSearch::default().answer("first", rss(&[("One", "http://example.org/1")]));
    let mut workbook = query_book(&[&["Query"], &["first"]]);
    workbook.add_worksheet_with_name("Result").unwrap();

    let config = RunConfig::builder(
        "A",
        Destination::ResultsSheet {
            name: "result".into(),
            require_existing: true,
        },
    )
    .build();

    RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook, &mut RecordingStore::default())
        .unwrap();

    assert_eq!(workbook.sheet_count(), 2);
    let results = workbook.worksheet_by_name("Result").unwrap();
    assert_eq!(results.name(), "Result");
    assert_eq!(results.text("B2").unwrap(), "http://example.org/1");
}

#[test]
fn test_missing_required_results_sheet_is_fatal() {
    let search = MockSearch::default();
    let mut workbook = workbook_with_query("q");
    let mut store = RecordingStore::default();
    let config = RunConfig::builder(
        "A",
        Destination::ResultsSheet {
            name: "Result".into(),
            require_existing: true,
        },
    )
    .build();

    let failure = RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook, &mut store)
        .unwrap_err();

    assert!(matches!(failure.error, FatalError::ResultsSheetMissing(ref name) if name == "Result"));
    assert!(failure.log.is_empty());
    assert!(search.requests.borrow().is_empty());
    assert_eq!(store.saves, 0);
}

#[test]
fn test_setup_errors_are_fatal() {
    let search = MockSearch::default();

    let config = RunConfig::builder("A", Destination::Column("B".into()))
        .sheet_name("Missing")
        .build();
    let failure = RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook_with_query("q"), &mut RecordingStore::default())
        .unwrap_err();
    assert!(matches!(failure.error, FatalError::SheetNotFound(_)));

    let config = RunConfig::builder("A1", Destination::Column("B".into())).build();
    let failure = RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook_with_query("q"), &mut RecordingStore::default())
        .unwrap_err();
    assert!(matches!(failure.error, FatalError::InvalidColumn { ref label, .. } if label == "A1"));

    let config = RunConfig::builder("A", Destination::Column("B".into()))
        .search_url("not a url")
        .build();
    let failure = RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook_with_query("q"), &mut RecordingStore::default())
        .unwrap_err();
    assert!(matches!(failure.error, FatalError::InvalidSearchUrl { .. }));

    let config = RunConfig::builder(
        "A",
        Destination::ResultsSheet {
            name: "sheet1".into(),
            require_existing: false,
        },
    )
    .build();
    let failure = RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook_with_query("q"), &mut RecordingStore::default())
        .unwrap_err();
    assert!(matches!(failure.error, FatalError::ResultsSheetIsQuerySheet(_)));

    assert!(search.requests.borrow().is_empty());
}

#[test]
fn test_columns_past_the_sheet_edge_are_fatal() {
    let search = MockSearch::default().answer("q", rss(&[("One", "http://example.org/1")]));

    for label in ["ZZZZZZ", "XFE"] {
        let config = RunConfig::builder("A", Destination::Column(label.into())).build();
        let failure = RowPipeline::new(&config, &search, &XmlFeedParser)
            .run(&mut workbook_with_query("q"), &mut RecordingStore::default())
            .unwrap_err();
        assert!(
            matches!(failure.error, FatalError::InvalidColumn { label: ref l, .. } if l == label),
            "{} gave {:?}",
            label,
            failure.error
        );
    }

    let config = RunConfig::builder("XFE", Destination::Column("B".into())).build();
    let failure = RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook_with_query("q"), &mut RecordingStore::default())
        .unwrap_err();
    assert!(matches!(failure.error, FatalError::InvalidColumn { .. }));

    // The second path would land one past the last column
    let config = RunConfig::builder("A", Destination::Column("XFD".into()))
        .data_paths([
            NamedPath::new("title", ".item[].title"),
            NamedPath::new("link", ".item[].link"),
        ])
        .build();
    let failure = RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook_with_query("q"), &mut RecordingStore::default())
        .unwrap_err();
    assert!(matches!(failure.error, FatalError::InvalidColumn { ref label, .. } if label == "XFD"));
    assert!(search.requests.borrow().is_empty());

    // The last column itself is usable
    let config = RunConfig::builder("A", Destination::Column("XFD".into())).build();
    let mut workbook = workbook_with_query("q");
    RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook, &mut RecordingStore::default())
        .unwrap();
    assert_eq!(sheet1(&workbook).text("XFD2").unwrap(), "http://example.org/1");
}

#[test]
fn test_save_failure_carries_row_errors() {
    let search = MockSearch::default().answer("works", rss(&[("T", "http://example.org/ok")]));
    let mut workbook = query_book(&[&["Query", "Result"], &["unreachable"], &["works"]]);
    let mut store = RecordingStore {
        fail: true,
        ..RecordingStore::default()
    };
    let config = column_config();

    let failure = RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook, &mut store)
        .unwrap_err();

    assert!(matches!(failure.error, FatalError::Save(_)));
    assert_eq!(failure.log.len(), 1);
    assert!(failure.to_string().starts_with("Can't save workbook, disk full\nrow 2: "));
}

#[test]
fn test_empty_query_policy() {
    let search = MockSearch::default()
        .answer("", rss(&[("Everything", "http://example.org/all")]))
        .answer("q", rss(&[("T", "http://example.org/q")]));

    let mut workbook = query_book(&[&["Query", "Result"], &[""], &["q"]]);
    let config = column_config();
    let report = RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook, &mut RecordingStore::default())
        .unwrap();
    assert_eq!(search.requested_titles(), vec!["", "q"]);
    assert_eq!(sheet1(&workbook).text("B2").unwrap(), "http://example.org/all");
    assert_eq!(report.rows_processed, 2);

    let search = MockSearch::default().answer("q", rss(&[("T", "http://example.org/q")]));
    let mut workbook = query_book(&[&["Query", "Result"], &[""], &["q"]]);
    let config = RunConfig::builder("A", Destination::Column("B".into()))
        .empty_query(EmptyQueryPolicy::Skip)
        .build();
    let report = RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook, &mut RecordingStore::default())
        .unwrap();
    assert_eq!(search.requested_titles(), vec!["q"]);
    assert_eq!(report.rows_skipped, 2);
    assert_eq!(report.rows_processed, 1);
}

#[test]
fn test_without_header_skip_first_row_is_searched() {
    let search = MockSearch::default().answer("q", rss(&[("T", "http://example.org/q")]));
    let mut workbook = query_book(&[&["q"]]);
    let config = RunConfig::builder("A", Destination::Column("B".into()))
        .skip_header(false)
        .build();

    RowPipeline::new(&config, &search, &XmlFeedParser)
        .run(&mut workbook, &mut RecordingStore::default())
        .unwrap();

    assert_eq!(sheet1(&workbook).text("B1").unwrap(), "http://example.org/q");
}
