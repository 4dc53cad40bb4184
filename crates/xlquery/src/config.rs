//! Run configuration

use std::collections::BTreeMap;

use xlquery_feed::NamedPath;

/// CaltechAUTHORS advanced search
pub const DEFAULT_SEARCH_URL: &str = "http://authors.library.caltech.edu/cgi/search/advanced/";

/// Sheet searched when none is named
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Results sheet used when none is named
pub const DEFAULT_RESULTS_SHEET: &str = "Result";

/// Path collected when none is configured
pub const DEFAULT_DATA_PATH: &str = ".item[].link";

/// Label of [`DEFAULT_DATA_PATH`]
pub const DEFAULT_DATA_PATH_LABEL: &str = "link";

/// Where extracted results are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A column of the query sheet, by label. Further data paths go to the
    /// columns to its right.
    Column(String),
    /// A separate sheet: column A holds the query, columns B.. the data
    /// paths in order. With `require_existing` a missing sheet is an error
    /// instead of being created.
    ResultsSheet { name: String, require_existing: bool },
}

/// What to do with a row whose query cell is empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyQueryPolicy {
    /// Send the empty search term as-is
    #[default]
    Send,
    /// Skip the row
    Skip,
}

/// Everything one run needs to know
///
/// Built once with [`RunConfig::builder`] and not changed while the run is
/// in progress.
#[derive(Debug, Clone)]
pub struct RunConfig {
    search_url: String,
    sheet_name: String,
    query_column: String,
    destination: Destination,
    skip_header: bool,
    overwrite: bool,
    data_paths: Vec<NamedPath>,
    query_param: String,
    output_param: (String, String),
    empty_query: EmptyQueryPolicy,
    separator: String,
    headers: BTreeMap<String, String>,
}

impl RunConfig {
    /// Start a configuration reading queries from `query_column`
    pub fn builder<S: Into<String>>(query_column: S, destination: Destination) -> RunConfigBuilder {
        RunConfigBuilder {
            config: RunConfig {
                search_url: DEFAULT_SEARCH_URL.to_string(),
                sheet_name: DEFAULT_SHEET_NAME.to_string(),
                query_column: query_column.into(),
                destination,
                skip_header: true,
                overwrite: false,
                data_paths: vec![NamedPath::new(DEFAULT_DATA_PATH_LABEL, DEFAULT_DATA_PATH)],
                query_param: "title".to_string(),
                output_param: ("output".to_string(), "RSS2".to_string()),
                empty_query: EmptyQueryPolicy::default(),
                separator: "\n".to_string(),
                headers: BTreeMap::new(),
            },
        }
    }

    /// Base search URL; parsed when the run starts
    pub fn search_url(&self) -> &str {
        &self.search_url
    }

    /// Name of the sheet holding the queries
    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn query_column(&self) -> &str {
        &self.query_column
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Whether row 0 is a header row
    pub fn skip_header(&self) -> bool {
        self.skip_header
    }

    /// Whether results may replace non-empty cells
    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    pub fn data_paths(&self) -> &[NamedPath] {
        &self.data_paths
    }

    /// Query parameter carrying the search term
    pub fn query_param(&self) -> &str {
        &self.query_param
    }

    /// Parameter selecting the feed format
    pub fn output_param(&self) -> (&str, &str) {
        (&self.output_param.0, &self.output_param.1)
    }

    pub fn empty_query(&self) -> EmptyQueryPolicy {
        self.empty_query
    }

    /// Joins multiple values extracted into one cell
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Extra request headers
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }
}

/// Builder for [`RunConfig`]
#[derive(Debug, Clone)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn search_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.search_url = url.into();
        self
    }

    pub fn sheet_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.sheet_name = name.into();
        self
    }

    pub fn skip_header(mut self, skip: bool) -> Self {
        self.config.skip_header = skip;
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.config.overwrite = overwrite;
        self
    }

    /// Replace the data paths
    pub fn data_paths<I: IntoIterator<Item = NamedPath>>(mut self, paths: I) -> Self {
        self.config.data_paths = paths.into_iter().collect();
        self
    }

    pub fn query_param<S: Into<String>>(mut self, name: S) -> Self {
        self.config.query_param = name.into();
        self
    }

    pub fn output_param<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.config.output_param = (key.into(), value.into());
        self
    }

    pub fn empty_query(mut self, policy: EmptyQueryPolicy) -> Self {
        self.config.empty_query = policy;
        self
    }

    pub fn separator<S: Into<String>>(mut self, separator: S) -> Self {
        self.config.separator = separator.into();
        self
    }

    /// Add a request header
    pub fn header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.config.headers.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> RunConfig {
        self.config
    }
}
