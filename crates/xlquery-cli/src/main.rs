//! xlquery CLI - run spreadsheet rows as search queries

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};
use xlquery::{
    run_file, Destination, EmptyQueryPolicy, ErrorLog, HttpFetcher, NamedPath, RunConfig,
    RunConfigBuilder, Workbook, WorkbookExt, DEFAULT_RESULTS_SHEET, DEFAULT_SEARCH_URL,
    DEFAULT_SHEET_NAME,
};

#[derive(Parser)]
#[command(name = "xlquery")]
#[command(
    author,
    version,
    about = "Run the rows of a spreadsheet as search queries and write the results back"
)]
struct Cli {
    /// Log each request and skipped row
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write results into a column of the query sheet
    Column {
        /// Workbook to read queries from and save results into (xlsx)
        workbook: PathBuf,

        /// Column holding the queries (e.g. A)
        query_column: String,

        /// Column receiving the results (e.g. B)
        result_column: String,

        /// Sheet holding the queries
        #[arg(short, long, default_value = DEFAULT_SHEET_NAME)]
        sheet: String,

        /// Replace results already in the sheet
        #[arg(short, long)]
        overwrite: bool,

        #[command(flatten)]
        search: SearchArgs,
    },

    /// Write results into a separate sheet, one column per data path
    Sheet {
        /// Workbook to read queries from and save results into (xlsx)
        workbook: PathBuf,

        /// Sheet holding the queries
        query_sheet: String,

        /// Column holding the queries (e.g. A)
        query_column: String,

        /// Sheet receiving the results
        #[arg(default_value = DEFAULT_RESULTS_SHEET)]
        result_sheet: String,

        /// Fail if the results sheet does not exist yet
        #[arg(long)]
        require_existing: bool,

        /// Keep results already in the results sheet
        #[arg(long)]
        no_overwrite: bool,

        #[command(flatten)]
        search: SearchArgs,
    },

    /// Print one cell as JSON
    CheckCell {
        /// Workbook to read (xlsx)
        workbook: PathBuf,

        /// Sheet index (0-based)
        sheet: usize,

        /// Row index (0-based)
        row: usize,

        /// Column index (0-based)
        col: usize,
    },
}

/// Options shared by the search commands
#[derive(Args)]
struct SearchArgs {
    /// Data path to extract, as `label=path` or `path` (repeatable)
    #[arg(short, long = "datapath", value_name = "PATH")]
    datapaths: Vec<NamedPath>,

    /// Treat the first row as data rather than a header
    #[arg(long)]
    no_skip_header: bool,

    /// Skip rows whose query cell is empty instead of searching for ""
    #[arg(long)]
    skip_empty: bool,

    /// Joins several results in one cell (\n, \r and \t are understood)
    #[arg(long, default_value = "\\n", value_parser = parse_separator)]
    separator: String,

    /// Search service URL
    #[arg(long, env = "EPRINTS_SEARCH_URL", default_value = DEFAULT_SEARCH_URL)]
    search_url: String,

    /// Extra request header as `Name: value` (repeatable)
    #[arg(short = 'H', long = "header", value_name = "HEADER", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Request timeout in seconds, 0 for none
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

impl SearchArgs {
    fn apply(&self, mut builder: RunConfigBuilder) -> RunConfigBuilder {
        if !self.datapaths.is_empty() {
            builder = builder.data_paths(self.datapaths.iter().cloned());
        }
        for (key, value) in &self.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        let empty_query = if self.skip_empty {
            EmptyQueryPolicy::Skip
        } else {
            EmptyQueryPolicy::Send
        };

        builder
            .search_url(self.search_url.as_str())
            .skip_header(!self.no_skip_header)
            .empty_query(empty_query)
            .separator(self.separator.as_str())
    }

    fn fetcher(&self) -> Result<HttpFetcher> {
        let timeout = (self.timeout > 0).then(|| Duration::from_secs(self.timeout));
        HttpFetcher::new(timeout).context("Failed to set up the HTTP client")
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Column {
            workbook,
            query_column,
            result_column,
            sheet,
            overwrite,
            search,
        } => {
            let builder = RunConfig::builder(query_column, Destination::Column(result_column))
                .sheet_name(sheet)
                .overwrite(overwrite);
            let config = search.apply(builder).build();
            run(&workbook, &config, &search)
        }
        Commands::Sheet {
            workbook,
            query_sheet,
            query_column,
            result_sheet,
            require_existing,
            no_overwrite,
            search,
        } => {
            let destination = Destination::ResultsSheet {
                name: result_sheet,
                require_existing,
            };
            let builder = RunConfig::builder(query_column, destination)
                .sheet_name(query_sheet)
                .overwrite(!no_overwrite);
            let config = search.apply(builder).build();
            run(&workbook, &config, &search)
        }
        Commands::CheckCell {
            workbook,
            sheet,
            row,
            col,
        } => check_cell(&workbook, sheet, row, col),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(path: &Path, config: &RunConfig, search: &SearchArgs) -> Result<()> {
    let fetcher = search.fetcher()?;

    match run_file(path, config, &fetcher) {
        Ok(report) => {
            print_log(&report.log);
            if report.saved {
                eprintln!(
                    "Searched {} rows, wrote {} cells to '{}'",
                    report.rows_processed,
                    report.cells_written,
                    path.display()
                );
            } else {
                eprintln!(
                    "Searched {} rows, nothing to write to '{}'",
                    report.rows_processed,
                    path.display()
                );
            }
            Ok(())
        }
        Err(failure) => {
            print_log(&failure.log);
            Err(failure.error).with_context(|| format!("Failed to process '{}'", path.display()))
        }
    }
}

fn print_log(log: &ErrorLog) {
    if !log.is_empty() {
        eprintln!("{}", log_summary(log));
    }
}

/// One line per logged problem under a count; a row may log several
fn log_summary(log: &ErrorLog) -> String {
    let noun = if log.len() == 1 { "problem" } else { "problems" };
    let mut summary = format!("{} {}:", log.len(), noun);
    for entry in log {
        summary.push_str(&format!("\n  {}", entry));
    }
    summary
}

fn check_cell(path: &Path, sheet_idx: usize, row: usize, col: usize) -> Result<()> {
    let workbook =
        Workbook::open(path).with_context(|| format!("Failed to open '{}'", path.display()))?;
    let sheet = workbook
        .worksheet(sheet_idx)
        .with_context(|| format!("Sheet index {} not found", sheet_idx))?;

    let json = match sheet.cell_at(row, col) {
        Some(cell) => serde_json::to_string_pretty(cell).context("Failed to encode cell")?,
        None => "null".to_string(),
    };
    println!("{}", json);
    Ok(())
}

fn parse_separator(s: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => return Err(format!("unknown escape \\{}", other)),
            None => return Err("trailing backslash".to_string()),
        }
    }
    Ok(out)
}

fn parse_header(s: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got {:?}", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("header name is empty".to_string());
    }
    Ok((name.to_string(), value.trim().to_string()))
}
