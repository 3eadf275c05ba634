//! Records passed between pipeline stages.
//!
//! Each stage owns its output until it hands it to the next one:
//! a [`TickerEntry`] becomes a [`DownloadedArchive`], then an
//! [`ExtractedDocuments`] set, then a [`FinancialReport`].

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// One input row: a ticker and the URL of its report archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerEntry {
    /// Exchange ticker symbol (e.g. "BBCA")
    pub ticker: String,
    /// Location of the report archive
    pub url: Url,
}

impl TickerEntry {
    /// Create an entry, upper-casing the ticker.
    pub fn new(ticker: impl AsRef<str>, url: Url) -> Self {
        Self {
            ticker: ticker.as_ref().trim().to_uppercase(),
            url,
        }
    }
}

/// An archive downloaded to local storage for one ticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArchive {
    /// Ticker the archive belongs to
    pub ticker: String,
    /// Local file path
    pub path: PathBuf,
    /// Size of the file in bytes
    pub size_bytes: u64,
    /// URL the archive was fetched from
    pub source_url: Url,
}

impl DownloadedArchive {
    /// Delete the archive file.
    pub fn discard(self) -> std::io::Result<()> {
        remove_if_exists(&self.path)
    }
}

/// Files unpacked from one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocuments {
    /// Ticker the documents belong to
    pub ticker: String,
    /// Directory holding the extracted files
    pub dir: PathBuf,
    /// Extracted file paths, sorted
    pub files: Vec<PathBuf>,
}

impl ExtractedDocuments {
    /// Number of extracted files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no file was extracted.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Delete the extraction directory and everything in it.
    pub fn discard(self) -> std::io::Result<()> {
        match std::fs::remove_dir_all(&self.dir) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Whether a report covers a full year or part of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    /// Twelve-month reporting period
    Annual,
    /// Quarterly or half-year reporting period
    Interim,
    /// No duration fact was available to decide
    Unknown,
}

impl PeriodKind {
    /// Classify a duration in days.
    pub const fn from_duration_days(days: i64) -> Self {
        if days >= 360 { Self::Annual } else { Self::Interim }
    }

    /// Lower-case name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Interim => "interim",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The reporting period a record covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingPeriod {
    /// Storage key component, `YYYY-Qn`
    pub label: String,
    /// Last day of the period
    pub end: NaiveDate,
    /// Calendar year of the period end
    pub fiscal_year: i32,
    /// Calendar quarter of the period end (1-4)
    pub quarter: u32,
    /// Annual or interim
    pub kind: PeriodKind,
}

impl ReportingPeriod {
    /// Build a period from its end date.
    pub fn ending(end: NaiveDate, kind: PeriodKind) -> Self {
        let quarter = (end.month() - 1) / 3 + 1;
        Self {
            label: format!("{}-Q{}", end.year(), quarter),
            end,
            fiscal_year: end.year(),
            quarter,
            kind,
        }
    }
}

/// Financial statement line items extracted from an XBRL instance.
///
/// `total_assets` is required; every other item is `None` when the instance
/// does not report it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItems {
    // Balance Sheet
    /// Total assets
    pub total_assets: f64,
    /// Current assets
    pub current_assets: Option<f64>,
    /// Total liabilities
    pub total_liabilities: Option<f64>,
    /// Current liabilities
    pub current_liabilities: Option<f64>,
    /// Total equity
    pub total_equity: Option<f64>,
    /// Equity attributable to owners of the parent
    pub equity_attributable_to_parent: Option<f64>,
    /// Cash and cash equivalents
    pub cash_and_equivalents: Option<f64>,

    // Income Statement
    /// Revenue
    pub revenue: Option<f64>,
    /// Gross profit
    pub gross_profit: Option<f64>,
    /// Operating income
    pub operating_income: Option<f64>,
    /// Profit before income tax
    pub profit_before_tax: Option<f64>,
    /// Net income (profit for the period)
    pub net_income: Option<f64>,
    /// Net income attributable to owners of the parent
    pub net_income_attributable_to_parent: Option<f64>,
    /// EPS (basic)
    pub eps_basic: Option<f64>,
    /// EPS (diluted)
    pub eps_diluted: Option<f64>,

    // Cash Flow
    /// Operating cash flow
    pub operating_cash_flow: Option<f64>,
    /// Investing cash flow
    pub investing_cash_flow: Option<f64>,
    /// Financing cash flow
    pub financing_cash_flow: Option<f64>,
}

/// Where a record came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// URL the archive was downloaded from
    pub source_url: String,
    /// File name of the XBRL instance used
    pub instance_filename: String,
    /// File name of the taxonomy schema, when the archive had one
    pub taxonomy_filename: Option<String>,
    /// Size of the instance document in bytes
    pub instance_size_bytes: u64,
    /// Size of the downloaded archive in bytes
    pub archive_size_bytes: u64,
    /// Entity name reported in the instance
    pub entity_name: Option<String>,
    /// Entity code reported in the instance
    pub entity_code: Option<String>,
    /// Facts found in the instance
    pub fact_count: usize,
    /// Facts that matched no line item
    pub unmapped_fact_count: usize,
    /// When the record was produced
    pub processed_at: DateTime<Utc>,
}

/// One ticker's financial report for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialReport {
    /// Ticker symbol
    pub ticker: String,
    /// Reporting period
    pub period: ReportingPeriod,
    /// ISO 4217 currency code of monetary items
    pub currency: String,
    /// Statement line items
    pub items: LineItems,
    /// Provenance
    pub metadata: SourceMetadata,
}

impl FinancialReport {
    /// Upsert key: (ticker, period label).
    pub fn key(&self) -> (&str, &str) {
        (&self.ticker, &self.period.label)
    }
}
