#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/idx-xbrl/idx-xbrl/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod archive;
pub mod download;
pub mod error;
pub mod input;
pub mod model;
pub mod store;
pub mod xbrl;

pub use archive::ExtractConfig;
pub use download::{DownloadConfig, HttpFetcher, ReportFetcher};
pub use error::{DataError, Result};
pub use input::{LoadedEntries, load_ticker_entries};
pub use model::{
    DownloadedArchive, ExtractedDocuments, FinancialReport, LineItems, PeriodKind,
    ReportingPeriod, SourceMetadata, TickerEntry,
};
pub use store::{ReportSink, SqliteReportStore, StoreStats, UpsertOutcome};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
