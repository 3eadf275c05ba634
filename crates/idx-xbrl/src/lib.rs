#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/idx-xbrl/idx-xbrl/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod processor;
pub mod shutdown;
pub mod summary;

// Re-export the data layer
pub use idx_xbrl_data as data;

pub use config::{DEFAULT_WORKERS, PipelineConfig};
pub use error::PipelineError;
pub use processor::ReportProcessor;
pub use shutdown::{ShutdownSignal, ShutdownTrigger};
pub use summary::{ProcessedReport, RunSummary, Stage, TickerFailure, TickerOutcome};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
