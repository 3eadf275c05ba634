//! Errors that abort a whole run.
//!
//! Per-ticker failures never surface here; they are recorded in the
//! [`RunSummary`](crate::summary::RunSummary).

use idx_xbrl_data::DataError;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal pipeline error.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The report sink failed its reachability check
    #[error("report store unavailable: {0}")]
    SinkUnavailable(#[source] DataError),

    /// The temporary root directory could not be created
    #[error("cannot create temporary directory {path}: {source}")]
    TempStorage {
        /// Directory that was requested
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The configuration cannot be used
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
