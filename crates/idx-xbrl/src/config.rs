//! Pipeline configuration.

use crate::error::PipelineError;
use idx_xbrl_data::{DownloadConfig, ExtractConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Default number of tickers processed concurrently.
pub const DEFAULT_WORKERS: usize = 5;

/// Settings for a [`ReportProcessor`](crate::processor::ReportProcessor) run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Tickers in flight at once
    pub workers: usize,
    /// Parent of the per-ticker scratch directories
    pub temp_root: PathBuf,
    /// Stop dispatching new tickers after this long
    pub run_timeout: Option<Duration>,
    /// Downloader settings
    pub download: DownloadConfig,
    /// Extractor settings
    pub extract: ExtractConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            temp_root: std::env::temp_dir().join("idx-xbrl"),
            run_timeout: None,
            download: DownloadConfig::default(),
            extract: ExtractConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Reject settings the processor cannot run with.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.workers == 0 {
            return Err(PipelineError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.download.max_archive_bytes == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_archive_bytes must be positive".to_string(),
            ));
        }
        if self.extract.max_extracted_bytes == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_extracted_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
