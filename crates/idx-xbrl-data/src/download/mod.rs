//! Archive downloading.
//!
//! The rest of the pipeline only sees the [`ReportFetcher`] trait. Session
//! state (cookies, warm-up requests, retries) lives entirely inside the
//! implementation, so a browser-driven fetcher can replace [`HttpFetcher`]
//! without touching later stages.
//!
//! # Example
//!
//! ```no_run
//! use idx_xbrl_data::download::{HttpFetcher, ReportFetcher};
//! use idx_xbrl_data::TickerEntry;
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = HttpFetcher::new();
//!     let entry = TickerEntry::new("BBCA", Url::parse("https://example.com/BBCA/instance.zip")?);
//!     let archive = fetcher.fetch(&entry, std::path::Path::new("/tmp/idx")).await?;
//!     println!("{} bytes at {}", archive.size_bytes, archive.path.display());
//!     Ok(())
//! }
//! ```

pub mod client;

pub use client::HttpFetcher;

use crate::error::Result;
use crate::model::{DownloadedArchive, TickerEntry};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Browser user agent sent with every request; IDX rejects unknown clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36 Edg/133.0.0.0";

/// Retrieves a ticker's report archive into a local directory.
pub trait ReportFetcher: Send + Sync {
    /// Download `entry.url` into `dest_dir`.
    ///
    /// The returned file belongs to the caller, who must delete it.
    fn fetch(
        &self,
        entry: &TickerEntry,
        dest_dir: &Path,
    ) -> impl Future<Output = Result<DownloadedArchive>> + Send;
}

/// Settings for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// User-Agent header
    pub user_agent: String,
    /// Whole-request timeout, body included
    pub timeout: Duration,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Retries after the first attempt for transient failures
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry
    pub retry_backoff: Duration,
    /// Largest archive accepted, in bytes
    pub max_archive_bytes: u64,
    /// Page visited once per session before the download, to collect cookies
    pub warmup_url: Option<Url>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
            max_archive_bytes: 256 * 1024 * 1024,
            warmup_url: None,
        }
    }
}

impl DownloadConfig {
    /// Delay before retry number `attempt` (0-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.retry_backoff.saturating_mul(1u32 << attempt.min(16))
    }
}

/// File name an archive is saved under.
///
/// The URL's last path segment when it names a `.zip`, else `{TICKER}_instance.zip`.
pub fn archive_filename(url: &Url, ticker: &str) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| {
            name.to_ascii_lowercase().ends_with(".zip")
                && !name.starts_with('.')
                && !name.contains('\\')
        })
        .map_or_else(|| format!("{ticker}_instance.zip"), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://idx.co.id/Portals/0/TW1/ADMR/instance.zip", "instance.zip")]
    #[case("https://example.com/reports/BBCA_2023.ZIP", "BBCA_2023.ZIP")]
    #[case("https://example.com/download?id=42", "BBCA_instance.zip")]
    #[case("https://example.com/reports/", "BBCA_instance.zip")]
    #[case("https://example.com/reports/.zip", "BBCA_instance.zip")]
    fn test_archive_filename(#[case] url: &str, #[case] expected: &str) {
        let url = Url::parse(url).unwrap();
        assert_eq!(archive_filename(&url, "BBCA"), expected);
    }

    #[test]
    fn test_backoff_doubles() {
        let config = DownloadConfig {
            retry_backoff: Duration::from_millis(100),
            ..Default::default()
        };
        assert_eq!(config.backoff_for(0), Duration::from_millis(100));
        assert_eq!(config.backoff_for(1), Duration::from_millis(200));
        assert_eq!(config.backoff_for(3), Duration::from_millis(800));
    }

    #[test]
    fn test_default_config() {
        let config = DownloadConfig::default();
        assert_eq!(config.max_retries, 2);
        assert!(config.user_agent.contains("Edg/"));
        assert!(config.warmup_url.is_none());
    }
}
