//! HTTP archive fetcher with per-download sessions.

use super::{DownloadConfig, ReportFetcher, archive_filename};
use crate::error::{DataError, Result};
use crate::model::{DownloadedArchive, TickerEntry};
use reqwest::StatusCode;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

/// Downloads report archives over HTTP.
///
/// Every call to [`ReportFetcher::fetch`] opens its own [`DownloadSession`],
/// so cookies never leak between tickers and the session is released when the
/// call returns, whatever the outcome.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    config: DownloadConfig,
}

impl HttpFetcher {
    /// Create a fetcher with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fetcher with custom settings.
    ///
    /// # Example
    /// ```
    /// use idx_xbrl_data::download::{DownloadConfig, HttpFetcher};
    /// use std::time::Duration;
    ///
    /// let fetcher = HttpFetcher::with_config(DownloadConfig {
    ///     max_retries: 0,
    ///     timeout: Duration::from_secs(5),
    ///     ..Default::default()
    /// });
    /// assert_eq!(fetcher.config().max_retries, 0);
    /// ```
    pub const fn with_config(config: DownloadConfig) -> Self {
        Self { config }
    }

    /// Current settings.
    pub const fn config(&self) -> &DownloadConfig {
        &self.config
    }
}

impl ReportFetcher for HttpFetcher {
    async fn fetch(&self, entry: &TickerEntry, dest_dir: &Path) -> Result<DownloadedArchive> {
        tokio::fs::create_dir_all(dest_dir).await?;
        let path = dest_dir.join(archive_filename(&entry.url, &entry.ticker));

        info!(ticker = %entry.ticker, url = %entry.url, "downloading archive");
        // Kept across retries once the warm-up has succeeded.
        let mut session: Option<DownloadSession> = None;

        let mut attempt = 0;
        loop {
            let opened = match session.take() {
                Some(open) => Ok(open),
                None => DownloadSession::open(&self.config).await,
            };
            let result = match opened {
                Ok(open) => {
                    let result = open
                        .download_to(&entry.url, &path, self.config.max_archive_bytes)
                        .await;
                    session = Some(open);
                    result
                }
                Err(e) => Err(e),
            };
            match result {
                Ok(size_bytes) => {
                    info!(ticker = %entry.ticker, size_bytes, "downloaded archive");
                    return Ok(DownloadedArchive {
                        ticker: entry.ticker.clone(),
                        path,
                        size_bytes,
                        source_url: entry.url.clone(),
                    });
                }
                Err(e) => {
                    if let Err(io) = tokio::fs::remove_file(&path).await
                        && io.kind() != std::io::ErrorKind::NotFound
                    {
                        warn!(path = %path.display(), error = %io, "could not remove partial download");
                    }
                    if !e.is_transient() || attempt >= self.config.max_retries {
                        return Err(e);
                    }
                    let delay = self.config.backoff_for(attempt);
                    attempt += 1;
                    warn!(
                        ticker = %entry.ticker,
                        attempt,
                        error = %e,
                        "download failed, retrying in {:?}",
                        delay
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// One browser-like session: its own client and cookie jar.
struct DownloadSession {
    client: reqwest::Client,
}

impl DownloadSession {
    /// Build the client and visit the warm-up page, if one is configured.
    async fn open(config: &DownloadConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .cookie_store(true)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(DataError::Network)?;

        if let Some(warmup) = &config.warmup_url {
            debug!(url = %warmup, "warming up download session");
            let response = client.get(warmup.as_str()).send().await?;
            if !response.status().is_success() {
                return Err(DataError::HttpStatus {
                    status: response.status().as_u16(),
                    url: warmup.to_string(),
                });
            }
        }

        Ok(Self { client })
    }

    /// Stream `url` into `path`; returns the number of bytes written.
    async fn download_to(&self, url: &Url, path: &Path, limit: u64) -> Result<u64> {
        let mut response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DataError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        if let Some(len) = response.content_length()
            && len > limit
        {
            return Err(DataError::TooLarge { limit });
        }

        let mut file = tokio::fs::File::create(path).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            written += chunk.len() as u64;
            if written > limit {
                return Err(DataError::TooLarge { limit });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        if written == 0 {
            return Err(DataError::EmptyDownload(url.to_string()));
        }
        Ok(written)
    }
}
