//! Per-ticker pipeline orchestration.
//!
//! Each ticker runs download, extract, parse and persist in order inside its
//! own scratch directory. Tickers run concurrently up to
//! [`PipelineConfig::workers`]; a failure only affects its own ticker.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::shutdown::ShutdownSignal;
use crate::summary::{ProcessedReport, RunSummary, Stage, TickerFailure, TickerOutcome};
use futures::stream::{self, StreamExt};
use idx_xbrl_data::archive;
use idx_xbrl_data::xbrl::{ReportSource, parse_report};
use idx_xbrl_data::{ReportFetcher, ReportSink, TickerEntry, UpsertOutcome};
use std::path::Path;
use std::pin::pin;
use std::sync::Arc;
use tracing::{info, warn};

/// Runs ticker entries through download, extract, parse and persist.
#[derive(Debug)]
pub struct ReportProcessor<F, S> {
    fetcher: F,
    sink: Arc<S>,
    config: PipelineConfig,
}

impl<F, S> ReportProcessor<F, S>
where
    F: ReportFetcher,
    S: ReportSink + 'static,
{
    /// Create a processor.
    ///
    /// # Errors
    /// [`PipelineError::InvalidConfig`] when `config` fails validation.
    pub fn new(fetcher: F, sink: S, config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            fetcher,
            sink: Arc::new(sink),
            config,
        })
    }

    /// Current settings.
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The sink records are written to.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Process every entry and summarize the run.
    pub async fn process_all(&self, entries: Vec<TickerEntry>) -> Result<RunSummary, PipelineError> {
        self.process_all_with(entries, &ShutdownSignal::never(), |_| {})
            .await
    }

    /// Process entries until done, stopped by `shutdown`, or past the run
    /// timeout. `on_outcome` sees each outcome as it completes.
    ///
    /// Entries not yet dispatched when the run stops are reported as skipped;
    /// in-flight entries run to completion.
    ///
    /// # Errors
    /// [`PipelineError::SinkUnavailable`] or [`PipelineError::TempStorage`]
    /// before any entry is processed.
    pub async fn process_all_with<C>(
        &self,
        entries: Vec<TickerEntry>,
        shutdown: &ShutdownSignal,
        mut on_outcome: C,
    ) -> Result<RunSummary, PipelineError>
    where
        C: FnMut(&TickerOutcome),
    {
        self.prepare().await?;

        info!(
            entries = entries.len(),
            workers = self.config.workers,
            "starting run"
        );
        let mut summary = RunSummary::start();
        let mut finished = vec![false; entries.len()];

        let shutdown = shutdown.clone();
        let run_timeout = self.config.run_timeout;
        let stop = async move {
            match run_timeout {
                Some(limit) => {
                    tokio::select! {
                        () = shutdown.triggered() => info!("shutdown requested, no new tickers will start"),
                        () = tokio::time::sleep(limit) => warn!(?limit, "run timeout reached, no new tickers will start"),
                    }
                }
                None => {
                    shutdown.triggered().await;
                    info!("shutdown requested, no new tickers will start");
                }
            }
        };

        let mut outcomes = pin!(
            stream::iter(entries.iter().enumerate())
                .take_until(stop)
                .map(|(index, entry)| async move { (index, self.process_ticker(entry).await) })
                .buffer_unordered(self.config.workers)
        );

        while let Some((index, outcome)) = outcomes.next().await {
            finished[index] = true;
            on_outcome(&outcome);
            summary.record(outcome);
        }

        let skipped: Vec<String> = entries
            .iter()
            .zip(&finished)
            .filter(|(_, done)| !**done)
            .map(|(entry, _)| entry.ticker.clone())
            .collect();
        if !skipped.is_empty() {
            warn!(count = skipped.len(), "tickers skipped");
        }
        summary.finish(skipped);

        info!(
            succeeded = summary.succeeded.len(),
            failed = summary.failed.len(),
            skipped = summary.skipped.len(),
            "run finished"
        );
        Ok(summary)
    }

    /// Run one entry through every stage.
    ///
    /// The scratch directory and every intermediate file are removed before
    /// this returns, whatever the outcome.
    pub async fn process_ticker(&self, entry: &TickerEntry) -> TickerOutcome {
        let outcome = match self.run_stages(entry).await {
            Ok((period, upsert)) => TickerOutcome::Succeeded(ProcessedReport {
                ticker: entry.ticker.clone(),
                period,
                updated: upsert == UpsertOutcome::Updated,
            }),
            Err((stage, reason)) => {
                warn!(ticker = %entry.ticker, %stage, %reason, "ticker failed");
                TickerOutcome::Failed(TickerFailure {
                    ticker: entry.ticker.clone(),
                    url: entry.url.to_string(),
                    stage,
                    reason,
                })
            }
        };
        if let TickerOutcome::Succeeded(report) = &outcome {
            info!(ticker = %report.ticker, period = %report.period, updated = report.updated, "ticker done");
        }
        outcome
    }

    async fn run_stages(&self, entry: &TickerEntry) -> Result<(String, UpsertOutcome), (Stage, String)> {
        let workdir = tempfile::Builder::new()
            .prefix(&format!("{}-", entry.ticker))
            .tempdir_in(&self.config.temp_root)
            .map_err(|e| (Stage::Download, format!("cannot create scratch directory: {e}")))?;

        let downloaded = self
            .fetcher
            .fetch(entry, workdir.path())
            .await
            .map_err(|e| (Stage::Download, e.to_string()))?;

        let extract_dir = workdir.path().join("extracted");
        let extract_config = self.config.extract.clone();
        let (documents, source) = blocking(Stage::Extract, move || {
            let source = ReportSource::from(&downloaded);
            let documents = archive::extract(&downloaded, &extract_dir, &extract_config);
            if let Err(e) = downloaded.discard() {
                warn!(error = %e, "could not remove downloaded archive");
            }
            documents.map(|documents| (documents, source))
        })
        .await?;

        let report = blocking(Stage::Parse, move || {
            let report = parse_report(&documents, &source);
            if let Err(e) = documents.discard() {
                warn!(error = %e, "could not remove extracted files");
            }
            report
        })
        .await?;

        let sink = Arc::clone(&self.sink);
        let period = report.period.label.clone();
        let upsert = blocking(Stage::Persist, move || sink.upsert(&report)).await?;

        drop(workdir);
        Ok((period, upsert))
    }

    /// Check the sink and create the scratch root.
    async fn prepare(&self) -> Result<(), PipelineError> {
        let sink = Arc::clone(&self.sink);
        tokio::task::spawn_blocking(move || sink.check())
            .await
            .map_err(|e| PipelineError::SinkUnavailable(std::io::Error::other(e).into()))?
            .map_err(PipelineError::SinkUnavailable)?;

        create_temp_root(&self.config.temp_root).await
    }
}

async fn create_temp_root(path: &Path) -> Result<(), PipelineError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| PipelineError::TempStorage {
            path: path.to_path_buf(),
            source,
        })
}

/// Run a blocking stage off the async workers, tagging failures with `stage`.
async fn blocking<T, Op>(stage: Stage, op: Op) -> Result<T, (Stage, String)>
where
    T: Send + 'static,
    Op: FnOnce() -> idx_xbrl_data::Result<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(op).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err((stage, e.to_string())),
        Err(e) => Err((stage, format!("worker task failed: {e}"))),
    }
}
