//! Per-ticker outcomes and the end-of-run summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Pipeline stage a ticker failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Fetching the archive
    Download,
    /// Unpacking the archive
    Extract,
    /// Reading the XBRL instance
    Parse,
    /// Writing the record to the sink
    Persist,
}

impl Stage {
    /// Lower-case name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Extract => "extract",
            Self::Parse => "parse",
            Self::Persist => "persist",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ticker whose record was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedReport {
    /// Ticker symbol
    pub ticker: String,
    /// Period label of the stored record
    pub period: String,
    /// Whether an existing record was overwritten
    pub updated: bool,
}

/// A ticker that produced no record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerFailure {
    /// Ticker symbol
    pub ticker: String,
    /// Archive URL
    pub url: String,
    /// Stage that failed
    pub stage: Stage,
    /// Cause, as displayed to users
    pub reason: String,
}

/// Result of running one ticker through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TickerOutcome {
    /// Record written
    Succeeded(ProcessedReport),
    /// Some stage failed
    Failed(TickerFailure),
}

impl TickerOutcome {
    /// Ticker the outcome belongs to.
    pub fn ticker(&self) -> &str {
        match self {
            Self::Succeeded(report) => &report.ticker,
            Self::Failed(failure) => &failure.ticker,
        }
    }

    /// Whether a record was written.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

/// Counts and details for a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Tickers whose record was written
    pub succeeded: Vec<ProcessedReport>,
    /// Tickers that failed, with stage and reason
    pub failed: Vec<TickerFailure>,
    /// Tickers never dispatched because the run was stopped
    pub skipped: Vec<String>,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Run end
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// Empty summary for a run starting now.
    pub fn start() -> Self {
        let now = Utc::now();
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    /// Add one ticker's outcome.
    pub fn record(&mut self, outcome: TickerOutcome) {
        match outcome {
            TickerOutcome::Succeeded(report) => self.succeeded.push(report),
            TickerOutcome::Failed(failure) => self.failed.push(failure),
        }
    }

    /// Mark the run finished; sorts entries by ticker.
    pub fn finish(&mut self, skipped: Vec<String>) {
        self.skipped = skipped;
        self.succeeded.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        self.failed.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        self.finished_at = Utc::now();
    }

    /// Tickers seen, including skipped ones.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.skipped.len()
    }

    /// Whether the run was stopped before every ticker was dispatched.
    pub fn was_cancelled(&self) -> bool {
        !self.skipped.is_empty()
    }

    /// Failure counts per stage.
    pub fn failures_by_stage(&self) -> BTreeMap<Stage, usize> {
        let mut counts = BTreeMap::new();
        for failure in &self.failed {
            *counts.entry(failure.stage).or_insert(0) += 1;
        }
        counts
    }

    /// Wall-clock duration of the run.
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Render the summary as a plain-text table.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str("\nIDX XBRL Run Summary\n");
        output.push_str(&format!(
            "Started: {}  Elapsed: {:.1}s\n",
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.elapsed().num_milliseconds() as f64 / 1000.0
        ));
        output.push_str(&"=".repeat(80));
        output.push('\n');

        output.push_str(&format!(
            "{:<12} {:>8} {:>8} {:>8} {:>8}\n",
            "", "Total", "OK", "Failed", "Skipped"
        ));
        output.push_str(&format!(
            "{:<12} {:>8} {:>8} {:>8} {:>8}\n",
            "Tickers",
            self.total(),
            self.succeeded.len(),
            self.failed.len(),
            self.skipped.len()
        ));

        if !self.failed.is_empty() {
            output.push_str(&"-".repeat(80));
            output.push('\n');
            output.push_str(&format!("{:<10} {:<10} {}\n", "Ticker", "Stage", "Reason"));
            output.push_str(&"-".repeat(80));
            output.push('\n');
            for failure in &self.failed {
                output.push_str(&format!(
                    "{:<10} {:<10} {}\n",
                    failure.ticker, failure.stage, failure.reason
                ));
            }
        }

        if !self.skipped.is_empty() {
            output.push_str(&"-".repeat(80));
            output.push('\n');
            output.push_str(&format!("Skipped: {}\n", self.skipped.join(", ")));
        }

        output.push_str(&"=".repeat(80));
        output.push('\n');
        output
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(ticker: &str, stage: Stage, reason: &str) -> TickerOutcome {
        TickerOutcome::Failed(TickerFailure {
            ticker: ticker.to_string(),
            url: format!("https://example.com/{ticker}.zip"),
            stage,
            reason: reason.to_string(),
        })
    }

    fn success(ticker: &str) -> TickerOutcome {
        TickerOutcome::Succeeded(ProcessedReport {
            ticker: ticker.to_string(),
            period: "2023-Q4".to_string(),
            updated: false,
        })
    }

    #[test]
    fn test_record_and_counts() {
        let mut summary = RunSummary::start();
        summary.record(success("TLKM"));
        summary.record(failure("XYZ", Stage::Download, "not found"));
        summary.record(success("BBCA"));
        summary.record(failure("ABC", Stage::Parse, "missing required fact: total assets"));
        summary.finish(vec!["ASII".to_string()]);

        assert_eq!(summary.total(), 5);
        assert_eq!(summary.succeeded[0].ticker, "BBCA");
        assert_eq!(summary.failed[0].ticker, "ABC");
        assert!(summary.was_cancelled());

        let by_stage = summary.failures_by_stage();
        assert_eq!(by_stage.get(&Stage::Download), Some(&1));
        assert_eq!(by_stage.get(&Stage::Parse), Some(&1));
        assert_eq!(by_stage.get(&Stage::Persist), None);
    }

    #[test]
    fn test_ascii_table() {
        let mut summary = RunSummary::start();
        summary.record(failure("XYZ", Stage::Download, "not found"));
        summary.finish(Vec::new());

        let table = summary.to_ascii_table();
        assert!(table.contains("IDX XBRL Run Summary"));
        assert!(table.contains("XYZ"));
        assert!(table.contains("download"));
        assert!(table.contains("not found"));
        assert!(!table.contains("Skipped:"));
    }

    #[test]
    fn test_failure_serialization() {
        let outcome = failure("XYZ", Stage::Download, "not found");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["ticker"], "XYZ");
        assert_eq!(json["stage"], "download");
        assert_eq!(json["reason"], "not found");
    }
}
