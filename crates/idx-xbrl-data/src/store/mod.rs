//! Persistence of financial report records.

pub mod sqlite;

pub use sqlite::{SqliteReportStore, StoreStats};

use crate::error::Result;
use crate::model::FinancialReport;
use std::sync::Arc;

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No record existed for the key
    Inserted,
    /// A record for the key was overwritten
    Updated,
}

/// A document store receiving one record per (ticker, period).
///
/// Calls are blocking; async callers should use `spawn_blocking`.
pub trait ReportSink: Send + Sync {
    /// Verify the store is reachable and writable.
    fn check(&self) -> Result<()>;

    /// Insert the record, or overwrite the one with the same key.
    fn upsert(&self, report: &FinancialReport) -> Result<UpsertOutcome>;
}

impl<S: ReportSink + ?Sized> ReportSink for Arc<S> {
    fn check(&self) -> Result<()> {
        (**self).check()
    }

    fn upsert(&self, report: &FinancialReport) -> Result<UpsertOutcome> {
        (**self).upsert(report)
    }
}
