//! SQLite document store for financial reports.

use super::{ReportSink, UpsertOutcome};
use crate::error::{DataError, Result};
use crate::model::FinancialReport;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// SQLite store keeping each report as a JSON document.
///
/// Records are keyed by `(ticker, period)`; writing the same key again
/// replaces the document and keeps the original `created_at`.
#[derive(Debug)]
pub struct SqliteReportStore {
    conn: Mutex<Connection>,
}

impl SqliteReportStore {
    /// Open (or create) a store.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DataError::Store("connection lock poisoned".to_string()))
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS financial_reports (
                ticker TEXT NOT NULL,
                period TEXT NOT NULL,
                period_end TEXT NOT NULL,
                period_kind TEXT NOT NULL,
                currency TEXT NOT NULL,
                total_assets REAL NOT NULL,
                document TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (ticker, period)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_reports_period_end ON financial_reports(period_end)",
            [],
        )?;

        Ok(())
    }

    /// Get the record for one ticker and period label (`YYYY-Qn`).
    pub fn get_report(&self, ticker: &str, period: &str) -> Result<Option<FinancialReport>> {
        let conn = self.lock()?;
        let document: Option<String> = conn
            .query_row(
                "SELECT document FROM financial_reports WHERE ticker = ?1 AND period = ?2",
                params![ticker, period],
                |row| row.get(0),
            )
            .optional()?;

        document
            .map(|doc| serde_json::from_str(&doc).map_err(DataError::from))
            .transpose()
    }

    /// Get all records for a ticker, latest period first.
    pub fn reports_for_ticker(&self, ticker: &str) -> Result<Vec<FinancialReport>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT document FROM financial_reports
             WHERE ticker = ?1
             ORDER BY period_end DESC",
        )?;

        let rows = stmt.query_map(params![ticker], |row| row.get::<_, String>(0))?;

        let mut reports = Vec::new();
        for row in rows {
            reports.push(serde_json::from_str(&row?)?);
        }

        Ok(reports)
    }

    /// Number of stored records.
    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM financial_reports", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get store statistics.
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.lock()?;

        let (reports, tickers, periods): (i64, i64, i64) = conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT ticker), COUNT(DISTINCT period)
             FROM financial_reports",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let last_updated: Option<String> = conn.query_row(
            "SELECT MAX(updated_at) FROM financial_reports",
            [],
            |row| row.get(0),
        )?;
        let last_updated = last_updated
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|d| d.with_timezone(&Utc))
                    .map_err(|e| DataError::Store(format!("invalid timestamp {s:?}: {e}")))
            })
            .transpose()?;

        Ok(StoreStats {
            reports: reports as usize,
            tickers: tickers as usize,
            periods: periods as usize,
            last_updated,
        })
    }
}

impl ReportSink for SqliteReportStore {
    fn check(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM financial_reports", [], |row| {
            row.get::<_, i64>(0)
        })?;
        Ok(())
    }

    fn upsert(&self, report: &FinancialReport) -> Result<UpsertOutcome> {
        let document = serde_json::to_string(report)?;
        let now = Utc::now().to_rfc3339();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM financial_reports WHERE ticker = ?1 AND period = ?2",
                params![report.ticker, report.period.label],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        tx.execute(
            "INSERT INTO financial_reports (
                ticker, period, period_end, period_kind, currency, total_assets,
                document, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            ON CONFLICT(ticker, period) DO UPDATE SET
                period_end = excluded.period_end,
                period_kind = excluded.period_kind,
                currency = excluded.currency,
                total_assets = excluded.total_assets,
                document = excluded.document,
                updated_at = excluded.updated_at",
            params![
                report.ticker,
                report.period.label,
                report.period.end.to_string(),
                report.period.kind.as_str(),
                report.currency,
                report.items.total_assets,
                document,
                now,
            ],
        )?;
        tx.commit()?;

        let outcome = if exists {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        };
        debug!(ticker = %report.ticker, period = %report.period.label, ?outcome, "stored report");
        Ok(outcome)
    }
}

/// Store statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Total number of records
    pub reports: usize,
    /// Distinct tickers
    pub tickers: usize,
    /// Distinct period labels
    pub periods: usize,
    /// Most recent write
    pub last_updated: Option<DateTime<Utc>>,
}
