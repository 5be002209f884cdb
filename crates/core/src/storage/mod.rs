//! Data-access context for daily market records.
//!
//! Every computation receives a `&dyn MarketStore` explicitly; there is no process-global
//! connection. [`postgres::PgMarketStore`] backs production, [`memory::InMemoryStore`] backs demo
//! mode and tests.

pub mod lock;
pub mod memory;
pub mod postgres;

use std::collections::HashSet;

use anyhow::Context;
use chrono::NaiveDate;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::records::{DailyRecord, SectorSummary};

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}

/// Inclusive date range and optional sector restriction for [`MarketStore::records`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub sector: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl RecordFilter {
    pub fn on(date: NaiveDate) -> Self {
        Self {
            sector: None,
            from: Some(date),
            to: Some(date),
        }
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            sector: None,
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn matches(&self, rec: &DailyRecord) -> bool {
        self.sector.as_deref().map_or(true, |s| rec.sector == s)
            && self.from.map_or(true, |d| rec.date >= d)
            && self.to.map_or(true, |d| rec.date <= d)
    }
}

/// Drops earlier rows that share a [`DailyRecord::key`] with a later one, keeping input order
/// otherwise. A single upsert statement may not touch the same row twice.
pub fn last_per_key(records: &[DailyRecord]) -> Vec<&DailyRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut out: Vec<&DailyRecord> = records
        .iter()
        .rev()
        .filter(|r| seen.insert(r.key()))
        .collect();
    out.reverse();
    out
}

#[derive(Debug, Clone)]
pub struct IngestRun {
    pub id: Uuid,
    pub as_of_date: NaiveDate,
    pub provider: String,
    pub sector: String,
    pub status: IngestStatus,
    pub error: Option<String>,
    pub records_written: u64,
    pub raw_response: Option<Value>,
}

impl IngestRun {
    pub fn success(
        as_of_date: NaiveDate,
        provider: &str,
        sector: &str,
        records_written: u64,
        raw_response: Option<Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            as_of_date,
            provider: provider.to_string(),
            sector: sector.to_string(),
            status: IngestStatus::Success,
            error: None,
            records_written,
            raw_response,
        }
    }

    pub fn failure(as_of_date: NaiveDate, provider: &str, sector: &str, error: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            as_of_date,
            provider: provider.to_string(),
            sector: sector.to_string(),
            status: IngestStatus::Error,
            error: Some(error),
            records_written: 0,
            raw_response: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStatus {
    Success,
    Error,
}

impl IngestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IngestStatus::Success => "success",
            IngestStatus::Error => "error",
        }
    }
}

#[async_trait::async_trait]
pub trait MarketStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Most recent trade date, optionally within one sector.
    async fn latest_date(&self, sector: Option<&str>) -> anyhow::Result<Option<NaiveDate>>;

    /// Most recent trade date strictly before `before`.
    async fn previous_date(&self, before: NaiveDate) -> anyhow::Result<Option<NaiveDate>>;

    /// Distinct sector names, ascending.
    async fn sectors(&self) -> anyhow::Result<Vec<String>>;

    /// Distinct trade dates, newest first.
    async fn dates(&self) -> anyhow::Result<Vec<NaiveDate>>;

    /// Matching records ordered by sector, symbol, date.
    async fn records(&self, filter: &RecordFilter) -> anyhow::Result<Vec<DailyRecord>>;

    /// Inserts or replaces records by (sector, date, symbol). Returns rows written.
    async fn upsert_records(&self, records: &[DailyRecord]) -> anyhow::Result<u64>;

    /// Inserts or replaces summaries by (sector, date). Returns rows written.
    async fn upsert_sector_summaries(&self, summaries: &[SectorSummary]) -> anyhow::Result<u64>;

    /// Previously stored summaries for `date`, ordered by sector.
    async fn sector_summaries(&self, date: NaiveDate) -> anyhow::Result<Vec<SectorSummary>>;

    async fn record_ingest_run(&self, run: &IngestRun) -> anyhow::Result<()>;
}
