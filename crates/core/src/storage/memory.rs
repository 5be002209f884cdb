use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::domain::records::{DailyRecord, SectorSummary};
use crate::storage::{last_per_key, IngestRun, MarketStore, RecordFilter};

type RecordKey = (String, NaiveDate, String);

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<RecordKey, DailyRecord>,
    summaries: BTreeMap<(String, NaiveDate), SectorSummary>,
    ingest_runs: Vec<IngestRun>,
}

/// Process-local store with the same upsert semantics as the Postgres schema.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_records(records: &[DailyRecord]) -> anyhow::Result<Self> {
        let store = Self::new();
        store.upsert_records(records).await?;
        Ok(store)
    }

    pub async fn ingest_runs(&self) -> Vec<IngestRun> {
        self.inner.read().await.ingest_runs.clone()
    }
}

#[async_trait::async_trait]
impl MarketStore for InMemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn latest_date(&self, sector: Option<&str>) -> anyhow::Result<Option<NaiveDate>> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .values()
            .filter(|r| sector.map_or(true, |s| r.sector == s))
            .map(|r| r.date)
            .max())
    }

    async fn previous_date(&self, before: NaiveDate) -> anyhow::Result<Option<NaiveDate>> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .values()
            .map(|r| r.date)
            .filter(|d| *d < before)
            .max())
    }

    async fn sectors(&self) -> anyhow::Result<Vec<String>> {
        let inner = self.inner.read().await;
        let set: BTreeSet<&str> = inner.records.values().map(|r| r.sector.as_str()).collect();
        Ok(set.into_iter().map(str::to_string).collect())
    }

    async fn dates(&self) -> anyhow::Result<Vec<NaiveDate>> {
        let inner = self.inner.read().await;
        let set: BTreeSet<NaiveDate> = inner.records.values().map(|r| r.date).collect();
        Ok(set.into_iter().rev().collect())
    }

    async fn records(&self, filter: &RecordFilter) -> anyhow::Result<Vec<DailyRecord>> {
        let inner = self.inner.read().await;
        let mut out: Vec<DailyRecord> = inner
            .records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            a.sector
                .cmp(&b.sector)
                .then_with(|| a.symbol.cmp(&b.symbol))
                .then_with(|| a.date.cmp(&b.date))
        });
        Ok(out)
    }

    async fn upsert_records(&self, records: &[DailyRecord]) -> anyhow::Result<u64> {
        let records = last_per_key(records);
        let mut inner = self.inner.write().await;
        for rec in &records {
            let (sector, date, symbol) = rec.key();
            let key = (sector.to_string(), date, symbol.to_string());
            let mut rec = (*rec).clone();
            rec.sector = key.0.clone();
            rec.symbol = key.2.clone();
            inner.records.insert(key, rec);
        }
        Ok(records.len() as u64)
    }

    async fn upsert_sector_summaries(&self, summaries: &[SectorSummary]) -> anyhow::Result<u64> {
        let mut inner = self.inner.write().await;
        for s in summaries {
            inner
                .summaries
                .insert((s.sector.clone(), s.date), s.clone());
        }
        Ok(summaries.len() as u64)
    }

    async fn sector_summaries(&self, date: NaiveDate) -> anyhow::Result<Vec<SectorSummary>> {
        let inner = self.inner.read().await;
        Ok(inner
            .summaries
            .values()
            .filter(|s| s.date == date)
            .cloned()
            .collect())
    }

    async fn record_ingest_run(&self, run: &IngestRun) -> anyhow::Result<()> {
        self.inner.write().await.ingest_runs.push(run.clone());
        Ok(())
    }
}
