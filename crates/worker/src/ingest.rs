use std::time::Duration;

use chrono::NaiveDate;
use sectorflow_core::ingest::provider::IndexDataProvider;
use sectorflow_core::storage::{IngestRun, MarketStore};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    pub sectors_ok: usize,
    pub sectors_failed: usize,
    pub records_written: u64,
}

/// Fetches every sector and upserts its rows. A failing sector is logged and recorded as an
/// error run; the remaining sectors still run. With `store == None` nothing is written.
pub async fn ingest_sectors(
    provider: &dyn IndexDataProvider,
    store: Option<&dyn MarketStore>,
    sectors: &[String],
    as_of_date: NaiveDate,
    req_delay: Duration,
) -> anyhow::Result<IngestOutcome> {
    anyhow::ensure!(!sectors.is_empty(), "sector list must be non-empty");

    let provider_name = provider.provider_name();
    let mut outcome = IngestOutcome::default();

    for (i, sector) in sectors.iter().enumerate() {
        if i > 0 && !req_delay.is_zero() {
            tokio::time::sleep(req_delay).await;
        }

        let (records, raw) = match provider.fetch_sector(sector, as_of_date).await {
            Ok(out) => out,
            Err(err) => {
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(%sector, error = %err, "sector fetch failed");
                outcome.sectors_failed += 1;
                if let Some(store) = store {
                    let run = IngestRun::failure(as_of_date, provider_name, sector, format!("{err:#}"));
                    store.record_ingest_run(&run).await?;
                }
                continue;
            }
        };

        let Some(store) = store else {
            tracing::info!(%sector, records = records.len(), dry_run = true, "sector fetched");
            outcome.sectors_ok += 1;
            continue;
        };

        let written = store.upsert_records(&records).await?;
        let trade_date = records.first().map(|r| r.date).unwrap_or(as_of_date);
        let run = IngestRun::success(trade_date, provider_name, sector, written, Some(raw));
        store.record_ingest_run(&run).await?;

        tracing::info!(%sector, %trade_date, written, "sector ingested");
        outcome.sectors_ok += 1;
        outcome.records_written += written;
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sectorflow_core::domain::records::DailyRecord;
    use sectorflow_core::storage::memory::InMemoryStore;
    use sectorflow_core::storage::{IngestStatus, RecordFilter};
    use serde_json::{json, Value};

    struct FakeProvider;

    #[async_trait::async_trait]
    impl IndexDataProvider for FakeProvider {
        fn provider_name(&self) -> &'static str {
            "fake"
        }

        async fn fetch_sector(
            &self,
            sector: &str,
            fallback_date: NaiveDate,
        ) -> anyhow::Result<(Vec<DailyRecord>, Value)> {
            anyhow::ensure!(sector != "BROKEN", "upstream refused {sector}");
            let rec = DailyRecord {
                sector: sector.to_string(),
                symbol: "AAA".to_string(),
                date: fallback_date,
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 1,
                turnover: 1.0,
                change_percent: 0.5,
            };
            Ok((vec![rec], json!({"sector": sector})))
        }
    }

    fn sectors(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn one_failing_sector_does_not_stop_the_rest() {
        let store = InMemoryStore::new();
        let as_of = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();

        let outcome = ingest_sectors(
            &FakeProvider,
            Some(&store),
            &sectors(&["NIFTY IT", "BROKEN", "NIFTY BANK"]),
            as_of,
            Duration::ZERO,
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            IngestOutcome {
                sectors_ok: 2,
                sectors_failed: 1,
                records_written: 2,
            }
        );
        assert_eq!(store.records(&RecordFilter::on(as_of)).await.unwrap().len(), 2);

        let runs = store.ingest_runs().await;
        assert_eq!(runs.len(), 3);
        let failed: Vec<_> = runs
            .iter()
            .filter(|r| r.status == IngestStatus::Error)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].sector, "BROKEN");
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let as_of = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let outcome = ingest_sectors(&FakeProvider, None, &sectors(&["NIFTY IT"]), as_of, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(outcome.sectors_ok, 1);
        assert_eq!(outcome.records_written, 0);
    }
}
