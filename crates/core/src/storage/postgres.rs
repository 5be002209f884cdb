use anyhow::Context;
use chrono::{NaiveDate, Utc};

use crate::domain::records::{DailyRecord, SectorSummary};
use crate::storage::{last_per_key, IngestRun, MarketStore, RecordFilter};

type RecordRow = (
    String,
    String,
    NaiveDate,
    f64,
    f64,
    f64,
    f64,
    i64,
    f64,
    f64,
);

type SummaryRow = (String, NaiveDate, f64, i64, f64, i64);

#[derive(Debug, Clone)]
pub struct PgMarketStore {
    pool: sqlx::PgPool,
    batch_size: usize,
}

impl PgMarketStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        let batch_size = std::env::var("DAILY_RECORDS_UPSERT_BATCH")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n >= 1)
            .unwrap_or(200);
        Self { pool, batch_size }
    }

    /// Opens a pool and runs migrations.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("connect DATABASE_URL failed")?;
        crate::storage::migrate(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn record_from_row(row: RecordRow) -> DailyRecord {
    let (sector, symbol, date, open, high, low, close, volume, turnover, change_percent) = row;
    DailyRecord {
        sector,
        symbol,
        date,
        open,
        high,
        low,
        close,
        volume,
        turnover,
        change_percent,
    }
}

fn summary_from_row(row: SummaryRow) -> SectorSummary {
    let (sector, date, avg_change_percent, total_volume, total_turnover, record_count) = row;
    SectorSummary {
        sector,
        date,
        avg_change_percent,
        total_volume,
        total_turnover,
        record_count,
    }
}

#[async_trait::async_trait]
impl MarketStore for PgMarketStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn latest_date(&self, sector: Option<&str>) -> anyhow::Result<Option<NaiveDate>> {
        let latest: Option<NaiveDate> = sqlx::query_scalar(
            "SELECT MAX(trade_date) FROM daily_records \
             WHERE ($1::text IS NULL OR sector = $1)",
        )
        .persistent(false)
        .bind(sector)
        .fetch_one(&self.pool)
        .await
        .context("select latest trade_date failed")?;
        Ok(latest)
    }

    async fn previous_date(&self, before: NaiveDate) -> anyhow::Result<Option<NaiveDate>> {
        let prev: Option<NaiveDate> = sqlx::query_scalar(
            "SELECT MAX(trade_date) FROM daily_records WHERE trade_date < $1",
        )
        .persistent(false)
        .bind(before)
        .fetch_one(&self.pool)
        .await
        .context("select previous trade_date failed")?;
        Ok(prev)
    }

    async fn sectors(&self) -> anyhow::Result<Vec<String>> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT sector FROM daily_records ORDER BY sector ASC")
                .persistent(false)
                .fetch_all(&self.pool)
                .await
                .context("select distinct sectors failed")?;
        Ok(rows)
    }

    async fn dates(&self) -> anyhow::Result<Vec<NaiveDate>> {
        let rows: Vec<NaiveDate> = sqlx::query_scalar(
            "SELECT DISTINCT trade_date FROM daily_records ORDER BY trade_date DESC",
        )
        .persistent(false)
        .fetch_all(&self.pool)
        .await
        .context("select distinct dates failed")?;
        Ok(rows)
    }

    async fn records(&self, filter: &RecordFilter) -> anyhow::Result<Vec<DailyRecord>> {
        let rows = sqlx::query_as::<_, RecordRow>(
            "SELECT sector, symbol, trade_date, open, high, low, close, volume, turnover, change_percent \
             FROM daily_records \
             WHERE ($1::text IS NULL OR sector = $1) \
               AND ($2::date IS NULL OR trade_date >= $2) \
               AND ($3::date IS NULL OR trade_date <= $3) \
             ORDER BY sector ASC, symbol ASC, trade_date ASC",
        )
        .persistent(false)
        .bind(filter.sector.as_deref())
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.pool)
        .await
        .context("select daily_records failed")?;

        Ok(rows.into_iter().map(record_from_row).collect())
    }

    async fn upsert_records(&self, records: &[DailyRecord]) -> anyhow::Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let records = last_per_key(records);
        let mut tx = self.pool.begin().await.context("begin transaction failed")?;

        let mut affected: u64 = 0;
        for (batch_idx, chunk) in records.chunks(self.batch_size).enumerate() {
            let t0 = std::time::Instant::now();
            let mut qb = sqlx::QueryBuilder::new(
                "INSERT INTO daily_records \
                 (sector, trade_date, symbol, open, high, low, close, volume, turnover, change_percent) ",
            );
            qb.push_values(chunk, |mut b, rec| {
                b.push_bind(rec.sector.trim())
                    .push_bind(rec.date)
                    .push_bind(rec.symbol.trim())
                    .push_bind(rec.open)
                    .push_bind(rec.high)
                    .push_bind(rec.low)
                    .push_bind(rec.close)
                    .push_bind(rec.volume)
                    .push_bind(rec.turnover)
                    .push_bind(rec.change_percent);
            });
            qb.push(
                " ON CONFLICT (sector, trade_date, symbol) DO UPDATE \
                   SET open = EXCLUDED.open, high = EXCLUDED.high, low = EXCLUDED.low, \
                       close = EXCLUDED.close, volume = EXCLUDED.volume, \
                       turnover = EXCLUDED.turnover, change_percent = EXCLUDED.change_percent",
            );

            let res = qb
                .build()
                .persistent(false)
                .execute(&mut *tx)
                .await
                .context("batch upsert daily_records failed")?;
            affected += res.rows_affected();

            tracing::debug!(
                batch_idx,
                batch_size = chunk.len(),
                elapsed_ms = t0.elapsed().as_millis(),
                "daily_records batch upsert"
            );
        }

        tx.commit().await.context("commit transaction failed")?;
        Ok(affected)
    }

    async fn upsert_sector_summaries(&self, summaries: &[SectorSummary]) -> anyhow::Result<u64> {
        if summaries.is_empty() {
            return Ok(0);
        }

        let computed_at = Utc::now();
        let mut qb = sqlx::QueryBuilder::new(
            "INSERT INTO sector_summaries \
             (sector, trade_date, avg_change_percent, total_volume, total_turnover, record_count, computed_at) ",
        );
        qb.push_values(summaries, |mut b, s| {
            b.push_bind(&s.sector)
                .push_bind(s.date)
                .push_bind(s.avg_change_percent)
                .push_bind(s.total_volume)
                .push_bind(s.total_turnover)
                .push_bind(s.record_count)
                .push_bind(computed_at);
        });
        qb.push(
            " ON CONFLICT (sector, trade_date) DO UPDATE \
               SET avg_change_percent = EXCLUDED.avg_change_percent, \
                   total_volume = EXCLUDED.total_volume, \
                   total_turnover = EXCLUDED.total_turnover, \
                   record_count = EXCLUDED.record_count, \
                   computed_at = EXCLUDED.computed_at",
        );

        let res = qb
            .build()
            .persistent(false)
            .execute(&self.pool)
            .await
            .context("upsert sector_summaries failed")?;
        Ok(res.rows_affected())
    }

    async fn sector_summaries(&self, date: NaiveDate) -> anyhow::Result<Vec<SectorSummary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            "SELECT sector, trade_date, avg_change_percent, total_volume, total_turnover, record_count \
             FROM sector_summaries \
             WHERE trade_date = $1 \
             ORDER BY sector ASC",
        )
        .persistent(false)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .context("select sector_summaries failed")?;

        Ok(rows.into_iter().map(summary_from_row).collect())
    }

    async fn record_ingest_run(&self, run: &IngestRun) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO ingest_runs \
             (id, as_of_date, generated_at, provider, sector, status, error, records_written, raw_response) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .persistent(false)
        .bind(run.id)
        .bind(run.as_of_date)
        .bind(Utc::now())
        .bind(&run.provider)
        .bind(&run.sector)
        .bind(run.status.as_str())
        .bind(run.error.as_deref())
        .bind(run.records_written as i64)
        .bind(&run.raw_response)
        .execute(&self.pool)
        .await
        .context("insert ingest_runs failed")?;

        Ok(())
    }
}
