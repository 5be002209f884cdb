use anyhow::Context;
use clap::{Parser, Subcommand};
use sectorflow_core::config::Settings;
use sectorflow_core::ingest::provider::NseHttpProvider;
use sectorflow_core::ingest::sample::{sample_records, SAMPLE_SYMBOLS};
use sectorflow_core::ingest::sectors_from_env;
use sectorflow_core::storage::lock::TradeDateLock;
use sectorflow_core::storage::postgres::PgMarketStore;
use sectorflow_core::storage::MarketStore;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod ingest;

#[derive(Debug, Parser)]
#[command(name = "sectorflow_worker")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch sector index constituents and upsert them as daily records.
    Ingest {
        /// Fallback trade date (YYYY-MM-DD) when the payload carries none. Defaults to the last
        /// completed NSE session.
        #[arg(long)]
        as_of_date: Option<String>,

        /// Fetch and parse without writing to the database.
        #[arg(long)]
        dry_run: bool,
    },

    /// Write deterministic sample records ending at the as-of date.
    SeedSample {
        #[arg(long)]
        as_of_date: Option<String>,

        /// Number of trade dates to generate.
        #[arg(long, default_value_t = 30)]
        days: usize,

        #[arg(long)]
        dry_run: bool,
    },

    /// Recompute and store sector summaries for one trade date.
    Summarize {
        #[arg(long)]
        as_of_date: Option<String>,

        /// Compute summaries without storing them.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = match args.command {
        Command::Ingest {
            as_of_date,
            dry_run,
        } => run_ingest(&settings, as_of_date.as_deref(), dry_run).await,
        Command::SeedSample {
            as_of_date,
            days,
            dry_run,
        } => run_seed_sample(&settings, as_of_date.as_deref(), days, dry_run).await,
        Command::Summarize {
            as_of_date,
            dry_run,
        } => run_summarize(&settings, as_of_date.as_deref(), dry_run).await,
    };

    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %err, "worker run failed");
    }
    result
}

fn resolve_as_of_date(arg: Option<&str>) -> anyhow::Result<chrono::NaiveDate> {
    sectorflow_core::time::market::resolve_as_of_date(arg, chrono::Utc::now())
}

async fn connect(settings: &Settings) -> anyhow::Result<PgMarketStore> {
    let db_url = settings.require_database_url()?;
    PgMarketStore::connect(db_url).await
}

async fn run_ingest(settings: &Settings, as_of_date: Option<&str>, dry_run: bool) -> anyhow::Result<()> {
    let as_of_date = resolve_as_of_date(as_of_date)?;
    let sectors = sectors_from_env();
    let provider = NseHttpProvider::from_settings(settings)?;

    let req_delay_ms = std::env::var("INGEST_REQ_DELAY_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(500);
    let req_delay = Duration::from_millis(req_delay_ms);

    let store = if dry_run { None } else { Some(connect(settings).await?) };
    let outcome = ingest::ingest_sectors(
        &provider,
        store.as_ref().map(|s| s as &dyn MarketStore),
        &sectors,
        as_of_date,
        req_delay,
    )
    .await?;

    tracing::info!(
        %as_of_date,
        dry_run,
        sectors_ok = outcome.sectors_ok,
        sectors_failed = outcome.sectors_failed,
        records_written = outcome.records_written,
        "ingest finished"
    );

    if let Some(store) = store {
        store.close().await;
    }
    anyhow::ensure!(outcome.sectors_ok > 0, "every sector fetch failed");
    Ok(())
}

async fn run_seed_sample(
    settings: &Settings,
    as_of_date: Option<&str>,
    days: usize,
    dry_run: bool,
) -> anyhow::Result<()> {
    anyhow::ensure!((1..=750).contains(&days), "days must be 1..=750 (got {days})");
    let as_of_date = resolve_as_of_date(as_of_date)?;
    let records = sample_records(&sectors_from_env(), SAMPLE_SYMBOLS, as_of_date, days);

    if dry_run {
        tracing::info!(%as_of_date, days, records = records.len(), dry_run = true, "sample data generated");
        return Ok(());
    }

    let store = connect(settings).await?;
    let written = store
        .upsert_records(&records)
        .await
        .context("sample upsert failed")?;
    tracing::info!(%as_of_date, days, written, "sample data seeded");
    store.close().await;
    Ok(())
}

async fn run_summarize(settings: &Settings, as_of_date: Option<&str>, dry_run: bool) -> anyhow::Result<()> {
    let as_of_date = resolve_as_of_date(as_of_date)?;
    let store = connect(settings).await?;

    if dry_run {
        let records = store
            .records(&sectorflow_core::storage::RecordFilter::on(as_of_date))
            .await?;
        let summaries = sectorflow_core::analytics::summary::summarize(&records);
        for s in &summaries {
            tracing::info!(
                sector = %s.sector,
                avg_change_percent = s.avg_change_percent,
                total_volume = s.total_volume,
                records = s.record_count,
                "summary (dry-run)"
            );
        }
        store.close().await;
        return Ok(());
    }

    let Some(lock) = TradeDateLock::try_acquire(store.pool(), as_of_date).await? else {
        tracing::warn!(%as_of_date, "trade date lock not acquired; another summarize run in progress");
        store.close().await;
        return Ok(());
    };

    let result = sectorflow_core::service::refresh_sector_summaries(&store, as_of_date).await;

    if let Err(err) = lock.release().await {
        tracing::warn!(error = %err, "trade date lock release failed");
    }
    store.close().await;

    let written = result?;
    tracing::info!(%as_of_date, written, "sector summaries stored");
    Ok(())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let args = Args::parse_from(["sectorflow_worker", "seed-sample", "--days", "10", "--dry-run"]);
        match args.command {
            Command::SeedSample { days, dry_run, as_of_date } => {
                assert_eq!(days, 10);
                assert!(dry_run);
                assert!(as_of_date.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let args = Args::parse_from(["sectorflow_worker", "summarize", "--as-of-date", "2024-05-10"]);
        assert!(matches!(
            args.command,
            Command::Summarize { as_of_date: Some(ref d), dry_run: false } if d == "2024-05-10"
        ));
    }
}
