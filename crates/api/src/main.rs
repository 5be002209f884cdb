use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sectorflow_core::config::{AnalysisConfig, Settings};
use sectorflow_core::ingest::sample::{sample_records, SAMPLE_SYMBOLS};
use sectorflow_core::ingest::sectors_from_env;
use sectorflow_core::storage::memory::InMemoryStore;
use sectorflow_core::storage::postgres::PgMarketStore;
use sectorflow_core::storage::MarketStore;

mod error;
mod routes;

const DEMO_HISTORY_DAYS: usize = 60;

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

    let config = AnalysisConfig::from_env();
    config.validate()?;

    let store = open_store(&settings).await;
    if let Some(store) = &store {
        tracing::info!(backend = store.backend_name(), "data store ready");
    }

    let state = routes::AppState {
        store,
        config,
        benchmark_sector: settings.benchmark_sector.clone(),
    };

    let app = routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Postgres when reachable, a seeded in-memory store in demo mode, otherwise `None` (degraded
/// mode: data endpoints answer 503).
async fn open_store(settings: &Settings) -> Option<Arc<dyn MarketStore>> {
    if settings.demo_mode {
        return match demo_store().await {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(error = %e, "demo store seeding failed; starting API in degraded mode");
                None
            }
        };
    }

    let db_url = match settings.require_database_url() {
        Ok(url) => url,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            return None;
        }
    };

    match PgMarketStore::connect(db_url).await {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "db connect failed; starting API in degraded mode");
            None
        }
    }
}

async fn demo_store() -> anyhow::Result<InMemoryStore> {
    let end = sectorflow_core::time::market::resolve_as_of_date(None, chrono::Utc::now())?;
    let records = sample_records(&sectors_from_env(), SAMPLE_SYMBOLS, end, DEMO_HISTORY_DAYS);
    tracing::info!(%end, records = records.len(), "seeding in-memory demo store");
    InMemoryStore::with_records(&records).await
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
