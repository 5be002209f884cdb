use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use sectorflow_core::config::AnalysisConfig;
use sectorflow_core::domain::records::SectorSummary;
use sectorflow_core::domain::results::{
    SectorAnalysis, SectorFirstMovers, SectorMomentum, SectorRanking, SectorSortField,
    SectorTimeseries, SectorTrends, SortOrder, StockRanking, StockSortField, TopStocks,
    TradingSignal,
};
use sectorflow_core::ingest::parse_sector_list;
use sectorflow_core::service;
use sectorflow_core::storage::MarketStore;

use crate::error::ApiError;

const DEFAULT_SERIES_DAYS: i64 = 30;

#[derive(Clone)]
pub struct AppState {
    pub store: Option<Arc<dyn MarketStore>>,
    pub config: AnalysisConfig,
    pub benchmark_sector: String,
}

impl AppState {
    fn store(&self) -> Result<&dyn MarketStore, ApiError> {
        self.store.as_deref().ok_or(ApiError::Unavailable)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/sectors", get(get_sectors))
        .route("/api/dates", get(get_dates))
        .route("/api/sector-momentum", get(get_sector_momentum))
        .route("/api/sector-ranking", get(get_sector_ranking))
        .route("/api/sector-trends", get(get_sector_trends))
        .route("/api/top-stocks/:sector", get(get_top_stocks))
        .route("/api/first-movers", get(get_first_movers))
        .route("/api/sector-daily", get(get_sector_daily))
        .route("/api/stock-ranking", get(get_stock_ranking))
        .route("/api/trading-signal", get(get_trading_signal))
        .route("/api/sector-analysis", get(get_sector_analysis))
        .route(
            "/api/sector-summaries/:date",
            get(get_sector_summaries).post(refresh_sector_summaries),
        )
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::invalid(format!("date must be YYYY-MM-DD (got {s:?})"))),
    }
}

fn validated(cfg: AnalysisConfig) -> Result<AnalysisConfig, ApiError> {
    cfg.validate().map_err(|e| ApiError::invalid(e.to_string()))?;
    Ok(cfg)
}

#[derive(Debug, Serialize)]
struct SectorsResponse {
    sectors: Vec<String>,
}

async fn get_sectors(State(state): State<AppState>) -> Result<Json<SectorsResponse>, ApiError> {
    let sectors = service::list_sectors(state.store()?).await?;
    Ok(Json(SectorsResponse { sectors }))
}

#[derive(Debug, Serialize)]
struct DatesResponse {
    dates: Vec<NaiveDate>,
}

async fn get_dates(State(state): State<AppState>) -> Result<Json<DatesResponse>, ApiError> {
    let dates = service::list_dates(state.store()?).await?;
    Ok(Json(DatesResponse { dates }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SectorMomentumQuery {
    date: Option<String>,
    search: Option<String>,
    sort_by: Option<SectorSortField>,
    order: Option<SortOrder>,
}

async fn get_sector_momentum(
    State(state): State<AppState>,
    Query(q): Query<SectorMomentumQuery>,
) -> Result<Json<SectorMomentum>, ApiError> {
    let out = service::sector_momentum(
        state.store()?,
        parse_date(q.date.as_deref())?,
        q.search.as_deref(),
        q.sort_by.unwrap_or_default(),
        q.order.unwrap_or_default(),
    )
    .await?;
    Ok(Json(out))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SectorRankingQuery {
    date: Option<String>,
    window: Option<usize>,
    threshold: Option<f64>,
}

async fn get_sector_ranking(
    State(state): State<AppState>,
    Query(q): Query<SectorRankingQuery>,
) -> Result<Json<SectorRanking>, ApiError> {
    let mut cfg = state.config.clone();
    if let Some(w) = q.window {
        cfg.window_days = w;
    }
    if let Some(t) = q.threshold {
        cfg.threshold = t;
    }
    let cfg = validated(cfg)?;

    let out = service::sector_ranking(state.store()?, &cfg, parse_date(q.date.as_deref())?).await?;
    Ok(Json(out))
}

#[derive(Debug, Default, Deserialize)]
struct DateQuery {
    date: Option<String>,
}

async fn get_sector_trends(
    State(state): State<AppState>,
    Query(q): Query<DateQuery>,
) -> Result<Json<SectorTrends>, ApiError> {
    let out = service::sector_trends(state.store()?, parse_date(q.date.as_deref())?).await?;
    Ok(Json(out))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopStocksQuery {
    date: Option<String>,
    sort_field: Option<StockSortField>,
    order: Option<SortOrder>,
    limit: Option<usize>,
}

async fn get_top_stocks(
    State(state): State<AppState>,
    Path(sector): Path<String>,
    Query(q): Query<TopStocksQuery>,
) -> Result<Json<TopStocks>, ApiError> {
    let mut cfg = state.config.clone();
    if let Some(f) = q.sort_field {
        cfg.sort_field = f;
    }
    if let Some(o) = q.order {
        cfg.order = o;
    }
    if let Some(l) = q.limit {
        cfg.top_n = l;
    }

    let out = service::top_stocks(
        state.store()?,
        &cfg,
        Some(sector.as_str()),
        parse_date(q.date.as_deref())?,
    )
    .await?;
    Ok(Json(out))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FirstMoversQuery {
    sectors: Option<String>,
    days_back: Option<i64>,
    top_n: Option<usize>,
}

async fn get_first_movers(
    State(state): State<AppState>,
    Query(q): Query<FirstMoversQuery>,
) -> Result<Json<Vec<SectorFirstMovers>>, ApiError> {
    let mut cfg = state.config.clone();
    if let Some(d) = q.days_back {
        cfg.history_days = d;
    }
    if let Some(n) = q.top_n {
        cfg.top_n = n;
    }
    let cfg = validated(cfg)?;

    let sectors = parse_sector_list(q.sectors.as_deref());
    let out = service::first_movers(state.store()?, &cfg, sectors).await?;
    Ok(Json(out))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SectorDailyQuery {
    sector: Option<String>,
    days_back: Option<i64>,
}

async fn get_sector_daily(
    State(state): State<AppState>,
    Query(q): Query<SectorDailyQuery>,
) -> Result<Json<SectorTimeseries>, ApiError> {
    let out = service::sector_timeseries(
        state.store()?,
        q.sector.as_deref(),
        q.days_back.unwrap_or(DEFAULT_SERIES_DAYS),
    )
    .await?;
    Ok(Json(out))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StockRankingQuery {
    sector: Option<String>,
    date: Option<String>,
    window: Option<usize>,
    volume_threshold: Option<f64>,
    benchmark_change: Option<f64>,
}

async fn get_stock_ranking(
    State(state): State<AppState>,
    Query(q): Query<StockRankingQuery>,
) -> Result<Json<StockRanking>, ApiError> {
    let mut cfg = state.config.clone();
    if let Some(w) = q.window {
        cfg.window_days = w;
    }
    if let Some(v) = q.volume_threshold {
        cfg.volume_threshold = v;
    }
    let cfg = validated(cfg)?;

    let out = service::stock_ranking(
        state.store()?,
        &cfg,
        q.sector.as_deref(),
        parse_date(q.date.as_deref())?,
        q.benchmark_change,
        &state.benchmark_sector,
    )
    .await?;
    Ok(Json(out))
}

#[derive(Debug, Default, Deserialize)]
struct TradingSignalQuery {
    date: Option<String>,
    threshold: Option<f64>,
}

async fn get_trading_signal(
    State(state): State<AppState>,
    Query(q): Query<TradingSignalQuery>,
) -> Result<Json<TradingSignal>, ApiError> {
    let mut cfg = state.config.clone();
    if let Some(t) = q.threshold {
        cfg.threshold = t;
    }
    let cfg = validated(cfg)?;

    let out = service::trading_signal(state.store()?, &cfg, parse_date(q.date.as_deref())?).await?;
    Ok(Json(out))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SectorAnalysisQuery {
    days_back: Option<i64>,
}

async fn get_sector_analysis(
    State(state): State<AppState>,
    Query(q): Query<SectorAnalysisQuery>,
) -> Result<Json<SectorAnalysis>, ApiError> {
    let mut cfg = state.config.clone();
    if let Some(d) = q.days_back {
        cfg.history_days = d;
    }
    let cfg = validated(cfg)?;

    let out = service::sector_analysis(state.store()?, &cfg).await?;
    Ok(Json(out))
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    date: NaiveDate,
    written: u64,
}

async fn refresh_sector_summaries(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let date = parse_date(Some(&date))?.ok_or(ApiError::invalid("date is required"))?;
    let written = service::refresh_sector_summaries(state.store()?, date).await?;
    Ok(Json(RefreshResponse { date, written }))
}

async fn get_sector_summaries(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<Vec<SectorSummary>>, ApiError> {
    let date = parse_date(Some(&date))?.ok_or(ApiError::invalid("date is required"))?;
    let out = service::stored_sector_summaries(state.store()?, date).await?;
    Ok(Json(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_optional_dates() {
        assert_eq!(parse_date(None).unwrap(), None);
        assert_eq!(parse_date(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_date(Some("2024-01-05")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5)
        );
        assert!(parse_date(Some("05-01-2024")).is_err());
    }

    #[test]
    fn rejects_zero_window_override() {
        let cfg = AnalysisConfig {
            window_days: 0,
            ..AnalysisConfig::default()
        };
        assert!(validated(cfg).is_err());
    }

    #[test]
    fn rejects_huge_days_back_override() {
        let cfg = AnalysisConfig {
            history_days: 100_000_000,
            ..AnalysisConfig::default()
        };
        let err = validated(cfg).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn query_fields_are_camel_case() {
        let q: TopStocksQuery =
            serde_json::from_value(serde_json::json!({"sortField": "turnover", "order": "asc", "limit": 5}))
                .unwrap();
        assert_eq!(q.sort_field, Some(StockSortField::Turnover));
        assert_eq!(q.order, Some(SortOrder::Asc));
        assert_eq!(q.limit, Some(5));
    }

    #[tokio::test]
    async fn data_endpoints_are_unavailable_without_store() {
        let state = AppState {
            store: None,
            config: AnalysisConfig::default(),
            benchmark_sector: "NIFTY 50".to_string(),
        };
        let err = get_sectors(State(state)).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
