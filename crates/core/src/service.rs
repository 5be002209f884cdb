//! Request-scoped entry points: load a bounded window from the store, hand it to the pure
//! analytics, shape the result.

use chrono::{Duration, NaiveDate};

use crate::analytics::{momentum, sector_ranking, signal, slope, summary, technical};
use crate::config::{AnalysisConfig, MAX_HISTORY_DAYS};
use crate::domain::records::{DailyRecord, SectorSummary};
use crate::domain::results::{
    CurrentLeader, SectorAnalysis, SectorDetail, SectorFirstMovers, SectorMomentum,
    SectorRanking, SectorSortField, SectorTimeseries, SectorTrends, SortOrder, StockRanking,
    StockSortField, TopStocks, TradingSignal,
};
use crate::error::{AnalysisError, AnalysisResult};
use crate::storage::{MarketStore, RecordFilter};

pub const MAX_LIMIT: usize = 50;
pub const DEFAULT_FIRST_MOVER_SECTORS: usize = 3;
const ANALYSIS_TOP_STOCKS: usize = 10;
const RANKING_LOOKBACK_FACTOR: usize = 2;

/// `date` if given, otherwise the latest trade date (optionally within `sector`).
pub async fn resolve_date(
    store: &dyn MarketStore,
    date: Option<NaiveDate>,
    sector: Option<&str>,
) -> AnalysisResult<NaiveDate> {
    if let Some(d) = date {
        return Ok(d);
    }
    store.latest_date(sector).await?.ok_or_else(|| {
        AnalysisError::NoDataFound(match sector {
            Some(s) => format!("no records for sector {s}"),
            None => "no records".to_string(),
        })
    })
}

fn checked_config(cfg: &AnalysisConfig) -> AnalysisResult<()> {
    cfg.validate()
        .map_err(|e| AnalysisError::InvalidParameter(format!("{e:#}")))
}

/// `end` minus `days` calendar days, with `days` bounded to `1..=MAX_HISTORY_DAYS`.
fn lookback_start(end: NaiveDate, days: i64) -> AnalysisResult<NaiveDate> {
    if !(1..=MAX_HISTORY_DAYS).contains(&days) {
        return Err(AnalysisError::InvalidParameter(format!(
            "daysBack must be 1..={MAX_HISTORY_DAYS} (got {days})"
        )));
    }
    end.checked_sub_signed(Duration::days(days))
        .ok_or_else(|| AnalysisError::InvalidParameter(format!("daysBack {days} reaches before {end}")))
}

fn require_sector(sector: Option<&str>) -> AnalysisResult<&str> {
    sector
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(AnalysisError::MissingParameter("sector"))
}

pub async fn list_sectors(store: &dyn MarketStore) -> AnalysisResult<Vec<String>> {
    Ok(store.sectors().await?)
}

pub async fn list_dates(store: &dyn MarketStore) -> AnalysisResult<Vec<NaiveDate>> {
    Ok(store.dates().await?)
}

/// Same-day average change/close per sector.
pub async fn sector_momentum(
    store: &dyn MarketStore,
    date: Option<NaiveDate>,
    search: Option<&str>,
    sort_by: SectorSortField,
    order: SortOrder,
) -> AnalysisResult<SectorMomentum> {
    let target_date = resolve_date(store, date, None).await?;
    let records = store.records(&RecordFilter::on(target_date)).await?;
    let sectors = summary::sector_day_momentum(&records, search, sort_by, order);

    tracing::debug!(%target_date, sectors = sectors.len(), "sector momentum computed");
    Ok(SectorMomentum {
        target_date,
        sectors,
    })
}

pub async fn sector_ranking(
    store: &dyn MarketStore,
    cfg: &AnalysisConfig,
    date: Option<NaiveDate>,
) -> AnalysisResult<SectorRanking> {
    checked_config(cfg)?;
    let target = resolve_date(store, date, None).await?;
    let window = cfg.window_days;

    // Twice the window + 1 trade dates on or before the target, so a sector that missed a few
    // sessions still has its own window + 1 points in range.
    let dates: Vec<NaiveDate> = store
        .dates()
        .await?
        .into_iter()
        .filter(|d| *d <= target)
        .take(RANKING_LOOKBACK_FACTOR * (window + 1))
        .collect();
    let Some(from) = dates.last().copied() else {
        return Ok(SectorRanking {
            date: target,
            window_days: window,
            sectors: Vec::new(),
        });
    };

    let records = store.records(&RecordFilter::between(from, target)).await?;
    let series = summary::daily_series_by_sector(&records);
    let sectors = sector_ranking::rank_sectors(&series, target, window, cfg.threshold);

    tracing::debug!(%target, window, ranked = sectors.len(), "sector ranking computed");
    Ok(SectorRanking {
        date: target,
        window_days: window,
        sectors,
    })
}

/// Day-over-day movement of each sector's average change. Needs both the target date and the
/// previous trade date.
pub async fn sector_trends(
    store: &dyn MarketStore,
    date: Option<NaiveDate>,
) -> AnalysisResult<SectorTrends> {
    let target = resolve_date(store, date, None).await?;
    let previous = store
        .previous_date(target)
        .await?
        .ok_or_else(|| AnalysisError::NoDataFound(format!("no trade date before {target}")))?;

    let today = summary::summarize(&store.records(&RecordFilter::on(target)).await?);
    if today.is_empty() {
        return Err(AnalysisError::NoDataFound(format!("no records on {target}")));
    }
    let before = summary::summarize(&store.records(&RecordFilter::on(previous)).await?);

    Ok(SectorTrends {
        date: target,
        previous_date: previous,
        sectors: sector_ranking::sector_trends(&today, &before),
    })
}

/// One day's rows for a sector, sorted by `cfg.sort_field` / `cfg.order`, at most `cfg.top_n`.
pub async fn top_stocks(
    store: &dyn MarketStore,
    cfg: &AnalysisConfig,
    sector: Option<&str>,
    date: Option<NaiveDate>,
) -> AnalysisResult<TopStocks> {
    checked_config(cfg)?;
    let sector = require_sector(sector)?;
    let date = resolve_date(store, date, Some(sector)).await?;

    let mut stocks = store
        .records(&RecordFilter::on(date).sector(sector))
        .await?;
    sort_records(&mut stocks, cfg.sort_field, cfg.order);
    stocks.truncate(cfg.top_n.clamp(1, MAX_LIMIT));

    Ok(TopStocks {
        sector: sector.to_string(),
        date,
        stocks,
    })
}

fn sort_records(records: &mut [DailyRecord], field: StockSortField, order: SortOrder) {
    records.sort_by(|a, b| {
        let ord = match field {
            StockSortField::ChangePercent => a.change_percent.total_cmp(&b.change_percent),
            StockSortField::Close => a.close.total_cmp(&b.close),
            StockSortField::Volume => a.volume.cmp(&b.volume),
            StockSortField::Turnover => a.turnover.total_cmp(&b.turnover),
            StockSortField::Symbol => a.symbol.cmp(&b.symbol),
        };
        let ord = match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        };
        ord.then_with(|| a.symbol.cmp(&b.symbol))
    });
}

/// Momentum leaders per sector over the trailing `cfg.history_days` calendar days. Without an
/// explicit sector list, the top three sectors by same-day average change are used.
pub async fn first_movers(
    store: &dyn MarketStore,
    cfg: &AnalysisConfig,
    sectors: Option<Vec<String>>,
) -> AnalysisResult<Vec<SectorFirstMovers>> {
    checked_config(cfg)?;
    let latest = resolve_date(store, None, None).await?;

    let sectors = match sectors.filter(|s| !s.is_empty()) {
        Some(s) => s,
        None => {
            let day = store.records(&RecordFilter::on(latest)).await?;
            summary::sector_day_momentum(&day, None, SectorSortField::AvgChange, SortOrder::Desc)
                .into_iter()
                .take(DEFAULT_FIRST_MOVER_SECTORS)
                .map(|e| e.sector)
                .collect()
        }
    };

    let from = lookback_start(latest, cfg.history_days)?;
    let mut out = Vec::with_capacity(sectors.len());
    for sector in sectors {
        let records = store
            .records(&RecordFilter::between(from, latest).sector(sector.as_str()))
            .await?;
        out.push(SectorFirstMovers {
            top_stocks: momentum::top_momentum(&records, cfg.top_n),
            sector,
        });
    }
    Ok(out)
}

/// Chronological daily summaries for a sector over the `days` calendar days up to its latest
/// trade date. Unknown sectors yield an empty series.
pub async fn sector_timeseries(
    store: &dyn MarketStore,
    sector: Option<&str>,
    days: i64,
) -> AnalysisResult<SectorTimeseries> {
    let sector = require_sector(sector)?;
    if !(1..=MAX_HISTORY_DAYS).contains(&days) {
        return Err(AnalysisError::InvalidParameter(format!(
            "daysBack must be 1..={MAX_HISTORY_DAYS} (got {days})"
        )));
    }
    let Some(latest) = store.latest_date(Some(sector)).await? else {
        return Ok(SectorTimeseries {
            sector: sector.to_string(),
            series: Vec::new(),
        });
    };

    let from = lookback_start(latest, days)?;
    let records = store
        .records(&RecordFilter::between(from, latest).sector(sector))
        .await?;

    Ok(SectorTimeseries {
        sector: sector.to_string(),
        series: summary::summarize(&records),
    })
}

/// Technical-filter ranking for one sector.
///
/// `benchmark_change_pct` is used as given. When absent it is derived from `benchmark_sector`'s
/// constituents over the same window; relative strength is omitted if that sector has no data.
pub async fn stock_ranking(
    store: &dyn MarketStore,
    cfg: &AnalysisConfig,
    sector: Option<&str>,
    date: Option<NaiveDate>,
    benchmark_change_pct: Option<f64>,
    benchmark_sector: &str,
) -> AnalysisResult<StockRanking> {
    checked_config(cfg)?;
    let sector = require_sector(sector)?;
    let date = resolve_date(store, date, Some(sector)).await?;
    let from = lookback_start(date, cfg.history_days)?;

    let records = store
        .records(&RecordFilter::between(from, date).sector(sector))
        .await?;

    let benchmark = match benchmark_change_pct {
        Some(b) => Some(b),
        None => {
            let bench = store
                .records(&RecordFilter::between(from, date).sector(benchmark_sector))
                .await?;
            technical::mean_change_pct(&bench, cfg.window_days)
        }
    };

    let params = technical::StockRankingParams {
        change_days: cfg.window_days,
        volume_window: cfg.volume_window,
        volume_threshold: cfg.volume_threshold,
    };
    let stocks = technical::rank_stocks(&records, &params, benchmark);

    tracing::debug!(%sector, %date, ranked = stocks.len(), ?benchmark, "stock ranking computed");
    Ok(StockRanking {
        sector: sector.to_string(),
        date,
        window_days: cfg.window_days,
        benchmark_change_pct: benchmark,
        stocks,
    })
}

pub async fn trading_signal(
    store: &dyn MarketStore,
    cfg: &AnalysisConfig,
    date: Option<NaiveDate>,
) -> AnalysisResult<TradingSignal> {
    checked_config(cfg)?;
    let date = resolve_date(store, date, None).await?;
    let from = lookback_start(date, signal::MOVING_AVERAGE_DAYS - 1)?;

    let records = store.records(&RecordFilter::between(from, date)).await?;
    let series = summary::daily_series_by_sector(&records);
    let day: Vec<SectorSummary> = series
        .values()
        .flatten()
        .filter(|s| s.date == date)
        .cloned()
        .collect();

    let out = signal::trading_signal(date, &day, &series, cfg.threshold)
        .ok_or_else(|| AnalysisError::NoDataFound(format!("no sector data on {date}")))?;

    tracing::info!(%date, signal = ?out.signal, leader = %out.current_leader, "trading signal computed");
    Ok(out)
}

/// Current leader by same-day average change, candidate next leaders by trend slope, and top
/// momentum stocks for each of them.
pub async fn sector_analysis(
    store: &dyn MarketStore,
    cfg: &AnalysisConfig,
) -> AnalysisResult<SectorAnalysis> {
    checked_config(cfg)?;
    let latest = resolve_date(store, None, None).await?;
    let from = lookback_start(latest, cfg.history_days)?;

    let records = store.records(&RecordFilter::between(from, latest)).await?;
    let series = summary::daily_series_by_sector(&records);
    let slopes = slope::sector_slopes(&series);

    let leader = series
        .values()
        .flatten()
        .filter(|s| s.date == latest)
        .max_by(|a, b| {
            a.avg_change_percent
                .total_cmp(&b.avg_change_percent)
                .then_with(|| b.sector.cmp(&a.sector))
        })
        .cloned()
        .ok_or_else(|| AnalysisError::NoDataFound(format!("no sector data on {latest}")))?;

    let leader_slope = slopes
        .iter()
        .find(|s| s.sector == leader.sector)
        .map(|s| s.slope)
        .unwrap_or(0.0);
    let next_leaders = slope::next_leading_sectors(&slopes, leader_slope);

    let mut sector_details = Vec::with_capacity(next_leaders.len() + 1);
    let analyzed = next_leaders
        .iter()
        .map(|s| (s.sector.as_str(), s.slope))
        .chain(std::iter::once((leader.sector.as_str(), leader_slope)));
    for (sector, momentum_slope) in analyzed {
        let sector_records: Vec<DailyRecord> = records
            .iter()
            .filter(|r| r.sector == sector)
            .cloned()
            .collect();
        sector_details.push(SectorDetail {
            sector: sector.to_string(),
            momentum_slope,
            top_stocks: momentum::top_momentum(&sector_records, ANALYSIS_TOP_STOCKS),
        });
    }

    Ok(SectorAnalysis {
        date: latest,
        current_leader: CurrentLeader {
            sector: leader.sector.clone(),
            avg_change: leader.avg_change_percent,
            momentum_slope: leader_slope,
        },
        next_leaders,
        sector_details,
        all_sector_trends: slopes,
    })
}

/// Recomputes every sector summary for `date` and upserts it. Re-running for the same date
/// overwrites the same rows with the same values.
pub async fn refresh_sector_summaries(
    store: &dyn MarketStore,
    date: NaiveDate,
) -> AnalysisResult<u64> {
    let records = store.records(&RecordFilter::on(date)).await?;
    if records.is_empty() {
        return Err(AnalysisError::NoDataFound(format!("no records on {date}")));
    }

    let summaries = summary::summarize(&records);
    let written = store.upsert_sector_summaries(&summaries).await?;
    tracing::info!(%date, written, "sector summaries refreshed");
    Ok(written)
}

pub async fn stored_sector_summaries(
    store: &dyn MarketStore,
    date: NaiveDate,
) -> AnalysisResult<Vec<SectorSummary>> {
    Ok(store.sector_summaries(date).await?)
}
