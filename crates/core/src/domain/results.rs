use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::records::{DailyRecord, SectorSummary};
use crate::domain::round;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Strengthening,
    Weakening,
}

impl Trend {
    /// Equal values count as weakening.
    pub fn between(recent: f64, prior: f64) -> Self {
        if recent > prior {
            Trend::Strengthening
        } else {
            Trend::Weakening
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectorLabel {
    #[serde(rename = "Leading")]
    Leading,
    #[serde(rename = "Getting Weak")]
    GettingWeak,
    #[serde(rename = "Next Leader")]
    NextLeader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StockSortField {
    #[default]
    ChangePercent,
    Close,
    Volume,
    Turnover,
    Symbol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectorSortField {
    #[default]
    AvgChange,
    AvgClose,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorRankingEntry {
    pub rank: usize,
    pub sector: String,
    #[serde(serialize_with = "round::dp2")]
    pub recent_avg_change: f64,
    #[serde(serialize_with = "round::dp2")]
    pub prior_avg_change: f64,
    pub trend: Trend,
    pub total_volume: i64,
    #[serde(serialize_with = "round::dp2")]
    pub total_turnover: f64,
    pub label: Option<SectorLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorRanking {
    pub date: NaiveDate,
    pub window_days: usize,
    pub sectors: Vec<SectorRankingEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorTrendEntry {
    pub sector: String,
    pub trend: Trend,
    #[serde(serialize_with = "round::dp2")]
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorTrends {
    pub date: NaiveDate,
    pub previous_date: NaiveDate,
    pub sectors: Vec<SectorTrendEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorMomentumEntry {
    pub sector: String,
    #[serde(serialize_with = "round::dp2")]
    pub avg_change: f64,
    #[serde(serialize_with = "round::dp2")]
    pub avg_close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorMomentum {
    pub target_date: NaiveDate,
    pub sectors: Vec<SectorMomentumEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopStocks {
    pub sector: String,
    pub date: NaiveDate,
    pub stocks: Vec<DailyRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorTimeseries {
    pub sector: String,
    pub series: Vec<SectorSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMomentumEntry {
    pub symbol: String,
    #[serde(serialize_with = "round::dp2")]
    pub price_change_pct: f64,
    #[serde(serialize_with = "round::dp3")]
    pub volume_spike: f64,
    #[serde(serialize_with = "round::dp2")]
    pub momentum_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorFirstMovers {
    pub sector: String,
    pub top_stocks: Vec<StockMomentumEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRankingEntry {
    pub rank: usize,
    pub symbol: String,
    #[serde(serialize_with = "round::dp2")]
    pub close: f64,
    #[serde(serialize_with = "round::dp2")]
    pub sma5: f64,
    #[serde(serialize_with = "round::dp2")]
    pub sma10: f64,
    #[serde(serialize_with = "round::dp2")]
    pub sma20: f64,
    #[serde(serialize_with = "round::dp2")]
    pub avg_volume: f64,
    #[serde(serialize_with = "round::dp2")]
    pub change_pct: f64,
    #[serde(serialize_with = "round::dp2")]
    pub atr10: f64,
    #[serde(serialize_with = "round::opt_dp2")]
    pub relative_strength: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRanking {
    pub sector: String,
    pub date: NaiveDate,
    pub window_days: usize,
    #[serde(serialize_with = "round::opt_dp2")]
    pub benchmark_change_pct: Option<f64>,
    pub stocks: Vec<StockRankingEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalAction {
    #[serde(rename = "HOLD")]
    Hold,
    /// Keep the current leader.
    #[serde(rename = "BUY_CURRENT_HOLD_OTHERS")]
    HoldCurrentLeader,
    /// Rotate out of the current leader into the next one.
    #[serde(rename = "SELL_CURRENT_BUY_NEXT")]
    RotateToNextLeader,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderDetail {
    #[serde(rename = "3DayAvgChangePercent", serialize_with = "round::opt_dp2")]
    pub three_day_avg_change_percent: Option<f64>,
    #[serde(serialize_with = "round::dp2")]
    pub today_change_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalDetails {
    pub current_leader: LeaderDetail,
    pub next_leader: Option<LeaderDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingSignal {
    pub date: NaiveDate,
    pub signal: SignalAction,
    pub reason: String,
    pub current_leader: String,
    pub next_leader: Option<String>,
    pub details: SignalDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorSlope {
    pub sector: String,
    #[serde(serialize_with = "round::dp5")]
    pub slope: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentLeader {
    pub sector: String,
    #[serde(serialize_with = "round::dp2")]
    pub avg_change: f64,
    #[serde(serialize_with = "round::dp5")]
    pub momentum_slope: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorDetail {
    pub sector: String,
    #[serde(serialize_with = "round::dp5")]
    pub momentum_slope: f64,
    pub top_stocks: Vec<StockMomentumEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorAnalysis {
    pub date: NaiveDate,
    pub current_leader: CurrentLeader,
    pub next_leaders: Vec<SectorSlope>,
    pub sector_details: Vec<SectorDetail>,
    pub all_sector_trends: Vec<SectorSlope>,
}
