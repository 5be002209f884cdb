use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::round;

/// One symbol's session in one sector. Unique by (sector, date, symbol).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub sector: String,
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub turnover: f64,
    pub change_percent: f64,
}

impl DailyRecord {
    /// Storage identity: trimmed sector, trade date, trimmed symbol.
    pub fn key(&self) -> (&str, NaiveDate, &str) {
        (self.sector.trim(), self.date, self.symbol.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorSummary {
    pub sector: String,
    pub date: NaiveDate,
    #[serde(serialize_with = "round::dp2")]
    pub avg_change_percent: f64,
    pub total_volume: i64,
    #[serde(serialize_with = "round::dp2")]
    pub total_turnover: f64,
    pub record_count: i64,
}
