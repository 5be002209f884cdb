use serde::{Deserialize, Serialize};

/// Body of NSE's `/api/equity-stockIndices?index=...`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConstituentsResponse {
    #[serde(default)]
    pub name: Option<String>,
    pub data: Vec<IndexConstituent>,
    #[serde(default)]
    pub metadata: Option<IndexMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexMetadata {
    #[serde(default)]
    pub index_name: Option<String>,
    /// e.g. `16-Oct-2026 15:30:00`.
    #[serde(default)]
    pub last_update_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexConstituent {
    pub symbol: String,
    #[serde(default)]
    pub priority: i64,
    pub open: f64,
    pub day_high: f64,
    pub day_low: f64,
    pub last_price: f64,
    pub p_change: f64,
    #[serde(default)]
    pub total_traded_volume: f64,
    #[serde(default)]
    pub total_traded_value: f64,
}
