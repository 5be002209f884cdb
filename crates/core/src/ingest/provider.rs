use crate::config::Settings;
use crate::domain::records::DailyRecord;
use crate::ingest::types::IndexConstituentsResponse;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde_json::Value;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;
const INDEX_PATH: &str = "/api/equity-stockIndices";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

#[async_trait::async_trait]
pub trait IndexDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Constituent rows of one sector index for its most recent session, plus the raw payload.
    async fn fetch_sector(
        &self,
        sector: &str,
        fallback_date: NaiveDate,
    ) -> Result<(Vec<DailyRecord>, Value)>;
}

#[derive(Debug)]
pub struct NseHttpProvider {
    http: reqwest::Client,
    base_url: String,
    retries: u32,

    // NSE rejects API calls without session cookies; the homepage sets them once per process.
    session_primed: tokio::sync::Mutex<bool>,
}

impl NseHttpProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout_secs = std::env::var("DATA_PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("DATA_PROVIDER_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES)
            .max(1);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .cookie_store(true)
            .default_headers(default_headers())
            .build()
            .context("failed to build data provider http client")?;

        Ok(Self {
            http,
            base_url: settings.data_provider_base_url.trim_end_matches('/').to_string(),
            retries,
            session_primed: tokio::sync::Mutex::new(false),
        })
    }

    async fn prime_session(&self) -> Result<()> {
        let mut primed = self.session_primed.lock().await;
        if *primed {
            return Ok(());
        }

        let res = self
            .http
            .get(&self.base_url)
            .send()
            .await
            .context("data provider homepage request failed")?;
        tracing::debug!(status = %res.status(), "data provider session primed");
        *primed = true;
        Ok(())
    }

    async fn fetch_once(
        &self,
        sector: &str,
        fallback_date: NaiveDate,
    ) -> Result<(Vec<DailyRecord>, Value)> {
        self.prime_session().await?;

        let res = self
            .http
            .get(format!("{}{}", self.base_url, INDEX_PATH))
            .query(&[("index", sector)])
            .send()
            .await
            .context("data provider request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read provider response")?;
        let raw_json = serde_json::from_str::<Value>(&text)
            .with_context(|| format!("provider response is not valid JSON: {text}"))?;

        if !status.is_success() {
            anyhow::bail!("data provider HTTP {status}: {raw_json}");
        }

        let parsed = serde_json::from_value::<IndexConstituentsResponse>(raw_json.clone())
            .context("failed to parse provider response into IndexConstituentsResponse")?;
        let records = into_records(sector, &parsed, fallback_date)?;
        Ok((records, raw_json))
    }
}

#[async_trait::async_trait]
impl IndexDataProvider for NseHttpProvider {
    fn provider_name(&self) -> &'static str {
        "nse_http_json"
    }

    async fn fetch_sector(
        &self,
        sector: &str,
        fallback_date: NaiveDate,
    ) -> Result<(Vec<DailyRecord>, Value)> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(sector, fallback_date).await {
                Ok(out) => return Ok(out),
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = retry_backoff(attempt);
                    tracing::warn!(%sector, attempt, ?backoff, error = %err, "data provider fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// `16-Oct-2026 15:30:00` -> 2026-10-16.
pub fn parse_trade_date(last_update_time: &str) -> Option<NaiveDate> {
    let day = last_update_time.split_whitespace().next()?;
    NaiveDate::parse_from_str(day, "%d-%b-%Y").ok()
}

/// Maps constituents to daily records. The index's own row (symbol equal to the sector name) is
/// dropped so it does not skew sector averages.
pub fn into_records(
    sector: &str,
    resp: &IndexConstituentsResponse,
    fallback_date: NaiveDate,
) -> Result<Vec<DailyRecord>> {
    let date = match resp
        .metadata
        .as_ref()
        .and_then(|m| m.last_update_time.as_deref())
        .and_then(parse_trade_date)
    {
        Some(d) => d,
        None => {
            tracing::warn!(%sector, %fallback_date, "provider payload has no parsable lastUpdateTime; using fallback date");
            fallback_date
        }
    };

    let mut out = Vec::with_capacity(resp.data.len());
    for item in &resp.data {
        let symbol = item.symbol.trim();
        anyhow::ensure!(!symbol.is_empty(), "symbol must be non-empty");
        if symbol.eq_ignore_ascii_case(sector.trim()) {
            continue;
        }

        out.push(DailyRecord {
            sector: sector.trim().to_string(),
            symbol: symbol.to_string(),
            date,
            open: item.open,
            high: item.day_high,
            low: item.day_low,
            close: item.last_price,
            volume: item.total_traded_volume.round() as i64,
            turnover: item.total_traded_value,
            change_percent: item.p_change,
        });
    }

    anyhow::ensure!(!out.is_empty(), "no constituents returned for sector {sector}");
    Ok(out)
}

const MAX_BACKOFF_SHIFT: u32 = 5;

/// 1s, 2s, 4s ... doubling per failed attempt, capped at 32s.
fn retry_backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "name": "NIFTY IT",
            "data": [
                {
                    "priority": 1,
                    "symbol": "NIFTY IT",
                    "open": 35000.0, "dayHigh": 35500.0, "dayLow": 34900.0,
                    "lastPrice": 35400.0, "pChange": 1.1,
                    "totalTradedVolume": 0, "totalTradedValue": 0
                },
                {
                    "priority": 0,
                    "symbol": "TCS",
                    "open": 4000.0, "dayHigh": 4100.0, "dayLow": 3990.0,
                    "lastPrice": 4080.5, "pChange": 2.01,
                    "totalTradedVolume": 1234567.0, "totalTradedValue": 5.04e9
                }
            ],
            "metadata": {"indexName": "NIFTY IT", "lastUpdateTime": "16-Oct-2026 15:30:00"}
        })
    }

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(retry_backoff(1), Duration::from_secs(1));
        assert_eq!(retry_backoff(3), Duration::from_secs(4));
        assert_eq!(retry_backoff(6), Duration::from_secs(32));
        assert_eq!(retry_backoff(100), Duration::from_secs(32));
    }

    #[test]
    fn maps_constituents_and_drops_index_row() {
        let resp: IndexConstituentsResponse = serde_json::from_value(payload()).unwrap();
        let fallback = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let records = into_records("NIFTY IT", &resp, fallback).unwrap();

        assert_eq!(records.len(), 1);
        let tcs = &records[0];
        assert_eq!(tcs.symbol, "TCS");
        assert_eq!(tcs.sector, "NIFTY IT");
        assert_eq!(tcs.date, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        assert_eq!(tcs.high, 4100.0);
        assert_eq!(tcs.close, 4080.5);
        assert_eq!(tcs.volume, 1_234_567);
        assert_eq!(tcs.change_percent, 2.01);
    }

    #[test]
    fn falls_back_when_update_time_missing() {
        let mut v = payload();
        v["metadata"] = Value::Null;
        let resp: IndexConstituentsResponse = serde_json::from_value(v).unwrap();
        let fallback = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        let records = into_records("NIFTY IT", &resp, fallback).unwrap();
        assert_eq!(records[0].date, fallback);
    }

    #[test]
    fn rejects_payload_without_constituents() {
        let v = json!({"data": [], "metadata": null});
        let resp: IndexConstituentsResponse = serde_json::from_value(v).unwrap();
        let fallback = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        assert!(into_records("NIFTY IT", &resp, fallback).is_err());
    }

    #[test]
    fn parses_update_time() {
        assert_eq!(
            parse_trade_date("03-Jan-2025 16:00:00"),
            NaiveDate::from_ymd_opt(2025, 1, 3)
        );
        assert_eq!(parse_trade_date("garbage"), None);
    }
}
