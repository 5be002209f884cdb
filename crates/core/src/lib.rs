pub mod analytics;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod service;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;

    use crate::domain::results::{SortOrder, StockSortField};

    pub const DEFAULT_BENCHMARK_SECTOR: &str = "NIFTY 50";
    pub const DEFAULT_DATA_PROVIDER_BASE_URL: &str = "https://www.nseindia.com";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub data_provider_base_url: String,
        pub benchmark_sector: String,
        pub demo_mode: bool,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                data_provider_base_url: std::env::var("DATA_PROVIDER_BASE_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_DATA_PROVIDER_BASE_URL.to_string()),
                benchmark_sector: std::env::var("BENCHMARK_SECTOR")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_BENCHMARK_SECTOR.to_string()),
                demo_mode: std::env::var("SECTORFLOW_DEMO")
                    .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                    .unwrap_or(false),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }
    }

    /// Upper bound for trading-day windows (about one year of sessions).
    pub const MAX_WINDOW_DAYS: usize = 250;

    /// Upper bound for calendar lookbacks.
    pub const MAX_HISTORY_DAYS: i64 = 3650;

    /// Knobs shared by every ranking, trend and signal computation.
    ///
    /// Built once per process from the environment; individual requests override single fields
    /// through query parameters.
    #[derive(Debug, Clone)]
    pub struct AnalysisConfig {
        /// Trailing window in trading days for sector ranking and N-day stock change.
        pub window_days: usize,

        /// Leader gap for "Next Leader" labeling and the rotation margin of the trading signal.
        pub threshold: f64,

        /// Minimum average volume a symbol needs to survive the stock ranking filter.
        pub volume_threshold: f64,

        /// Number of sessions averaged for the stock ranking volume filter.
        pub volume_window: usize,

        /// Calendar days of history loaded for momentum scoring and stock ranking.
        pub history_days: i64,

        pub sort_field: StockSortField,
        pub order: SortOrder,
        pub top_n: usize,
    }

    impl Default for AnalysisConfig {
        fn default() -> Self {
            Self {
                window_days: 5,
                threshold: 0.5,
                volume_threshold: 100_000.0,
                volume_window: 5,
                history_days: 30,
                sort_field: StockSortField::ChangePercent,
                order: SortOrder::Desc,
                top_n: 10,
            }
        }
    }

    impl AnalysisConfig {
        pub fn from_env() -> Self {
            let mut out = Self::default();

            if let Some(n) = env_parse::<usize>("ANALYSIS_WINDOW_DAYS") {
                out.window_days = n;
            }
            if let Some(n) = env_parse::<f64>("ANALYSIS_THRESHOLD") {
                out.threshold = n;
            }
            if let Some(n) = env_parse::<f64>("ANALYSIS_VOLUME_THRESHOLD") {
                out.volume_threshold = n;
            }
            if let Some(n) = env_parse::<usize>("ANALYSIS_VOLUME_WINDOW") {
                out.volume_window = n;
            }
            if let Some(n) = env_parse::<i64>("ANALYSIS_HISTORY_DAYS") {
                out.history_days = n;
            }
            if let Some(n) = env_parse::<usize>("ANALYSIS_TOP_N") {
                out.top_n = n;
            }

            out
        }

        pub fn validate(&self) -> anyhow::Result<()> {
            anyhow::ensure!(
                (1..=MAX_WINDOW_DAYS).contains(&self.window_days),
                "window_days must be 1..={MAX_WINDOW_DAYS} (got {})",
                self.window_days
            );
            anyhow::ensure!(
                (1..=MAX_WINDOW_DAYS).contains(&self.volume_window),
                "volume_window must be 1..={MAX_WINDOW_DAYS} (got {})",
                self.volume_window
            );
            anyhow::ensure!(
                (1..=MAX_HISTORY_DAYS).contains(&self.history_days),
                "history_days must be 1..={MAX_HISTORY_DAYS} (got {})",
                self.history_days
            );
            anyhow::ensure!(
                self.threshold.is_finite() && self.threshold >= 0.0,
                "threshold must be a non-negative number (got {})",
                self.threshold
            );
            Ok(())
        }
    }

    fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
        std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
    }

}
