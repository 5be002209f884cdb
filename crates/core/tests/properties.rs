use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use sectorflow_core::analytics::momentum::{momentum_score, volume_spike};
use sectorflow_core::analytics::sector_ranking::rank_sectors;
use sectorflow_core::analytics::summary::summarize;
use sectorflow_core::analytics::technical::{rank_stocks, StockRankingParams};
use sectorflow_core::domain::records::{DailyRecord, SectorSummary};

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn record(sector: &str, symbol: &str, day: i64, close: f64, change: f64, volume: i64) -> DailyRecord {
    DailyRecord {
        sector: sector.to_string(),
        symbol: symbol.to_string(),
        date: base_date() + Duration::days(day),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume,
        turnover: close * volume as f64,
        change_percent: change,
    }
}

proptest! {
    #[test]
    fn momentum_score_is_monotonic_in_price_change(
        a in -100.0f64..100.0,
        b in -100.0f64..100.0,
        spike in 0.0f64..10.0,
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(momentum_score(lo, spike) <= momentum_score(hi, spike));
    }

    #[test]
    fn momentum_score_is_monotonic_in_volume_spike(
        pct in -100.0f64..100.0,
        a in 0.0f64..10.0,
        b in 0.0f64..10.0,
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(momentum_score(pct, lo) <= momentum_score(pct, hi));
    }

    #[test]
    fn volume_spike_never_divides_by_zero(latest in 0.0f64..1e9) {
        prop_assert_eq!(volume_spike(latest, 0.0), 1.0);
    }

    #[test]
    fn summary_mean_matches_rows(changes in prop::collection::vec(-10.0f64..10.0, 1..20)) {
        let records: Vec<DailyRecord> = changes
            .iter()
            .enumerate()
            .map(|(i, c)| record("NIFTY IT", &format!("S{i}"), 0, 100.0, *c, 1))
            .collect();

        let summaries = summarize(&records);
        prop_assert_eq!(summaries.len(), 1);
        let expected = changes.iter().sum::<f64>() / changes.len() as f64;
        prop_assert!((summaries[0].avg_change_percent - expected).abs() < 1e-9);
        prop_assert_eq!(summaries[0].total_volume, changes.len() as i64);
    }

    #[test]
    fn relative_strength_is_exact_difference(
        step in 0.1f64..5.0,
        benchmark in -20.0f64..20.0,
    ) {
        let records: Vec<DailyRecord> = (0..25)
            .map(|i| record("NIFTY IT", "TCS", i, 100.0 + step * i as f64, 0.0, 1_000))
            .collect();
        let params = StockRankingParams { change_days: 5, volume_window: 5, volume_threshold: 0.0 };

        let ranked = rank_stocks(&records, &params, Some(benchmark));
        prop_assert_eq!(ranked.len(), 1);
        prop_assert_eq!(ranked[0].relative_strength, Some(ranked[0].change_pct - benchmark));
    }

    #[test]
    fn sector_ranking_is_deterministic(
        changes in prop::collection::vec(prop::collection::vec(-5.0f64..5.0, 6..10), 1..6),
        window in 1usize..5,
    ) {
        let mut series: BTreeMap<String, Vec<SectorSummary>> = BTreeMap::new();
        for (si, sector_changes) in changes.iter().enumerate() {
            let sector = format!("SECTOR {si}");
            let points = sector_changes
                .iter()
                .enumerate()
                .map(|(d, c)| SectorSummary {
                    sector: sector.clone(),
                    date: base_date() + Duration::days(d as i64),
                    avg_change_percent: *c,
                    total_volume: 1,
                    total_turnover: 1.0,
                    record_count: 1,
                })
                .collect();
            series.insert(sector, points);
        }

        let target = base_date() + Duration::days(5);
        let first = rank_sectors(&series, target, window, 0.5);
        let second = rank_sectors(&series, target, window, 0.5);
        prop_assert_eq!(&first, &second);
        prop_assert!(first.windows(2).all(|w| w[0].recent_avg_change >= w[1].recent_avg_change));
    }
}
