//! Moving averages, ATR and the filtered stock ranking built on them.

use crate::analytics::{desc, group_by_symbol, mean};
use crate::domain::records::DailyRecord;
use crate::domain::results::StockRankingEntry;

pub const MIN_HISTORY_DAYS: usize = 20;
pub const ATR_PERIOD: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct StockRankingParams {
    /// Sessions used for the N-day percent change.
    pub change_days: usize,
    pub volume_window: usize,
    pub volume_threshold: f64,
}

/// Simple moving average of the last `period` values.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    mean(values[values.len() - period..].iter().copied())
}

/// Percent change between the last value and the value `n` sessions earlier. Falls back to the
/// first value when the series is shorter than `n + 1`.
pub fn percent_change(values: &[f64], n: usize) -> Option<f64> {
    let last = *values.last()?;
    let base_idx = values.len().saturating_sub(n.saturating_add(1));
    let base = values[base_idx];
    if base == 0.0 || values.len() < 2 {
        return None;
    }
    Some((last - base) / base * 100.0)
}

pub fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    (high - low)
        .max((high - prev_close).abs())
        .max((low - prev_close).abs())
}

/// Mean true range over the last `period` sessions. Needs `period + 1` rows so every session
/// has a previous close.
pub fn average_true_range(rows: &[&DailyRecord], period: usize) -> Option<f64> {
    if period == 0 || rows.len() <= period {
        return None;
    }
    let start = rows.len() - period;
    mean((start..rows.len()).map(|i| true_range(rows[i].high, rows[i].low, rows[i - 1].close)))
}

/// Mean N-day change across every symbol with enough rows. Used to derive a benchmark change
/// from an index sector's constituents.
pub fn mean_change_pct(records: &[DailyRecord], n: usize) -> Option<f64> {
    let changes = group_by_symbol(records).into_values().filter_map(|rows| {
        if rows.len() <= n {
            return None;
        }
        let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();
        percent_change(&closes, n)
    });
    mean(changes)
}

/// Filters and ranks a sector's symbols.
///
/// A symbol needs [`MIN_HISTORY_DAYS`] rows, a latest close at or above its 5/10/20-session SMAs,
/// and an average volume at or above the threshold. Survivors are ranked by N-day change.
/// `benchmark_change_pct` is the benchmark's change over the same window; relative strength is
/// `None` when it is not supplied.
pub fn rank_stocks(
    records: &[DailyRecord],
    params: &StockRankingParams,
    benchmark_change_pct: Option<f64>,
) -> Vec<StockRankingEntry> {
    let mut out = Vec::new();

    for (symbol, rows) in group_by_symbol(records) {
        if rows.len() < MIN_HISTORY_DAYS {
            tracing::debug!(%symbol, days = rows.len(), "excluded: insufficient history");
            continue;
        }

        let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();
        let volumes: Vec<f64> = rows.iter().map(|r| r.volume as f64).collect();
        let close = closes[closes.len() - 1];

        let (Some(sma5), Some(sma10), Some(sma20)) =
            (sma(&closes, 5), sma(&closes, 10), sma(&closes, 20))
        else {
            continue;
        };
        if close < sma5 || close < sma10 || close < sma20 {
            continue;
        }

        let Some(avg_volume) = sma(&volumes, params.volume_window.min(volumes.len())) else {
            continue;
        };
        if avg_volume < params.volume_threshold {
            continue;
        }

        let Some(change_pct) = percent_change(&closes, params.change_days) else {
            continue;
        };
        let atr10 = average_true_range(&rows, ATR_PERIOD).unwrap_or(0.0);

        out.push(StockRankingEntry {
            rank: 0,
            symbol: symbol.to_string(),
            close,
            sma5,
            sma10,
            sma20,
            avg_volume,
            change_pct,
            atr10,
            relative_strength: benchmark_change_pct.map(|b| change_pct - b),
        });
    }

    out.sort_by(|a, b| desc(a.change_pct, b.change_pct).then_with(|| a.symbol.cmp(&b.symbol)));
    for (i, entry) in out.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::fixtures::*;

    const PARAMS: StockRankingParams = StockRankingParams {
        change_days: 5,
        volume_window: 5,
        volume_threshold: 500.0,
    };

    fn rising(symbol: &str, days: u32, step: f64) -> Vec<DailyRecord> {
        (0..days)
            .map(|i| {
                let close = 100.0 + step * i as f64;
                let mut r = rec("IT", symbol, day(i), close, 0.0);
                r.high = close + 1.0;
                r.low = close - 1.0;
                r
            })
            .collect()
    }

    #[test]
    fn sma_uses_trailing_values() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(sma(&v, 2), Some(4.5));
        assert_eq!(sma(&v, 5), Some(3.0));
        assert_eq!(sma(&v, 6), None);
    }

    #[test]
    fn percent_change_over_n_sessions() {
        let v = [100.0, 50.0, 100.0, 110.0];
        assert_eq!(percent_change(&v, 1), Some(10.0));
        assert_eq!(percent_change(&v, 2), Some(120.0));
        // Short series falls back to the first value.
        assert_eq!(percent_change(&v, 10), Some(10.0));
        assert_eq!(percent_change(&v, usize::MAX), Some(10.0));
    }

    #[test]
    fn huge_windows_yield_none_instead_of_overflowing() {
        let a = rec("IT", "X", day(0), 10.0, 0.0);
        let b = rec("IT", "X", day(1), 11.0, 0.0);
        assert!(average_true_range(&[&a, &b], usize::MAX).is_none());
        assert!(mean_change_pct(&rising("A", 6, 1.0), usize::MAX).is_none());
    }

    #[test]
    fn atr_uses_previous_close() {
        let a = rec("IT", "X", day(0), 10.0, 0.0);
        let mut b = rec("IT", "X", day(1), 12.0, 0.0);
        b.high = 13.0;
        b.low = 11.5;
        let mut c = rec("IT", "X", day(2), 12.0, 0.0);
        c.high = 12.5;
        c.low = 11.0;

        // TR(b) = max(1.5, 3.0, 1.5) = 3.0; TR(c) = max(1.5, 0.5, 1.0) = 1.5
        let atr = average_true_range(&[&a, &b, &c], 2).unwrap();
        assert!((atr - 2.25).abs() < 1e-12);
        assert!(average_true_range(&[&a, &b], 2).is_none());
    }

    #[test]
    fn excludes_symbols_with_short_history() {
        let records = rising("SHORT", 15, 1.0);
        assert!(rank_stocks(&records, &PARAMS, None).is_empty());

        let records = rising("LONG", 20, 1.0);
        assert_eq!(rank_stocks(&records, &PARAMS, None).len(), 1);
    }

    #[test]
    fn filters_below_moving_average_and_low_volume() {
        let mut records = rising("UP", 25, 1.0);

        let mut falling = rising("DOWN", 25, -1.0);
        records.append(&mut falling);

        let mut thin = rising("THIN", 25, 1.0);
        for r in &mut thin {
            r.volume = 10;
        }
        records.append(&mut thin);

        let ranked = rank_stocks(&records, &PARAMS, None);
        let symbols: Vec<_> = ranked.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["UP"]);
    }

    #[test]
    fn ranks_by_change_and_computes_relative_strength() {
        let mut records = rising("SLOW", 25, 0.5);
        records.append(&mut rising("FAST", 25, 2.0));

        let ranked = rank_stocks(&records, &PARAMS, Some(1.25));
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].symbol, "FAST");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
        for e in &ranked {
            assert_eq!(e.relative_strength, Some(e.change_pct - 1.25));
        }
        // high - prev close dominates: (close + 1) - (close - 2).
        assert!((ranked[0].atr10 - 3.0).abs() < 1e-9);
    }

    #[test]
    fn benchmark_change_is_mean_of_constituents() {
        let mut records = rising("A", 6, 2.0); // 100 -> 110
        records.append(&mut rising("B", 6, 0.0)); // flat
        let b = mean_change_pct(&records, 5).unwrap();
        assert!((b - 5.0).abs() < 1e-9);
    }
}
