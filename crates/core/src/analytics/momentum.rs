use crate::analytics::{desc, group_by_symbol, mean};
use crate::domain::records::DailyRecord;
use crate::domain::results::StockMomentumEntry;

pub const PRICE_WEIGHT: f64 = 0.7;
pub const VOLUME_WEIGHT: f64 = 0.3;
pub const MAX_TOP_N: usize = 50;

pub fn momentum_score(price_change_pct: f64, volume_spike: f64) -> f64 {
    price_change_pct * PRICE_WEIGHT + volume_spike * VOLUME_WEIGHT * 100.0
}

/// Latest volume relative to the window average; 1 when the average is zero.
pub fn volume_spike(latest_volume: f64, avg_volume: f64) -> f64 {
    if avg_volume == 0.0 {
        1.0
    } else {
        latest_volume / avg_volume
    }
}

/// Scores one symbol's rows, which must be sorted ascending by date.
pub fn calculate_momentum(symbol: &str, rows: &[&DailyRecord]) -> Option<StockMomentumEntry> {
    let first = rows.first()?;
    let last = rows.last()?;
    if first.close <= 0.0 {
        tracing::debug!(%symbol, close = first.close, "skipping symbol with non-positive base close");
        return None;
    }

    let price_change_pct = (last.close - first.close) / first.close * 100.0;
    let avg_volume = mean(rows.iter().map(|r| r.volume as f64)).unwrap_or(0.0);
    let spike = volume_spike(last.volume as f64, avg_volume);

    Some(StockMomentumEntry {
        symbol: symbol.to_string(),
        price_change_pct,
        volume_spike: spike,
        momentum_score: momentum_score(price_change_pct, spike),
    })
}

/// Highest momentum symbols first, at most `top_n` (clamped to `1..=50`).
pub fn top_momentum(records: &[DailyRecord], top_n: usize) -> Vec<StockMomentumEntry> {
    let top_n = top_n.clamp(1, MAX_TOP_N);

    let mut scored: Vec<StockMomentumEntry> = group_by_symbol(records)
        .into_iter()
        .filter_map(|(symbol, rows)| calculate_momentum(symbol, &rows))
        .collect();

    scored.sort_by(|a, b| {
        desc(a.momentum_score, b.momentum_score).then_with(|| a.symbol.cmp(&b.symbol))
    });
    scored.truncate(top_n);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::fixtures::*;
    use chrono::NaiveDate;

    #[test]
    fn worked_example() {
        let mut a = rec("IT", "TCS", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 100.0, 0.0);
        a.volume = 1000;
        let mut b = rec("IT", "TCS", NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(), 110.0, 0.0);
        b.volume = 2000;

        let m = calculate_momentum("TCS", &[&a, &b]).unwrap();
        assert!((m.price_change_pct - 10.0).abs() < 1e-9);
        assert!((m.volume_spike - 2000.0 / 1500.0).abs() < 1e-9);
        assert!((m.momentum_score - 47.0).abs() < 1e-9);
    }

    #[test]
    fn zero_average_volume_defaults_spike_to_one() {
        let mut a = rec("IT", "TCS", day(0), 100.0, 0.0);
        a.volume = 0;
        let mut b = rec("IT", "TCS", day(1), 100.0, 0.0);
        b.volume = 0;

        let m = calculate_momentum("TCS", &[&a, &b]).unwrap();
        assert_eq!(m.volume_spike, 1.0);
        assert!(m.momentum_score.is_finite());
        assert_eq!(m.momentum_score, 30.0);
    }

    #[test]
    fn skips_non_positive_base_close() {
        let a = rec("IT", "BAD", day(0), 0.0, 0.0);
        let b = rec("IT", "BAD", day(1), 10.0, 0.0);
        assert!(calculate_momentum("BAD", &[&a, &b]).is_none());
    }

    #[test]
    fn top_momentum_sorts_and_caps() {
        let mut records = Vec::new();
        for i in 0..60u32 {
            let symbol = format!("S{i:02}");
            records.push(rec("IT", &symbol, day(0), 100.0, 0.0));
            records.push(rec("IT", &symbol, day(1), 100.0 + i as f64, 0.0));
        }

        let top = top_momentum(&records, 500);
        assert_eq!(top.len(), MAX_TOP_N);
        assert_eq!(top[0].symbol, "S59");
        assert!(top.windows(2).all(|w| w[0].momentum_score >= w[1].momentum_score));

        let top = top_momentum(&records, 0);
        assert_eq!(top.len(), 1);
    }
}
