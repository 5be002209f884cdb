use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::domain::records::DailyRecord;

pub const SAMPLE_SYMBOLS: &[&str] = &["RELIANCE", "TCS", "INFY", "HDFCBANK", "ICICIBANK"];

/// Weekday trade dates, oldest first, ending on or before `end`.
pub fn trading_days(end: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut out = Vec::with_capacity(count);
    let mut d = end;
    while out.len() < count {
        if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            out.push(d);
        }
        d -= Duration::days(1);
    }
    out.reverse();
    out
}

/// Deterministic synthetic sessions for every (sector, symbol) over `days` trade dates.
///
/// Each sector gets its own drift so rankings and signals have something to separate.
pub fn sample_records(
    sectors: &[String],
    symbols: &[&str],
    end: NaiveDate,
    days: usize,
) -> Vec<DailyRecord> {
    let dates = trading_days(end, days);
    let mut out = Vec::with_capacity(sectors.len() * symbols.len() * dates.len());

    for (si, sector) in sectors.iter().enumerate() {
        let drift = ((si as f64) * 0.37).sin() * 0.8;
        for (yi, symbol) in symbols.iter().enumerate() {
            let seed = (si * 31 + yi * 7) as f64;
            let mut prev_close = 1_000.0 + seed * 3.0;

            for (i, date) in dates.iter().enumerate() {
                let t = i as f64;
                let change_percent = drift + ((t * 0.7 + seed).sin() * 1.5);
                let open = prev_close;
                let close = open * (1.0 + change_percent / 100.0);
                let high = open.max(close) * (1.0 + 0.004 * (1.0 + (t + seed).cos().abs()));
                let low = open.min(close) * (1.0 - 0.004 * (1.0 + (t * 1.3 + seed).sin().abs()));
                let volume = 200_000 + ((i * 7_919 + si * 104_729 + yi * 1_299_709) % 800_000) as i64;

                out.push(DailyRecord {
                    sector: sector.clone(),
                    symbol: symbol.to_string(),
                    date: *date,
                    open,
                    high,
                    low,
                    close,
                    volume,
                    turnover: close * volume as f64,
                    change_percent,
                });
                prev_close = close;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trading_days_skip_weekends() {
        // 2024-01-08 is a Monday.
        let end = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let days = trading_days(end, 3);
        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                end,
            ]
        );
    }

    #[test]
    fn sample_is_deterministic_and_consistent() {
        let sectors = vec!["NIFTY IT".to_string(), "NIFTY BANK".to_string()];
        let end = NaiveDate::from_ymd_opt(2024, 3, 29).unwrap();
        let a = sample_records(&sectors, SAMPLE_SYMBOLS, end, 30);
        let b = sample_records(&sectors, SAMPLE_SYMBOLS, end, 30);

        assert_eq!(a, b);
        assert_eq!(a.len(), 2 * SAMPLE_SYMBOLS.len() * 30);
        for r in &a {
            assert!(r.low <= r.open.min(r.close));
            assert!(r.high >= r.open.max(r.close));
            assert!(r.volume >= 200_000);
        }
    }
}
