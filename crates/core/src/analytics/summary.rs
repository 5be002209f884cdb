use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::analytics::{desc, mean};
use crate::domain::records::{DailyRecord, SectorSummary};
use crate::domain::results::{SectorMomentumEntry, SectorSortField, SortOrder};

/// One summary per (sector, date), ordered by sector then date.
pub fn summarize(records: &[DailyRecord]) -> Vec<SectorSummary> {
    let mut groups: BTreeMap<(&str, NaiveDate), Vec<&DailyRecord>> = BTreeMap::new();
    for rec in records {
        groups
            .entry((rec.sector.as_str(), rec.date))
            .or_default()
            .push(rec);
    }

    groups
        .into_iter()
        .map(|((sector, date), rows)| SectorSummary {
            sector: sector.to_string(),
            date,
            avg_change_percent: mean(rows.iter().map(|r| r.change_percent)).unwrap_or(0.0),
            total_volume: rows.iter().map(|r| r.volume).sum(),
            total_turnover: rows.iter().map(|r| r.turnover).sum(),
            record_count: rows.len() as i64,
        })
        .collect()
}

/// Daily summaries keyed by sector, each series ascending by date.
pub fn daily_series_by_sector(records: &[DailyRecord]) -> BTreeMap<String, Vec<SectorSummary>> {
    let mut out: BTreeMap<String, Vec<SectorSummary>> = BTreeMap::new();
    for summary in summarize(records) {
        out.entry(summary.sector.clone()).or_default().push(summary);
    }
    out
}

/// Same-day average change and close per sector, optionally filtered by a case-insensitive
/// substring of the sector name.
pub fn sector_day_momentum(
    records: &[DailyRecord],
    search: Option<&str>,
    sort_by: SectorSortField,
    order: SortOrder,
) -> Vec<SectorMomentumEntry> {
    let needle = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let mut groups: BTreeMap<&str, Vec<&DailyRecord>> = BTreeMap::new();
    for rec in records {
        if let Some(needle) = &needle {
            if !rec.sector.to_lowercase().contains(needle.as_str()) {
                continue;
            }
        }
        groups.entry(rec.sector.as_str()).or_default().push(rec);
    }

    let mut out: Vec<SectorMomentumEntry> = groups
        .into_iter()
        .map(|(sector, rows)| SectorMomentumEntry {
            sector: sector.to_string(),
            avg_change: mean(rows.iter().map(|r| r.change_percent)).unwrap_or(0.0),
            avg_close: mean(rows.iter().map(|r| r.close)).unwrap_or(0.0),
        })
        .collect();

    out.sort_by(|a, b| {
        let (x, y) = match sort_by {
            SectorSortField::AvgChange => (a.avg_change, b.avg_change),
            SectorSortField::AvgClose => (a.avg_close, b.avg_close),
        };
        let ord = match order {
            SortOrder::Desc => desc(x, y),
            SortOrder::Asc => desc(y, x),
        };
        ord.then_with(|| a.sector.cmp(&b.sector))
    });
    out
}
