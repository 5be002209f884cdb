use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::analytics::{desc, mean};
use crate::domain::records::SectorSummary;
use crate::domain::results::{SectorLabel, SectorRankingEntry, SectorTrendEntry, Trend};

/// Ranks sectors by mean daily change over the trailing `window` trading days ending at
/// `target`, comparing against the window shifted back by one day.
///
/// A sector needs at least `window + 1` daily summaries on or before `target`; sectors with less
/// history are left out instead of failing the whole ranking.
pub fn rank_sectors(
    series: &BTreeMap<String, Vec<SectorSummary>>,
    target: NaiveDate,
    window: usize,
    threshold: f64,
) -> Vec<SectorRankingEntry> {
    let window = window.max(1);

    let mut out = Vec::with_capacity(series.len());
    for (sector, points) in series {
        let points: Vec<&SectorSummary> = points.iter().filter(|p| p.date <= target).collect();
        if points.len() <= window {
            tracing::debug!(
                %sector,
                days = points.len(),
                window,
                "sector excluded from ranking: insufficient history"
            );
            continue;
        }

        let n = points.len();
        let recent = &points[n - window..];
        let prior = &points[n - window - 1..n - 1];

        let recent_avg = mean(recent.iter().map(|p| p.avg_change_percent)).unwrap_or(0.0);
        let prior_avg = mean(prior.iter().map(|p| p.avg_change_percent)).unwrap_or(0.0);

        out.push(SectorRankingEntry {
            rank: 0,
            sector: sector.clone(),
            recent_avg_change: recent_avg,
            prior_avg_change: prior_avg,
            trend: Trend::between(recent_avg, prior_avg),
            total_volume: recent.iter().map(|p| p.total_volume).sum(),
            total_turnover: recent.iter().map(|p| p.total_turnover).sum(),
            label: None,
        });
    }

    out.sort_by(|a, b| {
        desc(a.recent_avg_change, b.recent_avg_change).then_with(|| a.sector.cmp(&b.sector))
    });
    for (i, entry) in out.iter_mut().enumerate() {
        entry.rank = i + 1;
    }

    apply_labels(&mut out, threshold);
    out
}

fn apply_labels(ranked: &mut [SectorRankingEntry], threshold: f64) {
    let Some(top) = ranked.first() else {
        return;
    };
    let top_avg = top.recent_avg_change;
    let top_label = match top.trend {
        Trend::Strengthening => SectorLabel::Leading,
        Trend::Weakening => SectorLabel::GettingWeak,
    };
    ranked[0].label = Some(top_label);

    if let Some(second) = ranked.get_mut(1) {
        let gap = top_avg - second.recent_avg_change;
        if gap < threshold && second.trend == Trend::Strengthening {
            second.label = Some(SectorLabel::NextLeader);
        }
    }
}

/// Day-over-day change of each sector's average change. Sectors missing from either day are
/// skipped. Sorted by delta, largest first.
pub fn sector_trends(today: &[SectorSummary], previous: &[SectorSummary]) -> Vec<SectorTrendEntry> {
    let prev: BTreeMap<&str, f64> = previous
        .iter()
        .map(|s| (s.sector.as_str(), s.avg_change_percent))
        .collect();

    let mut out: Vec<SectorTrendEntry> = today
        .iter()
        .filter_map(|s| {
            let before = *prev.get(s.sector.as_str())?;
            Some(SectorTrendEntry {
                sector: s.sector.clone(),
                trend: Trend::between(s.avg_change_percent, before),
                delta: s.avg_change_percent - before,
            })
        })
        .collect();

    out.sort_by(|a, b| desc(a.delta, b.delta).then_with(|| a.sector.cmp(&b.sector)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::fixtures::day;

    fn series_of(sector: &str, changes: &[f64]) -> Vec<SectorSummary> {
        changes
            .iter()
            .enumerate()
            .map(|(i, c)| SectorSummary {
                sector: sector.to_string(),
                date: day(i as u32),
                avg_change_percent: *c,
                total_volume: 100,
                total_turnover: 10.0,
                record_count: 1,
            })
            .collect()
    }

    fn map(entries: Vec<(&str, Vec<SectorSummary>)>) -> BTreeMap<String, Vec<SectorSummary>> {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn ranks_by_recent_mean_and_compares_with_shifted_window() {
        let series = map(vec![
            ("AUTO", series_of("AUTO", &[0.0, 1.0, 1.0, 1.0])),
            ("IT", series_of("IT", &[3.0, 2.0, 2.0, 0.5])),
        ]);

        let ranked = rank_sectors(&series, day(3), 3, 0.1);
        assert_eq!(ranked.len(), 2);

        assert_eq!(ranked[0].sector, "IT");
        assert_eq!(ranked[0].rank, 1);
        assert!((ranked[0].recent_avg_change - 1.5).abs() < 1e-12);
        assert!((ranked[0].prior_avg_change - 7.0 / 3.0).abs() < 1e-12);
        assert_eq!(ranked[0].trend, Trend::Weakening);
        assert_eq!(ranked[0].label, Some(SectorLabel::GettingWeak));
        assert_eq!(ranked[0].total_volume, 300);

        assert_eq!(ranked[1].sector, "AUTO");
        assert_eq!(ranked[1].trend, Trend::Strengthening);
        // Gap 0.5 is above the 0.1 threshold.
        assert_eq!(ranked[1].label, None);
    }

    #[test]
    fn labels_next_leader_when_gap_is_small_and_strengthening() {
        let series = map(vec![
            ("AUTO", series_of("AUTO", &[0.0, 1.0, 1.0, 1.0])),
            ("IT", series_of("IT", &[0.0, 1.0, 1.0, 1.2])),
        ]);

        let ranked = rank_sectors(&series, day(3), 3, 0.5);
        assert_eq!(ranked[0].sector, "IT");
        assert_eq!(ranked[0].label, Some(SectorLabel::Leading));
        assert_eq!(ranked[1].label, Some(SectorLabel::NextLeader));
    }

    #[test]
    fn excludes_sectors_without_window_plus_one_days() {
        let series = map(vec![
            ("AUTO", series_of("AUTO", &[1.0, 1.0, 1.0])),
            ("IT", series_of("IT", &[1.0, 1.0, 1.0, 1.0])),
        ]);

        let ranked = rank_sectors(&series, day(3), 3, 0.5);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].sector, "IT");
    }

    #[test]
    fn huge_window_excludes_every_sector() {
        let series = map(vec![("IT", series_of("IT", &[1.0, 1.0, 1.0, 1.0]))]);
        assert!(rank_sectors(&series, day(3), usize::MAX, 0.5).is_empty());
    }

    #[test]
    fn ignores_days_after_target() {
        let series = map(vec![("IT", series_of("IT", &[1.0, 1.0, 1.0, 1.0, 50.0]))]);
        let ranked = rank_sectors(&series, day(3), 3, 0.5);
        assert_eq!(ranked[0].recent_avg_change, 1.0);
    }

    #[test]
    fn ranking_is_deterministic() {
        let series = map(vec![
            ("A", series_of("A", &[0.3, 0.1, 0.2, 0.4, 0.5, 0.6])),
            ("B", series_of("B", &[0.3, 0.1, 0.2, 0.4, 0.5, 0.6])),
            ("C", series_of("C", &[1.3, -0.1, 0.2, 0.9, 0.1, 0.6])),
        ]);
        let first = rank_sectors(&series, day(5), 5, 0.5);
        let second = rank_sectors(&series, day(5), 5, 0.5);
        assert_eq!(first, second);
        // Equal means fall back to name order.
        let names: Vec<_> = first.iter().map(|e| e.sector.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn trends_skip_sectors_missing_a_day() {
        let today = vec![
            series_of("IT", &[2.0]).remove(0),
            series_of("AUTO", &[-1.0]).remove(0),
            series_of("NEW", &[5.0]).remove(0),
        ];
        let previous = vec![
            series_of("IT", &[1.0]).remove(0),
            series_of("AUTO", &[1.0]).remove(0),
        ];

        let trends = sector_trends(&today, &previous);
        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].sector, "IT");
        assert_eq!(trends[0].trend, Trend::Strengthening);
        assert_eq!(trends[0].delta, 1.0);
        assert_eq!(trends[1].sector, "AUTO");
        assert_eq!(trends[1].trend, Trend::Weakening);
        assert_eq!(trends[1].delta, -2.0);
    }
}
