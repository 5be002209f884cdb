use std::collections::BTreeMap;

use crate::analytics::desc;
use crate::domain::records::SectorSummary;
use crate::domain::results::SectorSlope;

/// Margin a sector's slope must clear over the leader's to count as a candidate.
pub const SLOPE_EPSILON: f64 = 0.001;
pub const MAX_NEXT_LEADERS: usize = 3;

/// `(last - first) / (points - 1)` over a chronological series; `None` below two points.
pub fn trend_slope(series: &[SectorSummary]) -> Option<f64> {
    if series.len() < 2 {
        return None;
    }
    let first = series.first()?.avg_change_percent;
    let last = series.last()?.avg_change_percent;
    Some((last - first) / (series.len() - 1) as f64)
}

/// Slope per sector, steepest first.
pub fn sector_slopes(series: &BTreeMap<String, Vec<SectorSummary>>) -> Vec<SectorSlope> {
    let mut out: Vec<SectorSlope> = series
        .iter()
        .filter_map(|(sector, points)| {
            Some(SectorSlope {
                sector: sector.clone(),
                slope: trend_slope(points)?,
            })
        })
        .collect();
    out.sort_by(|a, b| desc(a.slope, b.slope).then_with(|| a.sector.cmp(&b.sector)));
    out
}

/// Sectors gaining momentum faster than the leader. Only considered while the leader's own slope
/// is flat or falling.
pub fn next_leading_sectors(slopes: &[SectorSlope], leader_slope: f64) -> Vec<SectorSlope> {
    if leader_slope >= SLOPE_EPSILON {
        return Vec::new();
    }
    slopes
        .iter()
        .filter(|s| s.slope > leader_slope + SLOPE_EPSILON)
        .take(MAX_NEXT_LEADERS)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::fixtures::day;

    fn series(sector: &str, changes: &[f64]) -> Vec<SectorSummary> {
        changes
            .iter()
            .enumerate()
            .map(|(i, c)| SectorSummary {
                sector: sector.to_string(),
                date: day(i as u32),
                avg_change_percent: *c,
                total_volume: 0,
                total_turnover: 0.0,
                record_count: 1,
            })
            .collect()
    }

    #[test]
    fn slope_from_first_and_last() {
        assert_eq!(trend_slope(&series("IT", &[1.0, 5.0, 0.0, 3.0])), Some(2.0 / 3.0));
        assert_eq!(trend_slope(&series("IT", &[1.0])), None);
    }

    #[test]
    fn excludes_single_point_sectors_and_sorts() {
        let mut map = BTreeMap::new();
        map.insert("A".to_string(), series("A", &[0.0, 1.0]));
        map.insert("B".to_string(), series("B", &[0.0, 4.0, 2.0]));
        map.insert("C".to_string(), series("C", &[7.0]));

        let slopes = sector_slopes(&map);
        let names: Vec<_> = slopes.iter().map(|s| s.sector.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn next_leaders_only_when_leader_is_flat() {
        let slopes = vec![
            SectorSlope { sector: "A".into(), slope: 0.5 },
            SectorSlope { sector: "B".into(), slope: 0.2 },
            SectorSlope { sector: "C".into(), slope: 0.1 },
            SectorSlope { sector: "D".into(), slope: 0.05 },
            SectorSlope { sector: "L".into(), slope: -0.1 },
        ];

        let next = next_leading_sectors(&slopes, -0.1);
        let names: Vec<_> = next.iter().map(|s| s.sector.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);

        assert!(next_leading_sectors(&slopes, 0.01).is_empty());
    }
}
