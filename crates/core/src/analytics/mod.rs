//! Pure ranking, trend and signal computations over in-memory records.
//!
//! Nothing in here touches storage; the service layer loads a bounded window and hands it over.

pub mod momentum;
pub mod sector_ranking;
pub mod signal;
pub mod slope;
pub mod summary;
pub mod technical;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::domain::records::DailyRecord;

/// Groups records per symbol, each group sorted ascending by date.
pub fn group_by_symbol(records: &[DailyRecord]) -> BTreeMap<&str, Vec<&DailyRecord>> {
    let mut out: BTreeMap<&str, Vec<&DailyRecord>> = BTreeMap::new();
    for rec in records {
        out.entry(rec.symbol.as_str()).or_default().push(rec);
    }
    for rows in out.values_mut() {
        rows.sort_by_key(|r| r.date);
    }
    out
}

pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

pub(crate) fn desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn groups_and_sorts_by_date() {
        let records = vec![
            rec("IT", "TCS", day(2), 3.0, 0.0),
            rec("IT", "INFY", day(0), 1.0, 0.0),
            rec("IT", "TCS", day(0), 1.0, 0.0),
        ];
        let grouped = group_by_symbol(&records);
        assert_eq!(grouped.len(), 2);
        let tcs = &grouped["TCS"];
        assert_eq!(tcs[0].date, day(0));
        assert_eq!(tcs[1].date, day(2));
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(Vec::<f64>::new()), None);
        assert_eq!(mean([1.0, 2.0, 3.0]), Some(2.0));
    }
}
