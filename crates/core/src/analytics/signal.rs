use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::analytics::{desc, mean};
use crate::domain::records::SectorSummary;
use crate::domain::results::{LeaderDetail, SignalAction, SignalDetails, TradingSignal};

/// Calendar days covered by the leader moving average, the target date included.
pub const MOVING_AVERAGE_DAYS: i64 = 3;

/// Mean `avg_change_percent` over `[date - 2, date]`. Missing days shrink the window.
pub fn three_day_average(series: &[SectorSummary], date: NaiveDate) -> Option<f64> {
    let start = date
        .checked_sub_signed(Duration::days(MOVING_AVERAGE_DAYS - 1))
        .unwrap_or(NaiveDate::MIN);
    mean(
        series
            .iter()
            .filter(|s| s.date >= start && s.date <= date)
            .map(|s| s.avg_change_percent),
    )
}

pub fn decide(
    current_avg: Option<f64>,
    next_avg: Option<f64>,
    threshold: f64,
) -> (SignalAction, String) {
    let Some(current) = current_avg else {
        return (SignalAction::Hold, "insufficient data".to_string());
    };
    let Some(next) = next_avg else {
        return (
            SignalAction::HoldCurrentLeader,
            "no next leader to compare against; hold current leader".to_string(),
        );
    };

    if current + threshold < next {
        (
            SignalAction::RotateToNextLeader,
            format!(
                "next leader 3-day average {next:.2}% exceeds current leader {current:.2}% by more than {threshold}; rotate to next leader"
            ),
        )
    } else {
        (
            SignalAction::HoldCurrentLeader,
            format!(
                "current leader 3-day average {current:.2}% is within {threshold} of next leader {next:.2}%; hold current leader"
            ),
        )
    }
}

/// Builds the leader/next-leader signal for `date` from that day's sector summaries and each
/// sector's daily series. Returns `None` when no sector has data on `date`.
pub fn trading_signal(
    date: NaiveDate,
    day: &[SectorSummary],
    series: &BTreeMap<String, Vec<SectorSummary>>,
    threshold: f64,
) -> Option<TradingSignal> {
    let mut ordered: Vec<&SectorSummary> = day.iter().filter(|s| s.date == date).collect();
    ordered.sort_by(|a, b| {
        desc(a.avg_change_percent, b.avg_change_percent).then_with(|| a.sector.cmp(&b.sector))
    });

    let current = *ordered.first()?;
    let next = ordered.iter().copied().find(|s| s.sector != current.sector);

    let avg_for = |sector: &str| {
        series
            .get(sector)
            .and_then(|points| three_day_average(points, date))
    };

    let current_avg = avg_for(&current.sector);
    let next_avg = next.and_then(|n| avg_for(&n.sector));
    let (signal, reason) = decide(current_avg, next_avg, threshold);

    Some(TradingSignal {
        date,
        signal,
        reason,
        current_leader: current.sector.clone(),
        next_leader: next.map(|n| n.sector.clone()),
        details: SignalDetails {
            current_leader: LeaderDetail {
                three_day_avg_change_percent: current_avg,
                today_change_percent: current.avg_change_percent,
            },
            next_leader: next.map(|n| LeaderDetail {
                three_day_avg_change_percent: next_avg,
                today_change_percent: n.avg_change_percent,
            }),
        },
    })
}
