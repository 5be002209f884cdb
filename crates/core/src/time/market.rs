//! NSE session calendar.

use std::collections::BTreeSet;

use anyhow::Context;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Utc, Weekday};

/// India Standard Time, UTC+05:30.
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Equity closes at 15:30 IST; feeds settle by 16:00.
const SESSION_SETTLED_AT: (u32, u32) = (16, 0);

/// Republic Day, Independence Day, Gandhi Jayanti, Christmas.
const FIXED_HOLIDAYS: [(u32, u32); 4] = [(1, 26), (8, 15), (10, 2), (12, 25)];

#[derive(Debug, Clone, Default)]
pub struct NseCalendar {
    /// Exchange-announced closures that move year to year (Diwali, Holi, ...).
    extra_holidays: BTreeSet<NaiveDate>,
}

impl NseCalendar {
    pub fn with_holidays(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            extra_holidays: holidays.into_iter().collect(),
        }
    }

    /// Fixed holidays plus `MARKET_HOLIDAYS="YYYY-MM-DD,YYYY-MM-DD"`. Unparsable entries are
    /// logged and skipped.
    pub fn from_env() -> Self {
        let raw = std::env::var("MARKET_HOLIDAYS").unwrap_or_default();
        Self::with_holidays(parse_holiday_list(&raw))
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
        let fixed = FIXED_HOLIDAYS.contains(&(date.month(), date.day()));
        !(weekend || fixed || self.extra_holidays.contains(&date))
    }

    /// `date` itself if it is a session, otherwise the closest earlier session.
    pub fn session_on_or_before(&self, mut date: NaiveDate) -> NaiveDate {
        while !self.is_trading_day(date) {
            date -= Duration::days(1);
        }
        date
    }

    /// Latest session whose data has settled at `now_utc`.
    pub fn last_settled_session(&self, now_utc: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
        let ist = FixedOffset::east_opt(IST_OFFSET_SECS).context("invalid IST offset")?;
        let now = now_utc.with_timezone(&ist);

        let (h, m) = SESSION_SETTLED_AT;
        let settled_at = NaiveTime::from_hms_opt(h, m, 0).context("invalid settle time")?;
        let today = now.date_naive();
        let candidate = if now.time() >= settled_at {
            today
        } else {
            today - Duration::days(1)
        };
        Ok(self.session_on_or_before(candidate))
    }
}

fn parse_holiday_list(raw: &str) -> Vec<NaiveDate> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(err) => {
                tracing::warn!(entry = s, error = %err, "ignoring malformed MARKET_HOLIDAYS entry");
                None
            }
        })
        .collect()
}

/// Explicit `YYYY-MM-DD` argument, or the most recent settled NSE session.
pub fn resolve_as_of_date(arg: Option<&str>, now_utc: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
    match arg {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid date {s:?}, expected YYYY-MM-DD")),
        None => NseCalendar::from_env().last_settled_session(now_utc),
    }
}
