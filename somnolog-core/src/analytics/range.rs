//! Date-window filtering, applied before any other analytics.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::types::SleepLog;

/// Trailing windows offered as presets.
pub const PRESET_DAYS: [u32; 3] = [30, 60, 90];

/// Which logs a statistics query looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeFilter {
    /// Every log
    #[default]
    All,
    /// Logs started within the last `n` days (0 behaves like `All`)
    TrailingDays(u32),
    /// Logs started between the start of `from` and the end of `to`, local time
    Between { from: NaiveDate, to: NaiveDate },
}

impl RangeFilter {
    /// Parse a user-entered day count.
    ///
    /// Anything that is not a positive integer means "no filter".
    pub fn trailing_days_from_input(input: &str) -> Self {
        match input.trim().parse::<u32>() {
            Ok(n) if n > 0 => RangeFilter::TrailingDays(n),
            _ => RangeFilter::All,
        }
    }

    /// Apply the filter. `now` anchors trailing windows, `tz` defines days.
    pub fn apply<Tz: TimeZone>(
        &self,
        logs: &[SleepLog],
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> Vec<SleepLog> {
        match *self {
            RangeFilter::All => logs.to_vec(),
            RangeFilter::TrailingDays(days) => filter_by_trailing_days(logs, days, now),
            RangeFilter::Between { from, to } => filter_by_date_range(logs, from, to, tz),
        }
    }

    /// Short description for headings.
    pub fn describe(&self) -> String {
        match self {
            RangeFilter::All => "all time".to_string(),
            RangeFilter::TrailingDays(n) => format!("last {} days", n),
            RangeFilter::Between { from, to } => format!("{} to {}", from, to),
        }
    }
}

/// Keep logs with `start >= now - days`.
///
/// Zero days, or a window reaching past the earliest representable instant,
/// keeps everything.
pub fn filter_by_trailing_days(
    logs: &[SleepLog],
    days: u32,
    now: DateTime<Utc>,
) -> Vec<SleepLog> {
    if days == 0 {
        return logs.to_vec();
    }
    let Some(cutoff) = now.checked_sub_signed(Duration::days(i64::from(days))) else {
        tracing::debug!(days, "Trailing window out of range, keeping all logs");
        return logs.to_vec();
    };
    logs.iter().filter(|l| l.start >= cutoff).cloned().collect()
}

/// Keep logs whose start falls in `[start of from, end of to]` in `tz`.
pub fn filter_by_date_range<Tz: TimeZone>(
    logs: &[SleepLog],
    from: NaiveDate,
    to: NaiveDate,
    tz: &Tz,
) -> Vec<SleepLog> {
    let (lower, upper) = day_bounds(from, to, tz);
    logs.iter()
        .filter(|l| l.start >= lower && l.start <= upper)
        .cloned()
        .collect()
}

/// UTC instants of local midnight on `from` and 23:59:59.999 on `to`.
pub fn day_bounds<Tz: TimeZone>(
    from: NaiveDate,
    to: NaiveDate,
    tz: &Tz,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = from.and_time(chrono::NaiveTime::MIN);
    let end = to
        .and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_else(|| to.and_time(chrono::NaiveTime::MIN));
    (
        resolve_local(tz, start, true),
        resolve_local(tz, end, false),
    )
}

/// Longest run of skipped wall-clock hours searched past (a whole skipped day).
const MAX_GAP_HOURS: usize = 24;

/// Map a local wall-clock time to UTC, picking the earliest or latest
/// candidate around DST changes.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime, earliest: bool) -> DateTime<Utc> {
    resolve_with(
        |candidate| {
            tz.from_local_datetime(candidate)
                .map(|dt| dt.with_timezone(&Utc))
        },
        naive,
        earliest,
    )
}

/// A skipped wall time moves an hour at a time away from the range: forward
/// for a lower bound (`earliest`), backward for an upper bound.
fn resolve_with<F>(lookup: F, naive: NaiveDateTime, earliest: bool) -> DateTime<Utc>
where
    F: Fn(&NaiveDateTime) -> LocalResult<DateTime<Utc>>,
{
    let step = if earliest {
        Duration::hours(1)
    } else {
        Duration::hours(-1)
    };
    let mut candidate = naive;
    for _ in 0..=MAX_GAP_HOURS {
        match lookup(&candidate) {
            LocalResult::Single(dt) => return dt,
            LocalResult::Ambiguous(first, last) => return if earliest { first } else { last },
            LocalResult::None => match candidate.checked_add_signed(step) {
                Some(next) => candidate = next,
                None => break,
            },
        }
    }
    tracing::warn!(%naive, "No valid local time near boundary, reading it as UTC");
    Utc.from_utc_datetime(&naive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveTime, Timelike};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    fn logs() -> Vec<SleepLog> {
        vec![
            SleepLog::new("old", now() - Duration::days(45)),
            SleepLog::new("edge", now() - Duration::days(30)),
            SleepLog::new("just-out", now() - Duration::days(30) - Duration::milliseconds(1)),
            SleepLog::new("recent", now() - Duration::days(2)),
        ]
    }

    fn ids(logs: &[SleepLog]) -> Vec<&str> {
        logs.iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn test_trailing_days_inclusive_boundary() {
        let logs = logs();
        let kept = filter_by_trailing_days(&logs, 30, now());
        assert_eq!(ids(&kept), vec!["edge", "recent"]);
    }

    #[test]
    fn test_trailing_zero_days_keeps_all() {
        let logs = logs();
        assert_eq!(filter_by_trailing_days(&logs, 0, now()).len(), logs.len());
    }

    #[test]
    fn test_trailing_window_past_calendar_keeps_all() {
        let logs = logs();
        assert_eq!(filter_by_trailing_days(&logs, u32::MAX, now()).len(), logs.len());

        let huge = RangeFilter::trailing_days_from_input("100000000");
        assert_eq!(huge, RangeFilter::TrailingDays(100_000_000));
        assert_eq!(huge.apply(&logs, now(), &Utc).len(), logs.len());
    }

    #[test]
    fn test_trailing_days_from_input() {
        assert_eq!(RangeFilter::trailing_days_from_input("14"), RangeFilter::TrailingDays(14));
        assert_eq!(RangeFilter::trailing_days_from_input("0"), RangeFilter::All);
        assert_eq!(RangeFilter::trailing_days_from_input("two weeks"), RangeFilter::All);
        assert_eq!(RangeFilter::trailing_days_from_input("-3"), RangeFilter::All);

        let logs = logs();
        let all = RangeFilter::trailing_days_from_input("x").apply(&logs, now(), &Utc);
        assert_eq!(all.len(), logs.len());
    }

    #[test]
    fn test_date_range_is_inclusive_of_whole_days() {
        let day = |d: u32, h: u32, m: u32| Utc.with_ymd_and_hms(2024, 6, d, h, m, 0).unwrap();
        let logs = vec![
            SleepLog::new("before", day(9, 23, 59)),
            SleepLog::new("first", day(10, 0, 0)),
            SleepLog::new("middle", day(12, 3, 0)),
            SleepLog::new("last", day(14, 23, 59)),
            SleepLog::new("after", day(15, 0, 0)),
        ];
        let from = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();

        let kept = filter_by_date_range(&logs, from, to, &Utc);
        assert_eq!(ids(&kept), vec!["first", "middle", "last"]);

        let filter = RangeFilter::Between { from, to };
        assert_eq!(filter.apply(&logs, now(), &Utc).len(), 3);
    }

    #[test]
    fn test_date_range_uses_local_days() {
        // 22:30 UTC on the 9th is already the 10th at UTC+3
        let log = SleepLog::new("a", Utc.with_ymd_and_hms(2024, 6, 9, 22, 30, 0).unwrap());
        let tz = FixedOffset::east_opt(3 * 3600).unwrap();
        let from = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();

        assert_eq!(filter_by_date_range(std::slice::from_ref(&log), from, from, &tz).len(), 1);
        assert!(filter_by_date_range(std::slice::from_ref(&log), from, from, &Utc).is_empty());
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let logs = logs();
        let from = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(filter_by_date_range(&logs, from, to, &Utc).is_empty());
    }

    #[test]
    fn test_skipped_wall_time_moves_to_nearest_valid_instant() {
        // UTC+2 zone whose 00:00-01:00 on 2024-03-31 does not exist
        let gap_day = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let lookup = |n: &NaiveDateTime| {
            if n.date() == gap_day && n.hour() == 0 {
                LocalResult::None
            } else {
                LocalResult::Single(Utc.from_utc_datetime(&(*n - Duration::hours(2))))
            }
        };

        let midnight = gap_day.and_time(NaiveTime::MIN);
        assert_eq!(
            resolve_with(lookup, midnight, true),
            Utc.with_ymd_and_hms(2024, 3, 30, 23, 0, 0).unwrap()
        );

        let half_past = gap_day.and_hms_opt(0, 30, 0).unwrap();
        assert_eq!(
            resolve_with(lookup, half_past, false),
            Utc.with_ymd_and_hms(2024, 3, 30, 21, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_describe() {
        assert_eq!(RangeFilter::TrailingDays(60).describe(), "last 60 days");
        assert_eq!(RangeFilter::All.describe(), "all time");
    }
}
