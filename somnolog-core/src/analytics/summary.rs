//! Summaries for the overview screens: overall averages, recent windows,
//! a calendar month and the daily trend.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::impact::{impact_for_tag, impacts_for, tag_counts, TagImpact};
use super::ranking::{by_incidence, top_negative, top_positive, ImpactKey, RankingOptions};
use super::split::mean;
use crate::types::SleepLog;

/// Hours after the last logged wake-up before asking about last night.
pub const LAST_NIGHT_PROMPT_HOURS: i64 = 14;

/// Number of top tags listed in a month summary.
pub const MONTH_TOP_TAGS: usize = 3;

/// Mean duration and quality over a set of logs.
///
/// Both default to 0.0 when no log has data; check the sample counts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct OverallAverages {
    pub avg_duration: f64,
    pub avg_quality: f64,
    pub duration_samples: u32,
    pub quality_samples: u32,
}

impl OverallAverages {
    pub fn compute<'a, I>(logs: I) -> Self
    where
        I: IntoIterator<Item = &'a SleepLog>,
    {
        let mut durations = Vec::new();
        let mut qualities = Vec::new();
        for log in logs {
            durations.extend(log.duration_hours());
            qualities.extend(log.quality_value());
        }
        Self {
            avg_duration: mean(durations.iter().copied()).unwrap_or(0.0),
            avg_quality: mean(qualities.iter().copied()).unwrap_or(0.0),
            duration_samples: durations.len() as u32,
            quality_samples: qualities.len() as u32,
        }
    }
}

/// Statistics over the most recent `n` logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSummary {
    /// Requested window size
    pub window: usize,
    /// Logs actually in the window
    pub logs: usize,
    pub averages: OverallAverages,
    /// Window mean duration minus the all-time mean
    pub duration_vs_overall: f64,
    /// Window mean quality minus the all-time mean
    pub quality_vs_overall: f64,
    /// Tag with the largest positive quality delta inside the window
    pub most_positive: Option<TagImpact>,
    /// Tag with the largest negative quality delta inside the window
    pub most_negative: Option<TagImpact>,
}

impl WindowSummary {
    /// Summarise the `window` most recent logs by start time (at least one).
    pub fn recent(logs: &[SleepLog], window: usize) -> Self {
        let mut sorted: Vec<&SleepLog> = logs.iter().collect();
        sorted.sort_by(|a, b| b.start.cmp(&a.start));
        sorted.truncate(window.max(1));

        let slice: Vec<SleepLog> = sorted.into_iter().cloned().collect();
        let averages = OverallAverages::compute(&slice);
        let overall = OverallAverages::compute(logs);

        let impacts = impacts_for(&slice);
        let options = RankingOptions::unfiltered(ImpactKey::Quality, 1);
        let most_positive = top_positive(&impacts, options).first().map(|i| (*i).clone());
        let most_negative = top_negative(&impacts, options).first().map(|i| (*i).clone());

        Self {
            window,
            logs: slice.len(),
            averages,
            duration_vs_overall: averages.avg_duration - overall.avg_duration,
            quality_vs_overall: averages.avg_quality - overall.avg_quality,
            most_positive,
            most_negative,
        }
    }
}

/// Whether the newest log ended (or, if open, started) long enough ago that
/// last night is probably missing. Always true for an empty collection.
pub fn needs_last_night_entry(logs: &[SleepLog], now: DateTime<Utc>) -> bool {
    match logs.iter().max_by_key(|l| l.start) {
        None => true,
        Some(latest) => latest.interval_end() < now - Duration::hours(LAST_NIGHT_PROMPT_HOURS),
    }
}

/// A frequent tag of one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthTag {
    /// Logs in the month carrying the tag
    pub month_count: u32,
    /// Impact over the whole collection
    #[serde(flatten)]
    pub impact: TagImpact,
}

/// One calendar month of logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary {
    pub year: i32,
    /// 1-12
    pub month: u32,
    /// Logs started in this month
    pub logs: usize,
    pub averages: OverallAverages,
    /// Mean duration per calendar day (index 0 = the 1st)
    pub daily_duration: Vec<Option<f64>>,
    /// Mean quality per calendar day (index 0 = the 1st)
    pub daily_quality: Vec<Option<f64>>,
    /// The month's most frequent tags
    pub top_tags: Vec<MonthTag>,
}

impl MonthSummary {
    /// Summarise `year`-`month` as seen in `tz`. Returns `None` for an invalid month.
    pub fn build<Tz: TimeZone>(logs: &[SleepLog], year: i32, month: u32, tz: &Tz) -> Option<Self> {
        let days = days_in_month(year, month)?;

        let month_logs: Vec<SleepLog> = logs
            .iter()
            .filter(|l| {
                let local = l.start.with_timezone(tz);
                local.year() == year && local.month() == month
            })
            .cloned()
            .collect();

        let mut durations: Vec<Vec<f64>> = vec![Vec::new(); days];
        let mut qualities: Vec<Vec<f64>> = vec![Vec::new(); days];
        for log in &month_logs {
            let day = log.start.with_timezone(tz).day0() as usize;
            durations[day].extend(log.duration_hours());
            qualities[day].extend(log.quality_value());
        }

        let mut counts = tag_counts(&month_logs);
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        let top_tags = counts
            .into_iter()
            .take(MONTH_TOP_TAGS)
            .map(|(tag, month_count)| MonthTag {
                month_count,
                impact: impact_for_tag(logs, &tag),
            })
            .collect();

        Some(Self {
            year,
            month,
            logs: month_logs.len(),
            averages: OverallAverages::compute(&month_logs),
            daily_duration: durations.into_iter().map(mean).collect(),
            daily_quality: qualities.into_iter().map(mean).collect(),
            top_tags,
        })
    }
}

/// Number of days in a month, or `None` if the month is invalid.
pub fn days_in_month(year: i32, month: u32) -> Option<usize> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(next.signed_duration_since(first).num_days() as usize)
}

/// One point of the daily trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub avg_duration: Option<f64>,
    pub avg_quality: Option<f64>,
}

/// Per-date means over the most recent dates that have logs.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DailyTrend {
    /// Oldest first
    pub points: Vec<TrendPoint>,
}

impl DailyTrend {
    /// Build the trend over the last `max_days` distinct local dates.
    pub fn build<Tz: TimeZone>(logs: &[SleepLog], tz: &Tz, max_days: usize) -> Self {
        let mut by_date: BTreeMap<NaiveDate, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
        for log in logs {
            let date = log.start.with_timezone(tz).date_naive();
            let entry = by_date.entry(date).or_default();
            entry.0.extend(log.duration_hours());
            entry.1.extend(log.quality_value());
        }

        let skip = by_date.len().saturating_sub(max_days);
        let points = by_date
            .into_iter()
            .skip(skip)
            .map(|(date, (durations, qualities))| TrendPoint {
                date,
                avg_duration: mean(durations),
                avg_quality: mean(qualities),
            })
            .collect();

        Self { points }
    }

    /// Duration series with gaps.
    pub fn durations(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.avg_duration).collect()
    }

    /// Quality series with gaps.
    pub fn qualities(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.avg_quality).collect()
    }

    /// A series is worth charting with at least two points that differ.
    pub fn is_chartable(series: &[Option<f64>]) -> bool {
        let values: Vec<f64> = series.iter().flatten().copied().collect();
        values.len() >= 2 && values.iter().any(|v| *v != values[0])
    }
}

/// Tags ordered by incidence, for "most common tags" listings.
pub fn common_tags(logs: &[SleepLog], limit: usize) -> Vec<TagImpact> {
    let impacts = impacts_for(logs);
    by_incidence(&impacts)
        .into_iter()
        .take(limit)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn at(m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, h, 0, 0).unwrap()
    }

    fn night(id: &str, start: DateTime<Utc>, hours: i64, quality: u8, tags: &[&str]) -> SleepLog {
        SleepLog::new(id, start)
            .with_end(start + Duration::hours(hours))
            .with_quality(quality)
            .with_tags(tags.iter().copied())
    }

    #[test]
    fn test_overall_averages_skip_missing() {
        let logs = vec![
            night("1", at(1, 1, 22), 8, 6, &[]),
            SleepLog::new("2", at(1, 2, 22)),
            night("3", at(1, 3, 22), 6, 8, &[]),
        ];
        let avg = OverallAverages::compute(&logs);
        assert_eq!(avg.avg_duration, 7.0);
        assert_eq!(avg.avg_quality, 7.0);
        assert_eq!(avg.duration_samples, 2);

        let empty = OverallAverages::compute(&[]);
        assert_eq!(empty.avg_quality, 0.0);
        assert_eq!(empty.quality_samples, 0);
    }

    #[test]
    fn test_recent_window() {
        let logs = vec![
            night("old", at(1, 1, 22), 9, 9, &["holiday"]),
            night("a", at(2, 1, 22), 6, 4, &["coffee"]),
            night("b", at(2, 2, 22), 8, 8, &["sport"]),
            night("c", at(2, 3, 22), 7, 6, &[]),
        ];
        let window = WindowSummary::recent(&logs, 3);
        assert_eq!(window.logs, 3);
        assert_eq!(window.averages.avg_duration, 7.0);
        assert_eq!(window.averages.avg_quality, 6.0);
        // overall: duration 7.5, quality 6.75
        assert_eq!(window.duration_vs_overall, -0.5);
        assert_eq!(window.quality_vs_overall, -0.75);
        assert_eq!(window.most_positive.as_ref().unwrap().tag, "sport");
        assert_eq!(window.most_negative.as_ref().unwrap().tag, "coffee");
    }

    #[test]
    fn test_recent_window_floors_at_one() {
        let logs = vec![night("a", at(2, 1, 22), 6, 4, &[]), night("b", at(2, 2, 22), 8, 8, &[])];
        let window = WindowSummary::recent(&logs, 0);
        assert_eq!(window.logs, 1);
        assert_eq!(window.averages.avg_quality, 8.0);
        assert!(window.most_positive.is_none());
    }

    #[test]
    fn test_needs_last_night_entry() {
        let now = at(3, 10, 12);
        assert!(needs_last_night_entry(&[], now));

        let fresh = vec![night("a", at(3, 9, 23), 8, 7, &[])];
        assert!(!needs_last_night_entry(&fresh, now));

        let stale = vec![night("a", at(3, 7, 23), 8, 7, &[])];
        assert!(needs_last_night_entry(&stale, now));

        // open entry started 13 hours ago
        let open = vec![SleepLog::new("b", now - Duration::hours(13))];
        assert!(!needs_last_night_entry(&open, now));
    }

    #[test]
    fn test_month_summary() {
        let logs = vec![
            night("1", at(2, 1, 22), 8, 8, &["sport"]),
            night("2", at(2, 1, 23), 6, 6, &["sport", "late"]),
            night("3", at(2, 29, 22), 7, 5, &["late"]),
            night("4", at(3, 1, 22), 9, 9, &["sport"]),
            night("5", at(1, 31, 22), 5, 4, &["coffee"]),
        ];
        let summary = MonthSummary::build(&logs, 2024, 2, &Utc).unwrap();
        assert_eq!(summary.logs, 3);
        assert_eq!(summary.daily_duration.len(), 29);
        assert_eq!(summary.daily_duration[0], Some(7.0));
        assert_eq!(summary.daily_quality[28], Some(5.0));
        assert_eq!(summary.daily_quality[10], None);

        let tags: Vec<_> = summary
            .top_tags
            .iter()
            .map(|t| (t.impact.tag.as_str(), t.month_count))
            .collect();
        assert_eq!(tags, vec![("sport", 2), ("late", 2)]);
        // impact measured on the full collection: sport 8,6,9 vs 5,4
        let sport = &summary.top_tags[0].impact;
        assert_eq!(sport.count, 3);
        assert_eq!(sport.quality_samples, 3);
        assert!((sport.delta_quality - (23.0 / 3.0 - 4.5)).abs() < 1e-9);

        assert!(MonthSummary::build(&logs, 2024, 13, &Utc).is_none());
    }

    #[test]
    fn test_month_summary_respects_time_zone() {
        let logs = vec![night("1", at(2, 29, 23), 8, 8, &[])];
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(MonthSummary::build(&logs, 2024, 2, &tz).unwrap().logs, 0);
        assert_eq!(MonthSummary::build(&logs, 2024, 3, &tz).unwrap().logs, 1);
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2023, 2), Some(28));
        assert_eq!(days_in_month(2024, 12), Some(31));
        assert_eq!(days_in_month(2024, 0), None);
    }

    #[test]
    fn test_daily_trend() {
        let logs = vec![
            night("1", at(1, 3, 22), 8, 8, &[]),
            night("2", at(1, 1, 22), 6, 6, &[]),
            night("3", at(1, 1, 23), 8, 4, &[]),
            SleepLog::new("4", at(1, 2, 22)),
        ];
        let trend = DailyTrend::build(&logs, &Utc, 30);
        let dates: Vec<_> = trend.points.iter().map(|p| p.date.day()).collect();
        assert_eq!(dates, vec![1, 2, 3]);
        assert_eq!(trend.durations(), vec![Some(7.0), None, Some(8.0)]);
        assert_eq!(trend.qualities(), vec![Some(5.0), None, Some(8.0)]);
        assert!(DailyTrend::is_chartable(&trend.durations()));

        let last_two = DailyTrend::build(&logs, &Utc, 2);
        assert_eq!(last_two.points.len(), 2);
        assert_eq!(last_two.points[0].date.day(), 2);
    }

    #[test]
    fn test_trend_chartable() {
        assert!(!DailyTrend::is_chartable(&[Some(7.0)]));
        assert!(!DailyTrend::is_chartable(&[Some(7.0), None, Some(7.0)]));
        assert!(DailyTrend::is_chartable(&[Some(7.0), Some(6.5)]));
        assert!(!DailyTrend::is_chartable(&[]));
    }

    #[test]
    fn test_common_tags() {
        let logs = vec![
            night("1", at(1, 1, 22), 8, 8, &["a", "b"]),
            night("2", at(1, 2, 22), 8, 8, &["b"]),
        ];
        let common = common_tags(&logs, 1);
        assert_eq!(common.len(), 1);
        assert_eq!(common[0].tag, "b");
    }
}
