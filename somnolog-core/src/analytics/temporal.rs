//! Temporal bucketing for tag heatmaps.
//!
//! A [`Bucket`] maps a log's start time (in the caller's time zone) to a slot
//! of a fixed-size partition. Counts per slot give incidence; deltas per slot
//! compare rated logs with and without a tag inside that slot only.

use chrono::{DateTime, Datelike, TimeZone};
use serde::Serialize;

use super::impact::Polarity;
use crate::types::SleepLog;

/// Deltas closer to zero than this render as neutral cells.
pub const NEUTRAL_DELTA: f64 = 1e-3;

/// Lowest intensity of a non-empty heatmap cell.
const MIN_INTENSITY: f64 = 0.2;

/// A temporal partition of log start times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// 7 slots, 0 = Sunday
    DayOfWeek,
    /// 31 slots, 0 = the 1st
    DayOfMonth,
    /// 12 slots, 0 = January
    MonthOfYear,
}

impl Bucket {
    /// All partitions, in heatmap display order.
    pub const ALL: [Bucket; 3] = [Bucket::DayOfWeek, Bucket::DayOfMonth, Bucket::MonthOfYear];

    /// Number of slots.
    pub fn size(&self) -> usize {
        match self {
            Bucket::DayOfWeek => 7,
            Bucket::DayOfMonth => 31,
            Bucket::MonthOfYear => 12,
        }
    }

    /// Slot of a timestamp, always `< self.size()`.
    pub fn index<Tz: TimeZone>(&self, ts: &DateTime<Tz>) -> usize {
        match self {
            Bucket::DayOfWeek => ts.weekday().num_days_from_sunday() as usize,
            Bucket::DayOfMonth => ts.day0() as usize,
            Bucket::MonthOfYear => ts.month0() as usize,
        }
    }

    /// Slot of a log's start time as seen in `tz`.
    pub fn index_of<Tz: TimeZone>(&self, log: &SleepLog, tz: &Tz) -> usize {
        self.index(&log.start.with_timezone(tz))
    }

    /// Short display label for each slot.
    pub fn labels(&self) -> Vec<String> {
        match self {
            Bucket::DayOfWeek => ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            Bucket::DayOfMonth => (1..=31).map(|d| d.to_string()).collect(),
            Bucket::MonthOfYear => [
                "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }

    /// Heading for this partition.
    pub fn title(&self) -> &'static str {
        match self {
            Bucket::DayOfWeek => "Day of week",
            Bucket::DayOfMonth => "Day of month",
            Bucket::MonthOfYear => "Month of year",
        }
    }
}

/// Number of logs per slot.
///
/// The counts always sum to the number of logs given.
pub fn bucket_counts<'a, I, Tz>(logs: I, bucket: Bucket, tz: &Tz) -> Vec<u32>
where
    I: IntoIterator<Item = &'a SleepLog>,
    Tz: TimeZone,
{
    let mut out = vec![0u32; bucket.size()];
    for log in logs {
        out[bucket.index_of(log, tz)] += 1;
    }
    out
}

#[derive(Default, Clone, Copy)]
struct QualitySum {
    sum: f64,
    n: u32,
}

impl QualitySum {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.n += 1;
    }

    fn mean(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.sum / self.n as f64
        }
    }
}

/// Per-slot quality delta of `tag` against the baseline in the same slot.
///
/// Only rated logs take part. A slot with no rated logs on either side uses
/// 0.0 for that side's mean.
pub fn bucket_deltas<Tz: TimeZone>(
    logs: &[SleepLog],
    tag: &str,
    bucket: Bucket,
    tz: &Tz,
) -> Vec<f64> {
    let mut with_tag = vec![QualitySum::default(); bucket.size()];
    let mut without_tag = vec![QualitySum::default(); bucket.size()];

    for log in logs {
        let Some(quality) = log.quality_value() else {
            continue;
        };
        let slot = bucket.index_of(log, tz);
        if log.has_tag(tag) {
            with_tag[slot].add(quality);
        } else {
            without_tag[slot].add(quality);
        }
    }

    with_tag
        .iter()
        .zip(&without_tag)
        .map(|(w, wo)| w.mean() - wo.mean())
        .collect()
}

/// One rendered heatmap cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatCell {
    /// Incidence in this slot
    pub count: u32,
    /// Quality delta in this slot
    pub delta: f64,
    /// 0.0 for empty cells, otherwise 0.2..=1.0 scaled by `count / max`
    pub intensity: f64,
    /// `None` for empty cells
    pub polarity: Option<Polarity>,
}

impl HeatCell {
    /// Classify a slot against the heatmap's maximum count.
    pub fn classify(count: u32, delta: f64, max_count: u32) -> Self {
        if count == 0 {
            return Self {
                count,
                delta,
                intensity: 0.0,
                polarity: None,
            };
        }
        let ratio = (count as f64 / max_count.max(1) as f64).min(1.0);
        Self {
            count,
            delta,
            intensity: MIN_INTENSITY + (1.0 - MIN_INTENSITY) * ratio,
            polarity: Some(Polarity::with_tolerance(delta, NEUTRAL_DELTA)),
        }
    }
}

/// Counts and deltas of one tag over one partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketSeries {
    pub bucket: Bucket,
    pub counts: Vec<u32>,
    pub deltas: Vec<f64>,
}

impl BucketSeries {
    /// Build the series for `tag`: counts over the tagged logs, deltas over all.
    pub fn build<Tz: TimeZone>(logs: &[SleepLog], tag: &str, bucket: Bucket, tz: &Tz) -> Self {
        Self {
            bucket,
            counts: bucket_counts(logs.iter().filter(|l| l.has_tag(tag)), bucket, tz),
            deltas: bucket_deltas(logs, tag, bucket, tz),
        }
    }

    /// Largest slot count.
    pub fn max_count(&self) -> u32 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Cells scaled against `scale_max`.
    pub fn cells(&self, scale_max: u32) -> Vec<HeatCell> {
        self.counts
            .iter()
            .zip(&self.deltas)
            .map(|(&count, &delta)| HeatCell::classify(count, delta, scale_max))
            .collect()
    }
}

/// Full heatmap of a tag: day of week, day of month and month of year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagHeatmap {
    pub tag: String,
    pub day_of_week: BucketSeries,
    pub day_of_month: BucketSeries,
    pub month_of_year: BucketSeries,
}

impl TagHeatmap {
    pub fn build<Tz: TimeZone>(logs: &[SleepLog], tag: &str, tz: &Tz) -> Self {
        Self {
            tag: tag.to_string(),
            day_of_week: BucketSeries::build(logs, tag, Bucket::DayOfWeek, tz),
            day_of_month: BucketSeries::build(logs, tag, Bucket::DayOfMonth, tz),
            month_of_year: BucketSeries::build(logs, tag, Bucket::MonthOfYear, tz),
        }
    }

    /// The three series in display order.
    pub fn series(&self) -> [&BucketSeries; 3] {
        [&self.day_of_week, &self.day_of_month, &self.month_of_year]
    }

    /// Largest count across all three series.
    pub fn max_count(&self) -> u32 {
        self.series().iter().map(|s| s.max_count()).max().unwrap_or(0)
    }

    /// Shared colour scale for this heatmap (never below 1).
    pub fn scale_max(&self) -> u32 {
        self.max_count().max(1)
    }
}

/// Two heatmaps drawn side by side on one intensity scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagComparison {
    pub left: TagHeatmap,
    pub right: TagHeatmap,
    /// Largest count across both heatmaps (never below 1)
    pub scale_max: u32,
}

impl TagComparison {
    pub fn build<Tz: TimeZone>(logs: &[SleepLog], left: &str, right: &str, tz: &Tz) -> Self {
        let left = TagHeatmap::build(logs, left, tz);
        let right = TagHeatmap::build(logs, right, tz);
        let scale_max = left.max_count().max(right.max_count()).max(1);
        Self {
            left,
            right,
            scale_max,
        }
    }
}
