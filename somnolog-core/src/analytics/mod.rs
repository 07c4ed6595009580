//! Analytics module for somnolog
//!
//! Turns a snapshot of sleep logs into comparative statistics:
//! - Baseline splitting ("has tag" / "lacks tag")
//! - Per-tag impact on quality and duration
//! - Ranked top-positive / top-negative / most-common tag lists
//! - Temporal heatmaps (day of week, day of month, month of year)
//! - Date-window filtering
//! - Overview summaries (recent windows, calendar months, daily trend)
//!
//! ## Data flow
//!
//! ```text
//! RangeFilter ──► impacts_for / TagHeatmap ──► ranking ──► front-end
//! ```
//!
//! Every function is pure over the slice it is given. Nothing is cached:
//! callers recompute after any change to the collection.
//!
//! ## Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use somnolog_core::analytics::{impacts_for, top_positive, RankingOptions};
//! use somnolog_core::SleepLog;
//!
//! let start = Utc.with_ymd_and_hms(2024, 1, 1, 22, 0, 0).unwrap();
//! let logs = vec![
//!     SleepLog::new("1", start).with_quality(8).with_tags(["sport"]),
//!     SleepLog::new("2", start).with_quality(4),
//! ];
//! let impacts = impacts_for(&logs);
//! let best = top_positive(&impacts, RankingOptions::default().with_min_count(1));
//! assert_eq!(best[0].tag, "sport");
//! ```

pub mod impact;
pub mod range;
pub mod ranking;
pub mod split;
pub mod summary;
pub mod temporal;

pub use impact::{impact_for_tag, impacts_for, tag_counts, Polarity, TagImpact};
pub use range::{filter_by_date_range, filter_by_trailing_days, RangeFilter, PRESET_DAYS};
pub use ranking::{
    by_incidence, filter_by_query, min_sample_threshold, mixed_incidence, top_negative,
    top_positive, ImpactKey, RankingOptions, DEFAULT_MIN_SAMPLE, DEFAULT_TOP_COUNT,
};
pub use split::split_by_tag;
pub use summary::{
    common_tags, needs_last_night_entry, DailyTrend, MonthSummary, MonthTag, OverallAverages,
    TrendPoint, WindowSummary,
};
pub use temporal::{
    bucket_counts, bucket_deltas, Bucket, BucketSeries, HeatCell, TagComparison, TagHeatmap,
};
