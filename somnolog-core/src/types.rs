//! Core domain types for somnolog
//!
//! A [`SleepLog`] is one sleep interval entered by the person tracking their
//! sleep. The analytics engine only ever reads these; ownership of the
//! collection belongs to [`crate::store::LogStore`].
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Tag** | A free-text label on a log, many-to-many with logs |
//! | **Impact** | Mean outcome of logs carrying a tag minus mean of those without it |
//! | **Incidence** | Number of logs carrying a tag in the queried collection |
//! | **Baseline** | The "lacks tag" subset used as the comparison group |
//! | **Bucket** | One slot of a fixed temporal partition (a weekday, a month...) |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Error, Result};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Lowest accepted quality rating.
pub const MIN_QUALITY: u8 = 1;
/// Highest accepted quality rating.
pub const MAX_QUALITY: u8 = 10;

// ============================================
// SleepLog
// ============================================

/// A single logged sleep interval.
///
/// Serialized in camelCase so the on-disk collection stays a flat JSON array
/// of `{id, start, end?, quality?, tags, createdAt}` objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepLog {
    /// Opaque identifier, stable for the lifetime of the record
    pub id: String,
    /// When the sleep started
    pub start: DateTime<Utc>,
    /// When the sleep ended; `None` while the entry is open
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// Quality rating 1-10, if the person rated the night
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    /// Tags in insertion order, without duplicates
    #[serde(default)]
    pub tags: Vec<String>,
    /// When the record was created (not used by analytics)
    pub created_at: DateTime<Utc>,
}

impl SleepLog {
    /// Create a log with only the required fields set.
    pub fn new(id: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            start,
            end: None,
            quality: None,
            tags: Vec::new(),
            created_at: start,
        }
    }

    /// Set the end timestamp.
    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    /// Set the quality rating.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Replace the tags (normalized).
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    /// Elapsed hours between `start` and `end`.
    ///
    /// `None` when there is no end or the span is not positive; such entries
    /// are excluded from duration means rather than counted as zero.
    pub fn duration_hours(&self) -> Option<f64> {
        let end = self.end?;
        let millis = end.signed_duration_since(self.start).num_milliseconds();
        if millis > 0 {
            Some(millis as f64 / MILLIS_PER_HOUR)
        } else {
            None
        }
    }

    /// Quality as a float, for averaging.
    pub fn quality_value(&self) -> Option<f64> {
        self.quality.map(f64::from)
    }

    /// Whether this log carries `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// The instant this log stops occupying time: `end`, or `start` if open.
    pub fn interval_end(&self) -> DateTime<Utc> {
        self.end.unwrap_or(self.start)
    }
}

/// Trim tags, drop empties and collapse duplicates keeping first occurrence.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() || !seen.insert(tag.to_string()) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}

/// Check interval and rating constraints for a log about to be stored.
pub fn validate_entry(
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    quality: Option<u8>,
) -> Result<()> {
    if let Some(end) = end {
        if end <= start {
            return Err(Error::InvalidLog(
                "end time must be after start time".to_string(),
            ));
        }
    }
    if let Some(q) = quality {
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&q) {
            return Err(Error::InvalidLog(format!(
                "quality must be between {} and {}, got {}",
                MIN_QUALITY, MAX_QUALITY, q
            )));
        }
    }
    Ok(())
}

// ============================================
// Inputs
// ============================================

/// Fields supplied by the caller when adding a log.
#[derive(Debug, Clone)]
pub struct NewSleepLog {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub quality: Option<u8>,
    pub tags: Vec<String>,
}

/// Partial update applied to an existing log.
///
/// Outer `None` leaves a field untouched; `Some(None)` clears an optional one.
#[derive(Debug, Clone, Default)]
pub struct LogUpdate {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<Option<DateTime<Utc>>>,
    pub quality: Option<Option<u8>>,
    pub tags: Option<Vec<String>>,
}

/// A record as found in a file before it has been checked.
///
/// Every field is optional so one malformed entry can be skipped without
/// failing the whole collection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSleepLog {
    pub id: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub quality: Option<u8>,
    pub tags: Option<Vec<String>>,
    pub created_at: Option<String>,
}

impl RawSleepLog {
    /// Convert into a [`SleepLog`].
    ///
    /// Fails only when `start` is missing or unparseable. A bad `end` is
    /// dropped (the log then has no duration), a missing `id` falls back to
    /// the `start` string and a missing `createdAt` to `now`.
    pub fn into_log(self, now: DateTime<Utc>) -> Result<SleepLog> {
        let start_raw = self
            .start
            .ok_or_else(|| Error::InvalidLog("record has no start".to_string()))?;
        let start = parse_timestamp(&start_raw).ok_or_else(|| {
            Error::InvalidLog(format!("unparseable start timestamp: {}", start_raw))
        })?;

        let end = self.end.as_deref().and_then(|raw| {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                tracing::debug!(end = raw, "Ignoring unparseable end timestamp");
            }
            parsed
        });

        let created_at = self
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(now);

        Ok(SleepLog {
            id: self.id.unwrap_or_else(|| start_raw.clone()),
            start,
            end,
            quality: self.quality,
            tags: normalize_tags(self.tags.unwrap_or_default()),
            created_at,
        })
    }
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 23, 0, 0).unwrap()
    }

    #[test]
    fn test_duration_ninety_minutes() {
        let log = SleepLog::new("a", t0()).with_end(t0() + Duration::minutes(90));
        assert_eq!(log.duration_hours(), Some(1.5));
    }

    #[test]
    fn test_duration_unset_without_end() {
        let log = SleepLog::new("a", t0());
        assert_eq!(log.duration_hours(), None);
    }

    #[test]
    fn test_duration_unset_for_non_positive_span() {
        let same = SleepLog::new("a", t0()).with_end(t0());
        assert_eq!(same.duration_hours(), None);

        let backwards = SleepLog::new("b", t0()).with_end(t0() - Duration::hours(2));
        assert_eq!(backwards.duration_hours(), None);
    }

    #[test]
    fn test_normalize_tags() {
        let tags = normalize_tags([" sport", "coffee", "", "sport", "  ", "late "]);
        assert_eq!(tags, vec!["sport", "coffee", "late"]);
    }

    #[test]
    fn test_has_tag() {
        let log = SleepLog::new("a", t0()).with_tags(["sport", "coffee"]);
        assert!(log.has_tag("sport"));
        assert!(!log.has_tag("Sport"));
        assert!(!log.has_tag("tea"));
    }

    #[test]
    fn test_validate_entry() {
        assert!(validate_entry(t0(), Some(t0() + Duration::hours(8)), Some(7)).is_ok());
        assert!(validate_entry(t0(), None, None).is_ok());
        assert!(validate_entry(t0(), Some(t0()), None).is_err());
        assert!(validate_entry(t0(), None, Some(0)).is_err());
        assert!(validate_entry(t0(), None, Some(11)).is_err());
    }

    #[test]
    fn test_raw_log_conversion() {
        let raw: RawSleepLog = serde_json::from_value(serde_json::json!({
            "start": "2024-03-04T23:00:00.000Z",
            "end": "not a date",
            "quality": 6,
            "tags": ["sport", "sport"],
        }))
        .unwrap();

        let log = raw.into_log(t0()).unwrap();
        assert_eq!(log.id, "2024-03-04T23:00:00.000Z");
        assert_eq!(log.start, t0());
        assert_eq!(log.end, None);
        assert_eq!(log.quality, Some(6));
        assert_eq!(log.tags, vec!["sport"]);
        assert_eq!(log.created_at, t0());
    }

    #[test]
    fn test_raw_log_without_start_is_rejected() {
        let raw = RawSleepLog {
            id: Some("x".to_string()),
            ..Default::default()
        };
        assert!(matches!(raw.into_log(t0()), Err(Error::InvalidLog(_))));
    }

    #[test]
    fn test_serialized_shape() {
        let log = SleepLog::new("1", t0()).with_tags(["a"]);
        let value = serde_json::to_value(&log).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("end").is_none());
        assert!(value.get("quality").is_none());
        assert_eq!(value["tags"], serde_json::json!(["a"]));
    }
}
