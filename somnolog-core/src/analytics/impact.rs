//! Tag impact aggregation.
//!
//! For every tag in a collection, compares the logs carrying the tag with the
//! baseline of logs that don't. Means skip missing values: a log without a
//! rating does not pull the quality mean toward zero, a log without a valid
//! end does not count as a zero-hour night.
//!
//! The mean of an empty subset is reported as `0.0`. `count` and the
//! `*_samples` fields are the only way to tell "no data" from a real zero.

use serde::Serialize;
use std::collections::HashMap;

use super::split::{duration_mean, quality_mean, split_by_tag};
use crate::types::SleepLog;

/// Comparative statistics for one tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagImpact {
    /// The tag
    pub tag: String,
    /// Incidence: number of logs carrying the tag
    pub count: u32,
    /// Mean quality of rated logs with the tag (0.0 if none are rated)
    pub avg_quality: f64,
    /// Mean hours of logs with the tag and a valid duration (0.0 if none)
    pub avg_duration: f64,
    /// `avg_quality` minus the baseline's mean quality
    pub delta_quality: f64,
    /// `avg_duration` minus the baseline's mean duration
    pub delta_duration: f64,
    /// Tagged logs that contributed to `avg_quality`
    pub quality_samples: u32,
    /// Tagged logs that contributed to `avg_duration`
    pub duration_samples: u32,
}

impl TagImpact {
    /// Quality delta plus duration delta, used by the combined-score rankings.
    pub fn combined_delta(&self) -> f64 {
        self.delta_quality + self.delta_duration
    }

    /// Whether any tagged log carried a quality rating.
    pub fn has_quality_data(&self) -> bool {
        self.quality_samples > 0
    }

    /// Whether any tagged log had a usable duration.
    pub fn has_duration_data(&self) -> bool {
        self.duration_samples > 0
    }
}

/// Direction of a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

impl Polarity {
    /// Sign of `value`; only an exact zero is neutral.
    pub fn of(value: f64) -> Self {
        Self::with_tolerance(value, 0.0)
    }

    /// Sign of `value`, treating `|value| <= tolerance` as neutral.
    pub fn with_tolerance(value: f64, tolerance: f64) -> Self {
        if value.is_nan() || value.abs() <= tolerance {
            Polarity::Neutral
        } else if value > 0.0 {
            Polarity::Positive
        } else {
            Polarity::Negative
        }
    }
}

/// Distinct tags with their incidence, in order of first appearance.
pub fn tag_counts(logs: &[SleepLog]) -> Vec<(String, u32)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(String, u32)> = Vec::new();
    for log in logs {
        for tag in &log.tags {
            match index.get(tag.as_str()) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    index.insert(tag.as_str(), counts.len());
                    counts.push((tag.clone(), 1));
                }
            }
        }
    }
    counts
}

/// Impact of a single tag against the rest of `logs`.
///
/// Works for tags absent from the collection too (count 0, zero means).
pub fn impact_for_tag(logs: &[SleepLog], tag: &str) -> TagImpact {
    let (with_tag, without_tag) = split_by_tag(logs, tag);

    let (with_quality, quality_samples) = quality_mean(&with_tag);
    let (without_quality, _) = quality_mean(&without_tag);
    let (with_duration, duration_samples) = duration_mean(&with_tag);
    let (without_duration, _) = duration_mean(&without_tag);

    let avg_quality = with_quality.unwrap_or(0.0);
    let avg_duration = with_duration.unwrap_or(0.0);

    TagImpact {
        tag: tag.to_string(),
        count: with_tag.len() as u32,
        avg_quality,
        avg_duration,
        delta_quality: avg_quality - without_quality.unwrap_or(0.0),
        delta_duration: avg_duration - without_duration.unwrap_or(0.0),
        quality_samples,
        duration_samples,
    }
}

/// One [`TagImpact`] per distinct tag in `logs`, in first-appearance order.
pub fn impacts_for(logs: &[SleepLog]) -> Vec<TagImpact> {
    let impacts: Vec<TagImpact> = tag_counts(logs)
        .into_iter()
        .map(|(tag, _)| impact_for_tag(logs, &tag))
        .collect();

    tracing::debug!(
        logs = logs.len(),
        tags = impacts.len(),
        "Computed tag impacts"
    );
    impacts
}
