//! Formatting helpers shared across front-ends.

use chrono::{DateTime, Utc};

/// Format hours as "7h 30m", rounded to the nearest minute.
pub fn format_duration(hours: f64) -> String {
    let total_minutes = (hours.max(0.0) * 60.0).round() as i64;
    format!("{}h {}m", total_minutes / 60, total_minutes % 60)
}

/// Format a signed duration difference, e.g. "+1h 5m" or "-0h 30m".
pub fn format_duration_delta(hours: f64) -> String {
    let sign = if hours > 0.0 {
        "+"
    } else if hours < 0.0 {
        "-"
    } else {
        ""
    };
    format!("{}{}", sign, format_duration(hours.abs()))
}

/// Format a signed quality difference with one decimal, e.g. "+1.5".
pub fn format_quality_delta(delta: f64) -> String {
    if delta > 0.0 {
        format!("+{:.1}", delta)
    } else if delta < 0.0 {
        format!("{:.1}", delta)
    } else {
        "0.0".to_string()
    }
}

/// Format an optional mean, or "-" when there is no data.
pub fn format_opt(value: Option<f64>, f: impl Fn(f64) -> String) -> String {
    value.map(f).unwrap_or_else(|| "-".to_string())
}

/// Format a timestamp relative to `now` (e.g., "2h ago").
pub fn format_relative_time(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(ts);

    if duration.num_seconds() < 0 {
        "just now".to_string()
    } else if duration.num_seconds() < 60 {
        format!("{}s ago", duration.num_seconds())
    } else if duration.num_minutes() < 60 {
        format!("{}m ago", duration.num_minutes())
    } else if duration.num_hours() < 24 {
        format!("{}h ago", duration.num_hours())
    } else if duration.num_days() < 7 {
        format!("{}d ago", duration.num_days())
    } else {
        ts.format("%b %d").to_string()
    }
}

/// Split comma-separated user input into normalized tags.
pub fn parse_tags(input: &str) -> Vec<String> {
    crate::types::normalize_tags(input.split(','))
}

// ============================================
// Bands
// ============================================

/// How good a night's length was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationBand {
    NoData,
    Poor,
    Fair,
    Good,
}

impl DurationBand {
    pub fn of(hours: Option<f64>) -> Self {
        match hours {
            Some(h) if h >= 6.0 => DurationBand::Good,
            Some(h) if h >= 4.0 => DurationBand::Fair,
            Some(h) if h > 0.0 => DurationBand::Poor,
            _ => DurationBand::NoData,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DurationBand::NoData => "no data",
            DurationBand::Poor => "short",
            DurationBand::Fair => "fair",
            DurationBand::Good => "good",
        }
    }
}

/// How good a quality rating (or mean rating) was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityBand {
    NoData,
    Poor,
    Fair,
    Good,
}

impl QualityBand {
    pub fn of(quality: Option<f64>) -> Self {
        match quality {
            Some(q) if q >= 7.0 => QualityBand::Good,
            Some(q) if q >= 4.0 => QualityBand::Fair,
            Some(q) if q > 0.0 => QualityBand::Poor,
            _ => QualityBand::NoData,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityBand::NoData => "no data",
            QualityBand::Poor => "poor",
            QualityBand::Fair => "fair",
            QualityBand::Good => "good",
        }
    }
}
