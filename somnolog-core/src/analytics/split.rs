//! Baseline splitting.
//!
//! Partitions a collection into the logs carrying a tag and the baseline of
//! logs that do not.

use crate::types::SleepLog;

/// Split `logs` into (`with_tag`, `without_tag`), preserving input order.
pub fn split_by_tag<'a>(
    logs: &'a [SleepLog],
    tag: &str,
) -> (Vec<&'a SleepLog>, Vec<&'a SleepLog>) {
    logs.iter().partition(|log| log.has_tag(tag))
}

/// Arithmetic mean, or `None` for an empty input.
pub(crate) fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// Mean quality over the logs that have a rating, and how many did.
pub(crate) fn quality_mean(logs: &[&SleepLog]) -> (Option<f64>, u32) {
    let values: Vec<f64> = logs.iter().filter_map(|l| l.quality_value()).collect();
    (mean(values.iter().copied()), values.len() as u32)
}

/// Mean duration over the logs with a positive span, and how many had one.
pub(crate) fn duration_mean(logs: &[&SleepLog]) -> (Option<f64>, u32) {
    let values: Vec<f64> = logs.iter().filter_map(|l| l.duration_hours()).collect();
    (mean(values.iter().copied()), values.len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn sample() -> Vec<SleepLog> {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 22, 0, 0).unwrap();
        vec![
            SleepLog::new("1", base).with_tags(["sport"]),
            SleepLog::new("2", base + Duration::days(1)).with_tags(["coffee"]),
            SleepLog::new("3", base + Duration::days(2)).with_tags(["sport", "coffee"]),
            SleepLog::new("4", base + Duration::days(3)),
        ]
    }

    #[test]
    fn test_split_is_complete_and_disjoint() {
        let logs = sample();
        for tag in ["sport", "coffee", "missing", ""] {
            let (with, without) = split_by_tag(&logs, tag);
            assert_eq!(with.len() + without.len(), logs.len(), "tag {tag:?}");
            for log in &with {
                assert!(!without.iter().any(|o| o.id == log.id));
                assert!(log.has_tag(tag));
            }
            for log in &without {
                assert!(!log.has_tag(tag));
            }
        }
    }

    #[test]
    fn test_split_keeps_order() {
        let logs = sample();
        let (with, without) = split_by_tag(&logs, "sport");
        let with_ids: Vec<_> = with.iter().map(|l| l.id.as_str()).collect();
        let without_ids: Vec<_> = without.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(with_ids, vec!["1", "3"]);
        assert_eq!(without_ids, vec!["2", "4"]);
    }

    #[test]
    fn test_mean_of_empty_is_none() {
        assert_eq!(mean(std::iter::empty()), None);
        assert_eq!(mean([2.0, 4.0]), Some(3.0));
    }
}
