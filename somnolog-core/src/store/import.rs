//! Bulk import and export of log collections.
//!
//! Import accepts the same document shapes the store itself reads (a bare
//! array, or `{"logs": [...]}`) and never adds a record whose interval
//! overlaps one already present, including records added earlier in the same
//! import. A record whose id is already taken gets a fresh one.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::{collection_records, parse_record, LogStore};
use crate::error::Result;
use crate::types::SleepLog;

/// Outcome of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Records appended to the store
    pub added: usize,
    /// Records dropped because they overlap an existing interval
    pub skipped: usize,
    /// Records that could not be read at all
    pub malformed: usize,
}

/// Half-open overlap test; an open log occupies the single instant `start`.
/// Two logs starting at the same instant always collide.
fn overlaps(a: (DateTime<Utc>, DateTime<Utc>), b: (DateTime<Utc>, DateTime<Utc>)) -> bool {
    a.0 == b.0 || (a.0 < b.1 && b.0 < a.1)
}

/// Import every usable record of `document` into the store.
pub fn import_logs(store: &mut LogStore, document: &Value) -> Result<ImportSummary> {
    let now = Utc::now();
    let mut intervals: Vec<(DateTime<Utc>, DateTime<Utc>)> = store
        .logs()
        .iter()
        .map(|l| (l.start, l.interval_end()))
        .collect();

    let mut ids: HashSet<String> = store.logs().iter().map(|l| l.id.clone()).collect();

    let mut summary = ImportSummary::default();
    let mut accepted: Vec<SleepLog> = Vec::new();

    for record in collection_records(document) {
        let mut log = match parse_record(record, now) {
            Ok(log) => log,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unreadable import record");
                summary.malformed += 1;
                continue;
            }
        };

        let interval = (log.start, log.interval_end());
        if intervals.iter().any(|&existing| overlaps(interval, existing)) {
            summary.skipped += 1;
            continue;
        }

        if ids.contains(&log.id) {
            let fresh = uuid::Uuid::new_v4().to_string();
            tracing::debug!(
                id = %log.id,
                new_id = %fresh,
                "Renaming imported log with a taken id"
            );
            log.id = fresh;
        }
        ids.insert(log.id.clone());
        intervals.push(interval);
        accepted.push(log);
        summary.added += 1;
    }

    store.extend(accepted)?;

    tracing::info!(
        added = summary.added,
        skipped = summary.skipped,
        malformed = summary.malformed,
        "Import complete"
    );
    Ok(summary)
}

/// Read a JSON document from `path` and import it.
pub fn import_file(store: &mut LogStore, path: &Path) -> Result<ImportSummary> {
    let content = std::fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(&content)?;
    import_logs(store, &document)
}

/// Write the whole collection to `path` as a pretty-printed JSON array.
pub fn export_logs(store: &LogStore, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(store.logs())?;
    std::fs::write(path, json)?;
    tracing::info!(path = %path.display(), count = store.len(), "Exported logs");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewSleepLog;
    use chrono::{Duration, TimeZone};
    use serde_json::json;
    use tempfile::TempDir;

    fn store_with_night() -> (TempDir, LogStore) {
        let dir = TempDir::new().unwrap();
        let mut store = LogStore::open(&dir.path().join("logs.json")).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 22, 0, 0).unwrap();
        store
            .add(NewSleepLog {
                start,
                end: Some(start + Duration::hours(8)),
                quality: Some(6),
                tags: vec![],
            })
            .unwrap();
        (dir, store)
    }

    #[test]
    fn test_import_skips_overlaps_and_malformed() {
        let (_dir, mut store) = store_with_night();
        let document = json!([
            // overlaps the stored night
            {"start": "2024-05-02T03:00:00Z", "end": "2024-05-02T09:00:00Z"},
            // touches its end exactly: no overlap
            {"start": "2024-05-02T06:00:00Z", "end": "2024-05-02T07:00:00Z", "quality": 4},
            // overlaps the record above, which was accepted first
            {"start": "2024-05-02T06:30:00Z", "end": "2024-05-02T06:45:00Z"},
            {"id": "no-start"},
            {"start": "2024-05-03T22:00:00Z", "tags": ["sport"]}
        ]);

        let summary = import_logs(&mut store, &document).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                added: 2,
                skipped: 2,
                malformed: 1
            }
        );
        assert_eq!(store.len(), 3);
        assert_eq!(store.logs()[2].id, "2024-05-03T22:00:00Z");
    }

    #[test]
    fn test_import_reassigns_taken_ids() {
        let (_dir, mut store) = store_with_night();
        let existing = store.logs()[0].id.clone();
        let document = json!([
            {"id": "x", "start": "2024-05-05T22:00:00Z"},
            {"id": "x", "start": "2024-05-09T22:00:00Z"},
            {"id": existing, "start": "2024-05-12T22:00:00Z"}
        ]);

        let summary = import_logs(&mut store, &document).unwrap();
        assert_eq!(summary.added, 3);

        let ids: HashSet<&str> = store.logs().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids.len(), 4);
        assert!(ids.contains("x"));

        let reopened = LogStore::open(store.path()).unwrap();
        let first = reopened.get("x").unwrap();
        assert_eq!(first.start, Utc.with_ymd_and_hms(2024, 5, 5, 22, 0, 0).unwrap());
        assert_eq!(reopened.get(&existing).unwrap().quality, Some(6));
    }

    #[test]
    fn test_overlap_rules() {
        let at = |h: u32| Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap();

        assert!(overlaps((at(1), at(5)), (at(4), at(8))));
        assert!(!overlaps((at(1), at(4)), (at(4), at(8))));
        // open log inside a closed one
        assert!(overlaps((at(3), at(3)), (at(1), at(5))));
        // duplicate open logs
        assert!(overlaps((at(3), at(3)), (at(3), at(3))));
        assert!(!overlaps((at(3), at(3)), (at(4), at(4))));
    }

    #[test]
    fn test_import_accepts_wrapped_and_nested_shapes() {
        let (_dir, mut store) = store_with_night();
        let document = json!({
            "logs": [
                [{"id": "a", "start": "2024-06-01T22:00:00Z"}],
                {"id": "b", "start": "2024-06-02T22:00:00Z"}
            ]
        });

        let summary = import_logs(&mut store, &document).unwrap();
        assert_eq!(summary.added, 2);

        let reopened = LogStore::open(store.path()).unwrap();
        assert!(reopened.get("a").is_some());
        assert!(reopened.get("b").is_some());
    }

    #[test]
    fn test_export_then_import_into_fresh_store() {
        let (dir, store) = store_with_night();
        let export = dir.path().join("out/export.json");
        export_logs(&store, &export).unwrap();

        let mut fresh = LogStore::open(&dir.path().join("fresh.json")).unwrap();
        let summary = import_file(&mut fresh, &export).unwrap();
        assert_eq!(summary.added, 1);
        assert_eq!(fresh.logs(), store.logs());

        // a second import of the same file overlaps everything
        let again = import_file(&mut fresh, &export).unwrap();
        assert_eq!(again.added, 0);
        assert_eq!(again.skipped, 1);
    }
}
