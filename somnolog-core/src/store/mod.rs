//! Storage layer for somnolog
//!
//! The whole collection lives in one pretty-printed JSON array on disk and is
//! held in memory by [`LogStore`]. Every mutation rewrites the file, so the
//! on-disk copy is always the latest snapshot.
//!
//! Loading is forgiving: a record that cannot be read (no `start`, wrong
//! types) is skipped with a warning instead of failing the load.

pub mod import;

pub use import::{export_logs, import_file, import_logs, ImportSummary};

use crate::error::{Error, Result};
use crate::types::{normalize_tags, validate_entry, LogUpdate, NewSleepLog, RawSleepLog, SleepLog};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// In-memory log collection backed by a JSON file.
#[derive(Debug)]
pub struct LogStore {
    path: PathBuf,
    logs: Vec<SleepLog>,
}

impl LogStore {
    /// Open or create a store at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let logs = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                let value: Value = serde_json::from_str(&content)?;
                let (logs, malformed) = parse_collection(&value, Utc::now());
                if malformed > 0 {
                    tracing::warn!(
                        path = %path.display(),
                        malformed,
                        "Skipped unreadable sleep log records"
                    );
                }
                logs
            }
        } else {
            Vec::new()
        };

        tracing::debug!(path = %path.display(), count = logs.len(), "Opened log store");

        Ok(Self {
            path: path.to_path_buf(),
            logs,
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current snapshot, in insertion order
    pub fn logs(&self) -> &[SleepLog] {
        &self.logs
    }

    /// Number of stored logs
    pub fn len(&self) -> usize {
        self.logs.len()
    }

    /// Whether the store holds no logs
    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    /// Look up a log by id
    pub fn get(&self, id: &str) -> Option<&SleepLog> {
        self.logs.iter().find(|l| l.id == id)
    }

    // ============================================
    // Mutations
    // ============================================

    /// Validate, assign an id and persist a new log
    pub fn add(&mut self, new: NewSleepLog) -> Result<&SleepLog> {
        validate_entry(new.start, new.end, new.quality)?;

        let log = SleepLog {
            id: uuid::Uuid::new_v4().to_string(),
            start: new.start,
            end: new.end,
            quality: new.quality,
            tags: normalize_tags(new.tags),
            created_at: Utc::now(),
        };
        tracing::info!(id = %log.id, "Adding sleep log");

        self.logs.push(log);
        self.save()?;
        Ok(&self.logs[self.logs.len() - 1])
    }

    /// Apply a partial update to the log with `id` and persist
    pub fn update(&mut self, id: &str, update: LogUpdate) -> Result<&SleepLog> {
        let index = self.index_of(id)?;

        let mut log = self.logs[index].clone();
        if let Some(start) = update.start {
            log.start = start;
        }
        if let Some(end) = update.end {
            log.end = end;
        }
        if let Some(quality) = update.quality {
            log.quality = quality;
        }
        if let Some(tags) = update.tags {
            log.tags = normalize_tags(tags);
        }
        validate_entry(log.start, log.end, log.quality)?;

        tracing::info!(id, "Updating sleep log");
        self.logs[index] = log;
        self.save()?;
        Ok(&self.logs[index])
    }

    /// Remove the log with `id` and persist
    pub fn remove(&mut self, id: &str) -> Result<SleepLog> {
        let index = self.index_of(id)?;
        let removed = self.logs.remove(index);
        tracing::info!(id, "Removed sleep log");
        self.save()?;
        Ok(removed)
    }

    /// Remove every log and delete the backing file
    pub fn clear(&mut self) -> Result<()> {
        self.logs.clear();
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        tracing::info!(path = %self.path.display(), "Cleared log store");
        Ok(())
    }

    /// Rename `old` to `new` on every log carrying it; returns logs changed.
    ///
    /// A log that already had `new` keeps a single copy.
    pub fn rename_tag(&mut self, old: &str, new: &str) -> Result<usize> {
        let new = new.trim();
        if new.is_empty() {
            return Err(Error::InvalidLog("tag name cannot be empty".to_string()));
        }

        let mut changed = 0;
        for log in self.logs.iter_mut().filter(|l| l.has_tag(old)) {
            let renamed = log.tags.iter().map(|t| if t == old { new } else { t.as_str() });
            log.tags = normalize_tags(renamed);
            changed += 1;
        }

        if changed > 0 {
            tracing::info!(old, new, changed, "Renamed tag");
            self.save()?;
        }
        Ok(changed)
    }

    /// Remove `tag` from every log; returns logs changed.
    pub fn delete_tag(&mut self, tag: &str) -> Result<usize> {
        let mut changed = 0;
        for log in self.logs.iter_mut().filter(|l| l.has_tag(tag)) {
            log.tags.retain(|t| t != tag);
            changed += 1;
        }

        if changed > 0 {
            tracing::info!(tag, changed, "Deleted tag");
            self.save()?;
        }
        Ok(changed)
    }

    /// Append already-checked logs and persist once (used by import).
    pub(crate) fn extend(&mut self, logs: Vec<SleepLog>) -> Result<()> {
        if logs.is_empty() {
            return Ok(());
        }
        self.logs.extend(logs);
        self.save()
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.logs
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| Error::LogNotFound(id.to_string()))
    }

    /// Write the snapshot via a temp file so a crash never leaves half a file.
    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.logs)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), count = self.logs.len(), "Saved log store");
        Ok(())
    }
}

/// Records of a collection document: a top-level array, or an object with a
/// `logs` array. Nested arrays are flattened one level.
pub(crate) fn collection_records(value: &Value) -> Vec<&Value> {
    let items = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("logs") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    items
        .iter()
        .flat_map(|item| match item {
            Value::Array(inner) => inner.iter().collect::<Vec<_>>(),
            other => vec![other],
        })
        .collect()
}

/// Read every usable record; returns the logs and the number skipped.
pub fn parse_collection(value: &Value, now: DateTime<Utc>) -> (Vec<SleepLog>, usize) {
    let mut logs = Vec::new();
    let mut malformed = 0;

    for record in collection_records(value) {
        match parse_record(record, now) {
            Ok(log) => logs.push(log),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping sleep log record");
                malformed += 1;
            }
        }
    }
    (logs, malformed)
}

pub(crate) fn parse_record(record: &Value, now: DateTime<Utc>) -> Result<SleepLog> {
    let raw: RawSleepLog = serde_json::from_value(record.clone())?;
    raw.into_log(now)
}
