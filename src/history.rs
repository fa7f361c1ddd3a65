use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::state::Depth;

/// Most recent records kept per store; older entries are evicted.
pub const MAX_RECORDS: usize = 10;

/// A past query and its result. Identity for deduplication is the exact
/// (topic, depth) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub topic: String,
    pub depth: Depth,
    pub summary: String,
    /// Older files lack this field; loads stamp the current time instead.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Bounded, deduplicated, most-recent-first record of past queries,
/// write-through persisted to a single JSON file.
pub struct HistoryStore {
    path: PathBuf,
    records: Vec<HistoryRecord>,
}

impl HistoryStore {
    /// Open the store, rehydrating from `path`. A missing, unreadable, or
    /// corrupt file degrades to an empty list and never fails the caller.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = Self::load(&path);
        Self { path, records }
    }

    fn load(path: &Path) -> Vec<HistoryRecord> {
        if !path.exists() {
            return Vec::new();
        }
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read history, starting empty");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<HistoryRecord>>(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "history file is corrupt, starting empty");
                Vec::new()
            }
        }
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&HistoryRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert a record at the front, replacing any record with the same
    /// (topic, depth) key and truncating to `MAX_RECORDS`. The in-memory
    /// list keeps the mutation even when the write fails; the caller
    /// decides how to surface the persistence error.
    pub fn upsert(&mut self, record: HistoryRecord) -> Result<()> {
        self.records
            .retain(|r| !(r.topic == record.topic && r.depth == record.depth));
        self.records.insert(0, record);
        self.records.truncate(MAX_RECORDS);
        self.persist()
    }

    /// Remove the record at `index` and re-persist. Returns the removed
    /// record so callers can name it in their confirmation.
    pub fn remove(&mut self, index: usize) -> Result<HistoryRecord> {
        if index >= self.records.len() {
            anyhow::bail!("no history entry at position {}", index + 1);
        }
        let removed = self.records.remove(index);
        self.persist()?;
        Ok(removed)
    }

    /// Empty the list and delete the persisted file entirely.
    pub fn clear(&mut self) -> Result<()> {
        self.records.clear();
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("failed to remove {}", self.path.display()))?;
        }
        debug!("history cleared");
        Ok(())
    }

    /// Write the full list synchronously. Temp file plus rename, so a
    /// failed write never leaves a truncated history behind.
    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let json =
            serde_json::to_string_pretty(&self.records).context("failed to serialize history")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        debug!(count = self.records.len(), "history persisted");
        Ok(())
    }
}
