//! ==============================================================================
//! history.rs - append-only reading log
//! ==============================================================================
//!
//! purpose:
//!     keeps every successfully polled reading in a single json array on disk,
//!     in arrival order. existing entries are never rewritten or reordered.
//!
//! file format:
//!     [
//!       { "timestamp": "2025-03-01T08:15:00", "temperature": 21.3, "humidity": 48.0 },
//!       ...
//!     ]
//!
//! failure model:
//!     - missing or empty file -> empty history
//!     - a record that does not parse -> skipped on load, kept as-is on disk
//!     - unreadable file or invalid json on load -> empty history
//!     - unreadable file or invalid json on append -> HistoryError, the file
//!       is left untouched
//!     - write failure -> HistoryError, reported by the caller, loop continues
//!
//!     single writer, single process. writes go to a sibling temp file that
//!     is renamed over the log, so a crash mid-write leaves the old file.
//!
//! ==============================================================================

use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::domain::HistoryRecord;
use crate::error::HistoryError;

pub struct HistoryStore {
    path: PathBuf,
    max_records: Option<usize>,
}

impl HistoryStore {
    /// open the log, creating the directory and an empty `[]` file if needed
    pub fn open<P: AsRef<Path>>(dir: P, file: &str, max_records: Option<usize>) -> Result<Self, HistoryError> {
        fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(file);
        if !path.exists() {
            fs::write(&path, "[]")?;
        }
        Ok(Self { path, max_records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// the raw entries on disk; a missing or empty file is an empty log
    fn read_entries(&self) -> Result<Vec<Value>, HistoryError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_str(&content)?)
    }

    /// the full history in arrival order
    pub fn load_all(&self) -> Vec<HistoryRecord> {
        let entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("history {} not readable, treating as empty: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        let total = entries.len();
        let records: Vec<HistoryRecord> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();

        if records.len() < total {
            tracing::warn!("history {}: skipped {} malformed records", self.path.display(), total - records.len());
        }
        records
    }

    /// add one record after all existing ones
    pub fn append(&self, record: HistoryRecord) -> Result<usize, HistoryError> {
        // entries we cannot parse are carried over untouched
        let mut entries = self.read_entries()?;
        entries.push(serde_json::to_value(record)?);

        if let Some(max) = self.max_records {
            if entries.len() > max {
                entries.drain(..entries.len() - max);
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(entries.len())
    }
}
