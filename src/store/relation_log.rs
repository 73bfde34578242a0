//! Append-only duplicate relation log.
//!
//! Relations are stored as newline-delimited JSON (JSONL). Writers take an
//! exclusive advisory lock for the read-check-append cycle, so concurrent
//! dedup runs never write the same relation twice.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dedup::DuplicateRelation;

/// One line of the relation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationRecord {
    /// When the relation was recorded
    pub ts: DateTime<Utc>,

    /// Deterministic id (see [`DuplicateRelation::relation_id`])
    pub relation_id: String,

    pub prediction_id: String,

    pub canonical_id: String,

    pub similarity_score: f64,

    /// Conversation the batch was drawn from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl RelationRecord {
    /// Create a record stamped with the current time
    pub fn new(relation: &DuplicateRelation, conversation_id: Option<String>) -> Self {
        Self {
            ts: Utc::now(),
            relation_id: relation.relation_id(),
            prediction_id: relation.prediction_id.clone(),
            canonical_id: relation.canonical_id.clone(),
            similarity_score: relation.similarity_score,
            conversation_id,
        }
    }
}

/// File-backed relation log
#[derive(Debug, Clone)]
pub struct RelationLog {
    path: PathBuf,
}

impl RelationLog {
    /// Open a log at `path`, creating parent directories if needed
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        Ok(Self { path })
    }

    /// Open the log configured in `$PREDUP_HOME` / config file
    pub fn open_default() -> Result<Self> {
        Self::open(crate::config::relations_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append records whose relation id is not already in the log.
    ///
    /// Returns how many were written.
    pub fn append(&self, records: &[RelationRecord]) -> Result<usize> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open relation log: {}", self.path.display()))?;

        file.lock_exclusive()
            .context("Failed to acquire file lock on relation log")?;

        let mut known = read_relation_ids(&file)?;
        let mut written = 0;

        for record in records {
            if !known.insert(record.relation_id.clone()) {
                debug!(relation_id = %record.relation_id, "Relation already recorded");
                continue;
            }
            let json = serde_json::to_string(record).context("Failed to serialize relation")?;
            writeln!(file, "{}", json).context("Failed to write relation")?;
            written += 1;
        }

        file.flush().context("Failed to flush relation log")?;

        // Lock is released when file is dropped
        Ok(written)
    }

    /// Load all records in append order
    pub fn load(&self) -> Result<Vec<RelationRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open relation log: {}", self.path.display()))?;

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: RelationRecord = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse relation line: {}", line))?;
            records.push(record);
        }

        Ok(records)
    }
}

/// Relation ids already present in an open log file
fn read_relation_ids(file: &File) -> Result<HashSet<String>> {
    #[derive(Deserialize)]
    struct IdOnly {
        relation_id: String,
    }

    let mut ids = HashSet::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: IdOnly = serde_json::from_str(&line)
            .with_context(|| format!("Failed to parse relation line: {}", line))?;
        ids.insert(entry.relation_id);
    }
    Ok(ids)
}
