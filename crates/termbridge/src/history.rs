// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A single saved prompt, persisted as one JSON line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptEntry {
    pub id: String,
    #[serde(rename = "timestampMs")]
    pub timestamp_ms: u64,
    pub serialized_content: String,
    pub project_cwd: String,
}

/// Append-only, id-keyed prompt history store under a per-user data
/// directory. Writes are append-only; removal rewrites the file filtered
/// by id, since JSONL has no in-place delete.
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Resolve the default per-user history file location.
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let base = dirs::data_dir().ok_or_else(|| anyhow::anyhow!("no data directory for this platform"))?;
        Ok(base.join("termbridge").join("prompt-history.jsonl"))
    }

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry. The caller supplies `id`, `timestamp_ms` comes
    /// from the caller too so history survives the process that wrote it.
    pub fn save(&self, entry: &PromptEntry) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(entry)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Ordered (oldest-first) list of every entry currently on disk.
    /// Returns an empty list rather than failing so a history error never
    /// blocks session startup.
    pub fn load(&self) -> Vec<PromptEntry> {
        let file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };
        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect()
    }

    /// Remove the entry with `id`, rewriting the file without it.
    pub fn remove(&self, id: &str) -> anyhow::Result<()> {
        let remaining: Vec<PromptEntry> = self
            .load()
            .into_iter()
            .filter(|entry| entry.id != id)
            .collect();

        let tmp_path = self.path.with_extension("jsonl.tmp");
        {
            let mut tmp = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            for entry in &remaining {
                writeln!(tmp, "{}", serde_json::to_string(entry)?)?;
            }
        }
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
