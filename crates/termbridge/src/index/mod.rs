// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

pub mod ignore;
pub mod search;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

/// A single indexed filesystem entry, relative to the index root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub short: String,
    pub path: String,
    #[serde(rename = "isDir")]
    pub is_dir: bool,
}

/// Immutable result of a scan, swapped in atomically.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    pub root: PathBuf,
    pub entries: Arc<Vec<Entry>>,
}

impl IndexSnapshot {
    fn empty(root: PathBuf) -> Self {
        Self {
            root,
            entries: Arc::new(Vec::new()),
        }
    }
}

/// Trees at or above this size prefer filesystem notifications over
/// polling, when notifications are available.
pub const MASSIVE_TREE_THRESHOLD: usize = 40_000;

const POLL_INTERVAL: Duration = Duration::from_secs(5);
const REFRESH_RATE_LIMIT: Duration = Duration::from_millis(500);

/// Background recursive indexer. Holds the current snapshot behind a
/// `RwLock` so search reads never block on a rescan in progress; the
/// rescan builds a whole new `Vec` and swaps it in at the end.
pub struct Indexer {
    root: PathBuf,
    snapshot: RwLock<IndexSnapshot>,
    last_refresh: RwLock<Instant>,
    refresh_requested: AtomicBool,
}

impl Indexer {
    pub fn new(root: impl Into<PathBuf>) -> Arc<Self> {
        let root = root.into();
        Arc::new(Self {
            snapshot: RwLock::new(IndexSnapshot::empty(root.clone())),
            last_refresh: RwLock::new(Instant::now() - REFRESH_RATE_LIMIT),
            refresh_requested: AtomicBool::new(false),
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshot(&self) -> IndexSnapshot {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Perform one full scan and swap the snapshot in.
    pub fn rescan(&self) {
        let entries = match ignore::scan(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "index scan failed, keeping previous snapshot");
                return;
            }
        };
        debug!(count = entries.len(), "index rescan complete");
        let mut guard = self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = IndexSnapshot {
            root: self.root.clone(),
            entries: Arc::new(entries),
        };
    }

    /// Non-blocking, rate-limited request to rescan. Coalesces bursts of
    /// requests (e.g. many filesystem events) into a single scan.
    pub fn request_refresh(self: &Arc<Self>) {
        let due = {
            let last = *self
                .last_refresh
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            last.elapsed() >= REFRESH_RATE_LIMIT
        };
        if !due {
            self.refresh_requested.store(true, Ordering::SeqCst);
            return;
        }

        self.refresh_requested.store(false, Ordering::SeqCst);
        {
            let mut last = self
                .last_refresh
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *last = Instant::now();
        }
        let indexer = Arc::clone(self);
        tokio::task::spawn_blocking(move || indexer.rescan());
    }

    /// Whether the current snapshot is large enough to prefer
    /// filesystem-notification-based strategy over polling.
    pub fn is_massive(&self) -> bool {
        self.snapshot().entries.len() >= MASSIVE_TREE_THRESHOLD
    }
}

/// Spawn the background strategy loop: notify-based watching with
/// debounce for massive trees (falling back to polling if the watcher
/// can't be set up), plain polling otherwise.
pub fn spawn_background_scan(indexer: Arc<Indexer>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        indexer.rescan();
        if indexer.is_massive() {
            if watch::run_notify_watch(Arc::clone(&indexer)).await.is_ok() {
                return;
            }
            warn!("falling back to polling: notify watcher unavailable");
        }
        watch::run_polling(indexer, POLL_INTERVAL).await;
    })
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
