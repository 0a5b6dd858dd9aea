// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::debug;

use super::Indexer;

const DEBOUNCE: Duration = Duration::from_millis(300);

/// Watch the index root for filesystem changes and request a debounced
/// refresh on each burst of events. Runs until the watcher itself errors
/// out or its channel closes.
pub async fn run_notify_watch(indexer: Arc<Indexer>) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res| {
        let _ = tx.send(res);
    })?;
    watcher.watch(indexer.root(), RecursiveMode::Recursive)?;

    loop {
        let first = match rx.recv().await {
            Some(event) => event,
            None => return Ok(()),
        };
        if let Err(e) = first {
            debug!(error = %e, "notify watcher reported an error");
        }

        // Debounce: drain anything else that arrives within the window
        // before triggering a single refresh.
        let _ = tokio::time::timeout(DEBOUNCE, async {
            while rx.recv().await.is_some() {}
        })
        .await;

        indexer.request_refresh();
    }
}

/// Periodic rescan fallback for trees too small to justify notifications,
/// or when the notify backend is unavailable.
pub async fn run_polling(indexer: Arc<Indexer>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        indexer.request_refresh();
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
