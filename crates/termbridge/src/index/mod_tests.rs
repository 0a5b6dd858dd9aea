// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

use super::*;

#[test]
fn rescan_populates_snapshot_atomically() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("a.txt"), "x").expect("write");
    std::fs::write(dir.path().join("b.txt"), "x").expect("write");

    let indexer = Indexer::new(dir.path());
    assert!(indexer.snapshot().entries.is_empty());

    indexer.rescan();
    assert_eq!(indexer.snapshot().entries.len(), 2);
}

#[test]
fn is_massive_reflects_entry_count_against_threshold() {
    let dir = tempfile::tempdir().expect("tempdir");
    let indexer = Indexer::new(dir.path());
    indexer.rescan();
    assert!(!indexer.is_massive());
}

#[tokio::test]
async fn request_refresh_is_rate_limited_but_eventually_runs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let indexer = Indexer::new(dir.path());

    indexer.request_refresh();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(indexer.snapshot().entries.len(), 0);

    std::fs::write(dir.path().join("c.txt"), "x").expect("write");
    // Wait out the rate-limit window, then request again: this is the
    // shape `watch::run_polling`/`run_notify_watch` actually drive it in.
    tokio::time::sleep(std::time::Duration::from_millis(600)).await;
    indexer.request_refresh();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(indexer.snapshot().entries.len(), 1);
}
