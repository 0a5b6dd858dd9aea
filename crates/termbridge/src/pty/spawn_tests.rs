// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

use super::*;

#[tokio::test]
async fn native_pty_echoes_output() {
    let command = vec!["printf".to_string(), "%s".to_string(), "hello".to_string()];
    let spawn_result = NativePty::spawn(&command, &[], None, 80, 24);
    let Ok((native, mut output_rx, _stdin_tx, join)) = spawn_result else {
        // forkpty can be unavailable in some sandboxes; skip rather than fail.
        return;
    };

    let mut collected = Vec::new();
    while let Some(chunk) = output_rx.recv().await {
        collected.extend_from_slice(&chunk);
    }
    assert!(native.pid().is_some());

    let status = join.await.expect("join").expect("exit status");
    assert_eq!(status.code, Some(0));
    assert!(collected.ends_with(b"hello"));
}

#[tokio::test]
async fn resize_updates_atomics_without_erroring() {
    let command = vec!["sleep".to_string(), "0.2".to_string()];
    let Ok((native, _output_rx, _stdin_tx, _join)) =
        NativePty::spawn(&command, &[], None, 80, 24)
    else {
        return;
    };

    native.resize(120, 40).expect("resize should succeed on a real pty");
    assert_eq!(native.cols.load(std::sync::atomic::Ordering::Relaxed), 120);
    assert_eq!(native.rows.load(std::sync::atomic::Ordering::Relaxed), 40);
}
