// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

use std::time::Duration;

use tokio::time::Instant;

/// Hard ceiling on how long `wait_idle` will ever block, regardless of the
/// requested idle window. Intentionally much larger than the 1 s window
/// used by clipboard restore; do not lower it to match that window.
pub const IDLE_WAIT_CAP: Duration = Duration::from_secs(60);

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Wait until `is_idle` reports true for a contiguous `idle_window`, or
/// until `IDLE_WAIT_CAP` elapses, whichever comes first.
///
/// `is_idle` is polled every ~25 ms; callers typically check "no stdout
/// activity since X" and "outbound buffer empty, no scheduled flush".
/// Returns `true` if the idle window was observed, `false` on timeout.
pub async fn wait_idle<F>(idle_window: Duration, mut is_idle: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    let mut idle_since: Option<Instant> = None;

    loop {
        let now = Instant::now();
        if now.duration_since(start) >= IDLE_WAIT_CAP {
            return false;
        }

        if is_idle() {
            let since = *idle_since.get_or_insert(now);
            if now.duration_since(since) >= idle_window {
                return true;
            }
        } else {
            idle_since = None;
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
#[path = "idle_tests.rs"]
mod tests;
