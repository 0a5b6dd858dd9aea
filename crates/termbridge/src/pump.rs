// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::time::Instant;

use crate::replay::{RingBuffer, REPLAY_CAP};

/// Minimum time between outbound stdout frames on a session, except when
/// an immediate flush is requested.
pub const THROTTLE_INTERVAL: Duration = Duration::from_millis(200);

/// Size of the chunks the pump reads from a session's stdout.
pub const READ_CHUNK: usize = 32 * 1024;

/// Replay ring + outbound buffer + throttle bookkeeping for one session's
/// pump. Callers (the session router) hold this behind the session mutex
/// and drive reads/flushes from the pump task.
pub struct PumpState {
    pub replay: RingBuffer,
    last_seq: u64,
    out_buf: BytesMut,
    last_send: Instant,
    last_enqueue: Instant,
    need_immediate: bool,
    flush_scheduled: bool,
}

impl PumpState {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            replay: RingBuffer::new(REPLAY_CAP),
            last_seq: 0,
            out_buf: BytesMut::new(),
            last_send: now,
            last_enqueue: now,
            need_immediate: false,
            flush_scheduled: false,
        }
    }

    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    pub fn last_enqueue(&self) -> Instant {
        self.last_enqueue
    }

    pub fn outbound_is_empty(&self) -> bool {
        self.out_buf.is_empty()
    }

    pub fn flush_is_scheduled(&self) -> bool {
        self.flush_scheduled
    }

    pub fn mark_needs_immediate(&mut self) {
        self.need_immediate = true;
    }

    /// Append a freshly-read chunk to the replay ring and the outbound
    /// buffer. Does not assign a sequence number; that happens only at
    /// send time.
    pub fn enqueue(&mut self, chunk: &[u8]) {
        self.replay.write(chunk);
        self.out_buf.extend_from_slice(chunk);
        self.last_enqueue = Instant::now();
    }

    /// Whether the throttle currently permits a flush.
    pub fn should_flush_now(&self) -> bool {
        self.need_immediate || self.last_send.elapsed() >= THROTTLE_INTERVAL
    }

    /// Deadline for a scheduled one-shot flush, if the throttle is
    /// currently withholding one.
    pub fn next_flush_deadline(&self) -> Instant {
        self.last_send + THROTTLE_INTERVAL
    }

    pub fn set_flush_scheduled(&mut self, scheduled: bool) {
        self.flush_scheduled = scheduled;
    }

    /// Drop whatever is sitting in the outbound buffer without assigning
    /// it a sequence number. The bytes are already in `replay` (`enqueue`
    /// writes both), so a snapshot still covers them; this only prevents
    /// them from also going out as a `stdout` frame once a connection
    /// reattaches.
    pub fn discard_unsent(&mut self) {
        self.out_buf.clear();
        self.flush_scheduled = false;
        self.need_immediate = false;
    }

    /// Flush protocol: copy the outbound buffer, clear it, cancel the
    /// scheduled flush, clear `need_immediate`, then bump `last_seq` to
    /// the value the caller must send the frame under. Returns `None`
    /// when there is nothing to send.
    pub fn take_flush(&mut self) -> Option<(u64, Bytes)> {
        if self.out_buf.is_empty() {
            return None;
        }
        let data = self.out_buf.split().freeze();
        self.flush_scheduled = false;
        self.need_immediate = false;
        self.last_seq += 1;
        Some((self.last_seq, data))
    }

    /// Record that a frame was just written, resetting the throttle
    /// window. Call this *after* the write completes.
    pub fn record_sent(&mut self) {
        self.last_send = Instant::now();
    }
}

impl Default for PumpState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "pump_tests.rs"]
mod tests;
