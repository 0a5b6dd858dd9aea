// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

use std::collections::VecDeque;

/// Bytes kept once a connection is dropped; allows a resumed connection to
/// replay whatever it missed instead of replaying the whole scrollback.
pub const REPLAY_CAP: usize = 256 * 1024;

/// A bounded byte ring that tracks a monotonic write offset so a resumed
/// connection can ask "what's new since offset N".
#[derive(Debug)]
pub struct RingBuffer {
    data: VecDeque<u8>,
    cap: usize,
    /// Offset (in the absolute byte stream) of `data[0]`.
    base_offset: u64,
    total_written: u64,
}

impl RingBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(cap),
            cap,
            base_offset: 0,
            total_written: 0,
        }
    }

    /// Append bytes, trimming the oldest data if the buffer would exceed
    /// its cap.
    pub fn write(&mut self, bytes: &[u8]) {
        self.data.extend(bytes.iter().copied());
        self.total_written += bytes.len() as u64;

        while self.data.len() > self.cap {
            self.data.pop_front();
            self.base_offset += 1;
        }
    }

    /// Total bytes ever written (the stream's absolute length).
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Lowest offset still available for replay.
    pub fn earliest_available(&self) -> u64 {
        self.base_offset
    }

    /// Whether `offset` is still covered by the buffer (neither trimmed
    /// away nor in the future).
    pub fn has_offset(&self, offset: u64) -> bool {
        offset >= self.base_offset && offset <= self.total_written
    }

    /// Bytes written since `offset`, or `None` if `offset` predates what
    /// the buffer retained (the caller should fall back to a full
    /// snapshot in that case).
    pub fn read_from(&self, offset: u64) -> Option<Vec<u8>> {
        if offset < self.base_offset || offset > self.total_written {
            return None;
        }
        let skip = (offset - self.base_offset) as usize;
        Some(self.data.iter().skip(skip).copied().collect())
    }
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
