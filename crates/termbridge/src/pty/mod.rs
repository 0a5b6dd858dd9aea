// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

pub mod nbio;
pub mod pipe;
pub mod spawn;

use std::path::Path;

use anyhow::Context;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::warn;

/// How the child process should be attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PtyMode {
    /// Try a real PTY, fall back to pipes if `forkpty` fails.
    AutoPty,
    /// Always use pipes, stderr merged into stdout.
    NoPty,
    /// Require a real PTY; fail to start if unavailable.
    ForcePty,
}

/// Child process exit status, normalized across PTY/pipe backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitStatus {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

enum Inner {
    Native(spawn::NativePty),
    Piped(pipe::PipeProcess),
}

/// A running child process, PTY-backed when available.
///
/// All operations take `&self`: resize/stdin/pid/wait/close can all be
/// called concurrently from independent tasks (e.g. a pump task awaiting
/// exit while the router calls resize), with no single "owner" of the
/// handle that would otherwise serialize them.
pub struct Session {
    inner: Inner,
    stdin_tx: mpsc::Sender<Bytes>,
    exit: watch::Receiver<Option<ExitStatus>>,
}

impl Session {
    /// Start the child process according to `mode`. Returns the session
    /// handle plus the channel on which output bytes arrive.
    pub fn start(
        command: &[String],
        env: &[(String, String)],
        cwd: Option<&Path>,
        mode: PtyMode,
        cols: u16,
        rows: u16,
    ) -> anyhow::Result<(Self, mpsc::Receiver<Bytes>)> {
        if command.is_empty() {
            anyhow::bail!("command must have at least one element");
        }

        let (inner, output_rx, stdin_tx, join) = match mode {
            PtyMode::ForcePty => {
                let (native, output_rx, stdin_tx, join) =
                    spawn::NativePty::spawn(command, env, cwd, cols, rows)
                        .context("ForcePty: native PTY spawn failed")?;
                (Inner::Native(native), output_rx, stdin_tx, join)
            }
            PtyMode::NoPty => {
                let (piped, output_rx, stdin_tx, join) =
                    pipe::PipeProcess::spawn(command, env, cwd)?;
                (Inner::Piped(piped), output_rx, stdin_tx, join)
            }
            PtyMode::AutoPty => match spawn::NativePty::spawn(command, env, cwd, cols, rows) {
                Ok((native, output_rx, stdin_tx, join)) => {
                    (Inner::Native(native), output_rx, stdin_tx, join)
                }
                Err(_) => {
                    let (piped, output_rx, stdin_tx, join) =
                        pipe::PipeProcess::spawn(command, env, cwd)
                            .context("AutoPty: piped fallback also failed")?;
                    (Inner::Piped(piped), output_rx, stdin_tx, join)
                }
            },
        };

        let (exit_tx, exit_rx) = watch::channel(None);
        tokio::spawn(async move {
            let status = match join.await {
                Ok(Ok(status)) => status,
                Ok(Err(e)) => {
                    warn!(error = %e, "child process task ended with an error");
                    ExitStatus::default()
                }
                Err(e) => {
                    warn!(error = %e, "child process task panicked or was cancelled");
                    ExitStatus::default()
                }
            };
            let _ = exit_tx.send(Some(status));
        });

        Ok((
            Self {
                inner,
                stdin_tx,
                exit: exit_rx,
            },
            output_rx,
        ))
    }

    /// A fresh sender handle for writing bytes to the child's stdin.
    pub fn stdin(&self) -> mpsc::Sender<Bytes> {
        self.stdin_tx.clone()
    }

    /// Resize the terminal. A no-op when there is no PTY.
    pub fn resize(&self, cols: u16, rows: u16) -> anyhow::Result<()> {
        match &self.inner {
            Inner::Native(native) => native.resize(cols, rows),
            Inner::Piped(_) => Ok(()),
        }
    }

    pub fn pid(&self) -> Option<u32> {
        match &self.inner {
            Inner::Native(native) => native.pid(),
            Inner::Piped(piped) => piped.pid(),
        }
    }

    /// Wait for the child to exit on its own. Safe to call from multiple
    /// tasks concurrently; all of them observe the same result.
    pub async fn wait(&self) -> ExitStatus {
        let mut rx = self.exit.clone();
        loop {
            if let Some(status) = *rx.borrow() {
                return status;
            }
            if rx.changed().await.is_err() {
                return ExitStatus::default();
            }
        }
    }

    /// Terminate the child: signal, bounded wait, then force-kill. Then
    /// wait for the exit status.
    pub async fn close(&self) -> ExitStatus {
        match &self.inner {
            Inner::Native(native) => native.terminate(),
            Inner::Piped(piped) => piped.terminate(),
        }
        self.wait().await
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
