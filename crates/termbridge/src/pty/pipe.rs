// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

use std::path::Path;
use std::process::Stdio;

use anyhow::Context;
use bytes::Bytes;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::ExitStatus;

/// Piped-process backend: stdin/stdout pipes with stderr merged into the
/// same output stream, no PTY. Used for `PtyMode::NoPty` and as the
/// `PtyMode::AutoPty` fallback when `forkpty` is unavailable.
pub struct PipeProcess {
    pid: Option<u32>,
}

type SpawnResult = (
    PipeProcess,
    mpsc::Receiver<Bytes>,
    mpsc::Sender<Bytes>,
    JoinHandle<anyhow::Result<ExitStatus>>,
);

impl PipeProcess {
    pub fn spawn(
        command: &[String],
        env: &[(String, String)],
        cwd: Option<&Path>,
    ) -> anyhow::Result<SpawnResult> {
        let mut cmd = Command::new(&command[0]);
        cmd.args(&command[1..]);
        cmd.envs(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().context("failed to spawn piped child process")?;
        let pid = child.id();

        let mut stdin = child.stdin.take().context("child stdin not piped")?;
        let mut stdout = child.stdout.take().context("child stdout not piped")?;
        let mut stderr = child.stderr.take().context("child stderr not piped")?;

        let (output_tx, output_rx) = mpsc::channel::<Bytes>(256);
        let (stdin_tx, mut stdin_rx) = mpsc::channel::<Bytes>(256);

        let out_tx = output_tx.clone();
        let stdout_task = tokio::spawn(async move {
            let mut buf = [0u8; 8192];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if out_tx.send(Bytes::copy_from_slice(&buf[..n])).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let err_tx = output_tx;
        let stderr_task = tokio::spawn(async move {
            let mut buf = [0u8; 8192];
            loop {
                match stderr.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if err_tx.send(Bytes::copy_from_slice(&buf[..n])).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let stdin_task = tokio::spawn(async move {
            while let Some(data) = stdin_rx.recv().await {
                if stdin.write_all(&data).await.is_err() {
                    break;
                }
            }
        });

        let join = tokio::spawn(async move {
            let status = child.wait().await.context("wait on piped child failed")?;
            let _ = stdout_task.await;
            let _ = stderr_task.await;
            let _ = stdin_task.await;
            Ok(ExitStatus {
                code: status.code(),
                signal: unix_signal(&status),
            })
        });

        Ok((Self { pid }, output_rx, stdin_tx, join))
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Signal then force-kill: SIGTERM, a bounded wait, then SIGKILL.
    pub fn terminate(&self) {
        if let Some(pid) = self.pid {
            let pid = Pid::from_raw(pid as i32);
            let _ = kill(pid, Signal::SIGTERM);
            std::thread::sleep(std::time::Duration::from_millis(50));
            let _ = kill(pid, Signal::SIGKILL);
        }
    }
}

#[cfg(unix)]
fn unix_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn unix_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

#[cfg(test)]
#[path = "pipe_tests.rs"]
mod tests;
