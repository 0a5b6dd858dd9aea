// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

use std::ffi::CString;
use std::os::fd::AsRawFd;
use std::path::Path;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context};
use bytes::Bytes;
use nix::libc;
use nix::pty::{forkpty, ForkptyResult, Winsize};
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{execvp, ForkResult, Pid};
use tokio::io::unix::AsyncFd;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::nbio::{is_expected_termination, read_chunk, set_nonblocking, write_all, PtyFd};
use super::ExitStatus;

/// Native PTY backend that spawns a child process via `forkpty`.
///
/// `resize`/`pid`/`terminate` operate on plain fields (raw fd, `Pid`,
/// atomics) so they stay usable from outside the IO task that owns the
/// async PTY handle.
pub struct NativePty {
    master_fd: std::os::fd::RawFd,
    child_pid: Pid,
    cols: Arc<AtomicU16>,
    rows: Arc<AtomicU16>,
}

type SpawnResult = (
    NativePty,
    mpsc::Receiver<Bytes>,
    mpsc::Sender<Bytes>,
    JoinHandle<anyhow::Result<ExitStatus>>,
);

impl NativePty {
    /// Spawn a child process on a new PTY. `command` must have at least
    /// one element (the program to run). `env` is merged over the
    /// process environment; `cwd` changes the child's working directory.
    // forkpty requires unsafe: post-fork child is partially initialized
    #[allow(unsafe_code)]
    pub fn spawn(
        command: &[String],
        env: &[(String, String)],
        cwd: Option<&Path>,
        cols: u16,
        rows: u16,
    ) -> anyhow::Result<SpawnResult> {
        let winsize = Winsize {
            ws_col: cols,
            ws_row: rows,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };

        // SAFETY: forkpty is unsafe because the child is in a
        // partially-initialized state after fork. We immediately exec.
        let result = unsafe { forkpty(&winsize, None) }.context("forkpty failed")?;
        let ForkptyResult {
            master,
            fork_result,
        } = result;

        match fork_result {
            ForkResult::Child => {
                if let Some(dir) = cwd {
                    let _ = nix::unistd::chdir(dir);
                }
                std::env::set_var("TERM", "xterm-256color");
                for (key, value) in env {
                    std::env::set_var(key, value);
                }

                let c_args: Vec<CString> = command
                    .iter()
                    .map(|s| CString::new(s.as_bytes()))
                    .collect::<Result<_, _>>()
                    .context("invalid command argument")?;

                execvp(&c_args[0], &c_args).context("execvp failed")?;
                unreachable!();
            }
            ForkResult::Parent { child } => {
                set_nonblocking(&master)?;
                let master_fd = master.as_raw_fd();
                let afd = AsyncFd::new(PtyFd(master)).context("AsyncFd::new failed")?;

                let cols = Arc::new(AtomicU16::new(cols));
                let rows = Arc::new(AtomicU16::new(rows));

                let (output_tx, output_rx) = mpsc::channel::<Bytes>(256);
                let (stdin_tx, stdin_rx) = mpsc::channel::<Bytes>(256);
                let join = tokio::spawn(run_io(afd, child, output_tx, stdin_rx));

                Ok((
                    Self {
                        master_fd,
                        child_pid: child,
                        cols,
                        rows,
                    },
                    output_rx,
                    stdin_tx,
                    join,
                ))
            }
        }
    }

    // TIOCSWINSZ ioctl requires unsafe for the libc::ioctl call
    #[allow(unsafe_code)]
    pub fn resize(&self, cols: u16, rows: u16) -> anyhow::Result<()> {
        self.cols.store(cols, Ordering::Relaxed);
        self.rows.store(rows, Ordering::Relaxed);

        let ws = Winsize {
            ws_col: cols,
            ws_row: rows,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };

        // SAFETY: TIOCSWINSZ is a well-defined ioctl that sets the window
        // size on the PTY master fd, which stays open for the session's
        // lifetime even though the `AsyncFd` that wraps it was moved into
        // the IO task.
        let ret = unsafe { libc::ioctl(self.master_fd, libc::TIOCSWINSZ, &ws) };
        if ret < 0 {
            bail!(
                "TIOCSWINSZ ioctl failed: {}",
                std::io::Error::last_os_error()
            );
        }

        Ok(())
    }

    pub fn pid(&self) -> Option<u32> {
        Some(self.child_pid.as_raw() as u32)
    }

    /// Signal then force-kill: SIGHUP, a bounded wait, then SIGKILL.
    pub fn terminate(&self) {
        let _ = kill(self.child_pid, Signal::SIGHUP);
        std::thread::sleep(std::time::Duration::from_millis(50));
        let _ = kill(self.child_pid, Signal::SIGKILL);
    }
}

impl Drop for NativePty {
    fn drop(&mut self) {
        self.terminate();
        let _ = waitpid(self.child_pid, Some(WaitPidFlag::WNOHANG));
    }
}

async fn run_io(
    master: AsyncFd<PtyFd>,
    pid: Pid,
    output_tx: mpsc::Sender<Bytes>,
    mut stdin_rx: mpsc::Receiver<Bytes>,
) -> anyhow::Result<ExitStatus> {
    let mut buf = vec![0u8; 8192];
    let mut input_closed = false;

    loop {
        if input_closed {
            // Only read output once input is closed.
            match read_chunk(&master, &mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    let data = Bytes::copy_from_slice(&buf[..n]);
                    if output_tx.send(data).await.is_err() {
                        break;
                    }
                }
                Err(e) if is_expected_termination(&e) => break,
                Err(e) => return Err(e.into()),
            }
        } else {
            tokio::select! {
                result = read_chunk(&master, &mut buf) => {
                    match result {
                        Ok(0) => break,
                        Ok(n) => {
                            let data = Bytes::copy_from_slice(&buf[..n]);
                            if output_tx.send(data).await.is_err() {
                                break;
                            }
                        }
                        Err(e) if is_expected_termination(&e) => break,
                        Err(e) => return Err(e.into()),
                    }
                }
                input = stdin_rx.recv() => {
                    match input {
                        Some(data) => write_all(&master, &data).await?,
                        None => input_closed = true,
                    }
                }
            }
        }
    }

    // Reap child on a blocking thread to avoid blocking the runtime.
    let status = tokio::task::spawn_blocking(move || wait_for_exit(pid))
        .await
        .context("join wait thread")??;
    Ok(status)
}

/// Block until the child exits and convert to our `ExitStatus`.
fn wait_for_exit(pid: Pid) -> anyhow::Result<ExitStatus> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => {
                return Ok(ExitStatus {
                    code: Some(code),
                    signal: None,
                });
            }
            Ok(WaitStatus::Signaled(_, sig, _)) => {
                return Ok(ExitStatus {
                    code: None,
                    signal: Some(sig as i32),
                });
            }
            Ok(_) => continue,
            Err(nix::errno::Errno::EINTR) => continue,
            Err(e) => bail!("waitpid failed: {e}"),
        }
    }
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
