// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

//! Session router: dispatches typed protocol messages, owns the
//! per-session lifecycle (open, resume, replace, orphan), and drives the
//! stdout pump for every live session.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::clipboard::Clipboard;
use crate::error::ErrorCode;
use crate::history::{HistoryStore, PromptEntry};
use crate::index::{search, Indexer};
use crate::inject;
use crate::protocol::{ClientMessage, HistoryEntryInput, ServerMessage, SessionConfigView};
use crate::pty::{self, PtyMode};
use crate::pump::PumpState;
use crate::sanitize::sanitize_snapshot;

/// A session survives a WS disconnect for this long before it and its
/// child process are torn down.
const ORPHAN_GRACE_WINDOW: Duration = Duration::from_secs(30);

/// A handle to whatever is on the other end of a live WebSocket
/// connection. The router never depends on the transport crate module;
/// the transport layer implements this trait once per connection.
#[async_trait::async_trait]
pub trait FrameSink: Send + Sync {
    async fn send(&self, msg: ServerMessage);
}

/// A connection currently attached to zero or more sessions.
#[derive(Clone)]
pub struct ConnHandle {
    pub id: String,
    pub sink: Arc<dyn FrameSink>,
}

struct SessionState {
    key: String,
    session_id: Mutex<String>,
    pty: pty::Session,
    stdin_tx: mpsc::Sender<Bytes>,
    pump: Mutex<PumpState>,
    conn: Mutex<Option<ConnHandle>>,
    suppress_next_exit: AtomicBool,
    use_clipboard: AtomicBool,
    cwd: Mutex<PathBuf>,
    /// Bumped every time a connection (re)attaches; an orphan timer only
    /// acts if this is unchanged when it wakes up.
    epoch: AtomicU64,
}

/// Owns every live session and the server-wide defaults that apply to
/// fresh opens.
pub struct Router {
    inner: Mutex<Inner>,
    indexer: Arc<Indexer>,
    history: HistoryStore,
    font_size: AtomicI32,
    clipboard: Box<dyn Clipboard>,
}

struct Inner {
    /// Keyed by the client-chosen `id` passed to `openSession`; survives
    /// resume and replace.
    by_key: HashMap<String, Arc<SessionState>>,
    /// Keyed by the server-minted `sessionId`; what subsequent control
    /// messages (stdin, resize, snapshot, inject) address.
    by_session_id: HashMap<String, Arc<SessionState>>,
    custom_command: Option<Vec<String>>,
}

impl Router {
    pub fn new(indexer: Arc<Indexer>, history: HistoryStore, clipboard: Box<dyn Clipboard>) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                by_key: HashMap::new(),
                by_session_id: HashMap::new(),
                custom_command: None,
            }),
            indexer,
            history,
            font_size: AtomicI32::new(0),
            clipboard,
        })
    }

    /// Dispatch one decoded client message. Errors are never propagated to
    /// the transport layer; they are delivered as `error` frames on the
    /// same connection per the fail-soft contract.
    pub async fn dispatch(self: &Arc<Self>, conn: &ConnHandle, msg: ClientMessage) {
        match msg {
            ClientMessage::Hello => self.hello(conn).await,
            ClientMessage::OpenSession {
                id,
                cmd,
                args,
                env,
                cwd,
                pty,
                cols,
                rows,
                resume,
                use_clipboard,
            } => {
                self.open_session(
                    conn,
                    id,
                    cmd,
                    args.unwrap_or_default(),
                    env.unwrap_or_default(),
                    cwd,
                    pty.unwrap_or(true),
                    cols,
                    rows,
                    resume.unwrap_or(false),
                    use_clipboard.unwrap_or(false),
                )
                .await
            }
            ClientMessage::Stdin {
                session_id,
                data_base64,
                history_entry,
            } => self.stdin(conn, &session_id, &data_base64, history_entry).await,
            ClientMessage::Resize {
                session_id,
                cols,
                rows,
            } => self.resize(&session_id, cols, rows).await,
            ClientMessage::InjectFiles { session_id, paths } => {
                self.inject_files(&session_id, &paths).await
            }
            ClientMessage::Send {
                session_id,
                data_base64,
                paths,
                history_entry,
            } => {
                self.send(conn, &session_id, data_base64, paths.unwrap_or_default(), history_entry)
                    .await
            }
            ClientMessage::Snapshot { session_id } => self.snapshot(conn, &session_id).await,
            ClientMessage::FontSizeChanged { font_size } => self.font_size_changed(font_size),
            ClientMessage::UpdateUseClipboard {
                session_id,
                use_clipboard,
            } => self.update_use_clipboard(session_id, use_clipboard).await,
            ClientMessage::UpdateSessionConfig { custom_command } => {
                self.update_session_config(conn, custom_command).await
            }
            ClientMessage::SavePrompt {
                session_id,
                history_entry,
            } => self.save_prompt(conn, session_id, history_entry).await,
            ClientMessage::RemovePrompt { prompt_id } => self.remove_prompt(conn, prompt_id).await,
            ClientMessage::SearchIndex {
                pattern,
                opened,
                limit,
            } => self.search_index(conn, pattern, opened, limit).await,
            ClientMessage::Unknown => {}
        }
    }

    async fn hello(&self, conn: &ConnHandle) {
        let custom_command = self.inner.lock().await.custom_command.clone();
        conn.sink
            .send(ServerMessage::Welcome {
                features: vec![
                    "resume".to_string(),
                    "inject".to_string(),
                    "search".to_string(),
                ],
                default_session_config: SessionConfigView {
                    custom_command: custom_command.map(|c| c.join(" ")),
                },
            })
            .await;
    }

    #[allow(clippy::too_many_arguments)]
    async fn open_session(
        self: &Arc<Self>,
        conn: &ConnHandle,
        id: Option<String>,
        cmd: Option<String>,
        args: Vec<String>,
        env: HashMap<String, String>,
        cwd: Option<String>,
        use_pty: bool,
        cols: Option<u16>,
        rows: Option<u16>,
        resume: bool,
        use_clipboard: bool,
    ) {
        let Some(key) = id else {
            conn.sink
                .send(ServerMessage::Error {
                    code: ErrorCode::Protocol,
                    message: "openSession requires id".to_string(),
                })
                .await;
            return;
        };

        if resume {
            let existing = self.inner.lock().await.by_key.get(&key).cloned();
            let Some(state) = existing else {
                conn.sink
                    .send(ServerMessage::Error {
                        code: ErrorCode::NoSession,
                        message: format!("no session to resume for id {key}"),
                    })
                    .await;
                return;
            };
            state.epoch.fetch_add(1, Ordering::AcqRel);
            *state.conn.lock().await = Some(conn.clone());
            if let (Some(cols), Some(rows)) = (cols, rows) {
                let _ = state.pty.resize(cols, rows);
            }
            let pid = state.pty.pid();
            let session_id = state.session_id.lock().await.clone();
            conn.sink
                .send(ServerMessage::Opened {
                    id: key,
                    session_id: session_id.clone(),
                    resumed: true,
                    pid,
                    prompt_history: self.history.load(),
                })
                .await;
            self.send_snapshot(conn, &state, &session_id).await;
            return;
        }

        let command = {
            let inner = self.inner.lock().await;
            match (&inner.custom_command, cmd) {
                (Some(custom), _) => custom.clone(),
                (None, Some(cmd)) => {
                    let mut full = vec![cmd];
                    full.extend(args);
                    full
                }
                (None, None) => default_command(),
            }
        };

        if let Some(old) = self.take_session(&key).await {
            old.suppress_next_exit.store(true, Ordering::Release);
            tokio::spawn(async move {
                old.pty.close().await;
            });
        }

        let env_pairs: Vec<(String, String)> = env.into_iter().collect();
        let cwd_path = cwd.map(PathBuf::from);
        let mode = if use_pty { PtyMode::AutoPty } else { PtyMode::NoPty };
        let cols = cols.unwrap_or(80);
        let rows = rows.unwrap_or(24);

        let start = pty::Session::start(&command, &env_pairs, cwd_path.as_deref(), mode, cols, rows);
        let (session, output_rx) = match start {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, id = %key, "session start failed");
                conn.sink
                    .send(ServerMessage::Error {
                        code: ErrorCode::SessionStart,
                        message: format!("failed to start session: {e}"),
                    })
                    .await;
                return;
            }
        };

        let pid = session.pid();
        let session_id = uuid::Uuid::new_v4().to_string();
        let stdin_tx = session.stdin();
        let state = Arc::new(SessionState {
            key: key.clone(),
            session_id: Mutex::new(session_id.clone()),
            pty: session,
            stdin_tx,
            pump: Mutex::new(PumpState::new()),
            conn: Mutex::new(Some(conn.clone())),
            suppress_next_exit: AtomicBool::new(false),
            use_clipboard: AtomicBool::new(use_clipboard),
            cwd: Mutex::new(cwd_path.unwrap_or_else(|| PathBuf::from("."))),
            epoch: AtomicU64::new(0),
        });

        {
            let mut inner = self.inner.lock().await;
            inner.by_key.insert(key.clone(), Arc::clone(&state));
            inner.by_session_id.insert(session_id.clone(), Arc::clone(&state));
        }

        let router = Arc::clone(self);
        tokio::spawn(run_pump(router, Arc::clone(&state), output_rx));

        conn.sink
            .send(ServerMessage::Opened {
                id: key,
                session_id,
                resumed: false,
                pid,
                prompt_history: self.history.load(),
            })
            .await;
    }

    async fn take_session(&self, key: &str) -> Option<Arc<SessionState>> {
        let mut inner = self.inner.lock().await;
        let old = inner.by_key.remove(key)?;
        let old_session_id = old.session_id.try_lock().map(|g| g.clone()).ok();
        if let Some(sid) = old_session_id {
            inner.by_session_id.remove(&sid);
        }
        Some(old)
    }

    /// Remove the session from both maps, but only if it is still the
    /// live entry under its key (a replacement may have already taken its
    /// place, in which case this is a stale cleanup and must be a no-op).
    async fn remove_if_current(&self, state: &Arc<SessionState>) {
        let mut inner = self.inner.lock().await;
        if let Some(current) = inner.by_key.get(&state.key) {
            if Arc::ptr_eq(current, state) {
                inner.by_key.remove(&state.key);
            }
        }
        let session_id = state.session_id.lock().await.clone();
        if let Some(current) = inner.by_session_id.get(&session_id) {
            if Arc::ptr_eq(current, state) {
                inner.by_session_id.remove(&session_id);
            }
        }
    }

    async fn lookup(&self, session_id: &str) -> Option<Arc<SessionState>> {
        self.inner.lock().await.by_session_id.get(session_id).cloned()
    }

    async fn stdin(&self, conn: &ConnHandle, session_id: &str, data_base64: &str, history_entry: Option<HistoryEntryInput>) {
        if let Some(entry) = history_entry {
            self.persist_history(entry);
        }

        let Some(state) = self.lookup(session_id).await else {
            conn.sink
                .send(ServerMessage::Error {
                    code: ErrorCode::NoSession,
                    message: "no session".to_string(),
                })
                .await;
            return;
        };

        let Ok(data) = BASE64.decode(data_base64) else {
            conn.sink
                .send(ServerMessage::Error {
                    code: ErrorCode::Protocol,
                    message: "invalid base64 in stdin".to_string(),
                })
                .await;
            return;
        };

        if state.stdin_tx.send(Bytes::from(data)).await.is_err() {
            return;
        }

        self.hint_immediate_flush(&state).await;
    }

    /// Hint the pump after stdin was written: if outbound data is already
    /// buffered, flush right away; otherwise mark the next enqueue as
    /// needing an immediate flush rather than waiting out the throttle.
    async fn hint_immediate_flush(&self, state: &Arc<SessionState>) {
        let buffered = {
            let mut pump = state.pump.lock().await;
            let buffered = !pump.outbound_is_empty();
            if !buffered {
                pump.mark_needs_immediate();
            }
            buffered
        };
        if buffered {
            flush(state).await;
        }
    }

    async fn resize(&self, session_id: &str, cols: u16, rows: u16) {
        if let Some(state) = self.lookup(session_id).await {
            let _ = state.pty.resize(cols, rows);
        }
    }

    async fn inject_files(&self, session_id: &str, paths: &[String]) {
        let Some(state) = self.lookup(session_id).await else {
            return;
        };
        let contents = read_files(&state, paths).await;
        let _ = self.do_inject(&state, contents).await;
    }

    async fn send(
        &self,
        conn: &ConnHandle,
        session_id: &str,
        data_base64: Option<String>,
        paths: Vec<String>,
        history_entry: Option<HistoryEntryInput>,
    ) {
        if let Some(entry) = history_entry {
            self.persist_history(entry);
        }

        let Some(state) = self.lookup(session_id).await else {
            conn.sink
                .send(ServerMessage::Error {
                    code: ErrorCode::NoSession,
                    message: "no session".to_string(),
                })
                .await;
            return;
        };

        if let Some(b64) = data_base64 {
            if let Ok(data) = BASE64.decode(&b64) {
                if state.stdin_tx.send(Bytes::from(data)).await.is_ok() {
                    self.hint_immediate_flush(&state).await;
                }
            }
        }

        if !paths.is_empty() {
            let contents = read_files(&state, &paths).await;
            let _ = self.do_inject(&state, contents).await;
        }
    }

    async fn do_inject(&self, state: &Arc<SessionState>, contents: Vec<String>) -> anyhow::Result<()> {
        if contents.is_empty() {
            return Ok(());
        }
        let use_clipboard = state.use_clipboard.load(Ordering::Acquire);
        let stdin = state.stdin_tx.clone();
        let pump = &state.pump;
        let is_idle = || {
            // Best-effort: treated idle once nothing is buffered and no
            // flush is scheduled. Reading the lock synchronously here
            // would require async; callers invoke this from an async
            // context via `idle::wait_idle`, which only needs a
            // `Fn() -> bool`, so fall back to try_lock snapshots.
            match pump.try_lock() {
                Ok(p) => p.outbound_is_empty() && !p.flush_is_scheduled(),
                Err(_) => false,
            }
        };
        inject::inject_files(&contents, use_clipboard, self.clipboard.as_ref(), &stdin, is_idle).await?;
        Ok(())
    }

    async fn snapshot(&self, conn: &ConnHandle, session_id: &str) {
        let Some(state) = self.lookup(session_id).await else {
            conn.sink
                .send(ServerMessage::Error {
                    code: ErrorCode::NoSession,
                    message: "no session".to_string(),
                })
                .await;
            return;
        };
        self.send_snapshot(conn, &state, session_id).await;
    }

    async fn send_snapshot(&self, conn: &ConnHandle, state: &Arc<SessionState>, session_id: &str) {
        let pump = state.pump.lock().await;
        let raw = pump
            .replay
            .read_from(pump.replay.earliest_available())
            .unwrap_or_default();
        let last_seq = pump.last_seq();
        drop(pump);
        let sanitized = sanitize_snapshot(&raw);
        conn.sink
            .send(ServerMessage::Snapshot {
                session_id: session_id.to_string(),
                data_base64: BASE64.encode(sanitized),
                last_seq,
            })
            .await;
    }

    fn font_size_changed(&self, font_size: i32) {
        if (8..=72).contains(&font_size) {
            self.font_size.store(font_size, Ordering::Release);
        }
    }

    /// Read and reset the latch atomically, for the authenticated HTTP
    /// endpoint.
    pub fn take_font_size(&self) -> i32 {
        self.font_size.swap(0, Ordering::AcqRel)
    }

    /// Set the server-wide default command new sessions use when they
    /// don't supply their own `cmd`. Used at startup to apply `--cmd`.
    pub async fn set_custom_command(&self, command: Option<Vec<String>>) {
        self.inner.lock().await.custom_command = command;
    }

    async fn update_use_clipboard(&self, session_id: Option<String>, use_clipboard: bool) {
        let inner = self.inner.lock().await;
        match session_id {
            Some(id) => {
                if let Some(state) = inner.by_session_id.get(&id) {
                    state.use_clipboard.store(use_clipboard, Ordering::Release);
                }
            }
            None => {
                for state in inner.by_session_id.values() {
                    state.use_clipboard.store(use_clipboard, Ordering::Release);
                }
            }
        }
    }

    async fn update_session_config(&self, conn: &ConnHandle, custom_command: Option<String>) {
        let command = custom_command
            .as_ref()
            .map(|s| s.split_whitespace().map(str::to_string).collect::<Vec<_>>());
        {
            let mut inner = self.inner.lock().await;
            inner.custom_command = command;
        }
        conn.sink
            .send(ServerMessage::SessionConfigUpdated {
                session_config: SessionConfigView { custom_command },
            })
            .await;
    }

    async fn save_prompt(&self, conn: &ConnHandle, _session_id: Option<String>, history_entry: HistoryEntryInput) {
        self.persist_history(history_entry);
        conn.sink.send(ServerMessage::PromptSaved).await;
    }

    async fn remove_prompt(&self, conn: &ConnHandle, prompt_id: String) {
        if let Err(e) = self.history.remove(&prompt_id) {
            warn!(error = %e, prompt_id = %prompt_id, "failed to remove prompt history entry");
        }
        conn.sink
            .send(ServerMessage::PromptRemoved { prompt_id })
            .await;
    }

    fn persist_history(&self, entry: HistoryEntryInput) {
        let path = self.history.path().to_path_buf();
        tokio::task::spawn_blocking(move || {
            let store = HistoryStore::new(path);
            let record = PromptEntry {
                id: entry.id,
                timestamp_ms: now_ms(),
                serialized_content: entry.serialized_content,
                project_cwd: entry.project_cwd,
            };
            if let Err(e) = store.save(&record) {
                warn!(error = %e, "failed to persist prompt history entry");
            }
        });
    }

    async fn search_index(&self, conn: &ConnHandle, pattern: String, opened: Vec<String>, limit: usize) {
        self.indexer.request_refresh();
        let snapshot = self.indexer.snapshot();
        let (results, opened_results) = search::search(&snapshot, &pattern, &opened, limit);
        conn.sink
            .send(ServerMessage::SearchResult {
                results,
                opened_results,
            })
            .await;
    }

    /// Called when a connection's socket closes. Every session still
    /// attached to it becomes orphaned and starts its grace-window timer.
    pub async fn handle_disconnect(self: &Arc<Self>, conn_id: &str) {
        let states: Vec<Arc<SessionState>> = {
            let inner = self.inner.lock().await;
            inner
                .by_key
                .values()
                .filter(|s| matches!(s.conn.try_lock(), Ok(g) if g.as_ref().is_some_and(|c| c.id == conn_id)))
                .cloned()
                .collect()
        };

        for state in states {
            *state.conn.lock().await = None;
            // Any bytes still sitting unsent in the pump are already in
            // the replay ring (`enqueue` writes both); drop them here so
            // a later reattach doesn't flush them a second time on top
            // of the snapshot resume already sent.
            state.pump.lock().await.discard_unsent();
            let epoch = state.epoch.load(Ordering::Acquire);
            let router = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(ORPHAN_GRACE_WINDOW).await;
                if state.epoch.load(Ordering::Acquire) != epoch {
                    return;
                }
                if state.conn.lock().await.is_some() {
                    return;
                }
                debug!(key = %state.key, "orphan grace window expired, closing session");
                state.suppress_next_exit.store(true, Ordering::Release);
                router.remove_if_current(&state).await;
                state.pty.close().await;
            });
        }
    }
}

async fn read_files(state: &Arc<SessionState>, paths: &[String]) -> Vec<String> {
    let cwd = state.cwd.lock().await.clone();
    let mut contents = Vec::with_capacity(paths.len());
    for path in paths {
        let full = cwd.join(path);
        match tokio::fs::read_to_string(&full).await {
            Ok(text) => contents.push(text),
            Err(e) => warn!(error = %e, path = %full.display(), "failed to read file for injection"),
        }
    }
    contents
}

fn default_command() -> Vec<String> {
    let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/bash".to_string());
    vec![shell]
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Drives one session's stdout: reads from the PTY, feeds the throttle,
/// flushes frames to whichever connection is currently attached, and
/// handles child exit once the output channel closes.
///
/// While no connection is attached, bytes go straight into the replay
/// ring and skip the outbound/flush machinery entirely: there is no one
/// to flush to, and letting the outbound buffer accumulate for the whole
/// orphan grace window would otherwise surface as a stray `stdout` frame
/// of stale data right after a resume's `snapshot`.
async fn run_pump(router: Arc<Router>, state: Arc<SessionState>, mut output_rx: mpsc::Receiver<Bytes>) {
    loop {
        let has_conn = state.conn.lock().await.is_some();

        if !has_conn {
            match output_rx.recv().await {
                Some(chunk) => state.pump.lock().await.replay.write(&chunk),
                None => break,
            }
            continue;
        }

        let deadline = state.pump.lock().await.next_flush_deadline();
        tokio::select! {
            data = output_rx.recv() => {
                match data {
                    Some(chunk) => {
                        let should_flush = {
                            let mut pump = state.pump.lock().await;
                            pump.enqueue(&chunk);
                            pump.should_flush_now()
                        };
                        if should_flush {
                            flush(&state).await;
                        } else {
                            state.pump.lock().await.set_flush_scheduled(true);
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::time::sleep_until(deadline) => {
                if state.pump.lock().await.flush_is_scheduled() {
                    flush(&state).await;
                }
            }
        }
    }

    // The child's stdout channel closed: it has exited or is exiting.
    flush(&state).await;
    let status = state.pty.wait().await;

    if !state.suppress_next_exit.swap(false, Ordering::AcqRel) {
        let conn = state.conn.lock().await;
        if let Some(c) = conn.as_ref() {
            let session_id = state.session_id.lock().await.clone();
            c.sink
                .send(ServerMessage::Exit {
                    session_id,
                    code: status.code,
                })
                .await;
        }
    }

    router.remove_if_current(&state).await;
}

async fn flush(state: &Arc<SessionState>) {
    let frame = {
        let mut pump = state.pump.lock().await;
        pump.take_flush()
    };
    let Some((seq, bytes)) = frame else {
        return;
    };

    let conn = state.conn.lock().await.clone();
    if let Some(conn) = conn {
        let session_id = state.session_id.lock().await.clone();
        conn.sink
            .send(ServerMessage::Stdout {
                session_id,
                data_base64: BASE64.encode(&bytes),
                seq,
            })
            .await;
    }

    state.pump.lock().await.record_sent();
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
