// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

//! Test-only harness for driving a real `termbridge` server over a real
//! TCP socket, used by the end-to-end scenario tests in `tests/`.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use termbridge::clipboard::Clipboard;
use termbridge::history::HistoryStore;
use termbridge::index::Indexer;
use termbridge::session;
use termbridge::transport::{self, AppState};

/// A clipboard that never actually holds anything; `get` returns empty,
/// `set` always fails so the inject path falls back to direct injection.
pub struct FailingClipboard;

#[async_trait::async_trait]
impl Clipboard for FailingClipboard {
    async fn get(&self) -> anyhow::Result<String> {
        Ok(String::new())
    }

    async fn set(&self, _text: &str) -> anyhow::Result<()> {
        anyhow::bail!("stub clipboard always fails to set")
    }
}

/// A running test instance of the daemon, bound to a real loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub token: String,
    pub router: Arc<session::Router>,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawn a server rooted at `dir` (used as both the file index root and
/// the prompt-history location) with a fixed token, using `clipboard` as
/// the clipboard backend.
pub async fn spawn(dir: &Path, token: &str, clipboard: Box<dyn Clipboard>) -> anyhow::Result<TestServer> {
    let indexer = Indexer::new(dir);
    let history = HistoryStore::new(dir.join("history.jsonl"));
    let router = session::Router::new(indexer, history, clipboard);

    let state = Arc::new(AppState {
        token: token.to_string(),
        router: Arc::clone(&router),
        ui_dir: None,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let app = transport::build_router(state).into_make_service_with_connect_info::<SocketAddr>();
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(TestServer {
        addr,
        token: token.to_string(),
        router,
        handle,
    })
}

/// Spawn with a clipboard that always fails on `set`, for testing the
/// inject-fallback path.
pub async fn spawn_with_failing_clipboard(dir: &Path, token: &str) -> anyhow::Result<TestServer> {
    spawn(dir, token, Box::new(FailingClipboard)).await
}
