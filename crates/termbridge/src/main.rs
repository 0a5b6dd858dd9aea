// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use termbridge::bootstrap::{self, BootInfo};
use termbridge::clipboard;
use termbridge::config::Config;
use termbridge::history::HistoryStore;
use termbridge::index::{self, Indexer};
use termbridge::session;
use termbridge::transport::{self, AppState};

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&config);

    if let Err(e) = run(config).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

/// Initialize structured logging from config. Uses `try_init` so it's
/// harmless to call more than once (e.g. from integration tests).
fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let result = match config.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).try_init(),
    };
    drop(result);
}

async fn run(config: Config) -> anyhow::Result<()> {
    let (listener, port) = bootstrap::bind(&config.http).await?;
    let token = bootstrap::mint_token();

    let cwd = std::env::current_dir()?;
    let indexer = Indexer::new(&cwd);
    index::spawn_background_scan(Arc::clone(&indexer));

    let history_path = HistoryStore::default_path()?;
    let history = HistoryStore::new(history_path);

    let router = session::Router::new(indexer, history, clipboard::system_clipboard());

    if let Some(cmd) = &config.cmd {
        let parts = cmd.split_whitespace().map(str::to_string).collect::<Vec<_>>();
        router.set_custom_command(Some(parts)).await;
    }

    let ui_dir = if config.serve_ui {
        let candidate = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.join("ui")));
        candidate.filter(|p| p.is_dir())
    } else {
        None
    };

    let state = Arc::new(AppState {
        token: token.clone(),
        router,
        ui_dir,
    });

    if config.print_conn_json {
        bootstrap::print_conn_json(&BootInfo {
            port,
            token,
            ui_base: format!("http://127.0.0.1:{port}/"),
        })?;
    }

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let app = transport::build_router(state).into_make_service_with_connect_info::<SocketAddr>();
    info!("termbridge listening on 127.0.0.1:{port}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    Ok(())
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();

        tokio::select! {
            _ = async {
                match sigterm.as_mut() {
                    Some(s) => s.recv().await,
                    None => std::future::pending().await,
                }
            } => info!("received SIGTERM"),
            _ = async {
                match sigint.as_mut() {
                    Some(s) => s.recv().await,
                    None => std::future::pending().await,
                }
            } => info!("received SIGINT"),
        }
        shutdown.cancel();
    });
}
