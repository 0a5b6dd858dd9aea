// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

//! WebSocket upgrade handler: subprotocol/origin handshake, then a
//! per-connection read loop that decodes `ClientMessage` frames and
//! forwards them to the session router.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tracing::debug;

use super::auth;
use super::AppState;
use crate::error::ErrorCode;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::{ConnHandle, FrameSink};

static NEXT_CONN_ID: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

/// Split a comma-separated `Sec-WebSocket-Protocol` offer list into its
/// individual entries.
fn offered_protocols(headers: &HeaderMap) -> Vec<String> {
    headers
        .get("sec-websocket-protocol")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').map(|p| p.trim().to_string()).collect())
        .unwrap_or_default()
}

/// `GET /ws` — validates the bearer subprotocol and Origin policy before
/// upgrading; a failed check never upgrades, it returns `403` directly.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    let offered = offered_protocols(&headers);

    let Some(candidate) = auth::find_bearer_subprotocol(&offered) else {
        return ErrorCode::Auth.to_http_response("missing bearer subprotocol").into_response();
    };
    let Some(echoed) = auth::validate_subprotocol(candidate, &state.token) else {
        return ErrorCode::Auth.to_http_response("invalid bearer token").into_response();
    };

    let origin = headers.get("origin").and_then(|v| v.to_str().ok());
    if !auth::origin_allowed(origin, Some(remote.ip())) {
        return ErrorCode::Auth.to_http_response("origin not allowed").into_response();
    }

    let echoed = echoed.to_string();
    ws.protocols([echoed.clone()])
        .on_upgrade(move |socket| handle_connection(state, socket))
}

struct WsSink {
    tx: Mutex<SplitSink<WebSocket, Message>>,
}

#[async_trait::async_trait]
impl FrameSink for WsSink {
    async fn send(&self, msg: ServerMessage) {
        let Ok(text) = serde_json::to_string(&msg) else {
            return;
        };
        let mut tx = self.tx.lock().await;
        let _ = tx.send(Message::Text(text.into())).await;
    }
}

async fn handle_connection(state: Arc<AppState>, socket: WebSocket) {
    let conn_id = format!("ws-{}", NEXT_CONN_ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed));
    let (tx, mut rx) = socket.split();
    let sink = Arc::new(WsSink { tx: Mutex::new(tx) });
    let conn = ConnHandle {
        id: conn_id.clone(),
        sink,
    };

    while let Some(frame) = rx.next().await {
        let frame = match frame {
            Ok(f) => f,
            Err(_) => break,
        };
        match frame {
            Message::Text(text) => {
                let parsed: Result<ClientMessage, _> = serde_json::from_str(&text);
                match parsed {
                    Ok(msg) => state.router.dispatch(&conn, msg).await,
                    Err(_) => {
                        conn.sink
                            .send(ServerMessage::Error {
                                code: ErrorCode::Protocol,
                                message: "malformed message".to_string(),
                            })
                            .await;
                    }
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    debug!(conn = %conn_id, "websocket connection closed");
    state.router.handle_disconnect(&conn_id).await;
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
