// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

//! HTTP and WebSocket transport: upgrade handshake, auth, and static UI
//! serving. Message shapes live in [`crate::protocol`]; session lifecycle
//! lives in [`crate::session`].

pub mod auth;
pub mod http;
pub mod ws;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

use crate::error::ErrorCode;
use crate::session;

/// Shared state handed to every axum handler.
pub struct AppState {
    pub token: String,
    pub router: Arc<session::Router>,
    pub ui_dir: Option<std::path::PathBuf>,
}

/// Machine-readable code plus human-readable message, the JSON body of
/// every non-2xx HTTP response this crate returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

impl ErrorCode {
    /// Convert this error code into a transport [`ErrorBody`].
    pub fn to_error_body(self, message: impl Into<String>) -> ErrorBody {
        ErrorBody {
            code: self.as_str().to_owned(),
            message: message.into(),
        }
    }

    /// Convert this error code into an axum JSON error response.
    pub fn to_http_response(self, message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse {
            error: self.to_error_body(message),
        };
        (status, Json(body))
    }
}

/// Build the full axum `Router`: health, WS upgrade, font-size, and
/// (when configured) static UI serving under `/`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(http::health))
        .route("/ws", get(ws::ws_handler))
        .route("/font-size", get(http::font_size));

    if let Some(dir) = state.ui_dir.clone() {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.with_state(state)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
