// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

//! Plain HTTP handlers: health check and the authenticated font-size
//! latch. Static UI serving is wired in `mod.rs` via `ServeDir`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::auth;
use super::AppState;
use crate::error::ErrorCode;

/// `GET /health` — always `200 "ok"`, no auth required.
pub async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FontSizeResponse {
    #[serde(rename = "fontSize")]
    pub font_size: i32,
}

/// `GET /font-size` — bearer-authenticated read-and-reset latch. Any
/// auth outcome other than success is `403`.
pub async fn font_size(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(header) = headers.get("authorization").and_then(|v| v.to_str().ok()) else {
        return ErrorCode::Auth.to_http_response("missing bearer token").into_response();
    };
    let Some(token) = header.strip_prefix("Bearer ") else {
        return ErrorCode::Auth.to_http_response("malformed authorization header").into_response();
    };
    if !auth::constant_time_eq(token, &state.token) {
        return ErrorCode::Auth.to_http_response("invalid bearer token").into_response();
    }

    Json(FontSizeResponse {
        font_size: state.router.take_font_size(),
    })
    .into_response()
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
