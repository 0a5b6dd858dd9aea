// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use serde::Serialize;
use tokio::net::TcpListener;

/// Connection info emitted once at startup so a host integration can
/// discover the daemon's loopback port and auth token.
#[derive(Debug, Clone, Serialize)]
pub struct BootInfo {
    pub port: u16,
    pub token: String,
    #[serde(rename = "uiBase")]
    pub ui_base: String,
}

/// Mint a fresh bearer token: 24 random bytes, URL-safe base64, unpadded.
pub fn mint_token() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Bind the loopback listener early so the real ephemeral port (when
/// `--http` asks for port 0) is known before anything downstream needs
/// the connection-info line.
pub async fn bind(http_addr: &str) -> anyhow::Result<(TcpListener, u16)> {
    let listener = TcpListener::bind(http_addr).await?;
    let port = listener.local_addr()?.port();
    Ok((listener, port))
}

/// Print the `{port, token, uiBase}` connection-info line to stdout, the
/// sole documented way a host discovers how to reach this process.
pub fn print_conn_json(info: &BootInfo) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(info)?);
    Ok(())
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
