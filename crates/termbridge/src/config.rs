// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

use clap::Parser;

/// Local terminal-bridge daemon.
#[derive(Debug, Parser, Clone)]
#[command(name = "termbridge", version, about)]
pub struct Config {
    /// Loopback HTTP listen address (port 0 picks an ephemeral port).
    #[arg(long, env = "TB_HTTP", default_value = "127.0.0.1:0")]
    pub http: String,

    /// Serve the embedded UI assets under `/`.
    #[arg(long, env = "TB_SERVE_UI", default_value_t = true)]
    pub serve_ui: bool,

    /// Print the `{port, token, uiBase}` connection line to stdout at startup.
    #[arg(long, env = "TB_PRINT_CONN_JSON", default_value_t = true)]
    pub print_conn_json: bool,

    /// Override the default child command (applies to future `openSession`
    /// calls that don't specify their own `cmd`).
    #[arg(long, env = "TB_CMD")]
    pub cmd: Option<String>,

    /// Log format: "json" or "text".
    #[arg(long, env = "TB_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "TB_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.http.parse::<std::net::SocketAddr>().is_err() {
            anyhow::bail!("--http must be a socket address, e.g. 127.0.0.1:0");
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid --log-format: {other}"),
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
