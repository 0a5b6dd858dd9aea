// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error codes shared across the HTTP surface and the WebSocket
/// `error` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    Auth,
    Protocol,
    SessionStart,
    NoSession,
    Io,
    Clipboard,
    Persistence,
    Internal,
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Auth => 403,
            Self::Protocol => 400,
            Self::SessionStart => 500,
            Self::NoSession => 404,
            Self::Io => 500,
            Self::Clipboard => 500,
            Self::Persistence => 500,
            Self::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "AUTH",
            Self::Protocol => "PROTOCOL",
            Self::SessionStart => "SESSION_START",
            Self::NoSession => "NO_SESSION",
            Self::Io => "IO",
            Self::Clipboard => "CLIPBOARD",
            Self::Persistence => "PERSISTENCE",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
