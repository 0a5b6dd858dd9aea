// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

//! Wire message shapes shared between the session router and the
//! transport layer. Kept separate from both so neither has to depend on
//! the other just to talk about messages.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::history::PromptEntry;
use crate::index::Entry;

/// One saved-prompt payload as supplied by a client message.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryInput {
    pub id: String,
    pub serialized_content: String,
    pub project_cwd: String,
}

/// The server-wide session defaults surfaced in `welcome`/
/// `sessionConfigUpdated`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfigView {
    pub custom_command: Option<String>,
}

/// Messages a connected client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Hello,
    OpenSession {
        id: Option<String>,
        cmd: Option<String>,
        args: Option<Vec<String>>,
        env: Option<HashMap<String, String>>,
        cwd: Option<String>,
        pty: Option<bool>,
        cols: Option<u16>,
        rows: Option<u16>,
        resume: Option<bool>,
        use_clipboard: Option<bool>,
    },
    Stdin {
        session_id: String,
        data_base64: String,
        history_entry: Option<HistoryEntryInput>,
    },
    Resize {
        session_id: String,
        cols: u16,
        rows: u16,
    },
    InjectFiles {
        session_id: String,
        paths: Vec<String>,
    },
    Send {
        session_id: String,
        data_base64: Option<String>,
        paths: Option<Vec<String>>,
        history_entry: Option<HistoryEntryInput>,
    },
    Snapshot {
        session_id: String,
    },
    FontSizeChanged {
        font_size: i32,
    },
    UpdateUseClipboard {
        session_id: Option<String>,
        use_clipboard: bool,
    },
    UpdateSessionConfig {
        custom_command: Option<String>,
    },
    SavePrompt {
        session_id: Option<String>,
        history_entry: HistoryEntryInput,
    },
    RemovePrompt {
        prompt_id: String,
    },
    SearchIndex {
        pattern: String,
        #[serde(default)]
        opened: Vec<String>,
        limit: usize,
    },
    /// Catch-all for any `type` this build doesn't recognize. Dispatched
    /// as a no-op: only genuinely malformed JSON is a protocol error.
    #[serde(other)]
    Unknown,
}

/// Messages the server emits to a client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    Welcome {
        features: Vec<String>,
        default_session_config: SessionConfigView,
    },
    Opened {
        id: String,
        session_id: String,
        resumed: bool,
        pid: Option<u32>,
        prompt_history: Vec<PromptEntry>,
    },
    Stdout {
        session_id: String,
        data_base64: String,
        seq: u64,
    },
    Snapshot {
        session_id: String,
        data_base64: String,
        last_seq: u64,
    },
    Exit {
        session_id: String,
        code: Option<i32>,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
    SearchResult {
        results: Vec<Entry>,
        opened_results: Vec<Entry>,
    },
    PromptSaved,
    PromptRemoved {
        prompt_id: String,
    },
    SessionConfigUpdated {
        session_config: SessionConfigView,
    },
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
