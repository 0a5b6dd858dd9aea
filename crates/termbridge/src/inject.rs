// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::clipboard::Clipboard;
use crate::idle;

/// Control byte that triggers "paste" in the attached terminal (Ctrl-V).
pub const PASTE_TRIGGER: u8 = 0x16;

const CLIPBOARD_IDLE_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectOutcome {
    pub used_clipboard: bool,
}

/// Deliver `contents` (one entry per file, already read) to the child's
/// stdin. Tries the clipboard-mediated path first when `use_clipboard` is
/// set; any clipboard error falls back to direct, newline-escaped
/// injection.
pub async fn inject_files<F>(
    contents: &[String],
    use_clipboard: bool,
    clipboard: &dyn Clipboard,
    stdin: &mpsc::Sender<Bytes>,
    is_idle: F,
) -> anyhow::Result<InjectOutcome>
where
    F: Fn() -> bool,
{
    if use_clipboard && try_clipboard_inject(contents, clipboard, stdin, &is_idle).await.is_ok() {
        return Ok(InjectOutcome {
            used_clipboard: true,
        });
    }

    let payload = fallback_payload(contents);
    stdin.send(Bytes::from(payload.into_bytes())).await?;
    Ok(InjectOutcome {
        used_clipboard: false,
    })
}

async fn try_clipboard_inject<F>(
    contents: &[String],
    clipboard: &dyn Clipboard,
    stdin: &mpsc::Sender<Bytes>,
    is_idle: &F,
) -> anyhow::Result<()>
where
    F: Fn() -> bool,
{
    let previous = clipboard.get().await.unwrap_or_default();
    let payload = contents.join(" ");
    clipboard.set(&payload).await?;

    idle::wait_idle(CLIPBOARD_IDLE_WINDOW, is_idle).await;
    stdin.send(Bytes::from(vec![PASTE_TRIGGER])).await?;
    idle::wait_idle(CLIPBOARD_IDLE_WINDOW, is_idle).await;

    // Best-effort restore; a failure here shouldn't undo the paste we
    // already triggered.
    let _ = clipboard.set(&previous).await;
    Ok(())
}

/// Normalize newlines and escape each as a literal backslash-newline pair,
/// per file, joined with a trailing space.
pub fn fallback_payload(contents: &[String]) -> String {
    let mut out = String::new();
    for content in contents {
        out.push_str(&escape_file(content));
        out.push(' ');
    }
    out
}

fn escape_file(content: &str) -> String {
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    normalized.replace('\n', "\\\n")
}

#[cfg(test)]
#[path = "inject_tests.rs"]
mod tests;
