// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

use tokio::process::Command;

/// Platform clipboard get/set. Implementations shell out to whatever
/// utility the platform provides; any failure is surfaced as an error so
/// callers can fall back to direct injection.
#[async_trait::async_trait]
pub trait Clipboard: Send + Sync {
    async fn get(&self) -> anyhow::Result<String>;
    async fn set(&self, text: &str) -> anyhow::Result<()>;
}

/// Picks the clipboard backend for the running platform.
pub fn system_clipboard() -> Box<dyn Clipboard> {
    #[cfg(target_os = "macos")]
    {
        Box::new(MacClipboard)
    }
    #[cfg(target_os = "windows")]
    {
        Box::new(WindowsClipboard)
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        Box::new(LinuxClipboard)
    }
}

async fn run_capture(program: &str, args: &[&str]) -> anyhow::Result<String> {
    let output = Command::new(program).args(args).output().await?;
    if !output.status.success() {
        anyhow::bail!("{program} exited with {}", output.status);
    }
    Ok(String::from_utf8(output.stdout)?)
}

async fn run_with_stdin(program: &str, args: &[&str], input: &str) -> anyhow::Result<()> {
    use tokio::io::AsyncWriteExt;
    use std::process::Stdio;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .spawn()?;
    let mut stdin = child.stdin.take().ok_or_else(|| anyhow::anyhow!("no stdin"))?;
    stdin.write_all(input.as_bytes()).await?;
    drop(stdin);
    let status = child.wait().await?;
    if !status.success() {
        anyhow::bail!("{program} exited with {status}");
    }
    Ok(())
}

#[cfg(target_os = "macos")]
struct MacClipboard;

#[cfg(target_os = "macos")]
#[async_trait::async_trait]
impl Clipboard for MacClipboard {
    async fn get(&self) -> anyhow::Result<String> {
        run_capture("pbpaste", &[]).await
    }

    async fn set(&self, text: &str) -> anyhow::Result<()> {
        run_with_stdin("pbcopy", &[], text).await
    }
}

#[cfg(target_os = "windows")]
struct WindowsClipboard;

#[cfg(target_os = "windows")]
#[async_trait::async_trait]
impl Clipboard for WindowsClipboard {
    async fn get(&self) -> anyhow::Result<String> {
        run_capture("powershell", &["-NoProfile", "-Command", "Get-Clipboard"]).await
    }

    async fn set(&self, text: &str) -> anyhow::Result<()> {
        run_with_stdin(
            "powershell",
            &["-NoProfile", "-Command", "Set-Clipboard -Value ([Console]::In.ReadToEnd())"],
            text,
        )
        .await
    }
}

/// Tries Wayland tools first, then X11 tools, in order.
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
struct LinuxClipboard;

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
#[async_trait::async_trait]
impl Clipboard for LinuxClipboard {
    async fn get(&self) -> anyhow::Result<String> {
        if let Ok(text) = run_capture("wl-paste", &["--no-newline"]).await {
            return Ok(text);
        }
        if let Ok(text) = run_capture("xclip", &["-selection", "clipboard", "-o"]).await {
            return Ok(text);
        }
        run_capture("xsel", &["--clipboard", "--output"]).await
    }

    async fn set(&self, text: &str) -> anyhow::Result<()> {
        if run_with_stdin("wl-copy", &[], text).await.is_ok() {
            return Ok(());
        }
        if run_with_stdin("xclip", &["-selection", "clipboard"], text)
            .await
            .is_ok()
        {
            return Ok(());
        }
        run_with_stdin("xsel", &["--clipboard", "--input"], text).await
    }
}

#[cfg(test)]
#[path = "clipboard_tests.rs"]
mod tests;
