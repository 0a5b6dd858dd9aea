// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the termbridge contributors

//! Literal end-to-end scenarios driven over a real TCP socket and a real
//! WebSocket client against an in-process server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use termbridge_specs::{spawn, spawn_with_failing_clipboard, FailingClipboard};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn try_connect(
    addr: std::net::SocketAddr,
    protocol: Option<&str>,
    origin: Option<&str>,
) -> Result<
    (WsStream, tokio_tungstenite::tungstenite::http::Response<Option<Vec<u8>>>),
    tokio_tungstenite::tungstenite::Error,
> {
    let mut request = format!("ws://{addr}/ws").into_client_request()?;
    if let Some(proto) = protocol {
        request.headers_mut().insert("Sec-WebSocket-Protocol", proto.parse().unwrap());
    }
    if let Some(origin) = origin {
        request.headers_mut().insert("Origin", origin.parse().unwrap());
    }
    tokio_tungstenite::connect_async(request).await
}

async fn connect_authed(addr: std::net::SocketAddr, token: &str) -> WsStream {
    let (stream, response) = try_connect(addr, Some(&format!("auth.bearer.{token}")), Some("http://localhost"))
        .await
        .expect("handshake should succeed");
    assert_eq!(
        response.headers().get("sec-websocket-protocol").and_then(|v| v.to_str().ok()),
        Some(format!("auth.bearer.{token}").as_str())
    );
    stream
}

async fn send_json(stream: &mut WsStream, value: &Value) {
    let text = serde_json::to_string(value).expect("serialize");
    stream.send(WsMessage::Text(text.into())).await.expect("send");
}

async fn recv_json(stream: &mut WsStream) -> Value {
    let msg = tokio::time::timeout(RECV_TIMEOUT, stream.next())
        .await
        .expect("recv timeout")
        .expect("stream closed")
        .expect("ws error");
    match msg {
        WsMessage::Text(text) => serde_json::from_str(&text).expect("valid json"),
        other => panic!("expected text frame, got {other:?}"),
    }
}

/// Scenario 1: Authentication.
#[tokio::test]
async fn authentication_rejects_missing_or_wrong_token_accepts_correct_one() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = spawn(dir.path(), "secrettoken", Box::new(FailingClipboard)).await.expect("spawn");

    let no_proto = try_connect(server.addr, None, None).await;
    assert!(no_proto.is_err());

    let wrong = try_connect(server.addr, Some("auth.bearer.wrong"), None).await;
    assert!(wrong.is_err());

    let (_stream, response) = try_connect(
        server.addr,
        Some("auth.bearer.secrettoken"),
        Some("http://localhost"),
    )
    .await
    .expect("handshake should succeed");
    assert_eq!(
        response.headers().get("sec-websocket-protocol").and_then(|v| v.to_str().ok()),
        Some("auth.bearer.secrettoken")
    );
}

/// Scenario 2: Open + echo.
#[tokio::test]
async fn open_session_streams_stdout_then_exit() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = spawn(dir.path(), "secrettoken", Box::new(FailingClipboard)).await.expect("spawn");
    let mut stream = connect_authed(server.addr, "secrettoken").await;

    send_json(&mut stream, &json!({"type": "hello"})).await;
    let welcome = recv_json(&mut stream).await;
    assert_eq!(welcome["type"], "welcome");

    send_json(
        &mut stream,
        &json!({
            "type": "openSession",
            "id": "o1",
            "cmd": "printf",
            "args": ["hi"],
            "pty": false,
            "cols": 80,
            "rows": 24
        }),
    )
    .await;

    let opened = recv_json(&mut stream).await;
    assert_eq!(opened["type"], "opened");
    assert_eq!(opened["id"], "o1");
    assert_eq!(opened["resumed"], false);
    let session_id = opened["sessionId"].as_str().expect("sessionId").to_string();

    let mut last_seq = 0u64;
    let mut saw_stdout = false;
    loop {
        let msg = recv_json(&mut stream).await;
        match msg["type"].as_str().expect("type") {
            "stdout" => {
                assert_eq!(msg["sessionId"], session_id);
                let seq = msg["seq"].as_u64().expect("seq");
                assert!(seq > last_seq, "seq must strictly increase");
                last_seq = seq;
                saw_stdout = true;
            }
            "exit" => {
                assert_eq!(msg["sessionId"], session_id);
                assert_eq!(msg["code"], 0);
                break;
            }
            other => panic!("unexpected message type: {other}"),
        }
    }
    assert!(saw_stdout);
}

/// Scenario 3: Resume after disconnect.
#[tokio::test]
async fn resume_after_disconnect_sends_opened_then_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = spawn(dir.path(), "secrettoken", Box::new(FailingClipboard)).await.expect("spawn");

    let mut first = connect_authed(server.addr, "secrettoken").await;
    send_json(
        &mut first,
        &json!({
            "type": "openSession",
            "id": "s1",
            "cmd": "sleep",
            "args": ["5"],
            "pty": false,
            "cols": 80,
            "rows": 24
        }),
    )
    .await;
    let opened = recv_json(&mut first).await;
    assert_eq!(opened["resumed"], false);

    first.close(None).await.expect("close");
    drop(first);
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut second = connect_authed(server.addr, "secrettoken").await;
    send_json(
        &mut second,
        &json!({"type": "openSession", "id": "s1", "resume": true}),
    )
    .await;

    let opened = recv_json(&mut second).await;
    assert_eq!(opened["type"], "opened");
    assert_eq!(opened["resumed"], true);

    let snapshot = recv_json(&mut second).await;
    assert_eq!(snapshot["type"], "snapshot");
    assert!(snapshot["lastSeq"].as_u64().is_some());
}

/// Scenario 4: Sequence gap recovery via an explicit snapshot request.
#[tokio::test]
async fn snapshot_returns_current_last_seq_on_demand() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = spawn(dir.path(), "secrettoken", Box::new(FailingClipboard)).await.expect("spawn");
    let mut stream = connect_authed(server.addr, "secrettoken").await;

    send_json(
        &mut stream,
        &json!({
            "type": "openSession",
            "id": "s1",
            "cmd": "sleep",
            "args": ["5"],
            "pty": false,
            "cols": 80,
            "rows": 24
        }),
    )
    .await;
    let opened = recv_json(&mut stream).await;
    let session_id = opened["sessionId"].as_str().expect("sessionId").to_string();

    send_json(&mut stream, &json!({"type": "snapshot", "sessionId": session_id})).await;
    let snapshot = recv_json(&mut stream).await;
    assert_eq!(snapshot["type"], "snapshot");
    assert_eq!(snapshot["sessionId"], session_id);
    assert!(snapshot["lastSeq"].as_u64().is_some());
}

/// Scenario 5: Font-size latch.
#[tokio::test]
async fn font_size_latch_reset_on_read() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = spawn(dir.path(), "secrettoken", Box::new(FailingClipboard)).await.expect("spawn");
    let mut stream = connect_authed(server.addr, "secrettoken").await;

    send_json(&mut stream, &json!({"type": "fontSizeChanged", "fontSize": 18})).await;

    let client = reqwest::Client::new();
    let url = format!("http://{}/font-size", server.addr);
    let first: Value = client
        .get(&url)
        .bearer_auth("secrettoken")
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(first["fontSize"], 18);

    let second: Value = client
        .get(&url)
        .bearer_auth("secrettoken")
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(second["fontSize"], 0);
}

/// Scenario 6: Inject with clipboard fallback.
#[tokio::test]
async fn inject_files_falls_back_to_direct_stdin_when_clipboard_set_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file_a = dir.path().join("a.txt");
    let file_b = dir.path().join("b.txt");
    std::fs::write(&file_a, "hello").expect("write a");
    std::fs::write(&file_b, "world").expect("write b");

    let server = spawn_with_failing_clipboard(dir.path(), "secrettoken").await.expect("spawn");
    let mut stream = connect_authed(server.addr, "secrettoken").await;

    send_json(
        &mut stream,
        &json!({
            "type": "openSession",
            "id": "s1",
            "cmd": "cat",
            "pty": false,
            "cols": 80,
            "rows": 24,
            "cwd": dir.path().display().to_string(),
            "useClipboard": true
        }),
    )
    .await;
    let opened = recv_json(&mut stream).await;
    let session_id = opened["sessionId"].as_str().expect("sessionId").to_string();

    send_json(
        &mut stream,
        &json!({
            "type": "injectFiles",
            "sessionId": session_id,
            "paths": ["a.txt", "b.txt"]
        }),
    )
    .await;

    let mut collected = Vec::new();
    loop {
        let msg = recv_json(&mut stream).await;
        if msg["type"] == "stdout" {
            let data = msg["dataBase64"].as_str().expect("dataBase64");
            use base64::Engine;
            let bytes = base64::engine::general_purpose::STANDARD.decode(data).expect("valid base64");
            collected.extend(bytes);
            if collected.contains(&0x16) {
                panic!("paste trigger byte must not be sent when clipboard fails");
            }
            let text = String::from_utf8_lossy(&collected);
            if text.contains("hello") && text.contains("world") {
                break;
            }
        }
    }
}
