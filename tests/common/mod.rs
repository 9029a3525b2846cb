#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

use accordgateway::gateway::session::SharedSession;
use accordgateway::Config;

pub type ServerWs = WebSocketStream<TcpStream>;

pub const RECV_TIMEOUT: Duration = Duration::from_secs(10);

/// Config pointed at nothing in particular; tests drive `run()` directly
/// or override `discovery_url`. The identify gate is disabled so reconnect
/// tests stay fast.
pub fn test_config() -> Config {
    let mut config = Config::new("Bot test-token", "http://127.0.0.1:9/unused");
    config.identify_min_interval_ms = 0;
    config
}

/// Binds a mock gateway listener. Each test scripts the server side of
/// every connection the client opens against it.
pub async fn bind_gateway() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, format!("ws://127.0.0.1:{}", addr.port()))
}

pub async fn accept(listener: &TcpListener) -> ServerWs {
    let (stream, _) = timeout(RECV_TIMEOUT, listener.accept())
        .await
        .expect("timed out waiting for the client to connect")
        .unwrap();
    accept_async(stream).await.unwrap()
}

pub async fn send_json(ws: &mut ServerWs, value: &Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

/// Next text payload from the client, decoded.
pub async fn recv_json(ws: &mut ServerWs) -> Value {
    loop {
        let msg = timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .unwrap();
        match msg {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("expected text frame, got {other:?}"),
        }
    }
}

/// Waits for the client to close the connection; returns the close code.
pub async fn recv_close(ws: &mut ServerWs) -> Option<u16> {
    loop {
        match timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for close")
        {
            Some(Ok(Message::Close(frame))) => return frame.map(|f| u16::from(f.code)),
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => return None,
        }
    }
}

pub fn hello(heartbeat_interval_ms: u64) -> Value {
    json!({ "op": 10, "d": { "heartbeat_interval": heartbeat_interval_ms } })
}

pub fn ready(session_id: &str, seq: u64) -> Value {
    json!({ "op": 0, "s": seq, "t": "READY", "d": { "session_id": session_id } })
}

pub fn heartbeat_ack() -> Value {
    json!({ "op": 11 })
}

/// Accepts a connection and walks it through the fresh-session handshake:
/// HELLO out, IDENTIFY and the immediate first heartbeat in.
pub async fn accept_and_identify(listener: &TcpListener, interval_ms: u64) -> (ServerWs, Value) {
    let mut ws = accept(listener).await;
    send_json(&mut ws, &hello(interval_ms)).await;
    let identify = recv_json(&mut ws).await;
    assert_eq!(identify["op"], 2, "expected IDENTIFY, got {identify}");
    let hb = recv_json(&mut ws).await;
    assert_eq!(hb["op"], 1, "expected the immediate first heartbeat, got {hb}");
    (ws, identify)
}

/// Polls until the client has captured the given session id.
pub async fn wait_for_session(session: &SharedSession, id: &str) {
    timeout(RECV_TIMEOUT, async {
        loop {
            if session.snapshot().await.session_id() == Some(id) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session id was never captured");
}

/// Minimal HTTP stub for the discovery call: answers every request with the
/// given status line and body, then closes.
pub async fn spawn_discovery(status_line: &'static str, body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let resp = format!(
                "HTTP/1.1 {status_line}\r\n\
                 content-type: application/json\r\n\
                 content-length: {}\r\n\
                 connection: close\r\n\r\n{body}",
                body.len()
            );
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let _ = stream.write_all(resp.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });
    format!("http://127.0.0.1:{}", addr.port())
}
