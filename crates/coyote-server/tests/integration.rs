//! End-to-end tests using a real WebSocket client in place of the app.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use coyote_protocol::{Channel, StrengthAction};
use coyote_server::config::ServerConfig;
use coyote_server::server::CoyoteServer;
use coyote_server::session::Session;

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Boot a server with one registered session.
async fn boot_server() -> (String, Arc<CoyoteServer>, Arc<Session>) {
    let server = Arc::new(CoyoteServer::new(ServerConfig::default()));
    let session = server.router().new_session();
    let (addr, _handle) = server.listen().await.unwrap();
    (format!("ws://{addr}"), server, session)
}

async fn connect(base: &str, client_id: &str) -> WsStream {
    let (ws, _) = timeout(TIMEOUT, connect_async(format!("{base}/{client_id}")))
        .await
        .expect("connect timed out")
        .expect("connect failed");
    ws
}

/// Next text frame as JSON, or `None` if the server closed the socket.
async fn read_json(ws: &mut WsStream) -> Option<Value> {
    loop {
        let frame = timeout(TIMEOUT, ws.next()).await.expect("read timed out")?;
        match frame.ok()? {
            Message::Text(text) => return Some(serde_json::from_str(&text).unwrap()),
            Message::Close(_) => return None,
            _ => {}
        }
    }
}

async fn send_json(ws: &mut WsStream, value: &Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

/// Connect and complete the bind handshake.
async fn bind(base: &str, session: &Session) -> WsStream {
    let mut ws = connect(base, session.client_id()).await;
    let hello = read_json(&mut ws).await.unwrap();
    assert_eq!(hello["type"], "bind");
    assert_eq!(hello["message"], "targetId");
    assert_eq!(hello["clientId"], session.client_id());

    send_json(
        &mut ws,
        &json!({
            "type": "bind",
            "clientId": session.client_id(),
            "targetId": "app-1",
            "message": "DGLAB",
        }),
    )
    .await;
    let reply = read_json(&mut ws).await.unwrap();
    assert_eq!(reply["type"], "bind");
    assert_eq!(reply["message"], "200");
    ws
}

async fn eventually(mut check: impl FnMut() -> bool) {
    timeout(TIMEOUT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached");
}

#[tokio::test]
async fn bind_handshake() {
    let (base, _server, session) = boot_server().await;
    let _ws = bind(&base, &session).await;
    assert!(session.is_bound());
    assert_eq!(session.target_id().as_deref(), Some("app-1"));
}

#[tokio::test]
async fn unknown_session_gets_404_and_close() {
    let (base, _server, _session) = boot_server().await;
    let mut ws = connect(&base, "not-a-session").await;
    let err = read_json(&mut ws).await.unwrap();
    assert_eq!(err["type"], "error");
    assert_eq!(err["message"], "404");
    assert!(read_json(&mut ws).await.is_none());
}

#[tokio::test]
async fn second_connection_rejected_while_bound() {
    let (base, _server, session) = boot_server().await;
    let mut first = bind(&base, &session).await;

    let mut second = connect(&base, session.client_id()).await;
    let err = read_json(&mut second).await.unwrap();
    assert_eq!(err["message"], "400");
    assert!(read_json(&mut second).await.is_none());

    // first pairing still works
    assert!(session.is_bound());
    session
        .set_strength(Channel::A, StrengthAction::Set, 7)
        .unwrap();
    let cmd = read_json(&mut first).await.unwrap();
    assert_eq!(cmd["message"], "strength-1+2+7");
}

#[tokio::test]
async fn strength_report_updates_session() {
    let (base, _server, session) = boot_server().await;
    let mut ws = bind(&base, &session).await;
    send_json(
        &mut ws,
        &json!({
            "type": "msg",
            "clientId": session.client_id(),
            "targetId": "app-1",
            "message": "strength-3+4+60+70",
        }),
    )
    .await;
    eventually(|| session.strength().max_b == 70).await;
    assert_eq!(session.strength().current_a, 3);
}

#[tokio::test]
async fn invalid_json_gets_403() {
    let (base, _server, session) = boot_server().await;
    let mut ws = bind(&base, &session).await;
    ws.send(Message::Text("{oops".into())).await.unwrap();
    let err = read_json(&mut ws).await.unwrap();
    assert_eq!(err["type"], "error");
    assert_eq!(err["message"], "403");
}

#[tokio::test]
async fn client_close_unbinds_session() {
    let (base, server, session) = boot_server().await;
    let mut ws = bind(&base, &session).await;
    ws.close(None).await.unwrap();
    eventually(|| !session.is_bound()).await;
    eventually(|| server.router().connection_count() == 0).await;
}

#[tokio::test]
async fn app_break_unbinds_and_allows_rebind() {
    let (base, _server, session) = boot_server().await;
    let mut ws = bind(&base, &session).await;
    send_json(
        &mut ws,
        &json!({
            "type": "break",
            "clientId": session.client_id(),
            "targetId": "app-1",
            "message": "209",
        }),
    )
    .await;
    eventually(|| !session.is_bound()).await;

    send_json(
        &mut ws,
        &json!({
            "type": "bind",
            "clientId": session.client_id(),
            "targetId": "app-2",
            "message": "DGLAB",
        }),
    )
    .await;
    let reply = read_json(&mut ws).await.unwrap();
    assert_eq!(reply["message"], "200");
    assert_eq!(session.target_id().as_deref(), Some("app-2"));
}

#[tokio::test]
async fn server_disconnect_sends_break() {
    let (base, _server, session) = boot_server().await;
    let mut ws = bind(&base, &session).await;
    session.disconnect();
    let notice = read_json(&mut ws).await.unwrap();
    assert_eq!(notice["type"], "break");
    assert!(read_json(&mut ws).await.is_none());
}
