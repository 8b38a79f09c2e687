//! Connection lifecycle: handles one upgraded socket from attach to close.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use super::connection::{ClientConnection, new_connection_id};
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL};
use crate::router::{ConnectOutcome, SessionRouter};

/// Time the writer gets to flush and send a Close frame after the reader ends.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Run a connection that asked for session `client_id`.
///
/// 1. Hands the connection to the router, which attaches or rejects it
/// 2. Routes inbound text frames to the router, strictly in arrival order
/// 3. Forwards queued outbound frames; on close flushes them, then sends Close
/// 4. Reports the disconnect to the router
#[instrument(skip_all, fields(client_id = %client_id, conn_id = tracing::field::Empty))]
pub async fn run_connection(
    ws: WebSocket,
    client_id: String,
    router: Arc<SessionRouter>,
    send_queue_size: usize,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<String>(send_queue_size.max(1));
    let connection = Arc::new(ClientConnection::new(new_connection_id(), send_tx));
    let _ = tracing::Span::current().record("conn_id", connection.id.as_str());

    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let closed = connection.closed_token();
    let mut outbound = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = send_rx.recv() => match msg {
                    Some(text) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                () = closed.cancelled() => {
                    while let Ok(text) = send_rx.try_recv() {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            return;
                        }
                    }
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    if let ConnectOutcome::Accepted(_) = router.handle_connect(&client_id, &connection) {
        info!("client connected");
    }

    let closed = connection.closed_token();
    loop {
        let frame = tokio::select! {
            frame = ws_rx.next() => frame,
            () = closed.cancelled() => break,
        };
        let Some(Ok(frame)) = frame else { break };

        match frame {
            Message::Text(text) => router.handle_message(&connection, text.as_str()),
            Message::Binary(data) => match std::str::from_utf8(&data) {
                Ok(text) => router.handle_message(&connection, text),
                Err(_) => debug!(len = data.len(), "ignoring non-UTF8 binary frame"),
            },
            Message::Close(_) => {
                debug!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    connection.close();
    router.handle_disconnect(&connection);
    if tokio::time::timeout(CLOSE_GRACE, &mut outbound).await.is_err() {
        outbound.abort();
    }

    info!(
        duration_ms = u64::try_from(connection.age().as_millis()).unwrap_or(u64::MAX),
        dropped = connection.drop_count(),
        "client disconnected"
    );
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
}
