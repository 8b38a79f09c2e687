//! Connection-to-session routing.
//!
//! Sessions are registered up front; a connection names its session in the
//! upgrade path. The router attaches accepted connections, decodes inbound
//! envelopes and hands them to the owning session, converting protocol
//! violations into status replies on the offending connection.

use std::sync::Arc;

use coyote_protocol::{MAX_MESSAGE_LEN, MsgType, RetCode, WsMessage};
use dashmap::DashMap;
use metrics::counter;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::errors::{RouterError, SessionError};
use crate::metrics::{WS_CONNECTIONS_REJECTED_TOTAL, WS_DECODE_ERRORS_TOTAL};
use crate::session::Session;
use crate::websocket::connection::ClientConnection;

/// Lifecycle events emitted by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterEvent {
    /// A connection was attached to a session.
    Connected {
        /// Session identifier.
        client_id: String,
        /// Connection identifier.
        conn_id: String,
    },
    /// An attached connection went away.
    Disconnected {
        /// Session identifier.
        client_id: String,
        /// Connection identifier.
        conn_id: String,
    },
    /// An envelope was routed to a session.
    MessageReceived {
        /// Session identifier.
        client_id: String,
        /// Envelope kind.
        kind: MsgType,
    },
}

/// Result of an upgrade attempt.
#[derive(Debug)]
pub enum ConnectOutcome {
    /// Attached to the session.
    Accepted(Arc<Session>),
    /// No session with that id; `404` sent and the connection closed.
    UnknownSession,
    /// Session already bound; `400` sent and the connection closed.
    AlreadyBound,
}

/// Registry of sessions and the connections attached to them.
pub struct SessionRouter {
    sessions: DashMap<String, Arc<Session>>,
    /// Connection ID → client ID for attached connections.
    connections: DashMap<String, String>,
    events: broadcast::Sender<RouterEvent>,
}

impl SessionRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            sessions: DashMap::new(),
            connections: DashMap::new(),
            events,
        }
    }

    /// Register a session under a fresh random id.
    pub fn new_session(&self) -> Arc<Session> {
        let session = Arc::new(Session::new(uuid::Uuid::new_v4().to_string()));
        self.register(Arc::clone(&session));
        session
    }

    /// Register an existing session.
    pub fn register(&self, session: Arc<Session>) {
        info!(client_id = session.client_id(), "session registered");
        let _ = self
            .sessions
            .insert(session.client_id().to_string(), session);
    }

    /// Look up a session.
    pub fn session(&self, client_id: &str) -> Result<Arc<Session>, RouterError> {
        self.sessions
            .get(client_id)
            .map(|s| Arc::clone(s.value()))
            .ok_or_else(|| RouterError::SessionNotFound(client_id.to_string()))
    }

    /// Registered sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Sessions currently bound.
    pub fn bound_count(&self) -> usize {
        self.sessions.iter().filter(|s| s.is_bound()).count()
    }

    /// Attached connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Receive lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: RouterEvent) {
        let _ = self.events.send(event);
    }

    /// Handle a new connection that asked for `client_id`.
    pub fn handle_connect(
        &self,
        client_id: &str,
        connection: &Arc<ClientConnection>,
    ) -> ConnectOutcome {
        let Ok(session) = self.session(client_id) else {
            warn!(client_id, conn_id = %connection.id, "connection for unknown session");
            counter!(WS_CONNECTIONS_REJECTED_TOTAL, "reason" => "unknown").increment(1);
            reply(connection, &WsMessage::error(RetCode::ReceiverOffline));
            connection.close();
            return ConnectOutcome::UnknownSession;
        };

        if session.is_bound() {
            warn!(client_id, conn_id = %connection.id, "session already bound, rejecting connection");
            counter!(WS_CONNECTIONS_REJECTED_TOTAL, "reason" => "bound").increment(1);
            reply(connection, &WsMessage::error(RetCode::AlreadyBound));
            connection.close();
            return ConnectOutcome::AlreadyBound;
        }

        session.attach(Arc::clone(connection));
        let _ = self
            .connections
            .insert(connection.id.clone(), client_id.to_string());
        info!(client_id, conn_id = %connection.id, "connection attached");
        self.emit(RouterEvent::Connected {
            client_id: client_id.to_string(),
            conn_id: connection.id.clone(),
        });

        let hello = WsMessage::new(MsgType::Bind, client_id, "", "targetId");
        if let Err(e) = session.send_message(&hello) {
            warn!(client_id, error = %e, "failed to send client id");
        }
        ConnectOutcome::Accepted(session)
    }

    /// Handle the end of a connection.
    pub fn handle_disconnect(&self, connection: &ClientConnection) {
        let Some((_, client_id)) = self.connections.remove(&connection.id) else {
            debug!(conn_id = %connection.id, "unattached connection closed");
            return;
        };
        if let Ok(session) = self.session(&client_id) {
            let _ = session.detach(&connection.id);
        }
        info!(client_id, conn_id = %connection.id, "connection detached");
        self.emit(RouterEvent::Disconnected {
            client_id,
            conn_id: connection.id.clone(),
        });
    }

    /// Handle one inbound text frame.
    pub fn handle_message(&self, connection: &ClientConnection, text: &str) {
        if text.len() > MAX_MESSAGE_LEN {
            debug!(conn_id = %connection.id, len = text.len(), "oversized envelope");
            counter!(WS_DECODE_ERRORS_TOTAL).increment(1);
            reply(connection, &WsMessage::error(RetCode::TooLong));
            return;
        }

        let msg = match WsMessage::from_json(text) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(conn_id = %connection.id, error = %e, "undecodable envelope");
                counter!(WS_DECODE_ERRORS_TOTAL).increment(1);
                reply(connection, &WsMessage::error(RetCode::InvalidFormat));
                return;
            }
        };

        let session = match self.session(&msg.client_id) {
            Ok(session) => session,
            Err(e) => {
                warn!(conn_id = %connection.id, error = %e, "dropping message");
                return;
            }
        };

        self.emit(RouterEvent::MessageReceived {
            client_id: msg.client_id.clone(),
            kind: msg.kind,
        });

        let result = match msg.kind {
            MsgType::Bind => session.handle_bind(&msg),
            MsgType::Msg => session.handle_msg(&msg.message),
            MsgType::Heartbeat => {
                session.handle_heartbeat();
                Ok(())
            }
            MsgType::Break => {
                session.handle_break();
                Ok(())
            }
            MsgType::Error => {
                session.handle_error(&msg.message);
                Ok(())
            }
            MsgType::Unknown => {
                reply(connection, &WsMessage::error(RetCode::Internal));
                Ok(())
            }
        };

        match result {
            Ok(()) => {}
            Err(SessionError::Codec(e)) => {
                debug!(client_id = %msg.client_id, error = %e, "malformed payload");
                reply(connection, &WsMessage::error(RetCode::InvalidFormat));
            }
            Err(e) => warn!(client_id = %msg.client_id, error = %e, "message handling failed"),
        }
    }
}

impl Default for SessionRouter {
    fn default() -> Self {
        Self::new()
    }
}

fn reply(connection: &ClientConnection, msg: &WsMessage) {
    match msg.to_json() {
        Ok(json) => {
            if !connection.send(json) {
                debug!(conn_id = %connection.id, "reply dropped");
            }
        }
        Err(e) => warn!(error = %e, "failed to encode reply"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionEvent;
    use assert_matches::assert_matches;
    use tokio::sync::mpsc;

    fn conn(id: &str) -> (Arc<ClientConnection>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(32);
        (Arc::new(ClientConnection::new(id.into(), tx)), rx)
    }

    fn next(rx: &mut mpsc::Receiver<String>) -> WsMessage {
        WsMessage::from_json(&rx.try_recv().unwrap()).unwrap()
    }

    fn envelope(kind: &str, client_id: &str, message: &str) -> String {
        serde_json::json!({
            "type": kind,
            "clientId": client_id,
            "targetId": "app-1",
            "message": message,
        })
        .to_string()
    }

    fn connected() -> (SessionRouter, Arc<Session>, Arc<ClientConnection>, mpsc::Receiver<String>) {
        let router = SessionRouter::new();
        let session = router.new_session();
        let (c, mut rx) = conn("conn_1");
        assert_matches!(
            router.handle_connect(session.client_id(), &c),
            ConnectOutcome::Accepted(_)
        );
        let _ = next(&mut rx);
        (router, session, c, rx)
    }

    #[test]
    fn new_sessions_have_distinct_ids() {
        let router = SessionRouter::new();
        let a = router.new_session();
        let b = router.new_session();
        assert_ne!(a.client_id(), b.client_id());
        assert_eq!(router.session_count(), 2);
    }

    #[test]
    fn lookup_unknown_session() {
        let router = SessionRouter::new();
        assert_matches!(router.session("nope"), Err(RouterError::SessionNotFound(_)));
    }

    #[test]
    fn connect_sends_client_id() {
        let router = SessionRouter::new();
        let session = router.new_session();
        let mut events = router.subscribe();
        let (c, mut rx) = conn("conn_1");

        assert_matches!(
            router.handle_connect(session.client_id(), &c),
            ConnectOutcome::Accepted(_)
        );
        let hello = next(&mut rx);
        assert_eq!(hello.kind, MsgType::Bind);
        assert_eq!(hello.client_id, session.client_id());
        assert_eq!(hello.message, "targetId");
        assert_eq!(router.connection_count(), 1);
        assert_matches!(events.try_recv().unwrap(), RouterEvent::Connected { .. });
    }

    #[test]
    fn connect_unknown_session_gets_404() {
        let router = SessionRouter::new();
        let (c, mut rx) = conn("conn_1");
        assert_matches!(router.handle_connect("ghost", &c), ConnectOutcome::UnknownSession);
        let err = next(&mut rx);
        assert_eq!(err.kind, MsgType::Error);
        assert_eq!(err.message, "404");
        assert!(c.is_closed());
    }

    #[test]
    fn connect_to_bound_session_gets_400_and_keeps_binding() {
        let (router, session, c, _rx) = connected();
        router.handle_message(&c, &envelope("bind", session.client_id(), "DGLAB"));
        assert!(session.is_bound());

        let (second, mut rx2) = conn("conn_2");
        assert_matches!(
            router.handle_connect(session.client_id(), &second),
            ConnectOutcome::AlreadyBound
        );
        assert_eq!(next(&mut rx2).message, "400");
        assert!(second.is_closed());

        router.handle_disconnect(&second);
        assert!(session.is_bound());
        assert_eq!(session.connection_id().as_deref(), Some("conn_1"));
    }

    #[test]
    fn bind_flow() {
        let (router, session, c, mut rx) = connected();
        router.handle_message(&c, &envelope("bind", session.client_id(), "DGLAB"));
        let reply = next(&mut rx);
        assert_eq!(reply.message, "200");
        assert!(session.is_bound());
    }

    #[test]
    fn invalid_json_gets_403() {
        let (router, _session, c, mut rx) = connected();
        router.handle_message(&c, "{{{");
        let err = next(&mut rx);
        assert_eq!(err.kind, MsgType::Error);
        assert_eq!(err.message, "403");
    }

    #[test]
    fn oversized_envelope_gets_405_and_is_dropped() {
        let (router, session, c, mut rx) = connected();
        let padding = "x".repeat(MAX_MESSAGE_LEN);
        router.handle_message(&c, &envelope("heartbeat", session.client_id(), &padding));
        let err = next(&mut rx);
        assert_eq!(err.kind, MsgType::Error);
        assert_eq!(err.message, "405");
        assert!(session.heartbeat_age().is_none());
    }

    #[test]
    fn unknown_type_gets_500() {
        let (router, session, c, mut rx) = connected();
        router.handle_message(&c, &envelope("telemetry", session.client_id(), ""));
        assert_eq!(next(&mut rx).message, "500");
    }

    #[test]
    fn malformed_strength_gets_403() {
        let (router, session, c, mut rx) = connected();
        router.handle_message(&c, &envelope("msg", session.client_id(), "strength-1+2"));
        assert_eq!(next(&mut rx).message, "403");
    }

    #[test]
    fn unknown_client_id_is_dropped() {
        let (router, _session, c, mut rx) = connected();
        router.handle_message(&c, &envelope("heartbeat", "someone-else", ""));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn strength_report_reaches_session() {
        let (router, session, c, _rx) = connected();
        let mut events = router.subscribe();
        router.handle_message(
            &c,
            &envelope("msg", session.client_id(), "strength-5+6+70+80"),
        );
        assert_eq!(session.strength().max_b, 80);
        assert_eq!(
            events.try_recv().unwrap(),
            RouterEvent::MessageReceived {
                client_id: session.client_id().to_string(),
                kind: MsgType::Msg,
            }
        );
    }

    #[test]
    fn disconnect_unbinds_and_emits() {
        let (router, session, c, _rx) = connected();
        router.handle_message(&c, &envelope("bind", session.client_id(), "DGLAB"));
        let mut events = router.subscribe();

        router.handle_disconnect(&c);
        assert!(!session.is_bound());
        assert_eq!(router.connection_count(), 0);
        assert_matches!(
            events.try_recv().unwrap(),
            RouterEvent::Disconnected { .. }
        );
    }

    #[test]
    fn reconnect_before_old_disconnect_starts_unbound() {
        let (router, session, c, _rx) = connected();
        router.handle_message(&c, &envelope("bind", session.client_id(), "DGLAB"));
        assert!(session.is_bound());
        let mut events = session.subscribe();

        // old socket dead, its reader has not reported yet
        c.close();
        let (again, mut rx2) = conn("conn_2");
        assert_matches!(
            router.handle_connect(session.client_id(), &again),
            ConnectOutcome::Accepted(_)
        );
        let _ = next(&mut rx2);
        assert!(!session.is_bound());
        assert!(session.target_id().is_none());
        assert_eq!(events.try_recv().unwrap(), SessionEvent::Break);

        router.handle_disconnect(&c);
        assert_eq!(session.connection_id().as_deref(), Some("conn_2"));

        router.handle_message(&again, &envelope("bind", session.client_id(), "DGLAB"));
        assert_eq!(next(&mut rx2).message, "200");
        assert!(session.is_bound());
    }

    #[test]
    fn reconnect_after_disconnect_is_accepted() {
        let (router, session, c, _rx) = connected();
        router.handle_message(&c, &envelope("bind", session.client_id(), "DGLAB"));
        router.handle_disconnect(&c);

        let (again, _rx2) = conn("conn_2");
        assert_matches!(
            router.handle_connect(session.client_id(), &again),
            ConnectOutcome::Accepted(_)
        );
    }
}
