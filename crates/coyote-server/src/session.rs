//! Per-client protocol state machine.
//!
//! A session is registered before any connection exists; its client id is
//! handed to the app out of band (the pairing URL). The app then connects,
//! receives its id, and binds:
//!
//! ```text
//! Unbound --bind--> Bound --break / disconnect--> Unbound
//! ```
//!
//! A second bind while bound is answered with `400` and changes nothing.
//! Heartbeat age is tracked but never forces a transition.

use std::sync::Arc;
use std::time::{Duration, Instant};

use coyote_protocol::{
    Channel, FeedbackButton, MAX_MESSAGE_LEN, MsgHead, MsgType, RetCode, StrengthAction,
    StrengthSnapshot, Waveform, WsMessage, clear_command, encode_waveform, parse_feedback,
    parse_strength_update, pulse_command, strength_command,
};
use metrics::counter;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::errors::SessionError;
use crate::metrics::SESSION_BINDS_TOTAL;
use crate::websocket::connection::ClientConnection;

/// Lifecycle events emitted by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The app completed a bind.
    Bound {
        /// App identifier.
        target_id: String,
    },
    /// The app sent a heartbeat.
    Heartbeat,
    /// A `msg` envelope arrived.
    MessageReceived {
        /// Classified head of the payload.
        head: MsgHead,
    },
    /// A feedback button was pressed.
    Feedback(FeedbackButton),
    /// The app reported new strengths.
    StrengthChanged(StrengthSnapshot),
    /// The pairing ended.
    Break,
    /// The app reported an error status.
    Error {
        /// Payload of the error envelope.
        message: String,
    },
}

#[derive(Default)]
struct SessionState {
    connection: Option<Arc<ClientConnection>>,
    target_id: Option<String>,
    bound: bool,
    strength: StrengthSnapshot,
    last_heartbeat: Option<Instant>,
}

/// One pairing between this relay and a controller app.
pub struct Session {
    client_id: String,
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    /// Create an unbound session.
    pub fn new(client_id: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            client_id: client_id.into(),
            state: Mutex::new(SessionState::default()),
            events,
        }
    }

    /// Identifier handed to the app.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// App identifier, once bound.
    pub fn target_id(&self) -> Option<String> {
        self.state.lock().target_id.clone()
    }

    /// Bound with an open connection.
    pub fn is_bound(&self) -> bool {
        let state = self.state.lock();
        state.bound && state.connection.as_ref().is_some_and(|c| !c.is_closed())
    }

    /// Last strength report.
    pub fn strength(&self) -> StrengthSnapshot {
        self.state.lock().strength
    }

    /// Time since the last heartbeat, if one has arrived.
    pub fn heartbeat_age(&self) -> Option<Duration> {
        self.state.lock().last_heartbeat.map(|t| t.elapsed())
    }

    /// ID of the attached connection.
    pub fn connection_id(&self) -> Option<String> {
        self.state.lock().connection.as_ref().map(|c| c.id.clone())
    }

    /// Receive lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Content of the pairing QR code for a relay reachable at `host:port`.
    pub fn pairing_url(&self, host: &str, port: u16) -> String {
        crate::pairing::pairing_url(host, port, &self.client_id)
    }

    /// Wait until the session is bound.
    pub async fn wait_for_bind(&self) {
        let mut rx = self.subscribe();
        while !self.is_bound() {
            match rx.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    // ── Transport ──────────────────────────────────────────────────────────

    /// Attach a new connection, closing any previous one.
    ///
    /// A binding belongs to the connection that made it, so replacing a
    /// connection ends the pairing.
    pub fn attach(&self, connection: Arc<ClientConnection>) {
        let (previous, was_bound) = {
            let mut state = self.state.lock();
            let previous = state.connection.replace(connection);
            let was_bound = previous.is_some() && std::mem::replace(&mut state.bound, false);
            if previous.is_some() {
                state.target_id = None;
            }
            (previous, was_bound)
        };
        if let Some(prev) = previous {
            debug!(client_id = %self.client_id, conn_id = %prev.id, "replacing stale connection");
            prev.close();
        }
        if was_bound {
            info!(client_id = %self.client_id, "session unbound by reconnect");
            self.emit(SessionEvent::Break);
        }
    }

    /// Tear down the pairing. Idempotent.
    ///
    /// Sends a best-effort break notification, closes the connection and
    /// always clears the bind state.
    pub fn disconnect(&self) {
        let (connection, target_id, was_bound) = {
            let mut state = self.state.lock();
            let was_bound = state.bound;
            state.bound = false;
            (state.connection.take(), state.target_id.take(), was_bound)
        };

        if let Some(conn) = connection {
            if !conn.is_closed() {
                let notice = WsMessage::new(
                    MsgType::Break,
                    self.client_id.as_str(),
                    target_id.unwrap_or_default(),
                    RetCode::Disconnected.as_str(),
                );
                if let Ok(json) = notice.to_json() {
                    let _ = conn.send(json);
                }
            }
            conn.close();
        }

        if was_bound {
            info!(client_id = %self.client_id, "session unbound by disconnect");
            self.emit(SessionEvent::Break);
        }
    }

    /// Disconnect only if `conn_id` is the attached connection.
    ///
    /// Returns whether the session was torn down.
    pub fn detach(&self, conn_id: &str) -> bool {
        let current = self
            .state
            .lock()
            .connection
            .as_ref()
            .is_some_and(|c| c.id == conn_id);
        if current {
            self.disconnect();
        }
        current
    }

    // ── Inbound handlers ───────────────────────────────────────────────────

    /// Handle a `bind` envelope.
    pub fn handle_bind(&self, msg: &WsMessage) -> Result<(), SessionError> {
        if self.is_bound() {
            warn!(client_id = %self.client_id, "bind while already bound");
            let reply = WsMessage::new(
                MsgType::Bind,
                self.client_id.as_str(),
                msg.target_id.as_str(),
                RetCode::AlreadyBound.as_str(),
            );
            return self.send_message(&reply);
        }

        let reply = WsMessage::new(
            MsgType::Bind,
            self.client_id.as_str(),
            msg.target_id.as_str(),
            RetCode::Success.as_str(),
        );
        {
            let mut state = self.state.lock();
            state.target_id = Some(msg.target_id.clone());
            state.bound = true;
        }
        if let Err(e) = self.send_message(&reply) {
            let mut state = self.state.lock();
            state.target_id = None;
            state.bound = false;
            return Err(e);
        }
        counter!(SESSION_BINDS_TOTAL).increment(1);
        info!(client_id = %self.client_id, target_id = %msg.target_id, "session bound");
        self.emit(SessionEvent::Bound {
            target_id: msg.target_id.clone(),
        });
        Ok(())
    }

    /// Handle a `heartbeat` envelope.
    pub fn handle_heartbeat(&self) {
        self.state.lock().last_heartbeat = Some(Instant::now());
        self.emit(SessionEvent::Heartbeat);
    }

    /// Handle a `break` envelope.
    pub fn handle_break(&self) {
        let was_bound = {
            let mut state = self.state.lock();
            state.target_id = None;
            std::mem::replace(&mut state.bound, false)
        };
        if was_bound {
            info!(client_id = %self.client_id, "app sent break");
            self.emit(SessionEvent::Break);
        } else {
            debug!(client_id = %self.client_id, "break on unbound session ignored");
        }
    }

    /// Handle a `msg` envelope payload.
    pub fn handle_msg(&self, message: &str) -> Result<(), SessionError> {
        let head = MsgHead::classify(message);
        self.emit(SessionEvent::MessageReceived { head: head.clone() });

        match head {
            MsgHead::Strength => {
                let snapshot = parse_strength_update(message)?;
                self.state.lock().strength = snapshot;
                debug!(client_id = %self.client_id, ?snapshot, "strength report");
                self.emit(SessionEvent::StrengthChanged(snapshot));
            }
            MsgHead::Feedback => {
                let button = parse_feedback(message)?;
                debug!(client_id = %self.client_id, button = button.0, "feedback");
                self.emit(SessionEvent::Feedback(button));
            }
            other => {
                debug!(client_id = %self.client_id, head = other.as_str(), "unhandled msg head");
            }
        }
        Ok(())
    }

    /// Handle an `error` envelope.
    pub fn handle_error(&self, message: &str) {
        warn!(client_id = %self.client_id, message, "app reported error");
        self.emit(SessionEvent::Error {
            message: message.to_string(),
        });
    }

    // ── Outbound ───────────────────────────────────────────────────────────

    /// Send an envelope on the attached connection.
    ///
    /// Envelopes longer than the app's limit are rejected, never truncated.
    pub fn send_message(&self, msg: &WsMessage) -> Result<(), SessionError> {
        let connection = self
            .state
            .lock()
            .connection
            .clone()
            .ok_or(SessionError::NoConnection)?;
        let json = msg.to_json()?;
        if json.len() > MAX_MESSAGE_LEN {
            return Err(SessionError::TooLong { len: json.len() });
        }
        if connection.send(json) {
            Ok(())
        } else {
            Err(SessionError::SendFailed {
                conn_id: connection.id.clone(),
            })
        }
    }

    fn send_command(&self, command: String) -> Result<(), SessionError> {
        let target_id = {
            let state = self.state.lock();
            let open = state.connection.as_ref().is_some_and(|c| !c.is_closed());
            if !(state.bound && open) {
                return Err(SessionError::NotBound);
            }
            state.target_id.clone().unwrap_or_default()
        };
        let msg = WsMessage::new(MsgType::Msg, self.client_id.as_str(), target_id, command);
        self.send_message(&msg)
    }

    /// Change the output strength on `channel`.
    pub fn set_strength(
        &self,
        channel: Channel,
        action: StrengthAction,
        value: u32,
    ) -> Result<(), SessionError> {
        self.send_command(strength_command(channel, action, value))
    }

    /// Queue `waveform` on `channel`. An empty waveform sends nothing.
    pub fn add_pulse(&self, channel: Channel, waveform: &Waveform) -> Result<(), SessionError> {
        if waveform.is_empty() {
            return Ok(());
        }
        let tokens = encode_waveform(waveform)?;
        self.send_command(pulse_command(channel, &tokens))
    }

    /// Drop any queued waveform on `channel`.
    pub fn clear_pulse(&self, channel: Channel) -> Result<(), SessionError> {
        self.send_command(clear_command(channel))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("client_id", &self.client_id)
            .field("bound", &self.is_bound())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
