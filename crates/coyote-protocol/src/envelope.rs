//! JSON envelope exchanged with the controller app.

use serde::{Deserialize, Serialize};

use crate::status::RetCode;

/// Largest serialized envelope the app accepts, in bytes.
pub const MAX_MESSAGE_LEN: usize = 1950;

/// Envelope kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MsgType {
    /// Liveness ping from either side.
    Heartbeat,
    /// Pairing handshake.
    Bind,
    /// Command or report carried in `message`.
    Msg,
    /// Peer is leaving the pairing.
    Break,
    /// Status code carried in `message`.
    Error,
    /// Any type this relay does not recognise.
    #[serde(other, skip_serializing)]
    Unknown,
}

/// One WebSocket text frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsMessage {
    /// Envelope kind.
    #[serde(rename = "type")]
    pub kind: MsgType,
    /// Session identifier assigned by the relay.
    #[serde(default)]
    pub client_id: String,
    /// Identifier of the paired app, empty until bound.
    #[serde(default)]
    pub target_id: String,
    /// Payload text.
    #[serde(default)]
    pub message: String,
}

impl WsMessage {
    /// Build an envelope.
    pub fn new(
        kind: MsgType,
        client_id: impl Into<String>,
        target_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            client_id: client_id.into(),
            target_id: target_id.into(),
            message: message.into(),
        }
    }

    /// An `error` envelope carrying `code`.
    pub fn error(code: RetCode) -> Self {
        Self::new(MsgType::Error, "", "", code.as_str())
    }

    /// Parse a text frame.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Serialize to a text frame.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
