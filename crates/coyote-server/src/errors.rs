//! Session and router error types.

use coyote_protocol::{CodecError, MAX_MESSAGE_LEN};
use thiserror::Error;

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No connection is attached to the session.
    #[error("session has no connection")]
    NoConnection,
    /// The session is not paired with an app.
    #[error("session is not bound")]
    NotBound,
    /// Serialized envelope exceeds the app's limit.
    #[error("message too long: {len} bytes (max {MAX_MESSAGE_LEN})")]
    TooLong {
        /// Serialized length.
        len: usize,
    },
    /// The connection's send queue is full or closed.
    #[error("connection {conn_id} refused the message")]
    SendFailed {
        /// Connection that refused.
        conn_id: String,
    },
    /// A payload failed to encode or parse.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Envelope serialization failed.
    #[error("failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors from router lookups.
#[derive(Debug, Error)]
pub enum RouterError {
    /// No session with this client id.
    #[error("session not found: {0}")]
    SessionNotFound(String),
}
