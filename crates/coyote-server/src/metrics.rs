//! Metric names recorded by the relay.
//!
//! Recording is a no-op until the binary installs a recorder.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Connections rejected at upgrade (counter, labels: reason).
pub const WS_CONNECTIONS_REJECTED_TOTAL: &str = "ws_connections_rejected_total";
/// Inbound envelopes that failed to decode (counter).
pub const WS_DECODE_ERRORS_TOTAL: &str = "ws_decode_errors_total";
/// Sessions that completed a bind (counter).
pub const SESSION_BINDS_TOTAL: &str = "session_binds_total";
