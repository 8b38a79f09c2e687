//! WebSocket gateway.
//!
//! - [`connection`]: per-connection send queue and close signal
//! - [`handler`]: reader/writer loop for one upgraded socket

pub mod connection;
pub mod handler;
