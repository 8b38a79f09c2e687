//! # coyote-server
//!
//! Relay between this process and the controller app.
//!
//! - [`session`]: per-client protocol state machine (bind, break, heartbeat,
//!   strength reports, outbound commands)
//! - [`router`]: maps connections to pre-registered sessions and routes
//!   inbound envelopes to them
//! - [`websocket`]: axum WebSocket gateway, one reader and one writer task
//!   per connection
//! - [`observers`]: fire-and-forget fan-out of lifecycle events
//! - HTTP endpoints: `/health`
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod observers;
pub mod pairing;
pub mod router;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::{RouterError, SessionError};
pub use router::{ConnectOutcome, RouterEvent, SessionRouter};
pub use server::CoyoteServer;
pub use session::{Session, SessionEvent};
pub use shutdown::ShutdownCoordinator;
pub use websocket::connection::ClientConnection;
