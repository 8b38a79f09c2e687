//! # coyote-game
//!
//! Turns game events into a paced stream of actuation commands.
//!
//! - [`segment`]: 200ms output segments and the bounded queue holding them
//! - [`scheduler`]: the dispatch loop (consumer), continuous mode and event
//!   overrides (producers)
//! - [`bridge`]: file-based exchange with the game mod, producing
//!   [`GameEvent`]s and carrying indicator updates back
//! - [`sink`]: the seam between the scheduler and a paired session

#![deny(unsafe_code)]

pub mod bridge;
pub mod cursor;
pub mod errors;
pub mod events;
pub mod metrics;
pub mod progress;
pub mod scheduler;
pub mod segment;
pub mod sink;

pub use errors::{BridgeError, SchedulerError};
pub use events::GameEvent;
pub use scheduler::{ContinuousState, Dispatch, OverrideKind, PulseScheduler};
pub use segment::{Segment, SegmentQueue};
pub use sink::ActuationSink;
