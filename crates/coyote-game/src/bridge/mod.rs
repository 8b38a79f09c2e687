//! File-based exchange with the game mod.
//!
//! The mod and the relay share one JSON file shaped as
//! `{"send": [...], "receive": [...]}`. The mod appends to `send`; the relay
//! drains it on every poll and writes its own messages to `receive`.

pub mod catalog;
pub mod listener;
pub mod model;
pub mod outbox;

pub use catalog::{CollectibleCatalog, ItemDetail, parse_collectibles};
pub use listener::{Batch, BridgeExit, BridgeListener, collect_events, resolve_data_file};
pub use model::{ModData, ModMessage, ModMessageKind};
pub use outbox::Outbox;
