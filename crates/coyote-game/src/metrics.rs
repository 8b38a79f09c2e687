//! Metric names recorded by the scheduler.

/// Segments sent to the device (counter).
pub const SEGMENTS_DISPATCHED_TOTAL: &str = "scheduler_segments_dispatched_total";
/// Override runs queued (counter, labels: kind).
pub const OVERRIDES_TOTAL: &str = "scheduler_overrides_total";
/// Segments waiting in the queue (gauge).
pub const QUEUE_DEPTH: &str = "scheduler_queue_depth";
/// Game events received from the bridge (counter, labels: event).
pub const GAME_EVENTS_TOTAL: &str = "game_events_total";
