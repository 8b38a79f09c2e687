//! Scheduler and bridge error types.

use thiserror::Error;

/// Errors from the segment queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// The queue is at capacity; the segment was not enqueued.
    #[error("segment queue full (capacity {capacity})")]
    QueueFull {
        /// Queue capacity.
        capacity: usize,
    },
}

/// Errors from the game-mod bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Reading or writing the data file failed.
    #[error("bridge file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The data file or an event payload is not valid JSON.
    #[error("bridge data is not valid: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_full_display() {
        let err = SchedulerError::QueueFull { capacity: 100 };
        assert_eq!(err.to_string(), "segment queue full (capacity 100)");
    }

    #[test]
    fn io_conversion() {
        let err: BridgeError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, BridgeError::Io(_)));
    }
}
