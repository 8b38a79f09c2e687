//! Messages waiting to be written for the mod.

use parking_lot::Mutex;

use super::model::ModMessage;

/// Buffer of relay-to-mod messages, drained on each bridge write.
#[derive(Debug, Default)]
pub struct Outbox {
    buffer: Mutex<Vec<ModMessage>>,
}

impl Outbox {
    /// Empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message.
    pub fn push(&self, message: ModMessage) {
        self.buffer.lock().push(message);
    }

    /// Take everything queued so far.
    pub fn drain(&self) -> Vec<ModMessage> {
        std::mem::take(&mut *self.buffer.lock())
    }

    /// Messages queued.
    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }
}
