//! Output segments and the bounded queue that paces them.

use std::collections::VecDeque;
use std::time::Duration;

use coyote_protocol::{Channel, Waveform};

use crate::errors::SchedulerError;

const SEGMENT_MS: u64 = 200;

/// Wall-clock span of one segment.
pub const SEGMENT_DURATION: Duration = Duration::from_millis(SEGMENT_MS);

/// Maximum segments held at once.
pub const QUEUE_CAPACITY: usize = 100;

/// One 200ms unit of output on both channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Strength on A.
    pub strength_a: u32,
    /// Strength on B.
    pub strength_b: u32,
    /// Up to two frames on A.
    pub frames_a: Waveform,
    /// Up to two frames on B.
    pub frames_b: Waveform,
}

impl Segment {
    /// Strength on `channel`.
    pub const fn strength(&self, channel: Channel) -> u32 {
        match channel {
            Channel::A => self.strength_a,
            Channel::B => self.strength_b,
        }
    }

    /// Frames on `channel`.
    pub const fn frames(&self, channel: Channel) -> &Waveform {
        match channel {
            Channel::A => &self.frames_a,
            Channel::B => &self.frames_b,
        }
    }
}

/// Number of segments covering `duration_ms`, rounded up.
pub fn segments_for(duration_ms: u64) -> usize {
    usize::try_from(duration_ms.div_ceil(SEGMENT_MS)).unwrap_or(usize::MAX)
}

/// FIFO of segments that never grows past its capacity.
///
/// Removal happens only through [`pop_front`](Self::pop_front) and
/// [`replace`](Self::replace).
#[derive(Debug)]
pub struct SegmentQueue {
    items: VecDeque<Segment>,
    capacity: usize,
}

impl SegmentQueue {
    /// Queue with [`QUEUE_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(QUEUE_CAPACITY)
    }

    /// Queue with a custom capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Segments queued.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether another push would be refused.
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recently queued segment.
    pub fn back(&self) -> Option<&Segment> {
        self.items.back()
    }

    /// Append a segment; refused when full.
    pub fn push_back(&mut self, segment: Segment) -> Result<(), SchedulerError> {
        if self.is_full() {
            return Err(SchedulerError::QueueFull {
                capacity: self.capacity,
            });
        }
        self.items.push_back(segment);
        Ok(())
    }

    /// Take the oldest segment.
    pub fn pop_front(&mut self) -> Option<Segment> {
        self.items.pop_front()
    }

    /// Swap the whole contents for `segments`.
    ///
    /// Segments past capacity are dropped; the number dropped is returned.
    pub fn replace(&mut self, mut segments: Vec<Segment>) -> usize {
        let dropped = segments.len().saturating_sub(self.capacity);
        segments.truncate(self.capacity);
        self.items = segments.into();
        dropped
    }
}

impl Default for SegmentQueue {
    fn default() -> Self {
        Self::new()
    }
}
