//! Read position within a cycling waveform.

use coyote_protocol::Waveform;

/// Frames a segment carries per channel.
pub const FRAMES_PER_SEGMENT: usize = 2;

/// Position in a waveform that advances two frames per segment and wraps.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WaveformCursor {
    index: usize,
}

impl WaveformCursor {
    /// Cursor at the first frame.
    pub const fn new() -> Self {
        Self { index: 0 }
    }

    /// Current position.
    pub const fn position(&self) -> usize {
        self.index
    }

    /// Rewind to the first frame.
    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Take the next two frames, wrapping past the end.
    ///
    /// A one-frame waveform yields that frame twice. An empty waveform yields
    /// nothing and leaves the cursor in place.
    pub fn next_two(&mut self, waveform: &Waveform) -> Waveform {
        let len = waveform.len();
        if len == 0 {
            return Waveform::empty();
        }
        let start = self.index % len;
        let frames = (0..FRAMES_PER_SEGMENT)
            .filter_map(|offset| waveform.frame_wrapping(start + offset))
            .collect();
        self.index = (start + FRAMES_PER_SEGMENT) % len;
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coyote_protocol::PulseFrame;

    fn wave(n: u8) -> Waveform {
        (0..n).map(|i| PulseFrame::new([10; 4], [i; 4])).collect()
    }

    fn strengths(w: &Waveform) -> Vec<u8> {
        w.frames().iter().map(|f| f.strength[0]).collect()
    }

    #[test]
    fn advances_two_and_wraps() {
        let w = wave(3);
        let mut c = WaveformCursor::new();
        assert_eq!(strengths(&c.next_two(&w)), vec![0, 1]);
        assert_eq!(c.position(), 2);
        assert_eq!(strengths(&c.next_two(&w)), vec![2, 0]);
        assert_eq!(c.position(), 1);
        assert_eq!(strengths(&c.next_two(&w)), vec![1, 2]);
    }

    #[test]
    fn single_frame_repeats() {
        let w = wave(1);
        let mut c = WaveformCursor::new();
        assert_eq!(strengths(&c.next_two(&w)), vec![0, 0]);
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn empty_waveform_yields_nothing() {
        let mut c = WaveformCursor::new();
        assert!(c.next_two(&Waveform::empty()).is_empty());
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn shorter_waveform_after_swap_wraps_index() {
        let mut c = WaveformCursor::new();
        let _ = c.next_two(&wave(10));
        let _ = c.next_two(&wave(10));
        assert_eq!(c.position(), 4);
        // settings reload swapped in a 3-frame waveform
        assert_eq!(strengths(&c.next_two(&wave(3))), vec![1, 2]);
    }

    #[test]
    fn reset_rewinds() {
        let mut c = WaveformCursor::new();
        let _ = c.next_two(&wave(5));
        c.reset();
        assert_eq!(c.position(), 0);
    }
}
