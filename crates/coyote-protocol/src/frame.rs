//! Pulse frames and waveforms.
//!
//! A [`PulseFrame`] describes 100ms of output on one channel as four
//! frequency bytes followed by four strength bytes. On the wire each frame
//! is a 16-character uppercase hex token. A [`Waveform`] is an ordered run
//! of frames that the scheduler walks two frames at a time.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::errors::{CodecError, Result};

/// Bytes in one encoded frame.
pub const FRAME_LEN: usize = 8;

/// Longest waveform accepted in a single pulse command.
pub const MAX_WAVEFORM_LEN: usize = 100;

/// Valid per-slot frequency values.
pub const FREQUENCY_RANGE: RangeInclusive<u8> = 10..=240;

/// Valid per-slot strength values.
pub const STRENGTH_RANGE: RangeInclusive<u8> = 0..=100;

/// One channel's output for a 100ms slice, split into four 25ms slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PulseFrame {
    /// Frequency per slot (10..=240).
    pub frequency: [u8; 4],
    /// Strength per slot (0..=100).
    pub strength: [u8; 4],
}

impl PulseFrame {
    /// Build a frame without validating it.
    pub const fn new(frequency: [u8; 4], strength: [u8; 4]) -> Self {
        Self {
            frequency,
            strength,
        }
    }

    /// Check every slot against [`FREQUENCY_RANGE`] and [`STRENGTH_RANGE`].
    pub fn validate(&self) -> Result<()> {
        for &value in &self.frequency {
            check_range("frequency", value, &FREQUENCY_RANGE)?;
        }
        for &value in &self.strength {
            check_range("strength", value, &STRENGTH_RANGE)?;
        }
        Ok(())
    }

    /// Encode as a 16-character uppercase hex token.
    ///
    /// Out-of-range values are rejected, never clamped.
    pub fn encode(&self) -> Result<String> {
        self.validate()?;
        Ok(self.to_hex())
    }

    /// Decode a 16-character hex token.
    ///
    /// Ranges are not checked here; callers that need a sendable frame call
    /// [`PulseFrame::validate`].
    pub fn decode(token: &str) -> Result<Self> {
        let bytes = hex_decode(token)?;
        if bytes.len() != FRAME_LEN {
            return Err(CodecError::InvalidLength {
                expected: FRAME_LEN,
                actual: bytes.len(),
            });
        }
        let mut frame = Self::new([0; 4], [0; 4]);
        frame.frequency.copy_from_slice(&bytes[..4]);
        frame.strength.copy_from_slice(&bytes[4..]);
        Ok(frame)
    }

    fn to_hex(self) -> String {
        self.frequency
            .iter()
            .chain(self.strength.iter())
            .map(|b| format!("{b:02X}"))
            .collect()
    }
}

fn check_range(field: &'static str, value: u8, range: &RangeInclusive<u8>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(CodecError::InvalidRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

fn hex_decode(token: &str) -> Result<Vec<u8>> {
    fn nibble(c: u8) -> Option<u8> {
        match c {
            b'0'..=b'9' => Some(c - b'0'),
            b'a'..=b'f' => Some(c - b'a' + 10),
            b'A'..=b'F' => Some(c - b'A' + 10),
            _ => None,
        }
    }

    let raw = token.as_bytes();
    if raw.len() % 2 != 0 {
        return Err(CodecError::InvalidHex(token.to_string()));
    }
    raw.chunks(2)
        .map(|pair| match (nibble(pair[0]), nibble(pair[1])) {
            (Some(hi), Some(lo)) => Ok((hi << 4) | lo),
            _ => Err(CodecError::InvalidHex(token.to_string())),
        })
        .collect()
}

/// An ordered sequence of pulse frames for one channel.
///
/// Serializes as a JSON array of hex tokens. Deserialization also accepts
/// the array embedded in a string (`"[\"0A0A0A0A00000000\"]"`) and checks
/// both frame ranges and the length limit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WaveformRepr", into = "Vec<String>")]
pub struct Waveform(Vec<PulseFrame>);

impl Waveform {
    /// An empty waveform.
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the waveform holds no frames.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the frames.
    pub fn frames(&self) -> &[PulseFrame] {
        &self.0
    }

    /// Frame at `index`, wrapping modulo the length.
    pub fn frame_wrapping(&self, index: usize) -> Option<PulseFrame> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0[index % self.0.len()])
        }
    }
}

impl From<Vec<PulseFrame>> for Waveform {
    fn from(frames: Vec<PulseFrame>) -> Self {
        Self(frames)
    }
}

impl FromIterator<PulseFrame> for Waveform {
    fn from_iter<I: IntoIterator<Item = PulseFrame>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Waveform> for Vec<String> {
    fn from(waveform: Waveform) -> Self {
        waveform.0.into_iter().map(PulseFrame::to_hex).collect()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WaveformRepr {
    Tokens(Vec<String>),
    Text(String),
}

impl TryFrom<WaveformRepr> for Waveform {
    type Error = CodecError;

    fn try_from(repr: WaveformRepr) -> Result<Self> {
        let waveform = match repr {
            WaveformRepr::Tokens(tokens) => decode_waveform(&tokens)?,
            WaveformRepr::Text(text) => decode_waveform_str(&text)?,
        };
        if waveform.len() > MAX_WAVEFORM_LEN {
            return Err(CodecError::TooLong {
                len: waveform.len(),
                max: MAX_WAVEFORM_LEN,
            });
        }
        for frame in waveform.frames() {
            frame.validate()?;
        }
        Ok(waveform)
    }
}

/// Encode a waveform as hex tokens.
///
/// The length limit is checked before any frame is encoded.
pub fn encode_waveform(waveform: &Waveform) -> Result<Vec<String>> {
    if waveform.len() > MAX_WAVEFORM_LEN {
        return Err(CodecError::TooLong {
            len: waveform.len(),
            max: MAX_WAVEFORM_LEN,
        });
    }
    waveform.frames().iter().map(PulseFrame::encode).collect()
}

/// Decode hex tokens into a waveform.
pub fn decode_waveform<S: AsRef<str>>(tokens: &[S]) -> Result<Waveform> {
    tokens
        .iter()
        .map(|t| PulseFrame::decode(t.as_ref()))
        .collect::<Result<Vec<_>>>()
        .map(Waveform)
}

/// Decode a waveform from its JSON text form.
///
/// `""` and `"[]"` both yield an empty waveform.
pub fn decode_waveform_str(text: &str) -> Result<Waveform> {
    let text = text.trim();
    if text.is_empty() || text == "[]" {
        return Ok(Waveform::empty());
    }
    let tokens: Vec<String> =
        serde_json::from_str(text).map_err(|_| CodecError::InvalidFormat(text.to_string()))?;
    decode_waveform(&tokens)
}
