//! Codec error types.

use thiserror::Error;

/// Errors produced while encoding or decoding wire payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A frame field lies outside its permitted range.
    #[error("{field} value {value} outside {min}..={max}")]
    InvalidRange {
        /// Which field failed (`frequency` or `strength`).
        field: &'static str,
        /// Offending value.
        value: u8,
        /// Inclusive lower bound.
        min: u8,
        /// Inclusive upper bound.
        max: u8,
    },
    /// A waveform holds more frames than one command may carry.
    #[error("waveform too long: {len} frames (max {max})")]
    TooLong {
        /// Frames in the rejected waveform.
        len: usize,
        /// Maximum accepted.
        max: usize,
    },
    /// A frame token decoded to the wrong number of bytes.
    #[error("frame must decode to {expected} bytes, got {actual}")]
    InvalidLength {
        /// Required byte count.
        expected: usize,
        /// Decoded byte count.
        actual: usize,
    },
    /// A frame token is not valid hexadecimal.
    #[error("invalid hex frame token: {0:?}")]
    InvalidHex(String),
    /// A message does not match its grammar.
    #[error("malformed message: {0:?}")]
    InvalidFormat(String),
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_range_display() {
        let err = CodecError::InvalidRange {
            field: "frequency",
            value: 5,
            min: 10,
            max: 240,
        };
        assert_eq!(err.to_string(), "frequency value 5 outside 10..=240");
    }

    #[test]
    fn too_long_display() {
        let err = CodecError::TooLong { len: 101, max: 100 };
        assert_eq!(err.to_string(), "waveform too long: 101 frames (max 100)");
    }

    #[test]
    fn invalid_format_quotes_input() {
        let err = CodecError::InvalidFormat("strength-1".into());
        assert!(err.to_string().contains("\"strength-1\""));
    }
}
