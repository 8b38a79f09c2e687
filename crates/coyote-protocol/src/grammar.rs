//! Text grammar of the envelope `message` field.
//!
//! Inbound from the app:
//! - `strength-{a}+{b}+{maxA}+{maxB}`: current and maximum strength
//! - `feedback-{n}`: button press, 0..=4 on channel A, 5..=9 on channel B
//!
//! Outbound to the app:
//! - `strength-{channel}+{action}+{value}`
//! - `pulse-{A|B}:["<hex>", ...]`
//! - `clear-{channel}`

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{CodecError, Result};

static STRENGTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^strength-(\d+)\+(\d+)\+(\d+)\+(\d+)$").expect("strength pattern is valid")
});
static FEEDBACK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^feedback-(\d+)$").expect("feedback pattern is valid"));

/// Output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Channel A (wire number 1).
    A,
    /// Channel B (wire number 2).
    B,
}

impl Channel {
    /// Both channels, A first.
    pub const ALL: [Channel; 2] = [Channel::A, Channel::B];

    /// Wire number used by strength and clear commands.
    pub const fn number(self) -> u8 {
        match self {
            Self::A => 1,
            Self::B => 2,
        }
    }

    /// Letter used by pulse commands.
    pub const fn letter(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

/// How a strength command changes the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthAction {
    /// Subtract the value.
    Decrease,
    /// Add the value.
    Increase,
    /// Replace with the value.
    Set,
}

impl StrengthAction {
    /// Wire code.
    pub const fn code(self) -> u8 {
        match self {
            Self::Decrease => 0,
            Self::Increase => 1,
            Self::Set => 2,
        }
    }
}

/// Classification of an inbound `msg` payload by the text before its first `-`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MsgHead {
    /// `targetId`
    TargetId,
    /// `DGLAB`
    Dglab,
    /// `strength`
    Strength,
    /// `pulse`
    Pulse,
    /// `clear`
    Clear,
    /// `feedback`
    Feedback,
    /// Anything else.
    Other(String),
}

impl MsgHead {
    /// Classify a payload.
    pub fn classify(message: &str) -> Self {
        let head = message.split('-').next().unwrap_or_default();
        match head {
            "targetId" => Self::TargetId,
            "DGLAB" => Self::Dglab,
            "strength" => Self::Strength,
            "pulse" => Self::Pulse,
            "clear" => Self::Clear,
            "feedback" => Self::Feedback,
            other => Self::Other(other.to_string()),
        }
    }

    /// Head text.
    pub fn as_str(&self) -> &str {
        match self {
            Self::TargetId => "targetId",
            Self::Dglab => "DGLAB",
            Self::Strength => "strength",
            Self::Pulse => "pulse",
            Self::Clear => "clear",
            Self::Feedback => "feedback",
            Self::Other(s) => s,
        }
    }
}

/// Last strength report from the app.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StrengthSnapshot {
    /// Current strength on A.
    pub current_a: u32,
    /// Current strength on B.
    pub current_b: u32,
    /// Maximum allowed on A.
    pub max_a: u32,
    /// Maximum allowed on B.
    pub max_b: u32,
}

impl StrengthSnapshot {
    /// Current strength on `channel`.
    pub const fn current(&self, channel: Channel) -> u32 {
        match channel {
            Channel::A => self.current_a,
            Channel::B => self.current_b,
        }
    }

    /// Maximum allowed on `channel`.
    pub const fn max(&self, channel: Channel) -> u32 {
        match channel {
            Channel::A => self.max_a,
            Channel::B => self.max_b,
        }
    }
}

/// A feedback button index reported by the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackButton(pub u32);

impl FeedbackButton {
    /// Channel the button belongs to, if the index is in range.
    pub const fn channel(self) -> Option<Channel> {
        match self.0 {
            0..=4 => Some(Channel::A),
            5..=9 => Some(Channel::B),
            _ => None,
        }
    }
}

fn capture_u32(caps: &regex::Captures<'_>, index: usize, text: &str) -> Result<u32> {
    caps.get(index)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| CodecError::InvalidFormat(text.to_string()))
}

/// Parse `strength-{a}+{b}+{maxA}+{maxB}`.
pub fn parse_strength_update(text: &str) -> Result<StrengthSnapshot> {
    let caps = STRENGTH_RE
        .captures(text)
        .ok_or_else(|| CodecError::InvalidFormat(text.to_string()))?;
    Ok(StrengthSnapshot {
        current_a: capture_u32(&caps, 1, text)?,
        current_b: capture_u32(&caps, 2, text)?,
        max_a: capture_u32(&caps, 3, text)?,
        max_b: capture_u32(&caps, 4, text)?,
    })
}

/// Parse `feedback-{n}`.
pub fn parse_feedback(text: &str) -> Result<FeedbackButton> {
    let caps = FEEDBACK_RE
        .captures(text)
        .ok_or_else(|| CodecError::InvalidFormat(text.to_string()))?;
    capture_u32(&caps, 1, text).map(FeedbackButton)
}

/// Build `strength-{channel}+{action}+{value}`.
pub fn strength_command(channel: Channel, action: StrengthAction, value: u32) -> String {
    format!("strength-{}+{}+{value}", channel.number(), action.code())
}

/// Build `pulse-{A|B}:[...]` from already-encoded hex tokens.
pub fn pulse_command(channel: Channel, tokens: &[String]) -> String {
    let body = tokens
        .iter()
        .map(|t| format!("\"{t}\""))
        .collect::<Vec<_>>()
        .join(",");
    format!("pulse-{}:[{body}]", channel.letter())
}

/// Build `clear-{channel}`.
pub fn clear_command(channel: Channel) -> String {
    format!("clear-{}", channel.number())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parse_strength_update_fields() {
        let s = parse_strength_update("strength-10+20+100+200").unwrap();
        assert_eq!(
            s,
            StrengthSnapshot {
                current_a: 10,
                current_b: 20,
                max_a: 100,
                max_b: 200,
            }
        );
    }

    #[test]
    fn parse_strength_update_rejects_missing_field() {
        assert_matches!(
            parse_strength_update("strength-10+20+100"),
            Err(CodecError::InvalidFormat(_))
        );
    }

    #[test]
    fn parse_strength_update_rejects_trailing_text() {
        assert!(parse_strength_update("strength-1+2+3+4x").is_err());
        assert!(parse_strength_update("strength--1+2+3+4").is_err());
    }

    #[test]
    fn parse_strength_update_rejects_overflow() {
        assert!(parse_strength_update("strength-99999999999+0+0+0").is_err());
    }

    #[test]
    fn parse_feedback_button() {
        let b = parse_feedback("feedback-7").unwrap();
        assert_eq!(b, FeedbackButton(7));
        assert_eq!(b.channel(), Some(Channel::B));
        assert_eq!(parse_feedback("feedback-0").unwrap().channel(), Some(Channel::A));
        assert_eq!(FeedbackButton(12).channel(), None);
    }

    #[test]
    fn parse_feedback_rejects_garbage() {
        assert!(parse_feedback("feedback-").is_err());
        assert!(parse_feedback("feedback-a").is_err());
    }

    #[test]
    fn classify_heads() {
        assert_eq!(MsgHead::classify("strength-1+2+3+4"), MsgHead::Strength);
        assert_eq!(MsgHead::classify("feedback-3"), MsgHead::Feedback);
        assert_eq!(MsgHead::classify("DGLAB"), MsgHead::Dglab);
        assert_eq!(MsgHead::classify("targetId"), MsgHead::TargetId);
        assert_eq!(MsgHead::classify("wat-1"), MsgHead::Other("wat".into()));
    }

    #[test]
    fn outbound_commands() {
        assert_eq!(
            strength_command(Channel::B, StrengthAction::Set, 35),
            "strength-2+2+35"
        );
        assert_eq!(
            strength_command(Channel::A, StrengthAction::Decrease, 1),
            "strength-1+0+1"
        );
        assert_eq!(clear_command(Channel::A), "clear-1");
        assert_eq!(
            pulse_command(
                Channel::A,
                &["0A0A0A0A00000000".into(), "0A0A0A0A64646464".into()]
            ),
            r#"pulse-A:["0A0A0A0A00000000","0A0A0A0A64646464"]"#
        );
        assert_eq!(pulse_command(Channel::B, &[]), "pulse-B:[]");
    }
}
