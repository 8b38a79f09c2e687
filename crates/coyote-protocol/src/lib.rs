//! # coyote-protocol
//!
//! Wire-level building blocks shared by the relay server and the pulse
//! scheduler.
//!
//! - [`frame`]: 8-byte pulse frames and waveforms, hex encoding and decoding
//! - [`envelope`]: the JSON envelope exchanged with the controller app
//! - [`grammar`]: the text grammar carried in an envelope's `message` field
//! - [`status`]: numeric status codes sent in bind and error replies

#![deny(unsafe_code)]

pub mod envelope;
pub mod errors;
pub mod frame;
pub mod grammar;
pub mod status;

pub use envelope::{MAX_MESSAGE_LEN, MsgType, WsMessage};
pub use errors::{CodecError, Result};
pub use frame::{
    MAX_WAVEFORM_LEN, PulseFrame, Waveform, decode_waveform, decode_waveform_str,
    encode_waveform,
};
pub use grammar::{
    Channel, FeedbackButton, MsgHead, StrengthAction, StrengthSnapshot, clear_command,
    parse_feedback, parse_strength_update, pulse_command, strength_command,
};
pub use status::RetCode;
