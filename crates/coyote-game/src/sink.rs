//! Where the scheduler sends its commands.

use coyote_protocol::{Channel, StrengthAction, StrengthSnapshot, Waveform};
use coyote_server::{Session, SessionError};

/// Actuation target driven by the scheduler.
///
/// Implemented by [`Session`]; tests substitute a recorder.
pub trait ActuationSink: Send + Sync {
    /// Whether commands can be delivered.
    fn is_bound(&self) -> bool;

    /// Last strength report from the device.
    fn strength(&self) -> StrengthSnapshot;

    /// Change the output strength on `channel`.
    fn set_strength(
        &self,
        channel: Channel,
        action: StrengthAction,
        value: u32,
    ) -> Result<(), SessionError>;

    /// Queue frames on `channel`.
    fn add_pulse(&self, channel: Channel, waveform: &Waveform) -> Result<(), SessionError>;
}

impl ActuationSink for Session {
    fn is_bound(&self) -> bool {
        Session::is_bound(self)
    }

    fn strength(&self) -> StrengthSnapshot {
        Session::strength(self)
    }

    fn set_strength(
        &self,
        channel: Channel,
        action: StrengthAction,
        value: u32,
    ) -> Result<(), SessionError> {
        Session::set_strength(self, channel, action, value)
    }

    fn add_pulse(&self, channel: Channel, waveform: &Waveform) -> Result<(), SessionError> {
        Session::add_pulse(self, channel, waveform)
    }
}
