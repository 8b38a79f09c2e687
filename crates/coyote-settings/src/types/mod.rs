//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a settings
//! file may be partial. Each type implements [`Default`] with the values the
//! relay ships with.

mod bridge;
mod game;
mod server;

pub use bridge::*;
pub use game::*;
pub use server::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "debug": true,
///   "server": { "port": 9999 },
///   "game": { "onHurt": { "durationMs": 1500 } }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoyoteSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// Verbose logging.
    pub debug: bool,
    /// WebSocket relay.
    pub server: ServerSettings,
    /// Game-event bridge.
    pub bridge: BridgeSettings,
    /// Pulse generation.
    pub game: GameSettings,
}

impl Default for CoyoteSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "coyote".to_string(),
            debug: false,
            server: ServerSettings::default(),
            bridge: BridgeSettings::default(),
            game: GameSettings::default(),
        }
    }
}

impl CoyoteSettings {
    /// Reject values the runtime cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.bridge.poll_interval_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "bridge.pollIntervalMs must be > 0".into(),
            ));
        }
        self.game.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        CoyoteSettings::default().validate().unwrap();
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: CoyoteSettings = serde_json::from_str(r#"{"debug": true}"#).unwrap();
        assert!(s.debug);
        assert_eq!(s.name, "coyote");
        assert_eq!(s.server.port, ServerSettings::default().port);
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let mut s = CoyoteSettings::default();
        s.bridge.poll_interval_ms = 0;
        assert!(matches!(s.validate(), Err(SettingsError::InvalidValue(_))));
    }

    #[test]
    fn serde_roundtrip_keeps_waveforms() {
        let s = CoyoteSettings::default();
        let json = serde_json::to_string(&s).unwrap();
        let back: CoyoteSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(
            back.game.continuous_mode.pulse_a,
            s.game.continuous_mode.pulse_a
        );
    }
}
