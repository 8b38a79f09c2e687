//! Shapes of the shared data file.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::errors::BridgeError;
use crate::events::GameEvent;

/// Contents of the data file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModData {
    /// Messages from the mod.
    pub send: Vec<ModMessage>,
    /// Messages to the mod.
    pub receive: Vec<ModMessage>,
}

/// Kind of a bridge message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModMessageKind {
    /// A game event (mod to relay).
    Event,
    /// Current channel strengths for the in-game indicator (relay to mod).
    UpdateIndicator,
    /// Relay announced itself.
    Connect,
    /// Liveness ping, both directions.
    Heartbeat,
    /// Anything else; ignored.
    #[serde(other, skip_serializing)]
    Unknown,
}

/// One message in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModMessage {
    /// Message kind.
    #[serde(rename = "type")]
    pub kind: ModMessageKind,
    /// Kind-specific payload.
    #[serde(default)]
    pub message: Value,
    /// Game frame the mod stamped on the message.
    #[serde(default)]
    pub frame_count: i64,
}

/// Payload of an `event` message.
#[derive(Debug, Deserialize)]
struct EventPayload {
    #[serde(rename = "Type", alias = "type")]
    kind: String,
    #[serde(rename = "Data", alias = "data", default)]
    data: Value,
}

impl ModMessage {
    fn new(kind: ModMessageKind, message: Value) -> Self {
        Self {
            kind,
            message,
            frame_count: 0,
        }
    }

    /// Relay start-up announcement.
    pub fn connect() -> Self {
        Self::new(ModMessageKind::Connect, Value::Null)
    }

    /// Liveness ping.
    pub fn heartbeat() -> Self {
        Self::new(ModMessageKind::Heartbeat, Value::Null)
    }

    /// Indicator update carrying both channel strengths.
    pub fn update_indicator(strength_a: u32, strength_b: u32) -> Self {
        Self::new(
            ModMessageKind::UpdateIndicator,
            json!({ "strengthA": strength_a, "strengthB": strength_b }),
        )
    }

    /// Decode the game event carried by an `event` message.
    ///
    /// Non-event messages and unrecognised event names give `Ok(None)`.
    pub fn to_event(&self) -> Result<Option<GameEvent>, BridgeError> {
        if self.kind != ModMessageKind::Event {
            return Ok(None);
        }
        let payload: EventPayload = serde_json::from_value(self.message.clone())?;
        let data = || {
            if payload.data.is_null() {
                Value::Object(serde_json::Map::new())
            } else {
                payload.data.clone()
            }
        };
        let event = match payload.kind.as_str() {
            "ModInitEvent" => GameEvent::ModInit,
            "PlayerHurtEvent" => GameEvent::PlayerHurt(serde_json::from_value(data())?),
            "PlayerDeathEvent" => GameEvent::PlayerDeath,
            "ManualRestartEvent" => GameEvent::ManualRestart,
            "GameStartEvent" => GameEvent::GameStart(serde_json::from_value(data())?),
            "GameExitEvent" => GameEvent::GameExit,
            "GameEndEvent" => GameEvent::GameEnd,
            "NewCollectibleEvent" => GameEvent::NewCollectible(serde_json::from_value(data())?),
            "PlayerInfoUpdateEvent" => {
                GameEvent::PlayerInfoUpdate(serde_json::from_value(data())?)
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}
