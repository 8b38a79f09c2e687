//! Game events delivered by the mod bridge.

use serde::{Deserialize, Serialize};

/// Damage taken by the player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerHurt {
    /// Character name.
    pub player_name: String,
    /// Damage amount, in half hearts.
    pub damage: f64,
    /// Damage flag bits.
    pub flags: i64,
    /// Entity type of the damage source.
    pub source: i64,
}

/// An item picked up by the player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewCollectible {
    /// Item name.
    pub name: String,
    /// Item id.
    pub id: i64,
    /// Item quality, 0..=4.
    pub quality: i32,
}

/// Periodic player snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerInfo {
    /// Current health.
    pub health: i32,
    /// Maximum health.
    pub max_health: i32,
    /// Held items as `name:count` pairs separated by commas.
    pub collectibles: String,
}

/// Payload of a run start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameStart {
    /// The run resumes a saved game.
    pub is_continue: bool,
}

/// Something that happened in the game.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// The mod started talking to the bridge.
    ModInit,
    /// The player took damage.
    PlayerHurt(PlayerHurt),
    /// The player died.
    PlayerDeath,
    /// The player restarted the run by hand.
    ManualRestart,
    /// A run started.
    GameStart(GameStart),
    /// The player left to the menu.
    GameExit,
    /// A run ended.
    GameEnd,
    /// The player picked up an item.
    NewCollectible(NewCollectible),
    /// Health and inventory snapshot.
    PlayerInfoUpdate(PlayerInfo),
}

impl GameEvent {
    /// Wire name of the event, as the mod spells it.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ModInit => "ModInitEvent",
            Self::PlayerHurt(_) => "PlayerHurtEvent",
            Self::PlayerDeath => "PlayerDeathEvent",
            Self::ManualRestart => "ManualRestartEvent",
            Self::GameStart(_) => "GameStartEvent",
            Self::GameExit => "GameExitEvent",
            Self::GameEnd => "GameEndEvent",
            Self::NewCollectible(_) => "NewCollectibleEvent",
            Self::PlayerInfoUpdate(_) => "PlayerInfoUpdateEvent",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payloads_accept_missing_fields() {
        let hurt: PlayerHurt = serde_json::from_str(r#"{"damage": 1.5}"#).unwrap();
        assert!((hurt.damage - 1.5).abs() < f64::EPSILON);
        assert!(hurt.player_name.is_empty());

        let start: GameStart = serde_json::from_str("{}").unwrap();
        assert!(!start.is_continue);
    }

    #[test]
    fn info_uses_camel_case() {
        let info: PlayerInfo = serde_json::from_str(
            r#"{"health": 4, "maxHealth": 6, "collectibles": "Sad Onion:1"}"#,
        )
        .unwrap();
        assert_eq!(info.max_health, 6);
        assert_eq!(info.collectibles, "Sad Onion:1");
    }

    #[test]
    fn names_match_mod_spelling() {
        assert_eq!(GameEvent::PlayerDeath.name(), "PlayerDeathEvent");
        assert_eq!(
            GameEvent::GameStart(GameStart { is_continue: true }).name(),
            "GameStartEvent"
        );
    }
}
