//! Per-run player state that raises the continuous-mode floor.

use coyote_protocol::Channel;
use coyote_settings::ContinuousModeSettings;

/// Health and item bonus for the current run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameProgress {
    /// Current health.
    pub health: i32,
    /// Maximum health.
    pub max_health: i32,
    /// Floor bonus on A from collected items.
    pub bonus_a: i32,
    /// Floor bonus on B from collected items.
    pub bonus_b: i32,
    /// Last collectible list seen, used to detect changes.
    pub collectibles: String,
}

impl GameProgress {
    /// Minimum strength continuous mode may produce on `channel`.
    ///
    /// `base + per_health * missing_health + bonus`, never below zero.
    pub fn floor(&self, settings: &ContinuousModeSettings, channel: Channel) -> u32 {
        let (base, per_health, bonus) = match channel {
            Channel::A => (
                settings.base_strength_a,
                settings.strength_per_health_a,
                self.bonus_a,
            ),
            Channel::B => (
                settings.base_strength_b,
                settings.strength_per_health_b,
                self.bonus_b,
            ),
        };
        let missing = (i64::from(self.max_health) - i64::from(self.health)).max(0);
        let value = i64::from(base) + i64::from(per_health) * missing + i64::from(bonus);
        u32::try_from(value.max(0)).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ContinuousModeSettings {
        ContinuousModeSettings {
            base_strength_a: 5,
            base_strength_b: 1,
            strength_per_health_a: 2,
            strength_per_health_b: 0,
            ..ContinuousModeSettings::default()
        }
    }

    #[test]
    fn floor_at_full_health_is_base() {
        let p = GameProgress {
            health: 6,
            max_health: 6,
            ..GameProgress::default()
        };
        assert_eq!(p.floor(&settings(), Channel::A), 5);
        assert_eq!(p.floor(&settings(), Channel::B), 1);
    }

    #[test]
    fn floor_grows_with_missing_health_and_bonus() {
        let p = GameProgress {
            health: 2,
            max_health: 6,
            bonus_a: 3,
            bonus_b: 1,
            collectibles: String::new(),
        };
        assert_eq!(p.floor(&settings(), Channel::A), 5 + 8 + 3);
        assert_eq!(p.floor(&settings(), Channel::B), 2);
    }

    #[test]
    fn overheal_does_not_lower_floor() {
        let p = GameProgress {
            health: 10,
            max_health: 6,
            ..GameProgress::default()
        };
        assert_eq!(p.floor(&settings(), Channel::A), 5);
    }

    #[test]
    fn negative_floor_clamps_to_zero() {
        let s = ContinuousModeSettings {
            base_strength_a: 0,
            ..settings()
        };
        let p = GameProgress {
            bonus_a: -4,
            ..GameProgress::default()
        };
        assert_eq!(p.floor(&s, Channel::A), 0);
    }
}
