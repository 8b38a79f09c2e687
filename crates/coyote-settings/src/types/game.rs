use std::collections::BTreeMap;

use coyote_protocol::{PulseFrame, Waveform};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Pulse generation settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameSettings {
    /// Baseline producer.
    pub continuous_mode: ContinuousModeSettings,
    /// Bonus floor strength per collectible quality.
    pub on_new_collectible: CollectibleSettings,
    /// Override run on player damage.
    pub on_hurt: OverrideSettings,
    /// Override run on player death.
    pub on_death: OverrideSettings,
    /// Override run on a manual restart.
    pub on_manual_restart: OverrideSettings,
    /// Empty the segment queue when a run starts or ends.
    pub clear_queue_on_reset: bool,
}

impl GameSettings {
    pub(crate) fn validate(&self) -> Result<()> {
        let cm = &self.continuous_mode;
        if cm.decay_value < 0 {
            return Err(SettingsError::InvalidValue(
                "continuousMode.decayValue must be >= 0".into(),
            ));
        }
        if cm.base_strength_a < 0 || cm.base_strength_b < 0 {
            return Err(SettingsError::InvalidValue(
                "continuousMode base strengths must be >= 0".into(),
            ));
        }
        for (name, o) in [
            ("onHurt", &self.on_hurt),
            ("onDeath", &self.on_death),
            ("onManualRestart", &self.on_manual_restart),
        ] {
            if o.strength_operator == StrengthOperator::Set
                && (o.strength_a < 0 || o.strength_b < 0)
            {
                return Err(SettingsError::InvalidValue(format!(
                    "{name}: absolute strengths must be >= 0"
                )));
            }
        }
        Ok(())
    }
}

/// Continuous-mode producer settings.
///
/// The floor strength of a channel is
/// `baseStrength + strengthPerHealth * (maxHealth - health) + collectibleBonus`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContinuousModeSettings {
    /// Produce baseline segments while paired.
    pub enabled: bool,
    /// Time between decay steps. Zero pins strength to the floor.
    pub decay_interval_ms: u64,
    /// Strength removed per decay step.
    pub decay_value: i32,
    /// Floor on A with full health.
    pub base_strength_a: i32,
    /// Floor on B with full health.
    pub base_strength_b: i32,
    /// Floor added on A per missing health point.
    pub strength_per_health_a: i32,
    /// Floor added on B per missing health point.
    pub strength_per_health_b: i32,
    /// Waveform cycled on A.
    pub pulse_a: Waveform,
    /// Waveform cycled on B.
    pub pulse_b: Waveform,
}

impl Default for ContinuousModeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            decay_interval_ms: 1000,
            decay_value: 1,
            base_strength_a: 5,
            base_strength_b: 5,
            strength_per_health_a: 2,
            strength_per_health_b: 2,
            pulse_a: ramp_waveform(),
            pulse_b: ramp_waveform(),
        }
    }
}

/// How an override's configured strength is applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StrengthOperator {
    /// Use the configured strength as is.
    #[default]
    Set,
    /// Add the configured strength to the current floor.
    Increment,
}

/// A temporary run of segments that replaces the queue.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverrideSettings {
    /// React to the event at all.
    pub enabled: bool,
    /// Length of the run.
    pub duration_ms: u64,
    /// Strength on A (absolute or increment).
    pub strength_a: i32,
    /// Strength on B (absolute or increment).
    pub strength_b: i32,
    /// Interpretation of the strengths.
    pub strength_operator: StrengthOperator,
    /// Waveform on A.
    pub pulse_a: Waveform,
    /// Waveform on B.
    pub pulse_b: Waveform,
}

impl Default for OverrideSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            duration_ms: 1000,
            strength_a: 0,
            strength_b: 0,
            strength_operator: StrengthOperator::Set,
            pulse_a: burst_waveform(),
            pulse_b: burst_waveform(),
        }
    }
}

/// Strength pair keyed by collectible quality.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelStrength {
    /// Strength on A.
    pub strength_a: i32,
    /// Strength on B.
    pub strength_b: i32,
}

/// Floor bonus earned from collected items.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectibleSettings {
    /// Recompute the bonus when the collectible list changes.
    pub enabled: bool,
    /// Bonus per item, keyed by item quality (0..=4).
    pub strength_by_quality: BTreeMap<i32, ChannelStrength>,
}

impl Default for CollectibleSettings {
    fn default() -> Self {
        let strength_by_quality = [(0, 0), (1, 0), (2, 1), (3, 2), (4, 3)]
            .into_iter()
            .map(|(q, s)| {
                (
                    q,
                    ChannelStrength {
                        strength_a: s,
                        strength_b: s,
                    },
                )
            })
            .collect();
        Self {
            enabled: true,
            strength_by_quality,
        }
    }
}

/// Ten frames rising from silence to full slot strength at 10Hz.
fn ramp_waveform() -> Waveform {
    (0..10u8)
        .map(|i| PulseFrame::new([10; 4], [i * 10 + 10; 4]))
        .collect()
}

/// Two frames of full slot strength.
fn burst_waveform() -> Waveform {
    vec![PulseFrame::new([10; 4], [100; 4]); 2].into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_waveforms_encode() {
        let g = GameSettings::default();
        assert_eq!(g.continuous_mode.pulse_a.len(), 10);
        assert!(coyote_protocol::encode_waveform(&g.continuous_mode.pulse_a).is_ok());
        assert!(coyote_protocol::encode_waveform(&g.on_hurt.pulse_b).is_ok());
    }

    #[test]
    fn operator_parses_lowercase() {
        let o: OverrideSettings =
            serde_json::from_str(r#"{"strengthOperator": "increment", "durationMs": 400}"#)
                .unwrap();
        assert_eq!(o.strength_operator, StrengthOperator::Increment);
        assert_eq!(o.duration_ms, 400);
    }

    #[test]
    fn quality_map_uses_numeric_keys() {
        let c: CollectibleSettings = serde_json::from_str(
            r#"{"enabled": true, "strengthByQuality": {"4": {"strengthA": 7, "strengthB": 3}}}"#,
        )
        .unwrap();
        assert_eq!(
            c.strength_by_quality.get(&4),
            Some(&ChannelStrength {
                strength_a: 7,
                strength_b: 3
            })
        );
    }

    #[test]
    fn negative_decay_rejected() {
        let mut g = GameSettings::default();
        g.continuous_mode.decay_value = -1;
        assert!(g.validate().is_err());
    }

    #[test]
    fn negative_increment_allowed() {
        let mut g = GameSettings::default();
        g.on_hurt.strength_operator = StrengthOperator::Increment;
        g.on_hurt.strength_a = -3;
        assert!(g.validate().is_ok());
    }

    #[test]
    fn waveform_from_string_form() {
        let cm: ContinuousModeSettings =
            serde_json::from_str(r#"{"pulseA": "[\"0A0A0A0A64646464\"]", "pulseB": ""}"#).unwrap();
        assert_eq!(cm.pulse_a.len(), 1);
        assert!(cm.pulse_b.is_empty());
    }
}
