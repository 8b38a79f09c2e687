//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`CoyoteSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::CoyoteSettings;

/// Default settings file, resolved against the working directory.
pub fn settings_path() -> PathBuf {
    std::env::var("COYOTE_CONFIG")
        .ok()
        .filter(|v| !v.is_empty())
        .map_or_else(|| PathBuf::from("coyote.json"), PathBuf::from)
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. Invalid JSON or a value
/// that fails validation is an error.
pub fn load_settings_from_path(path: &Path) -> Result<CoyoteSettings> {
    let defaults = serde_json::to_value(CoyoteSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: CoyoteSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are logged and ignored.
pub fn apply_env_overrides(settings: &mut CoyoteSettings) {
    // ── Server settings ─────────────────────────────────────────────
    if let Some(v) = read_env_string("COYOTE_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_env_u16("COYOTE_PORT", 1, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = read_env_string("COYOTE_PUBLIC_ADDRESS") {
        settings.server.public_address = Some(v);
    }

    // ── Bridge settings ─────────────────────────────────────────────
    if let Some(v) = read_env_string("COYOTE_DATA_FILE") {
        settings.bridge.data_file = v;
    }
    if let Some(v) = read_env_string("COYOTE_RESOURCES_FILE") {
        settings.bridge.resources_file = v;
    }

    if let Some(v) = read_env_bool("COYOTE_DEBUG") {
        settings.debug = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    let val = std::env::var(name).ok()?;
    let result = parse_u16_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn deep_merge_nested_objects() {
        let target = json!({"game": {"onHurt": {"enabled": false, "durationMs": 1000}}});
        let source = json!({"game": {"onHurt": {"enabled": true}}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["game"]["onHurt"]["enabled"], true);
        assert_eq!(merged["game"]["onHurt"]["durationMs"], 1000);
    }

    #[test]
    fn deep_merge_null_preserves_target() {
        let merged = deep_merge(json!({"a": 1}), json!({"a": null}));
        assert_eq!(merged["a"], 1);
    }

    #[test]
    fn deep_merge_arrays_replace() {
        let merged = deep_merge(json!({"a": [1, 2, 3]}), json!({"a": [4]}));
        assert_eq!(merged["a"], json!([4]));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(s.name, "coyote");
    }

    #[test]
    fn partial_file_merges_over_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{"game": {{"continuousMode": {{"decayValue": 4}}, "onDeath": {{"enabled": true}}}}}}"#
        )
        .unwrap();
        let s = load_settings_from_path(f.path()).unwrap();
        assert_eq!(s.game.continuous_mode.decay_value, 4);
        assert!(s.game.continuous_mode.enabled);
        assert!(s.game.on_death.enabled);
        assert!(!s.game.continuous_mode.pulse_a.is_empty());
    }

    #[test]
    fn invalid_json_is_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{{ nope").unwrap();
        assert!(matches!(
            load_settings_from_path(f.path()),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn invalid_waveform_is_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{"game": {{"onHurt": {{"pulseA": ["0101010100000000"]}}}}}}"#
        )
        .unwrap();
        assert!(load_settings_from_path(f.path()).is_err());
    }

    #[test]
    fn failed_validation_is_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"game": {{"continuousMode": {{"decayValue": -2}}}}}}"#).unwrap();
        assert!(matches!(
            load_settings_from_path(f.path()),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    #[test]
    fn parse_bool_values() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_u16_range_bounds() {
        assert_eq!(parse_u16_range("9999", 1, 65535), Some(9999));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u16_range("70000", 1, 65535), None);
    }
}
