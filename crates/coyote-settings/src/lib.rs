//! # coyote-settings
//!
//! Configuration for the relay, loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`CoyoteSettings::default()`]
//! 2. **Settings file**: `coyote.json` (deep-merged over defaults)
//! 3. **Environment variables**: `COYOTE_*` overrides (highest priority)
//!
//! The loaded value is published through a [`SettingsHandle`], a versioned
//! read-only snapshot. [`SettingsWatcher`] reloads the file on change and
//! publishes a new version; a reload that fails keeps the previous snapshot.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;
pub mod watcher;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings_from_path, settings_path};
pub use types::*;
pub use watcher::{SettingsHandle, SettingsSnapshot, SettingsWatcher};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let settings = CoyoteSettings::default();
        let handle = SettingsHandle::new(settings);
        assert_eq!(handle.version(), 0);
        let _path = settings_path();
    }

    #[test]
    fn deep_merge_re_exported() {
        let a = serde_json::json!({"x": 1});
        let b = serde_json::json!({"y": 2});
        let merged = deep_merge(a, b);
        assert_eq!(merged["x"], 1);
        assert_eq!(merged["y"], 2);
    }
}
