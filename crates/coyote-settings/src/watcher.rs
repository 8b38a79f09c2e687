//! Versioned settings snapshot and file-change hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::errors::Result;
use crate::loader::load_settings_from_path;
use crate::types::CoyoteSettings;

/// Quiet period before a burst of file events triggers one reload.
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(250);

/// One published settings value.
#[derive(Clone, Debug)]
pub struct SettingsSnapshot {
    /// Incremented on every successful reload, starting at 0.
    pub version: u64,
    /// The settings.
    pub settings: Arc<CoyoteSettings>,
}

/// Shared read-only access to the current settings.
///
/// Readers take an `Arc` of the current value; a reload swaps the value
/// without disturbing readers that still hold the previous one.
#[derive(Clone, Debug)]
pub struct SettingsHandle {
    tx: Arc<watch::Sender<SettingsSnapshot>>,
}

impl SettingsHandle {
    /// Publish `settings` as version 0.
    pub fn new(settings: CoyoteSettings) -> Self {
        let (tx, _rx) = watch::channel(SettingsSnapshot {
            version: 0,
            settings: Arc::new(settings),
        });
        Self { tx: Arc::new(tx) }
    }

    /// Current settings.
    pub fn current(&self) -> Arc<CoyoteSettings> {
        Arc::clone(&self.tx.borrow().settings)
    }

    /// Current version.
    pub fn version(&self) -> u64 {
        self.tx.borrow().version
    }

    /// Current settings and version together.
    pub fn snapshot(&self) -> SettingsSnapshot {
        self.tx.borrow().clone()
    }

    /// Receive every future snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SettingsSnapshot> {
        self.tx.subscribe()
    }

    /// Publish new settings, returning the new version.
    pub fn replace(&self, settings: CoyoteSettings) -> u64 {
        let mut version = 0;
        self.tx.send_modify(|snap| {
            snap.version += 1;
            snap.settings = Arc::new(settings);
            version = snap.version;
        });
        version
    }

    /// Reload from `path` and publish on success.
    ///
    /// On failure the previous snapshot stays current.
    pub fn reload_from(&self, path: &Path) -> Result<u64> {
        let settings = load_settings_from_path(path)?;
        Ok(self.replace(settings))
    }
}

/// Watches the settings file and reloads it into a [`SettingsHandle`].
///
/// Watching stops when this value is dropped.
pub struct SettingsWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    path: PathBuf,
}

impl SettingsWatcher {
    /// Start watching `path`.
    ///
    /// The parent directory is watched so editors that replace the file
    /// instead of writing in place are still seen.
    pub fn spawn(path: &Path, handle: SettingsHandle) -> Result<Self> {
        let path = std::path::absolute(path)?;
        let dir = path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let target = path.clone();

        let mut debouncer = new_debouncer(RELOAD_DEBOUNCE, move |res: DebounceEventResult| {
            match res {
                Ok(events) => {
                    if !events
                        .iter()
                        .any(|e| e.path.file_name() == target.file_name())
                    {
                        return;
                    }
                    match handle.reload_from(&target) {
                        Ok(version) => info!(version, path = %target.display(), "settings reloaded"),
                        Err(e) => warn!(error = %e, "settings reload failed, keeping previous"),
                    }
                }
                Err(e) => warn!(error = %e, "settings watcher error"),
            }
        })?;
        debouncer.watcher().watch(&dir, RecursiveMode::NonRecursive)?;
        info!(path = %path.display(), "watching settings file");

        Ok(Self {
            _debouncer: debouncer,
            path,
        })
    }

    /// Absolute path being watched.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
