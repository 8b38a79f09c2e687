use serde::{Deserialize, Serialize};

/// Game-event bridge settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeSettings {
    /// Data file shared with the game mod, or the directory holding its
    /// `save*.dat` files. Empty disables the bridge.
    pub data_file: String,
    /// Collectible catalog (`{id: {name, quality}}`).
    pub resources_file: String,
    /// Delay between reads of the data file.
    pub poll_interval_ms: u64,
    /// Interval between outbound heartbeats.
    pub heartbeat_interval_ms: u64,
    /// Inbound heartbeat age after which the mod counts as gone.
    pub stale_after_ms: u64,
    /// Pause before the bridge is restarted after losing the mod.
    pub retry_delay_ms: u64,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            data_file: String::new(),
            resources_file: "resources/collectibles.json".to_string(),
            poll_interval_ms: 256,
            heartbeat_interval_ms: 2000,
            stale_after_ms: 2000,
            retry_delay_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let b = BridgeSettings::default();
        assert!(b.data_file.is_empty());
        assert_eq!(b.poll_interval_ms, 256);
        assert_eq!(b.stale_after_ms, 2000);
    }
}
