//! Item metadata used to price collected items.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::LazyLock;

use coyote_settings::ChannelStrength;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::errors::BridgeError;

static COLLECTIBLE_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^,:]+):([^,]+)").expect("valid collectible regex"));

/// Item metadata from the resource file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemDetail {
    /// Display name.
    pub name: String,
    /// Quality tier, 0..=4. Negative for items without one.
    #[serde(default = "no_quality")]
    pub quality: i32,
}

const fn no_quality() -> i32 {
    -1
}

/// Item metadata keyed by item name.
#[derive(Debug, Clone, Default)]
pub struct CollectibleCatalog {
    by_name: HashMap<String, ItemDetail>,
}

impl CollectibleCatalog {
    /// Catalog with no items; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a resource file of the form `{"<id>": {"name": ..., "quality": ...}}`.
    pub fn load(path: &Path) -> Result<Self, BridgeError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Parse resource file contents.
    pub fn from_json(raw: &str) -> Result<Self, BridgeError> {
        let by_id: HashMap<String, ItemDetail> = serde_json::from_str(raw)?;
        let by_name = by_id
            .into_values()
            .map(|item| (item.name.clone(), item))
            .collect();
        Ok(Self { by_name })
    }

    /// Number of known items.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether no items are known.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Look up an item by name.
    pub fn get(&self, name: &str) -> Option<&ItemDetail> {
        self.by_name.get(name)
    }

    /// Floor bonus `(a, b)` earned by a collectible list.
    ///
    /// Each known item with a non-negative quality contributes its quality's
    /// strength times its count. Unknown items contribute nothing.
    pub fn bonus(&self, collectibles: &str, table: &BTreeMap<i32, ChannelStrength>) -> (i32, i32) {
        parse_collectibles(collectibles)
            .into_iter()
            .filter_map(|(name, count)| {
                let Some(item) = self.get(&name) else {
                    debug!(item = %name, "collectible not in catalog");
                    return None;
                };
                if item.quality < 0 {
                    return None;
                }
                table.get(&item.quality).map(|s| (s, count))
            })
            .fold((0, 0), |(a, b), (s, count)| {
                (
                    a.saturating_add(s.strength_a.saturating_mul(count)),
                    b.saturating_add(s.strength_b.saturating_mul(count)),
                )
            })
    }
}

/// Split `"name:count, name:count"` into trimmed pairs.
///
/// Entries whose count is not an integer are skipped.
pub fn parse_collectibles(text: &str) -> Vec<(String, i32)> {
    COLLECTIBLE_ENTRY
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps[1].trim();
            let count = caps[2].trim();
            match count.parse::<i32>() {
                Ok(n) if !name.is_empty() => Some((name.to_string(), n)),
                Ok(_) => None,
                Err(_) => {
                    debug!(item = %name, count, "collectible count is not a number");
                    None
                }
            }
        })
        .collect()
}
