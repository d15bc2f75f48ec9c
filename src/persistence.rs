// =============================================================================
// Persistence — saved indicator layouts
// =============================================================================
//
// A chart's indicators are stored as one JSON document:
//
//   { "indicators": [ { id, kind, typeId, name, options } ], "version": 1 }
//
// `options` is a flat object holding both style (color, lineWidth, visible,
// paneHeight) and the algorithm's parameters.
//
// Storage is pluggable through `StorageAdapter`.  `IndicatorStore` binds an
// adapter to a key and never lets a storage or parse failure escape on
// restore: anything unreadable is logged and treated as "nothing saved".
// =============================================================================

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::indicator::Indicator;
use crate::manager::IndicatorManager;
use crate::types::IndicatorKind;

/// Layout version written by this build.
pub const PAYLOAD_VERSION: u32 = 1;

/// One persisted indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorRecord {
    pub id: String,
    pub kind: IndicatorKind,
    /// Kept as a string so records from newer builds still parse.
    pub type_id: String,
    pub name: String,
    #[serde(default)]
    pub options: serde_json::Value,
}

impl IndicatorRecord {
    pub fn from_indicator(indicator: &Indicator) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: indicator.id().to_string(),
            kind: indicator.kind(),
            type_id: indicator.type_id().to_string(),
            name: indicator.name().to_string(),
            options: indicator.options_value()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorsPayload {
    #[serde(default)]
    pub indicators: Vec<IndicatorRecord>,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    PAYLOAD_VERSION
}

impl IndicatorsPayload {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("failed to serialise indicator payload")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to parse indicator payload")
    }
}

// =============================================================================
// Storage adapters
// =============================================================================

/// Key/value string storage for saved layouts.
pub trait StorageAdapter {
    /// Stored contents for `key`, or `None` when nothing was saved.
    fn load(&self, key: &str) -> Result<Option<String>>;

    fn save(&self, key: &str, contents: &str) -> Result<()>;
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StorageAdapter for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Some(content))
    }

    /// Atomic write: tmp sibling, then rename over the target.
    fn save(&self, key: &str, contents: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;

        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, contents)
            .with_context(|| format!("failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &path)
            .with_context(|| format!("failed to rename tmp file to {}", path.display()))?;
        Ok(())
    }
}

/// In-process storage, mainly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageAdapter for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn save(&self, key: &str, contents: &str) -> Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), contents.to_string());
        Ok(())
    }
}

// =============================================================================
// Store
// =============================================================================

/// Saves and restores one manager's layout under a fixed key.
#[derive(Debug)]
pub struct IndicatorStore<S> {
    storage: S,
    key: String,
}

impl<S: StorageAdapter> IndicatorStore<S> {
    pub fn new(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Replace the manager's indicators with the saved layout.
    ///
    /// Returns the number restored.  Missing, unreadable, corrupt or
    /// newer-version state counts as "nothing saved" and leaves the manager
    /// untouched.
    pub fn restore(&self, manager: &mut IndicatorManager) -> usize {
        let json = match self.storage.load(&self.key) {
            Ok(Some(json)) => json,
            Ok(None) => {
                info!(key = %self.key, "No saved indicators");
                return 0;
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read saved indicators");
                return 0;
            }
        };

        let payload = match IndicatorsPayload::from_json(&json) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Saved indicators are corrupt, ignoring");
                return 0;
            }
        };

        if payload.version > PAYLOAD_VERSION {
            warn!(
                key = %self.key,
                version = payload.version,
                supported = PAYLOAD_VERSION,
                "Saved indicators use a newer layout version, ignoring"
            );
            return 0;
        }

        manager.restore_payload(&payload)
    }

    pub fn persist(&self, manager: &IndicatorManager) -> Result<()> {
        let payload = manager.to_payload();
        let json = payload.to_json()?;
        self.storage
            .save(&self.key, &json)
            .with_context(|| format!("failed to persist indicators under key {}", self.key))?;
        info!(key = %self.key, indicators = payload.indicators.len(), "Indicators persisted");
        Ok(())
    }
}
