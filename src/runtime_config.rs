// =============================================================================
// Runtime Configuration — chart defaults with atomic save
// =============================================================================
//
// Where saved indicator layouts live, the default style applied to newly
// created indicators, and the indicator set a fresh chart starts with.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::indicator::{Indicator, StylePatch, DEFAULT_LINE_WIDTH, DEFAULT_PANE_HEIGHT};
use crate::indicators::{IndicatorParams, IndicatorTypeId};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_storage_dir() -> String {
    "chart_state".to_string()
}

fn default_storage_key() -> String {
    "indicators".to_string()
}

fn default_line_width() -> f64 {
    DEFAULT_LINE_WIDTH
}

fn default_pane_height() -> f64 {
    DEFAULT_PANE_HEIGHT
}

fn default_indicators() -> Vec<IndicatorTypeId> {
    vec![IndicatorTypeId::Ema, IndicatorTypeId::Volume]
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration for the indicator engine.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Storage -------------------------------------------------------------

    /// Directory holding one `<key>.json` file per saved layout.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,

    /// Key the chart's layout is saved under.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    // --- New-indicator style -------------------------------------------------

    #[serde(default = "default_line_width")]
    pub line_width: f64,

    /// Initial pane height for panel indicators.
    #[serde(default = "default_pane_height")]
    pub pane_height: f64,

    // --- Fresh chart ---------------------------------------------------------

    /// Indicators added when no saved layout exists.
    #[serde(default = "default_indicators")]
    pub default_indicators: Vec<IndicatorTypeId>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            storage_key: default_storage_key(),
            line_width: default_line_width(),
            pane_height: default_pane_height(),
            default_indicators: default_indicators(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            storage_dir = %config.storage_dir,
            defaults = ?config.default_indicators,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// A new indicator of `type_id` styled with the configured defaults.
    pub fn build_indicator(&self, type_id: IndicatorTypeId) -> Indicator {
        Indicator::with_style(
            IndicatorParams::defaults_for(type_id),
            StylePatch {
                line_width: Some(self.line_width),
                pane_height: Some(self.pane_height),
                ..StylePatch::default()
            },
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IndicatorKind;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.storage_dir, "chart_state");
        assert_eq!(cfg.storage_key, "indicators");
        assert!((cfg.line_width - DEFAULT_LINE_WIDTH).abs() < f64::EPSILON);
        assert_eq!(
            cfg.default_indicators,
            vec![IndicatorTypeId::Ema, IndicatorTypeId::Volume]
        );
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, RuntimeConfig::default());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "pane_height": 160.0, "default_indicators": ["RSI", "BollingerBands"] }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.pane_height, 160.0);
        assert_eq!(
            cfg.default_indicators,
            vec![IndicatorTypeId::Rsi, IndicatorTypeId::BollingerBands]
        );
        assert_eq!(cfg.storage_key, "indicators");
    }

    #[test]
    fn unknown_indicator_type_is_rejected() {
        let json = r#"{ "default_indicators": ["ADX"] }"#;
        assert!(serde_json::from_str::<RuntimeConfig>(json).is_err());
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir().join(format!("chart-config-{}.json", uuid::Uuid::new_v4()));
        let cfg = RuntimeConfig {
            line_width: 3.0,
            ..RuntimeConfig::default()
        };
        cfg.save(&path).unwrap();
        assert_eq!(RuntimeConfig::load(&path).unwrap(), cfg);
        assert!(!path.with_extension("json.tmp").exists());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("missing-{}.json", uuid::Uuid::new_v4()));
        assert!(RuntimeConfig::load(&path).is_err());
    }

    #[test]
    fn built_indicators_use_configured_style() {
        let cfg = RuntimeConfig {
            line_width: 1.0,
            pane_height: 240.0,
            ..RuntimeConfig::default()
        };
        let panel = cfg.build_indicator(IndicatorTypeId::Macd);
        assert_eq!(panel.kind(), IndicatorKind::Panel);
        assert_eq!(panel.style().line_width, 1.0);
        assert_eq!(panel.style().pane_height, Some(240.0));

        let overlay = cfg.build_indicator(IndicatorTypeId::Sma);
        assert_eq!(overlay.style().pane_height, None);
    }
}
