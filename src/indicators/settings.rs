// =============================================================================
// Settings surface consumed by the indicator settings UI
// =============================================================================
//
// The UI addresses options by string key.  Each algorithm translates a key +
// `SettingValue` into its typed patch, so the "does this need a recompute"
// answer always comes from the typed path.

use serde::{Deserialize, Serialize};

use crate::error::IndicatorError;
use crate::types::PriceSource;

/// A loosely-typed value coming from (or going to) the settings UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl SettingValue {
    pub fn as_number(&self, key: &str) -> Result<f64, IndicatorError> {
        match self {
            Self::Number(n) if n.is_finite() => Ok(*n),
            Self::Number(_) => Err(IndicatorError::invalid_value(key, "not a finite number")),
            _ => Err(IndicatorError::invalid_value(key, "expected a number")),
        }
    }

    /// Periods arrive as UI numbers; round them and refuse negatives.
    pub fn as_period(&self, key: &str) -> Result<usize, IndicatorError> {
        let n = self.as_number(key)?;
        if n < 0.0 {
            return Err(IndicatorError::invalid_value(key, "period must not be negative"));
        }
        Ok(n.round() as usize)
    }

    pub fn as_bool(&self, key: &str) -> Result<bool, IndicatorError> {
        match self {
            Self::Bool(b) => Ok(*b),
            _ => Err(IndicatorError::invalid_value(key, "expected a boolean")),
        }
    }

    pub fn as_text(&self, key: &str) -> Result<String, IndicatorError> {
        match self {
            Self::Text(s) => Ok(s.clone()),
            _ => Err(IndicatorError::invalid_value(key, "expected text")),
        }
    }

    pub fn as_source(&self, key: &str) -> Result<PriceSource, IndicatorError> {
        self.as_text(key)?
            .parse()
            .map_err(|reason: String| IndicatorError::invalid_value(key, reason))
    }
}

impl From<f64> for SettingValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<usize> for SettingValue {
    fn from(n: usize) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for SettingValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for SettingValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<PriceSource> for SettingValue {
    fn from(src: PriceSource) -> Self {
        Self::Text(src.as_str().to_string())
    }
}

/// Which control the UI should render for a setting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SettingControl {
    Number { min: f64, max: f64, step: f64 },
    Color,
    Toggle,
    Source,
}

/// One row of an indicator's settings form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingDescriptor {
    pub key: &'static str,
    pub label: &'static str,
    pub control: SettingControl,
}

impl SettingDescriptor {
    pub fn number(key: &'static str, label: &'static str, min: f64, max: f64, step: f64) -> Self {
        Self {
            key,
            label,
            control: SettingControl::Number { min, max, step },
        }
    }

    pub fn period(key: &'static str, label: &'static str) -> Self {
        Self::number(key, label, 1.0, 500.0, 1.0)
    }

    pub fn color(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            control: SettingControl::Color,
        }
    }

    pub fn toggle(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            control: SettingControl::Toggle,
        }
    }

    pub fn source() -> Self {
        Self {
            key: "source",
            label: "Source",
            control: SettingControl::Source,
        }
    }
}

/// Overwrite `slot` with `value` when present and different.
///
/// Returns whether anything changed, so callers can OR the results of the
/// fields that invalidate computed data.
pub(crate) fn assign<T: PartialEq>(slot: &mut T, value: Option<T>) -> bool {
    match value {
        Some(v) if *slot != v => {
            *slot = v;
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_rounds_and_rejects_negatives() {
        assert_eq!(SettingValue::Number(13.6).as_period("period").unwrap(), 14);
        assert!(SettingValue::Number(-1.0).as_period("period").is_err());
        assert!(SettingValue::Text("x".into()).as_period("period").is_err());
    }

    #[test]
    fn source_parses_from_text() {
        let src = SettingValue::from("hlc3").as_source("source").unwrap();
        assert_eq!(src, PriceSource::Hlc3);
        assert!(SettingValue::Bool(true).as_source("source").is_err());
    }

    #[test]
    fn untagged_values_deserialise() {
        let v: SettingValue = serde_json::from_str("12").unwrap();
        assert_eq!(v, SettingValue::Number(12.0));
        let v: SettingValue = serde_json::from_str("\"#ff0000\"").unwrap();
        assert_eq!(v, SettingValue::Text("#ff0000".into()));
    }

    #[test]
    fn assign_reports_changes_only() {
        let mut period = 14usize;
        assert!(!assign(&mut period, None));
        assert!(!assign(&mut period, Some(14)));
        assert!(assign(&mut period, Some(20)));
        assert_eq!(period, 20);
    }
}
