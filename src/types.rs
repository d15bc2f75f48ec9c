// =============================================================================
// Shared types used across the indicator engine
// =============================================================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A single OHLCV bar supplied by the chart session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

/// Immutable snapshot of a bar sequence, shared between the manager and every
/// indicator that computed against it.
pub type BarSeries = Arc<[Bar]>;

/// One computed output point, index-aligned with the source bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorDataPoint {
    pub time: i64,
    /// Primary series value; NaN means "undefined at this index".
    pub value: f64,
    /// Secondary series for multi-line indicators.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<f64>,
}

impl IndicatorDataPoint {
    pub fn new(time: i64, value: f64) -> Self {
        Self {
            time,
            value,
            values: Vec::new(),
        }
    }

    pub fn with_values(time: i64, value: f64, values: Vec<f64>) -> Self {
        Self {
            time,
            value,
            values,
        }
    }

    /// A point with every series undefined.
    pub fn undefined(time: i64, width: usize) -> Self {
        Self {
            time,
            value: f64::NAN,
            values: vec![f64::NAN; width],
        }
    }
}

/// Where an indicator is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    /// Drawn over the main price axis.
    Overlay,
    /// Drawn in an auxiliary pane with its own axis.
    Panel,
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overlay => write!(f, "overlay"),
            Self::Panel => write!(f, "panel"),
        }
    }
}

/// Which price of a bar an algorithm consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Open,
    High,
    Low,
    Close,
    /// (high + low) / 2
    Hl2,
    /// (high + low + close) / 3
    Hlc3,
    /// (open + high + low + close) / 4
    Ohlc4,
}

impl Default for PriceSource {
    fn default() -> Self {
        Self::Close
    }
}

impl PriceSource {
    pub const ALL: [PriceSource; 7] = [
        Self::Open,
        Self::High,
        Self::Low,
        Self::Close,
        Self::Hl2,
        Self::Hlc3,
        Self::Ohlc4,
    ];

    /// Resolve this source against one bar.
    pub fn price(self, bar: &Bar) -> f64 {
        match self {
            Self::Open => bar.open,
            Self::High => bar.high,
            Self::Low => bar.low,
            Self::Close => bar.close,
            Self::Hl2 => (bar.high + bar.low) / 2.0,
            Self::Hlc3 => (bar.high + bar.low + bar.close) / 3.0,
            Self::Ohlc4 => (bar.open + bar.high + bar.low + bar.close) / 4.0,
        }
    }

    /// Resolve this source against every bar.
    pub fn series(self, bars: &[Bar]) -> Vec<f64> {
        bars.iter().map(|b| self.price(b)).collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::High => "high",
            Self::Low => "low",
            Self::Close => "close",
            Self::Hl2 => "hl2",
            Self::Hlc3 => "hlc3",
            Self::Ohlc4 => "ohlc4",
        }
    }
}

impl std::fmt::Display for PriceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PriceSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|src| src.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown price source: {s}"))
    }
}

/// Vertical value range a renderer should scale its axis to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
    /// Set when the lower bound never depends on data.
    pub fixed_min: Option<f64>,
    /// Set when the upper bound never depends on data.
    pub fixed_max: Option<f64>,
}

impl ValueRange {
    pub fn observed(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            fixed_min: None,
            fixed_max: None,
        }
    }

    pub fn fixed(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            fixed_min: Some(min),
            fixed_max: Some(max),
        }
    }
}

/// Horizontal threshold line drawn across a panel (e.g. RSI 70/30).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelLine {
    pub value: f64,
    pub label: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar() -> Bar {
        Bar {
            time: 1,
            open: 10.0,
            high: 14.0,
            low: 6.0,
            close: 12.0,
            volume: 5.0,
        }
    }

    #[test]
    fn price_source_resolves_composites() {
        let b = bar();
        assert_eq!(PriceSource::Close.price(&b), 12.0);
        assert_eq!(PriceSource::Hl2.price(&b), 10.0);
        assert!((PriceSource::Hlc3.price(&b) - 32.0 / 3.0).abs() < 1e-12);
        assert_eq!(PriceSource::Ohlc4.price(&b), 10.5);
    }

    #[test]
    fn price_source_parses_case_insensitively() {
        assert_eq!("HL2".parse::<PriceSource>().unwrap(), PriceSource::Hl2);
        assert!("median".parse::<PriceSource>().is_err());
    }

    #[test]
    fn price_source_serialises_lowercase() {
        let json = serde_json::to_string(&PriceSource::Ohlc4).unwrap();
        assert_eq!(json, "\"ohlc4\"");
    }

    #[test]
    fn kind_serialises_lowercase() {
        let json = serde_json::to_string(&IndicatorKind::Panel).unwrap();
        assert_eq!(json, "\"panel\"");
    }
}
