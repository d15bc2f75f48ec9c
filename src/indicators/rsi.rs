// =============================================================================
// Relative Strength Index (RSI) — Wilder's Smoothing
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1 — Compute price changes (deltas) from consecutive prices.
// Step 2 — Seed average gain / average loss with the simple mean of the first
//          `period` gains / losses.
// Step 3 — Apply Wilder's smoothing:
//            avg_gain = (prev_avg_gain * (period - 1) + current_gain) / period
//            avg_loss = (prev_avg_loss * (period - 1) + current_loss) / period
// Step 4 — RSI = 100 * avg_gain / (avg_gain + avg_loss)
//
// The first value lands at index `period` (it needs `period` deltas).
// Thresholds:  RSI > 70 => overbought,  RSI < 30 => oversold.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::settings::{assign, SettingDescriptor, SettingValue};
use super::{unknown_setting, Algorithm, IndicatorTypeId, RangePolicy};
use crate::error::IndicatorError;
use crate::types::{Bar, IndicatorDataPoint, IndicatorKind, LevelLine, PriceSource};

fn default_period() -> usize {
    14
}

fn default_overbought() -> f64 {
    70.0
}

fn default_oversold() -> f64 {
    30.0
}

/// Compute the index-aligned RSI series for `values`.
///
/// # Edge cases
/// - `period == 0` or `values.len() < period + 1` => all NaN
/// - No movement at all (avg gain + avg loss == 0) => 50.0
pub fn rsi_series(values: &[f64], period: usize) -> Vec<f64> {
    let len = values.len();
    let mut out = vec![f64::NAN; len];
    if period == 0 || len < period + 1 {
        return out;
    }

    // --- Seed averages with the mean of the first `period` deltas ------------
    let (sum_gain, sum_loss) = (1..=period).fold((0.0_f64, 0.0_f64), |(g, l), i| {
        let delta = values[i] - values[i - 1];
        if delta > 0.0 {
            (g + delta, l)
        } else {
            (g, l - delta)
        }
    });

    let period_f = period as f64;
    let mut avg_gain = sum_gain / period_f;
    let mut avg_loss = sum_loss / period_f;
    out[period] = rsi_from_averages(avg_gain, avg_loss);

    // --- Wilder's smoothing for subsequent values ----------------------------
    for i in (period + 1)..len {
        let delta = values[i] - values[i - 1];
        let gain = if delta > 0.0 { delta } else { 0.0 };
        let loss = if delta < 0.0 { -delta } else { 0.0 };

        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;
        out[i] = rsi_from_averages(avg_gain, avg_loss);
    }

    out
}

/// Convert average gain / average loss into an RSI value in [0, 100].
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    let total = avg_gain + avg_loss;
    if total == 0.0 {
        50.0 // No movement at all — neutral.
    } else {
        100.0 * avg_gain / total
    }
}

// =============================================================================
// Parameters
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsiParams {
    #[serde(default = "default_period")]
    pub period: usize,
    #[serde(default)]
    pub source: PriceSource,
    #[serde(default = "default_overbought")]
    pub overbought: f64,
    #[serde(default = "default_oversold")]
    pub oversold: f64,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self {
            period: default_period(),
            source: PriceSource::Close,
            overbought: default_overbought(),
            oversold: default_oversold(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RsiPatch {
    pub period: Option<usize>,
    pub source: Option<PriceSource>,
    pub overbought: Option<f64>,
    pub oversold: Option<f64>,
}

impl Algorithm for RsiParams {
    type Patch = RsiPatch;

    const TYPE_ID: IndicatorTypeId = IndicatorTypeId::Rsi;
    const KIND: IndicatorKind = IndicatorKind::Panel;

    fn display_name(&self) -> String {
        format!("RSI ({})", self.period)
    }

    fn min_history(&self) -> usize {
        self.period + 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<IndicatorDataPoint> {
        let prices = self.source.series(bars);
        rsi_series(&prices, self.period)
            .into_iter()
            .zip(bars)
            .map(|(v, b)| IndicatorDataPoint::new(b.time, v))
            .collect()
    }

    fn apply(&mut self, patch: RsiPatch) -> bool {
        // Threshold lines are drawn from options; they never touch the data.
        assign(&mut self.overbought, patch.overbought);
        assign(&mut self.oversold, patch.oversold);
        assign(&mut self.period, patch.period) | assign(&mut self.source, patch.source)
    }

    fn patch_for(key: &str, value: &SettingValue) -> Result<RsiPatch, IndicatorError> {
        let mut patch = RsiPatch::default();
        match key {
            "period" => patch.period = Some(value.as_period(key)?),
            "source" => patch.source = Some(value.as_source(key)?),
            "overbought" => patch.overbought = Some(value.as_number(key)?),
            "oversold" => patch.oversold = Some(value.as_number(key)?),
            _ => return Err(unknown_setting::<Self>(key)),
        }
        Ok(patch)
    }

    fn setting_value(&self, key: &str) -> Option<SettingValue> {
        match key {
            "period" => Some(self.period.into()),
            "source" => Some(self.source.into()),
            "overbought" => Some(self.overbought.into()),
            "oversold" => Some(self.oversold.into()),
            _ => None,
        }
    }

    fn settings(&self) -> Vec<SettingDescriptor> {
        vec![
            SettingDescriptor::period("period", "Period"),
            SettingDescriptor::source(),
            SettingDescriptor::number("overbought", "Overbought", 50.0, 100.0, 1.0),
            SettingDescriptor::number("oversold", "Oversold", 0.0, 50.0, 1.0),
        ]
    }

    fn default_color(&self) -> &'static str {
        "#7E57C2"
    }

    fn range_policy(&self) -> RangePolicy {
        RangePolicy::Fixed { min: 0.0, max: 100.0 }
    }

    fn level_lines(&self) -> Vec<LevelLine> {
        vec![
            LevelLine {
                value: self.overbought,
                label: "overbought",
            },
            LevelLine {
                value: self.oversold,
                label: "oversold",
            },
        ]
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::testing::{flat_bars, wavy_bars};

    #[test]
    fn rsi_empty_input() {
        assert!(rsi_series(&[], 14).is_empty());
    }

    #[test]
    fn rsi_insufficient_data() {
        let closes: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        let out = rsi_series(&closes, 14);
        assert_eq!(out.len(), 14);
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let out = rsi_series(&closes, 14);
        assert!(out[..14].iter().all(|v| v.is_nan()));
        for &v in &out[14..] {
            assert!((v - 100.0).abs() < 1e-10, "expected 100.0, got {v}");
        }
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        for &v in &rsi_series(&closes, 14)[14..] {
            assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
        }
    }

    #[test]
    fn rsi_flat_market_is_neutral() {
        for &v in &rsi_series(&[100.0; 30], 14)[14..] {
            assert_eq!(v, 50.0);
        }
    }

    #[test]
    fn rsi_stays_in_range() {
        let out = RsiParams::default().compute(&wavy_bars(200));
        for p in out.iter().filter(|p| p.value.is_finite()) {
            assert!((0.0..=100.0).contains(&p.value), "RSI {} out of range", p.value);
        }
    }

    #[test]
    fn rsi_rising_then_converges_to_100() {
        // Mixed start, then a long strictly increasing run.
        let mut closes = vec![50.0, 48.0, 51.0, 47.0, 49.0, 46.0];
        closes.extend((0..300).map(|x| 50.0 + x as f64));
        let out = RsiParams::default().compute(&flat_bars(&closes));
        let last = out.last().unwrap().value;
        assert!(last > 99.9 && last <= 100.0, "RSI did not converge: {last}");
    }

    #[test]
    fn thresholds_are_cosmetic() {
        let mut params = RsiParams::default();
        let stale = params.apply(RsiPatch {
            overbought: Some(80.0),
            ..RsiPatch::default()
        });
        assert!(!stale);
        assert_eq!(params.level_lines()[0].value, 80.0);

        let stale = params.apply(RsiPatch {
            period: Some(21),
            ..RsiPatch::default()
        });
        assert!(stale);
        assert_eq!(params.display_name(), "RSI (21)");
    }
}
