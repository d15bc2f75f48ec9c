// =============================================================================
// Stochastic Oscillator (full)
// =============================================================================
//
//   raw %K   = (close - lowest low(k)) / (highest high(k) - lowest low(k)) * 100
//   %K       = SMA(raw %K, smooth)
//   %D       = SMA(%K, d)
//
// A flat window (highest == lowest) yields raw %K = 50.
// Each data point carries `value = %K` and `values = [%K, %D]`.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::kernels;
use super::settings::{assign, SettingDescriptor, SettingValue};
use super::{unknown_setting, Algorithm, IndicatorTypeId, RangePolicy};
use crate::error::IndicatorError;
use crate::types::{Bar, IndicatorDataPoint, IndicatorKind, LevelLine};

fn default_k_period() -> usize {
    14
}

fn default_d_period() -> usize {
    3
}

fn default_smooth() -> usize {
    3
}

fn default_overbought() -> f64 {
    80.0
}

fn default_oversold() -> f64 {
    20.0
}

fn default_d_color() -> String {
    "#FF6D00".to_string()
}

/// Raw %K for every bar; NaN until `k_period` bars are available.
fn raw_k(bars: &[Bar], k_period: usize) -> Vec<f64> {
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let hh = kernels::highest(&highs, i, k_period);
            let ll = kernels::lowest(&lows, i, k_period);
            let range = hh - ll;
            if !range.is_finite() {
                f64::NAN
            } else if range == 0.0 {
                50.0
            } else {
                (bar.close - ll) / range * 100.0
            }
        })
        .collect()
}

/// %K and %D from a raw oscillator series, kept inside [0, 100].
///
/// Sliding sums can drift an ulp past the bounds, hence the clamp.
pub(crate) fn smooth_k_d(raw: &[f64], smooth: usize, d_period: usize) -> (Vec<f64>, Vec<f64>) {
    let k: Vec<f64> = kernels::sma(raw, smooth)
        .into_iter()
        .map(|v| v.clamp(0.0, 100.0))
        .collect();
    let d: Vec<f64> = kernels::sma(&k, d_period)
        .into_iter()
        .map(|v| v.clamp(0.0, 100.0))
        .collect();
    (k, d)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StochasticParams {
    #[serde(default = "default_k_period")]
    pub k_period: usize,
    #[serde(default = "default_d_period")]
    pub d_period: usize,
    #[serde(default = "default_smooth")]
    pub smooth: usize,
    #[serde(default = "default_overbought")]
    pub overbought: f64,
    #[serde(default = "default_oversold")]
    pub oversold: f64,
    #[serde(default = "default_d_color")]
    pub d_color: String,
}

impl Default for StochasticParams {
    fn default() -> Self {
        Self {
            k_period: default_k_period(),
            d_period: default_d_period(),
            smooth: default_smooth(),
            overbought: default_overbought(),
            oversold: default_oversold(),
            d_color: default_d_color(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StochasticPatch {
    pub k_period: Option<usize>,
    pub d_period: Option<usize>,
    pub smooth: Option<usize>,
    pub overbought: Option<f64>,
    pub oversold: Option<f64>,
    pub d_color: Option<String>,
}

impl Algorithm for StochasticParams {
    type Patch = StochasticPatch;

    const TYPE_ID: IndicatorTypeId = IndicatorTypeId::Stochastic;
    const KIND: IndicatorKind = IndicatorKind::Panel;
    const WIDTH: usize = 2;

    fn display_name(&self) -> String {
        format!("Stoch ({}, {}, {})", self.k_period, self.d_period, self.smooth)
    }

    fn min_history(&self) -> usize {
        (self.k_period + self.smooth + self.d_period).saturating_sub(2)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<IndicatorDataPoint> {
        let raw = raw_k(bars, self.k_period);
        let (k, d) = smooth_k_d(&raw, self.smooth, self.d_period);

        bars.iter()
            .enumerate()
            .map(|(i, bar)| IndicatorDataPoint::with_values(bar.time, k[i], vec![k[i], d[i]]))
            .collect()
    }

    fn apply(&mut self, patch: StochasticPatch) -> bool {
        assign(&mut self.overbought, patch.overbought);
        assign(&mut self.oversold, patch.oversold);
        assign(&mut self.d_color, patch.d_color);
        assign(&mut self.k_period, patch.k_period)
            | assign(&mut self.d_period, patch.d_period)
            | assign(&mut self.smooth, patch.smooth)
    }

    fn patch_for(key: &str, value: &SettingValue) -> Result<StochasticPatch, IndicatorError> {
        let mut patch = StochasticPatch::default();
        match key {
            "kPeriod" => patch.k_period = Some(value.as_period(key)?),
            "dPeriod" => patch.d_period = Some(value.as_period(key)?),
            "smooth" => patch.smooth = Some(value.as_period(key)?),
            "overbought" => patch.overbought = Some(value.as_number(key)?),
            "oversold" => patch.oversold = Some(value.as_number(key)?),
            "dColor" => patch.d_color = Some(value.as_text(key)?),
            _ => return Err(unknown_setting::<Self>(key)),
        }
        Ok(patch)
    }

    fn setting_value(&self, key: &str) -> Option<SettingValue> {
        match key {
            "kPeriod" => Some(self.k_period.into()),
            "dPeriod" => Some(self.d_period.into()),
            "smooth" => Some(self.smooth.into()),
            "overbought" => Some(self.overbought.into()),
            "oversold" => Some(self.oversold.into()),
            "dColor" => Some(self.d_color.as_str().into()),
            _ => None,
        }
    }

    fn settings(&self) -> Vec<SettingDescriptor> {
        vec![
            SettingDescriptor::period("kPeriod", "%K period"),
            SettingDescriptor::period("dPeriod", "%D period"),
            SettingDescriptor::period("smooth", "%K smoothing"),
            SettingDescriptor::number("overbought", "Overbought", 50.0, 100.0, 1.0),
            SettingDescriptor::number("oversold", "Oversold", 0.0, 50.0, 1.0),
            SettingDescriptor::color("dColor", "%D line"),
        ]
    }

    fn default_color(&self) -> &'static str {
        "#2962FF"
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

    fn secondary_colors(&self) -> Vec<String> {
        vec![self.d_color.clone()]
    }

    fn legend_values(&self, point: &IndicatorDataPoint) -> Vec<f64> {
        point.values.clone()
    }
}
