// =============================================================================
// Stochastic RSI
// =============================================================================
//
// The stochastic formula applied to the RSI series instead of price:
//
//   raw = (RSI - lowest RSI(stoch)) / (highest RSI(stoch) - lowest RSI(stoch)) * 100
//   %K  = SMA(raw, k)
//   %D  = SMA(%K, d)
//
// A flat RSI window yields raw = 0.  The plain Stochastic uses 50 for the same
// case; both are kept as-is for output compatibility with saved charts.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::kernels;
use super::rsi::rsi_series;
use super::settings::{assign, SettingDescriptor, SettingValue};
use super::stochastic::smooth_k_d;
use super::{unknown_setting, Algorithm, IndicatorTypeId, RangePolicy};
use crate::error::IndicatorError;
use crate::types::{Bar, IndicatorDataPoint, IndicatorKind, LevelLine, PriceSource};

fn default_rsi_period() -> usize {
    14
}

fn default_stoch_period() -> usize {
    14
}

fn default_k_period() -> usize {
    3
}

fn default_d_period() -> usize {
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StochRsiParams {
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    #[serde(default = "default_stoch_period")]
    pub stoch_period: usize,
    #[serde(default = "default_k_period")]
    pub k_period: usize,
    #[serde(default = "default_d_period")]
    pub d_period: usize,
    #[serde(default)]
    pub source: PriceSource,
    #[serde(default = "default_overbought")]
    pub overbought: f64,
    #[serde(default = "default_oversold")]
    pub oversold: f64,
    #[serde(default = "default_d_color")]
    pub d_color: String,
}

impl Default for StochRsiParams {
    fn default() -> Self {
        Self {
            rsi_period: default_rsi_period(),
            stoch_period: default_stoch_period(),
            k_period: default_k_period(),
            d_period: default_d_period(),
            source: PriceSource::Close,
            overbought: default_overbought(),
            oversold: default_oversold(),
            d_color: default_d_color(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StochRsiPatch {
    pub rsi_period: Option<usize>,
    pub stoch_period: Option<usize>,
    pub k_period: Option<usize>,
    pub d_period: Option<usize>,
    pub source: Option<PriceSource>,
    pub overbought: Option<f64>,
    pub oversold: Option<f64>,
    pub d_color: Option<String>,
}

impl Algorithm for StochRsiParams {
    type Patch = StochRsiPatch;

    const TYPE_ID: IndicatorTypeId = IndicatorTypeId::StochRsi;
    const KIND: IndicatorKind = IndicatorKind::Panel;
    const WIDTH: usize = 2;

    fn display_name(&self) -> String {
        format!(
            "StochRSI ({}, {}, {}, {})",
            self.rsi_period, self.stoch_period, self.k_period, self.d_period
        )
    }

    fn min_history(&self) -> usize {
        self.rsi_period + self.stoch_period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<IndicatorDataPoint> {
        let prices = self.source.series(bars);
        let rsi = rsi_series(&prices, self.rsi_period);

        let raw: Vec<f64> = (0..rsi.len())
            .map(|i| {
                let hi = kernels::highest(&rsi, i, self.stoch_period);
                let lo = kernels::lowest(&rsi, i, self.stoch_period);
                let range = hi - lo;
                if !range.is_finite() {
                    f64::NAN
                } else if range == 0.0 {
                    0.0
                } else {
                    (rsi[i] - lo) / range * 100.0
                }
            })
            .collect();

        let (k, d) = smooth_k_d(&raw, self.k_period, self.d_period);

        bars.iter()
            .enumerate()
            .map(|(i, bar)| IndicatorDataPoint::with_values(bar.time, k[i], vec![k[i], d[i]]))
            .collect()
    }

    fn apply(&mut self, patch: StochRsiPatch) -> bool {
        assign(&mut self.overbought, patch.overbought);
        assign(&mut self.oversold, patch.oversold);
        assign(&mut self.d_color, patch.d_color);
        assign(&mut self.rsi_period, patch.rsi_period)
            | assign(&mut self.stoch_period, patch.stoch_period)
            | assign(&mut self.k_period, patch.k_period)
            | assign(&mut self.d_period, patch.d_period)
            | assign(&mut self.source, patch.source)
    }

    fn patch_for(key: &str, value: &SettingValue) -> Result<StochRsiPatch, IndicatorError> {
        let mut patch = StochRsiPatch::default();
        match key {
            "rsiPeriod" => patch.rsi_period = Some(value.as_period(key)?),
            "stochPeriod" => patch.stoch_period = Some(value.as_period(key)?),
            "kPeriod" => patch.k_period = Some(value.as_period(key)?),
            "dPeriod" => patch.d_period = Some(value.as_period(key)?),
            "source" => patch.source = Some(value.as_source(key)?),
            "overbought" => patch.overbought = Some(value.as_number(key)?),
            "oversold" => patch.oversold = Some(value.as_number(key)?),
            "dColor" => patch.d_color = Some(value.as_text(key)?),
            _ => return Err(unknown_setting::<Self>(key)),
        }
        Ok(patch)
    }

    fn setting_value(&self, key: &str) -> Option<SettingValue> {
        match key {
            "rsiPeriod" => Some(self.rsi_period.into()),
            "stochPeriod" => Some(self.stoch_period.into()),
            "kPeriod" => Some(self.k_period.into()),
            "dPeriod" => Some(self.d_period.into()),
            "source" => Some(self.source.into()),
            "overbought" => Some(self.overbought.into()),
            "oversold" => Some(self.oversold.into()),
            "dColor" => Some(self.d_color.as_str().into()),
            _ => None,
        }
    }

    fn settings(&self) -> Vec<SettingDescriptor> {
        vec![
            SettingDescriptor::period("rsiPeriod", "RSI period"),
            SettingDescriptor::period("stochPeriod", "Stochastic period"),
            SettingDescriptor::period("kPeriod", "%K smoothing"),
            SettingDescriptor::period("dPeriod", "%D smoothing"),
            SettingDescriptor::source(),
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
