// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   macd      = EMA(price, fast) - EMA(price, slow)
//   signal    = EMA(macd, signal)
//   histogram = macd - signal
//
// Unlike the standalone EMA indicator, all three EMAs here are seeded with the
// first value rather than an SMA, so every series is defined from index 0 once
// `slow` bars are available.  Persisted charts depend on these exact values.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::kernels;
use super::settings::{assign, SettingDescriptor, SettingValue};
use super::{unknown_setting, Algorithm, IndicatorTypeId, RangePolicy};
use crate::error::IndicatorError;
use crate::types::{Bar, IndicatorDataPoint, IndicatorKind, LevelLine, PriceSource};

fn default_fast() -> usize {
    12
}

fn default_slow() -> usize {
    26
}

fn default_signal() -> usize {
    9
}

fn default_signal_color() -> String {
    "#FF6D00".to_string()
}

fn default_histogram_up_color() -> String {
    "#26A69A".to_string()
}

fn default_histogram_down_color() -> String {
    "#EF5350".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacdParams {
    #[serde(default = "default_fast")]
    pub fast_period: usize,
    #[serde(default = "default_slow")]
    pub slow_period: usize,
    #[serde(default = "default_signal")]
    pub signal_period: usize,
    #[serde(default)]
    pub source: PriceSource,
    #[serde(default = "default_signal_color")]
    pub signal_color: String,
    #[serde(default = "default_histogram_up_color")]
    pub histogram_up_color: String,
    #[serde(default = "default_histogram_down_color")]
    pub histogram_down_color: String,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast_period: default_fast(),
            slow_period: default_slow(),
            signal_period: default_signal(),
            source: PriceSource::Close,
            signal_color: default_signal_color(),
            histogram_up_color: default_histogram_up_color(),
            histogram_down_color: default_histogram_down_color(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacdPatch {
    pub fast_period: Option<usize>,
    pub slow_period: Option<usize>,
    pub signal_period: Option<usize>,
    pub source: Option<PriceSource>,
    pub signal_color: Option<String>,
    pub histogram_up_color: Option<String>,
    pub histogram_down_color: Option<String>,
}

impl Algorithm for MacdParams {
    type Patch = MacdPatch;

    const TYPE_ID: IndicatorTypeId = IndicatorTypeId::Macd;
    const KIND: IndicatorKind = IndicatorKind::Panel;
    const WIDTH: usize = 3;

    fn display_name(&self) -> String {
        format!(
            "MACD ({}, {}, {})",
            self.fast_period, self.slow_period, self.signal_period
        )
    }

    fn min_history(&self) -> usize {
        self.slow_period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<IndicatorDataPoint> {
        let prices = self.source.series(bars);
        let fast = kernels::ema_from_first(&prices, self.fast_period);
        let slow = kernels::ema_from_first(&prices, self.slow_period);

        let macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal = kernels::ema_from_first(&macd, self.signal_period);

        bars.iter()
            .enumerate()
            .map(|(i, bar)| {
                let histogram = macd[i] - signal[i];
                IndicatorDataPoint::with_values(
                    bar.time,
                    macd[i],
                    vec![macd[i], signal[i], histogram],
                )
            })
            .collect()
    }

    fn apply(&mut self, patch: MacdPatch) -> bool {
        assign(&mut self.signal_color, patch.signal_color);
        assign(&mut self.histogram_up_color, patch.histogram_up_color);
        assign(&mut self.histogram_down_color, patch.histogram_down_color);
        assign(&mut self.fast_period, patch.fast_period)
            | assign(&mut self.slow_period, patch.slow_period)
            | assign(&mut self.signal_period, patch.signal_period)
            | assign(&mut self.source, patch.source)
    }

    fn patch_for(key: &str, value: &SettingValue) -> Result<MacdPatch, IndicatorError> {
        let mut patch = MacdPatch::default();
        match key {
            "fastPeriod" => patch.fast_period = Some(value.as_period(key)?),
            "slowPeriod" => patch.slow_period = Some(value.as_period(key)?),
            "signalPeriod" => patch.signal_period = Some(value.as_period(key)?),
            "source" => patch.source = Some(value.as_source(key)?),
            "signalColor" => patch.signal_color = Some(value.as_text(key)?),
            "histogramUpColor" => patch.histogram_up_color = Some(value.as_text(key)?),
            "histogramDownColor" => patch.histogram_down_color = Some(value.as_text(key)?),
            _ => return Err(unknown_setting::<Self>(key)),
        }
        Ok(patch)
    }

    fn setting_value(&self, key: &str) -> Option<SettingValue> {
        match key {
            "fastPeriod" => Some(self.fast_period.into()),
            "slowPeriod" => Some(self.slow_period.into()),
            "signalPeriod" => Some(self.signal_period.into()),
            "source" => Some(self.source.into()),
            "signalColor" => Some(self.signal_color.as_str().into()),
            "histogramUpColor" => Some(self.histogram_up_color.as_str().into()),
            "histogramDownColor" => Some(self.histogram_down_color.as_str().into()),
            _ => None,
        }
    }

    fn settings(&self) -> Vec<SettingDescriptor> {
        vec![
            SettingDescriptor::period("fastPeriod", "Fast"),
            SettingDescriptor::period("slowPeriod", "Slow"),
            SettingDescriptor::period("signalPeriod", "Signal"),
            SettingDescriptor::source(),
            SettingDescriptor::color("signalColor", "Signal line"),
            SettingDescriptor::color("histogramUpColor", "Histogram up"),
            SettingDescriptor::color("histogramDownColor", "Histogram down"),
        ]
    }

    fn default_color(&self) -> &'static str {
        "#2962FF"
    }

    fn range_policy(&self) -> RangePolicy {
        RangePolicy::AllSeries
    }

    fn level_lines(&self) -> Vec<LevelLine> {
        vec![LevelLine {
            value: 0.0,
            label: "zero",
        }]
    }

    fn secondary_colors(&self) -> Vec<String> {
        vec![
            self.signal_color.clone(),
            self.histogram_up_color.clone(),
            self.histogram_down_color.clone(),
        ]
    }

    fn histogram_slot(&self) -> Option<usize> {
        Some(2)
    }

    fn legend_values(&self, point: &IndicatorDataPoint) -> Vec<f64> {
        point.values.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::testing::{flat_bars, wavy_bars};

    #[test]
    fn histogram_is_macd_minus_signal() {
        let out = MacdParams::default().compute(&wavy_bars(120));
        for p in &out {
            let (macd, signal, hist) = (p.values[0], p.values[1], p.values[2]);
            assert_eq!(p.value, macd);
            assert!((hist - (macd - signal)).abs() < 1e-12);
        }
    }

    #[test]
    fn defined_from_first_bar() {
        let out = MacdParams::default().compute(&wavy_bars(26));
        assert!(out.iter().all(|p| p.values.iter().all(|v| v.is_finite())));
        // Both EMAs start at the same price, so everything starts at zero.
        assert_eq!(out[0].values, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn flat_series_has_zero_macd() {
        let out = MacdParams::default().compute(&flat_bars(&[50.0; 40]));
        assert!(out.iter().all(|p| p.value.abs() < 1e-9));
    }

    #[test]
    fn colors_are_cosmetic_periods_are_not() {
        let mut params = MacdParams::default();
        assert!(!params.apply(MacdPatch {
            signal_color: Some("#123456".into()),
            ..MacdPatch::default()
        }));
        assert!(params.apply(MacdPatch {
            fast_period: Some(8),
            ..MacdPatch::default()
        }));
        assert_eq!(params.display_name(), "MACD (8, 26, 9)");
    }
}
