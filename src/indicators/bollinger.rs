// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ), where σ is the population standard deviation
// of the same window.
//
// Each data point carries `value = middle` and `values = [middle, upper, lower]`.

use serde::{Deserialize, Serialize};

use super::kernels;
use super::settings::{assign, SettingDescriptor, SettingValue};
use super::{unknown_setting, Algorithm, IndicatorTypeId, RangePolicy};
use crate::error::IndicatorError;
use crate::types::{Bar, IndicatorDataPoint, IndicatorKind, PriceSource};

fn default_period() -> usize {
    20
}

fn default_std_dev() -> f64 {
    2.0
}

fn default_band_color() -> String {
    "#2196F3".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BollingerParams {
    #[serde(default = "default_period")]
    pub period: usize,
    /// Band width multiplier `k`.
    #[serde(default = "default_std_dev")]
    pub std_dev: f64,
    #[serde(default)]
    pub source: PriceSource,
    /// Color of the upper and lower bands.
    #[serde(default = "default_band_color")]
    pub band_color: String,
}

impl Default for BollingerParams {
    fn default() -> Self {
        Self {
            period: default_period(),
            std_dev: default_std_dev(),
            source: PriceSource::Close,
            band_color: default_band_color(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BollingerPatch {
    pub period: Option<usize>,
    pub std_dev: Option<f64>,
    pub source: Option<PriceSource>,
    pub band_color: Option<String>,
}

impl Algorithm for BollingerParams {
    type Patch = BollingerPatch;

    const TYPE_ID: IndicatorTypeId = IndicatorTypeId::BollingerBands;
    const KIND: IndicatorKind = IndicatorKind::Overlay;
    const WIDTH: usize = 3;

    fn display_name(&self) -> String {
        format!("BB ({}, {})", self.period, self.std_dev)
    }

    fn min_history(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<IndicatorDataPoint> {
        let prices = self.source.series(bars);
        let middle = kernels::sma(&prices, self.period);

        bars.iter()
            .enumerate()
            .map(|(i, bar)| {
                let mid = middle[i];
                if !mid.is_finite() {
                    return IndicatorDataPoint::undefined(bar.time, Self::WIDTH);
                }
                let window = &prices[i + 1 - self.period..=i];
                let sigma = kernels::population_std_dev(window, mid);
                let upper = mid + self.std_dev * sigma;
                let lower = mid - self.std_dev * sigma;
                IndicatorDataPoint::with_values(bar.time, mid, vec![mid, upper, lower])
            })
            .collect()
    }

    fn apply(&mut self, patch: BollingerPatch) -> bool {
        assign(&mut self.band_color, patch.band_color);
        assign(&mut self.period, patch.period)
            | assign(&mut self.std_dev, patch.std_dev)
            | assign(&mut self.source, patch.source)
    }

    fn patch_for(key: &str, value: &SettingValue) -> Result<BollingerPatch, IndicatorError> {
        let mut patch = BollingerPatch::default();
        match key {
            "period" => patch.period = Some(value.as_period(key)?),
            "stdDev" => patch.std_dev = Some(value.as_number(key)?),
            "source" => patch.source = Some(value.as_source(key)?),
            "bandColor" => patch.band_color = Some(value.as_text(key)?),
            _ => return Err(unknown_setting::<Self>(key)),
        }
        Ok(patch)
    }

    fn setting_value(&self, key: &str) -> Option<SettingValue> {
        match key {
            "period" => Some(self.period.into()),
            "stdDev" => Some(self.std_dev.into()),
            "source" => Some(self.source.into()),
            "bandColor" => Some(self.band_color.as_str().into()),
            _ => None,
        }
    }

    fn settings(&self) -> Vec<SettingDescriptor> {
        vec![
            SettingDescriptor::period("period", "Period"),
            SettingDescriptor::number("stdDev", "StdDev", 0.1, 10.0, 0.1),
            SettingDescriptor::source(),
            SettingDescriptor::color("bandColor", "Bands"),
        ]
    }

    fn default_color(&self) -> &'static str {
        "#FF9800"
    }

    fn range_policy(&self) -> RangePolicy {
        RangePolicy::AllSeries
    }

    fn secondary_colors(&self) -> Vec<String> {
        vec![self.band_color.clone(), self.band_color.clone()]
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
    fn zero_variance_collapses_bands() {
        let out = BollingerParams::default().compute(&flat_bars(&[100.0; 30]));
        assert!(out[..19].iter().all(|p| p.value.is_nan()));
        for p in &out[19..] {
            assert_eq!(p.values, vec![100.0, 100.0, 100.0]);
            assert_eq!(p.value, 100.0);
        }
    }

    #[test]
    fn inexact_constant_collapses_bands_exactly() {
        for v in [0.1, 100.3] {
            let out = BollingerParams::default().compute(&flat_bars(&[v; 30]));
            for p in &out[19..] {
                assert_eq!(p.values, vec![v, v, v]);
            }
        }
    }

    #[test]
    fn bands_are_symmetric_around_middle() {
        let out = BollingerParams::default().compute(&wavy_bars(80));
        for p in out.iter().filter(|p| p.value.is_finite()) {
            let (mid, upper, lower) = (p.values[0], p.values[1], p.values[2]);
            assert!(upper >= mid && lower <= mid);
            assert!(((upper - mid) - (mid - lower)).abs() < 1e-9);
        }
    }

    #[test]
    fn population_sigma() {
        // window [1, 2, 3, 4]: mean 2.5, population variance 1.25
        let params = BollingerParams {
            period: 4,
            std_dev: 1.0,
            ..BollingerParams::default()
        };
        let out = params.compute(&flat_bars(&[1.0, 2.0, 3.0, 4.0]));
        let upper = out[3].values[1];
        assert!((upper - (2.5 + 1.25_f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn name_embeds_parameters() {
        assert_eq!(BollingerParams::default().display_name(), "BB (20, 2)");
        let mut params = BollingerParams::default();
        assert!(!params.apply(BollingerPatch {
            band_color: Some("#000".into()),
            ..BollingerPatch::default()
        }));
        assert!(params.apply(BollingerPatch {
            std_dev: Some(2.5),
            ..BollingerPatch::default()
        }));
        assert_eq!(params.display_name(), "BB (20, 2.5)");
    }
}
