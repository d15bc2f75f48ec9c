// =============================================================================
// Hull Moving Average (HMA)
// =============================================================================
//
//   raw = 2 * WMA(price, floor(n / 2)) - WMA(price, n)
//   HMA = WMA(raw, floor(sqrt(n)))
//
// A NaN anywhere inside a WMA window propagates, so the first defined value
// lands at index n + floor(sqrt(n)) - 2.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::kernels;
use super::settings::{assign, SettingDescriptor, SettingValue};
use super::{Algorithm, IndicatorTypeId, PeriodPatch};
use crate::error::IndicatorError;
use crate::types::{Bar, IndicatorDataPoint, IndicatorKind, PriceSource};

fn default_period() -> usize {
    9
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HmaParams {
    #[serde(default = "default_period")]
    pub period: usize,
    #[serde(default)]
    pub source: PriceSource,
}

impl Default for HmaParams {
    fn default() -> Self {
        Self {
            period: default_period(),
            source: PriceSource::Close,
        }
    }
}

impl HmaParams {
    fn half_period(&self) -> usize {
        self.period / 2
    }

    fn sqrt_period(&self) -> usize {
        (self.period as f64).sqrt().floor() as usize
    }
}

impl Algorithm for HmaParams {
    type Patch = PeriodPatch;

    const TYPE_ID: IndicatorTypeId = IndicatorTypeId::Hma;
    const KIND: IndicatorKind = IndicatorKind::Overlay;

    fn display_name(&self) -> String {
        format!("HMA ({})", self.period)
    }

    fn min_history(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<IndicatorDataPoint> {
        let prices = self.source.series(bars);
        let half = kernels::wma(&prices, self.half_period());
        let full = kernels::wma(&prices, self.period);

        let raw: Vec<f64> = half
            .iter()
            .zip(&full)
            .map(|(h, f)| 2.0 * h - f)
            .collect();

        kernels::wma(&raw, self.sqrt_period())
            .into_iter()
            .zip(bars)
            .map(|(v, b)| IndicatorDataPoint::new(b.time, v))
            .collect()
    }

    fn apply(&mut self, patch: PeriodPatch) -> bool {
        assign(&mut self.period, patch.period) | assign(&mut self.source, patch.source)
    }

    fn patch_for(key: &str, value: &SettingValue) -> Result<PeriodPatch, IndicatorError> {
        PeriodPatch::from_setting::<Self>(key, value)
    }

    fn setting_value(&self, key: &str) -> Option<SettingValue> {
        match key {
            "period" => Some(self.period.into()),
            "source" => Some(self.source.into()),
            _ => None,
        }
    }

    fn settings(&self) -> Vec<SettingDescriptor> {
        vec![SettingDescriptor::period("period", "Period"), SettingDescriptor::source()]
    }

    fn default_color(&self) -> &'static str {
        "#AB47BC"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::testing::{flat_bars, wavy_bars};

    #[test]
    fn first_defined_index() {
        // n = 9: half 4, sqrt 3 => first value at 9 + 3 - 2 = 10
        let out = HmaParams::default().compute(&wavy_bars(30));
        assert!(out[..10].iter().all(|p| p.value.is_nan()));
        assert!(out[10..].iter().all(|p| p.value.is_finite()));
    }

    #[test]
    fn constant_series_is_flat() {
        let out = HmaParams::default().compute(&flat_bars(&[100.0; 30]));
        for p in &out[10..] {
            assert!((p.value - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn linear_series_is_tracked_without_lag() {
        // WMA of a line lags by a constant; the Hull combination cancels it.
        let closes: Vec<f64> = (0..40).map(|x| x as f64).collect();
        let out = HmaParams {
            period: 16,
            source: PriceSource::Close,
        }
        .compute(&flat_bars(&closes));
        let last = out.last().unwrap().value;
        assert!((last - 39.0).abs() < 1.0, "HMA lagged too far: {last}");
    }
}
