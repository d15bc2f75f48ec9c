// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_t      = price_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The first EMA value is seeded with the SMA of the first `period` prices and
// placed at index `period - 1`; everything before it is NaN.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::kernels;
use super::settings::{assign, SettingDescriptor, SettingValue};
use super::{Algorithm, IndicatorTypeId, PeriodPatch};
use crate::error::IndicatorError;
use crate::types::{Bar, IndicatorDataPoint, IndicatorKind, PriceSource};

fn default_period() -> usize {
    20
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmaParams {
    #[serde(default = "default_period")]
    pub period: usize,
    #[serde(default)]
    pub source: PriceSource,
}

impl Default for EmaParams {
    fn default() -> Self {
        Self {
            period: default_period(),
            source: PriceSource::Close,
        }
    }
}

impl Algorithm for EmaParams {
    type Patch = PeriodPatch;

    const TYPE_ID: IndicatorTypeId = IndicatorTypeId::Ema;
    const KIND: IndicatorKind = IndicatorKind::Overlay;

    fn display_name(&self) -> String {
        format!("EMA ({})", self.period)
    }

    fn min_history(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<IndicatorDataPoint> {
        let prices = self.source.series(bars);
        kernels::ema(&prices, self.period)
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
        "#FF6D00"
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
    fn seed_equals_sma_of_first_period() {
        let bars = wavy_bars(40);
        let params = EmaParams {
            period: 10,
            source: PriceSource::Close,
        };
        let out = params.compute(&bars);
        let seed = bars[..10].iter().map(|b| b.close).sum::<f64>() / 10.0;

        assert!(out[..9].iter().all(|p| p.value.is_nan()));
        assert!((out[9].value - seed).abs() < 1e-10);
    }

    #[test]
    fn known_values() {
        // 5-period EMA of [1..=10]: SMA seed 3.0, multiplier 1/3.
        let closes: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let out = EmaParams {
            period: 5,
            source: PriceSource::Close,
        }
        .compute(&flat_bars(&closes));

        let mult = 2.0 / 6.0;
        let mut expected = 3.0;
        assert!((out[4].value - expected).abs() < 1e-10);
        for i in 5..10 {
            expected = closes[i] * mult + expected * (1.0 - mult);
            assert!((out[i].value - expected).abs() < 1e-10, "index {i}");
        }
    }

    #[test]
    fn source_change_needs_recalc() {
        let mut params = EmaParams::default();
        let stale = params.apply(PeriodPatch {
            period: None,
            source: Some(PriceSource::Hl2),
        });
        assert!(stale);
        assert_eq!(params.display_name(), "EMA (20)");
    }
}
