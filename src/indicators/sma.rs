// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// Arithmetic mean of the last `period` source prices, maintained with an
// O(1) add/remove sliding sum.  The first `period - 1` points are NaN.
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
pub struct SmaParams {
    #[serde(default = "default_period")]
    pub period: usize,
    #[serde(default)]
    pub source: PriceSource,
}

impl Default for SmaParams {
    fn default() -> Self {
        Self {
            period: default_period(),
            source: PriceSource::Close,
        }
    }
}

impl Algorithm for SmaParams {
    type Patch = PeriodPatch;

    const TYPE_ID: IndicatorTypeId = IndicatorTypeId::Sma;
    const KIND: IndicatorKind = IndicatorKind::Overlay;

    fn display_name(&self) -> String {
        format!("SMA ({})", self.period)
    }

    fn min_history(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<IndicatorDataPoint> {
        let prices = self.source.series(bars);
        kernels::sma(&prices, self.period)
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
        "#2962FF"
    }
}
