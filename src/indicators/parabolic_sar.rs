// =============================================================================
// Parabolic SAR (Stop And Reverse)
// =============================================================================
//
//   SAR_t = SAR_{t-1} + AF * (EP - SAR_{t-1})
//
// EP is the extreme price of the current trend (highest high while long,
// lowest low while short).  AF starts at `start` and grows by `increment`,
// capped at `maximum`, every time a new EP is made.
//
// While in trend the SAR may not cross the prior two bars' lows (long) or
// highs (short).  When price penetrates the SAR the trend reverses: the new
// SAR is the prior EP and AF resets to `start`.
//
// Index 0 is undefined; each point carries `values = [direction]` where +1 is
// long and -1 is short, so the renderer can color the dots.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::settings::{assign, SettingDescriptor, SettingValue};
use super::{unknown_setting, Algorithm, IndicatorTypeId};
use crate::error::IndicatorError;
use crate::types::{Bar, IndicatorDataPoint, IndicatorKind};

fn default_start() -> f64 {
    0.02
}

fn default_increment() -> f64 {
    0.02
}

fn default_maximum() -> f64 {
    0.2
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParabolicSarParams {
    #[serde(default = "default_start")]
    pub start: f64,
    #[serde(default = "default_increment")]
    pub increment: f64,
    #[serde(default = "default_maximum")]
    pub maximum: f64,
}

impl Default for ParabolicSarParams {
    fn default() -> Self {
        Self {
            start: default_start(),
            increment: default_increment(),
            maximum: default_maximum(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParabolicSarPatch {
    pub start: Option<f64>,
    pub increment: Option<f64>,
    pub maximum: Option<f64>,
}

impl Algorithm for ParabolicSarParams {
    type Patch = ParabolicSarPatch;

    const TYPE_ID: IndicatorTypeId = IndicatorTypeId::ParabolicSar;
    const KIND: IndicatorKind = IndicatorKind::Overlay;
    const WIDTH: usize = 1;

    fn display_name(&self) -> String {
        format!("PSAR ({}, {}, {})", self.start, self.increment, self.maximum)
    }

    fn min_history(&self) -> usize {
        2
    }

    fn compute(&self, bars: &[Bar]) -> Vec<IndicatorDataPoint> {
        let len = bars.len();
        let mut out = Vec::with_capacity(len);
        let Some(first) = bars.first() else {
            return out;
        };
        out.push(IndicatorDataPoint::undefined(first.time, Self::WIDTH));
        if len < 2 {
            return out;
        }

        let mut long = bars[1].close >= first.close;
        let mut ep = if long { first.high } else { first.low };
        let mut sar = if long { first.low } else { first.high };
        let mut af = self.start;

        for i in 1..len {
            let bar = &bars[i];
            sar += af * (ep - sar);

            if long {
                // SAR must not sit above the two previous lows.
                sar = sar.min(bars[i - 1].low);
                if i >= 2 {
                    sar = sar.min(bars[i - 2].low);
                }

                if bar.low < sar {
                    long = false;
                    sar = ep;
                    ep = bar.low;
                    af = self.start;
                } else if bar.high > ep {
                    ep = bar.high;
                    af = (af + self.increment).min(self.maximum);
                }
            } else {
                // SAR must not sit below the two previous highs.
                sar = sar.max(bars[i - 1].high);
                if i >= 2 {
                    sar = sar.max(bars[i - 2].high);
                }

                if bar.high > sar {
                    long = true;
                    sar = ep;
                    ep = bar.high;
                    af = self.start;
                } else if bar.low < ep {
                    ep = bar.low;
                    af = (af + self.increment).min(self.maximum);
                }
            }

            let direction = if long { 1.0 } else { -1.0 };
            out.push(IndicatorDataPoint::with_values(bar.time, sar, vec![direction]));
        }

        out
    }

    fn apply(&mut self, patch: ParabolicSarPatch) -> bool {
        assign(&mut self.start, patch.start)
            | assign(&mut self.increment, patch.increment)
            | assign(&mut self.maximum, patch.maximum)
    }

    fn patch_for(key: &str, value: &SettingValue) -> Result<ParabolicSarPatch, IndicatorError> {
        let mut patch = ParabolicSarPatch::default();
        match key {
            "start" => patch.start = Some(value.as_number(key)?),
            "increment" => patch.increment = Some(value.as_number(key)?),
            "maximum" => patch.maximum = Some(value.as_number(key)?),
            _ => return Err(unknown_setting::<Self>(key)),
        }
        Ok(patch)
    }

    fn setting_value(&self, key: &str) -> Option<SettingValue> {
        match key {
            "start" => Some(self.start.into()),
            "increment" => Some(self.increment.into()),
            "maximum" => Some(self.maximum.into()),
            _ => None,
        }
    }

    fn settings(&self) -> Vec<SettingDescriptor> {
        vec![
            SettingDescriptor::number("start", "Start", 0.001, 1.0, 0.001),
            SettingDescriptor::number("increment", "Increment", 0.001, 1.0, 0.001),
            SettingDescriptor::number("maximum", "Maximum", 0.01, 1.0, 0.01),
        ]
    }

    fn default_color(&self) -> &'static str {
        "#26A69A"
    }
}
