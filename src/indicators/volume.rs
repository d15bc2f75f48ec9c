// =============================================================================
// Volume
// =============================================================================
//
// Pass-through of bar volume.  `values[0]` encodes bar direction for the
// renderer: +1 when close >= open, -1 otherwise.  There is no warm-up region.

use serde::{Deserialize, Serialize};

use super::settings::{assign, SettingDescriptor, SettingValue};
use super::{unknown_setting, Algorithm, IndicatorTypeId, RangePolicy};
use crate::error::IndicatorError;
use crate::types::{Bar, IndicatorDataPoint, IndicatorKind};

fn default_up_color() -> String {
    "#26A69A".to_string()
}

fn default_down_color() -> String {
    "#EF5350".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeParams {
    #[serde(default = "default_up_color")]
    pub up_color: String,
    #[serde(default = "default_down_color")]
    pub down_color: String,
}

impl Default for VolumeParams {
    fn default() -> Self {
        Self {
            up_color: default_up_color(),
            down_color: default_down_color(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumePatch {
    pub up_color: Option<String>,
    pub down_color: Option<String>,
}

impl Algorithm for VolumeParams {
    type Patch = VolumePatch;

    const TYPE_ID: IndicatorTypeId = IndicatorTypeId::Volume;
    const KIND: IndicatorKind = IndicatorKind::Panel;
    const WIDTH: usize = 1;

    fn display_name(&self) -> String {
        "Volume".to_string()
    }

    fn min_history(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<IndicatorDataPoint> {
        bars.iter()
            .map(|b| {
                let direction = if b.close >= b.open { 1.0 } else { -1.0 };
                IndicatorDataPoint::with_values(b.time, b.volume, vec![direction])
            })
            .collect()
    }

    fn apply(&mut self, patch: VolumePatch) -> bool {
        // Colors only: the data never goes stale.
        assign(&mut self.up_color, patch.up_color);
        assign(&mut self.down_color, patch.down_color);
        false
    }

    fn patch_for(key: &str, value: &SettingValue) -> Result<VolumePatch, IndicatorError> {
        let mut patch = VolumePatch::default();
        match key {
            "upColor" => patch.up_color = Some(value.as_text(key)?),
            "downColor" => patch.down_color = Some(value.as_text(key)?),
            _ => return Err(unknown_setting::<Self>(key)),
        }
        Ok(patch)
    }

    fn setting_value(&self, key: &str) -> Option<SettingValue> {
        match key {
            "upColor" => Some(self.up_color.as_str().into()),
            "downColor" => Some(self.down_color.as_str().into()),
            _ => None,
        }
    }

    fn settings(&self) -> Vec<SettingDescriptor> {
        vec![
            SettingDescriptor::color("upColor", "Up"),
            SettingDescriptor::color("downColor", "Down"),
        ]
    }

    fn default_color(&self) -> &'static str {
        "#26A69A"
    }

    fn range_policy(&self) -> RangePolicy {
        RangePolicy::ZeroFloor
    }

    fn secondary_colors(&self) -> Vec<String> {
        vec![self.up_color.clone(), self.down_color.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_volume_through_with_direction() {
        let bars = vec![
            Bar {
                time: 1,
                open: 10.0,
                high: 12.0,
                low: 9.0,
                close: 11.0,
                volume: 500.0,
            },
            Bar {
                time: 2,
                open: 11.0,
                high: 11.5,
                low: 9.5,
                close: 10.0,
                volume: 750.0,
            },
            Bar {
                time: 3,
                open: 10.0,
                high: 10.0,
                low: 10.0,
                close: 10.0,
                volume: 0.0,
            },
        ];
        let out = VolumeParams::default().compute(&bars);
        assert_eq!(out[0].value, 500.0);
        assert_eq!(out[0].values, vec![1.0]);
        assert_eq!(out[1].values, vec![-1.0]);
        // close == open counts as up
        assert_eq!(out[2].values, vec![1.0]);
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(VolumeParams::default().compute(&[]).is_empty());
    }

    #[test]
    fn color_changes_never_recalc() {
        let mut params = VolumeParams::default();
        assert!(!params.apply(VolumePatch {
            up_color: Some("#00ff00".into()),
            down_color: None,
        }));
        assert_eq!(params.up_color, "#00ff00");
    }
}
