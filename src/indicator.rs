// =============================================================================
// Indicator instance
// =============================================================================
//
// An `Indicator` couples one algorithm's parameters with its presentation
// style, the most recently computed output and the series that output was
// computed against.  Calculation is delegated to `IndicatorParams`; this
// module adds identity, style, derived ranges and legend text.
//
// Identity is a UUID v4 assigned at construction (or restored from persisted
// state) and never changes afterwards.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::IndicatorError;
use crate::indicators::{
    IndicatorParams, IndicatorTypeId, ParamsPatch, RangePolicy, SettingDescriptor, SettingValue,
};
use crate::types::{BarSeries, IndicatorDataPoint, IndicatorKind, LevelLine, ValueRange};

pub const DEFAULT_LINE_WIDTH: f64 = 2.0;
pub const DEFAULT_PANE_HEIGHT: f64 = 100.0;

// =============================================================================
// Options & style
// =============================================================================

/// Presentation settings shared by every algorithm.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub visible: bool,
    pub color: String,
    pub line_width: f64,
    /// Height hint for the auxiliary pane; always `None` for overlays.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pane_height: Option<f64>,
}

/// Partial style update.  Also the shape persisted style fields decode into.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePatch {
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub line_width: Option<f64>,
    #[serde(default)]
    pub pane_height: Option<f64>,
}

/// Typed option update accepted by [`Indicator::apply_patch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorPatch {
    pub style: StylePatch,
    pub params: Option<ParamsPatch>,
}

impl IndicatorPatch {
    pub fn style(style: StylePatch) -> Self {
        Self {
            style,
            params: None,
        }
    }

    pub fn params(params: ParamsPatch) -> Self {
        Self {
            style: StylePatch::default(),
            params: Some(params),
        }
    }
}

/// Identity and presentation of one indicator instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorOptions {
    pub id: String,
    pub name: String,
    pub kind: IndicatorKind,
    #[serde(flatten)]
    pub style: Style,
}

// =============================================================================
// Indicator
// =============================================================================

#[derive(Debug, Clone)]
pub struct Indicator {
    options: IndicatorOptions,
    params: IndicatorParams,
    data: Vec<IndicatorDataPoint>,
    /// Series `data` was last computed against.
    source: Option<BarSeries>,
}

impl Indicator {
    /// New instance with default style and a fresh id.
    pub fn new(params: IndicatorParams) -> Self {
        Self::with_style(params, StylePatch::default())
    }

    /// New instance with default parameters for `type_id`.
    pub fn from_type(type_id: IndicatorTypeId) -> Self {
        Self::new(IndicatorParams::defaults_for(type_id))
    }

    /// New instance whose default style is overridden by `style`.
    pub fn with_style(params: IndicatorParams, style: StylePatch) -> Self {
        Self::restore(Uuid::new_v4().to_string(), params, style)
    }

    /// Rebuild an instance under a previously issued id.
    pub(crate) fn restore(id: String, params: IndicatorParams, style: StylePatch) -> Self {
        let kind = params.kind();
        let mut base = Style {
            visible: true,
            color: params.default_color().to_string(),
            line_width: DEFAULT_LINE_WIDTH,
            pane_height: match kind {
                IndicatorKind::Panel => Some(DEFAULT_PANE_HEIGHT),
                IndicatorKind::Overlay => None,
            },
        };
        merge_style(&mut base, kind, style);

        Self {
            options: IndicatorOptions {
                id,
                name: params.display_name(),
                kind,
                style: base,
            },
            params,
            data: Vec::new(),
            source: None,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.options.id
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    pub fn kind(&self) -> IndicatorKind {
        self.options.kind
    }

    pub fn type_id(&self) -> IndicatorTypeId {
        self.params.type_id()
    }

    pub fn options(&self) -> &IndicatorOptions {
        &self.options
    }

    pub fn style(&self) -> &Style {
        &self.options.style
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    pub fn data(&self) -> &[IndicatorDataPoint] {
        &self.data
    }

    pub fn is_visible(&self) -> bool {
        self.options.style.visible
    }

    /// Series the current data was computed against, if any.
    pub fn bars(&self) -> Option<&BarSeries> {
        self.source.as_ref()
    }

    // ── Calculation ─────────────────────────────────────────────────────────

    /// Replace `data` with the output for `bars` and remember the series.
    pub fn calculate(&mut self, bars: &BarSeries) {
        self.data = self.params.calculate(bars);
        self.source = Some(BarSeries::clone(bars));
        debug!(
            id = %self.options.id,
            name = %self.options.name,
            bars = bars.len(),
            "indicator calculated"
        );
    }

    /// Recompute against the remembered series.  Returns `false` when there
    /// is nothing to compute against.
    pub fn recalculate(&mut self) -> bool {
        match self.source.take() {
            Some(bars) => {
                self.calculate(&bars);
                true
            }
            None => false,
        }
    }

    /// Release computed data and the remembered series.
    pub fn destroy(&mut self) {
        self.data = Vec::new();
        self.source = None;
    }

    // ── Option updates ──────────────────────────────────────────────────────

    /// Apply a typed partial update.  Returns whether `data` is now stale.
    ///
    /// The patch is all-or-nothing: a mismatched parameter patch leaves the
    /// style untouched as well.
    pub fn apply_patch(&mut self, patch: IndicatorPatch) -> Result<bool, IndicatorError> {
        let stale = match patch.params {
            Some(params) => self.params.apply(params)?,
            None => false,
        };
        merge_style(&mut self.options.style, self.options.kind, patch.style);
        if stale {
            self.options.name = self.params.display_name();
        }
        Ok(stale)
    }

    /// Apply one UI setting by key.  Style keys (`visible`, `color`,
    /// `lineWidth`, `paneHeight`) are handled here; everything else is routed
    /// to the algorithm.
    pub fn set_setting_value(
        &mut self,
        key: &str,
        value: &SettingValue,
    ) -> Result<bool, IndicatorError> {
        let mut style = StylePatch::default();
        match key {
            "visible" => style.visible = Some(value.as_bool(key)?),
            "color" => style.color = Some(value.as_text(key)?),
            "lineWidth" => style.line_width = Some(value.as_number(key)?),
            "paneHeight" if self.kind() == IndicatorKind::Panel => {
                style.pane_height = Some(value.as_number(key)?)
            }
            _ => {
                let stale = self.params.set_setting(key, value)?;
                if stale {
                    self.options.name = self.params.display_name();
                }
                return Ok(stale);
            }
        }
        merge_style(&mut self.options.style, self.options.kind, style);
        Ok(false)
    }

    pub fn setting_value(&self, key: &str) -> Option<SettingValue> {
        let style = &self.options.style;
        match key {
            "visible" => Some(style.visible.into()),
            "color" => Some(style.color.as_str().into()),
            "lineWidth" => Some(style.line_width.into()),
            "paneHeight" => style.pane_height.map(SettingValue::from),
            _ => self.params.setting_value(key),
        }
    }

    /// Settings rows for an options dialog: style first, then parameters.
    pub fn settings_config(&self) -> Vec<SettingDescriptor> {
        let mut rows = vec![
            SettingDescriptor::toggle("visible", "Visible"),
            SettingDescriptor::color("color", "Color"),
            SettingDescriptor::number("lineWidth", "Line width", 0.5, 10.0, 0.5),
        ];
        if self.kind() == IndicatorKind::Panel {
            rows.push(SettingDescriptor::number(
                "paneHeight",
                "Pane height",
                40.0,
                800.0,
                10.0,
            ));
        }
        rows.extend(self.params.settings());
        rows
    }

    // ── Render-facing reads ─────────────────────────────────────────────────

    /// Axis range for the current data.  `0..0` when nothing is finite.
    pub fn range(&self) -> ValueRange {
        match self.params.range_policy() {
            RangePolicy::Fixed { min, max } => ValueRange::fixed(min, max),
            RangePolicy::Primary => observed(self.data.iter().map(|p| p.value)),
            RangePolicy::AllSeries => observed(
                self.data
                    .iter()
                    .flat_map(|p| std::iter::once(p.value).chain(p.values.iter().copied())),
            ),
            RangePolicy::ZeroFloor => {
                let seen = observed(self.data.iter().map(|p| p.value));
                ValueRange {
                    min: 0.0,
                    max: seen.max.max(0.0),
                    fixed_min: Some(0.0),
                    fixed_max: None,
                }
            }
        }
    }

    /// Legend text for the point at `index` (last point when `None`, clamped
    /// when out of range), e.g. `RSI (14): 55.31`.
    pub fn description(&self, index: Option<usize>) -> String {
        let values = match self.data.len().checked_sub(1) {
            Some(last) => {
                let i = index.map_or(last, |i| i.min(last));
                self.params.legend_values(&self.data[i])
            }
            None => {
                let blank = IndicatorDataPoint::undefined(0, self.params.width());
                self.params.legend_values(&blank)
            }
        };
        let text: Vec<String> = values.iter().map(|v| format_value(*v)).collect();
        format!("{}: {}", self.options.name, text.join(" "))
    }

    pub fn level_lines(&self) -> Vec<LevelLine> {
        self.params.level_lines()
    }

    /// Histogram bar height at `index`, for algorithms that carry one.
    pub fn histogram_value(&self, index: usize) -> Option<f64> {
        let slot = self.params.histogram_slot()?;
        self.data.get(index)?.values.get(slot).copied()
    }

    /// Primary color followed by the secondary series colors.
    pub fn line_colors(&self) -> Vec<String> {
        let mut colors = vec![self.options.style.color.clone()];
        colors.extend(self.params.secondary_colors());
        colors
    }

    /// Style and parameters as one flat JSON object, the persisted `options`.
    pub fn options_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut merged = serde_json::to_value(&self.options.style)?;
        if let (Some(target), serde_json::Value::Object(params)) =
            (merged.as_object_mut(), serde_json::to_value(&self.params)?)
        {
            target.extend(params);
        }
        Ok(merged)
    }

    /// Rebuild an instance from persisted `options` for `type_id`.
    pub fn decode(
        id: String,
        type_id: IndicatorTypeId,
        options: &serde_json::Value,
    ) -> Result<Self, IndicatorError> {
        // a record saved without options restores with defaults
        let empty = serde_json::Value::Object(serde_json::Map::new());
        let options = if options.is_null() { &empty } else { options };
        let params = IndicatorParams::decode(type_id, options)?;
        let style = StylePatch::deserialize(options)?;
        Ok(Self::restore(id, params, style))
    }
}

fn merge_style(style: &mut Style, kind: IndicatorKind, patch: StylePatch) {
    if let Some(visible) = patch.visible {
        style.visible = visible;
    }
    if let Some(color) = patch.color {
        style.color = color;
    }
    if let Some(width) = patch.line_width {
        style.line_width = width;
    }
    if kind == IndicatorKind::Panel && patch.pane_height.is_some() {
        style.pane_height = patch.pane_height;
    }
}

fn observed(values: impl Iterator<Item = f64>) -> ValueRange {
    let bounds = values
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            None => Some((v, v)),
        });
    match bounds {
        Some((min, max)) => ValueRange::observed(min, max),
        None => ValueRange::observed(0.0, 0.0),
    }
}

fn format_value(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.2}")
    } else {
        "-".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::testing::{flat_bars, wavy_bars};
    use crate::indicators::{MacdPatch, PeriodPatch, RsiPatch};

    fn series(bars: Vec<crate::types::Bar>) -> BarSeries {
        BarSeries::from(bars)
    }

    // ---- identity & defaults ----

    #[test]
    fn ids_are_unique_uuids() {
        let a = Indicator::from_type(IndicatorTypeId::Sma);
        let b = Indicator::from_type(IndicatorTypeId::Sma);
        assert_ne!(a.id(), b.id());
        assert!(Uuid::parse_str(a.id()).is_ok());
    }

    #[test]
    fn pane_height_only_for_panels() {
        let overlay = Indicator::from_type(IndicatorTypeId::Ema);
        let panel = Indicator::from_type(IndicatorTypeId::Rsi);
        assert_eq!(overlay.style().pane_height, None);
        assert_eq!(panel.style().pane_height, Some(DEFAULT_PANE_HEIGHT));

        let overlay = Indicator::with_style(
            IndicatorParams::defaults_for(IndicatorTypeId::Ema),
            StylePatch {
                pane_height: Some(300.0),
                ..StylePatch::default()
            },
        );
        assert_eq!(overlay.style().pane_height, None);
    }

    #[test]
    fn user_style_overrides_defaults() {
        let ind = Indicator::with_style(
            IndicatorParams::defaults_for(IndicatorTypeId::Sma),
            StylePatch {
                color: Some("#123456".into()),
                ..StylePatch::default()
            },
        );
        assert_eq!(ind.style().color, "#123456");
        assert_eq!(ind.style().line_width, DEFAULT_LINE_WIDTH);
        assert!(ind.is_visible());
        assert_eq!(ind.name(), "SMA (20)");
    }

    // ---- calculation ----

    #[test]
    fn calculate_caches_series_and_recalculates() {
        let mut ind = Indicator::from_type(IndicatorTypeId::Sma);
        assert!(!ind.recalculate());
        let bars = series(wavy_bars(50));
        ind.calculate(&bars);
        assert_eq!(ind.data().len(), 50);
        assert!(ind.recalculate());
        assert_eq!(ind.data().len(), 50);
    }

    #[test]
    fn destroy_is_idempotent() {
        let mut ind = Indicator::from_type(IndicatorTypeId::Macd);
        ind.calculate(&series(wavy_bars(40)));
        ind.destroy();
        ind.destroy();
        assert!(ind.data().is_empty());
        assert!(ind.bars().is_none());
        assert!(!ind.recalculate());
    }

    // ---- patches ----

    #[test]
    fn cosmetic_patch_does_not_need_recalc() {
        let mut ind = Indicator::from_type(IndicatorTypeId::Rsi);
        let stale = ind
            .apply_patch(IndicatorPatch {
                style: StylePatch {
                    visible: Some(false),
                    line_width: Some(3.0),
                    ..StylePatch::default()
                },
                params: Some(ParamsPatch::Rsi(RsiPatch {
                    overbought: Some(75.0),
                    ..RsiPatch::default()
                })),
            })
            .unwrap();
        assert!(!stale);
        assert!(!ind.is_visible());
        assert_eq!(ind.style().line_width, 3.0);
        assert_eq!(ind.level_lines()[0].value, 75.0);
    }

    #[test]
    fn period_patch_renames() {
        let mut ind = Indicator::from_type(IndicatorTypeId::Ema);
        let stale = ind
            .apply_patch(IndicatorPatch::params(ParamsPatch::Ema(PeriodPatch {
                period: Some(50),
                source: None,
            })))
            .unwrap();
        assert!(stale);
        assert_eq!(ind.name(), "EMA (50)");
    }

    #[test]
    fn mismatched_patch_leaves_style_alone() {
        let mut ind = Indicator::from_type(IndicatorTypeId::Sma);
        let err = ind.apply_patch(IndicatorPatch {
            style: StylePatch {
                color: Some("#000000".into()),
                ..StylePatch::default()
            },
            params: Some(ParamsPatch::Macd(MacdPatch::default())),
        });
        assert!(matches!(err, Err(IndicatorError::PatchMismatch { .. })));
        assert_ne!(ind.style().color, "#000000");
    }

    #[test]
    fn string_settings_route_to_style_or_params() {
        let mut ind = Indicator::from_type(IndicatorTypeId::BollingerBands);
        assert!(!ind
            .set_setting_value("color", &SettingValue::from("#abcdef"))
            .unwrap());
        assert!(ind
            .set_setting_value("stdDev", &SettingValue::from(3.0))
            .unwrap());
        assert_eq!(ind.name(), "BB (20, 3)");
        assert_eq!(ind.setting_value("color"), Some(SettingValue::from("#abcdef")));
        assert_eq!(ind.setting_value("stdDev"), Some(SettingValue::from(3.0)));

        assert!(matches!(
            ind.set_setting_value("paneHeight", &SettingValue::from(120.0)),
            Err(IndicatorError::UnknownSetting { .. })
        ));
        assert!(matches!(
            ind.set_setting_value("visible", &SettingValue::from(1.0)),
            Err(IndicatorError::InvalidSettingValue { .. })
        ));
    }

    #[test]
    fn settings_config_lists_style_then_params() {
        let ind = Indicator::from_type(IndicatorTypeId::Rsi);
        let keys: Vec<&str> = ind.settings_config().iter().map(|d| d.key).collect();
        assert_eq!(&keys[..4], &["visible", "color", "lineWidth", "paneHeight"]);
        assert!(keys.contains(&"period"));
        assert!(keys.contains(&"overbought"));
    }

    // ---- render reads ----

    #[test]
    fn range_policies() {
        let bars = series(wavy_bars(80));

        let mut empty = Indicator::from_type(IndicatorTypeId::Sma);
        empty.calculate(&series(wavy_bars(5)));
        let r = empty.range();
        assert_eq!((r.min, r.max), (0.0, 0.0));

        let mut rsi = Indicator::from_type(IndicatorTypeId::Rsi);
        rsi.calculate(&bars);
        assert_eq!(rsi.range(), ValueRange::fixed(0.0, 100.0));

        let mut bb = Indicator::from_type(IndicatorTypeId::BollingerBands);
        bb.calculate(&bars);
        let r = bb.range();
        let upper_max = bb
            .data()
            .iter()
            .filter_map(|p| p.values.get(1).copied())
            .filter(|v| v.is_finite())
            .fold(f64::MIN, f64::max);
        assert_eq!(r.max, upper_max);

        let mut vol = Indicator::from_type(IndicatorTypeId::Volume);
        vol.calculate(&bars);
        let r = vol.range();
        assert_eq!(r.min, 0.0);
        assert_eq!(r.fixed_min, Some(0.0));
        assert!(r.max >= 1_000.0);
    }

    #[test]
    fn description_formats_and_clamps() {
        let mut sma = Indicator::from_type(IndicatorTypeId::Sma);
        assert_eq!(sma.description(None), "SMA (20): -");

        sma.calculate(&series(flat_bars(&[42.5; 25])));
        assert_eq!(sma.description(None), "SMA (20): 42.50");
        assert_eq!(sma.description(Some(0)), "SMA (20): -");
        assert_eq!(sma.description(Some(10_000)), "SMA (20): 42.50");

        let macd = Indicator::from_type(IndicatorTypeId::Macd);
        assert_eq!(macd.description(None), "MACD (12, 26, 9): - - -");
    }

    #[test]
    fn macd_histogram_and_colors() {
        let mut macd = Indicator::from_type(IndicatorTypeId::Macd);
        assert_eq!(macd.histogram_value(0), None);
        macd.calculate(&series(wavy_bars(60)));
        let p = &macd.data()[59];
        assert_eq!(macd.histogram_value(59), Some(p.values[2]));
        assert_eq!(macd.histogram_value(60), None);
        assert_eq!(macd.line_colors().len(), 4);

        let sma = Indicator::from_type(IndicatorTypeId::Sma);
        assert_eq!(sma.histogram_value(0), None);
        assert_eq!(sma.line_colors(), vec![sma.style().color.clone()]);
    }

    // ---- persisted options ----

    #[test]
    fn options_value_merges_style_and_params() {
        let ind = Indicator::from_type(IndicatorTypeId::Stochastic);
        let v = ind.options_value().unwrap();
        assert_eq!(v["visible"], true);
        assert_eq!(v["lineWidth"], DEFAULT_LINE_WIDTH);
        assert_eq!(v["paneHeight"], DEFAULT_PANE_HEIGHT);
        assert_eq!(v["kPeriod"], 14);
        assert_eq!(v["dPeriod"], 3);
        assert!(v.get("id").is_none());

        let overlay = Indicator::from_type(IndicatorTypeId::Sma);
        assert!(overlay.options_value().unwrap().get("paneHeight").is_none());
    }

    #[test]
    fn decode_restores_id_and_options() {
        let mut original = Indicator::from_type(IndicatorTypeId::Hma);
        original
            .set_setting_value("period", &SettingValue::from(16usize))
            .unwrap();
        original
            .set_setting_value("visible", &SettingValue::from(false))
            .unwrap();
        let options = original.options_value().unwrap();

        let restored =
            Indicator::decode(original.id().to_string(), IndicatorTypeId::Hma, &options).unwrap();
        assert_eq!(restored.options(), original.options());
        assert_eq!(restored.params(), original.params());
    }

    #[test]
    fn decode_without_options_uses_defaults() {
        let restored =
            Indicator::decode("rsi-1".into(), IndicatorTypeId::Rsi, &serde_json::Value::Null)
                .unwrap();
        assert_eq!(restored.id(), "rsi-1");
        assert_eq!(restored.params(), Indicator::from_type(IndicatorTypeId::Rsi).params());
        assert!(restored.is_visible());
    }

    #[test]
    fn decode_rejects_wrong_shapes() {
        let options = serde_json::json!({ "period": "fast" });
        let err = Indicator::decode("x".into(), IndicatorTypeId::Sma, &options);
        assert!(matches!(err, Err(IndicatorError::Decode(_))));
    }
}
