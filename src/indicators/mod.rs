// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free calculation algorithms.  Each algorithm is a typed
// parameter struct implementing `Algorithm`; `IndicatorParams` is the closed
// set of them and is what the manager and the persistence layer dispatch on.
//
// Every algorithm returns exactly one data point per input bar.  When fewer
// bars than the algorithm's minimum history are supplied, the whole output is
// NaN-filled.

pub mod bollinger;
pub mod ema;
pub mod hma;
pub mod kernels;
pub mod macd;
pub mod parabolic_sar;
pub mod rsi;
pub mod settings;
pub mod sma;
pub mod stoch_rsi;
pub mod stochastic;
pub mod volume;

use serde::{Deserialize, Serialize};

use crate::error::IndicatorError;
use crate::types::{Bar, IndicatorDataPoint, IndicatorKind, LevelLine, PriceSource};

pub use bollinger::{BollingerParams, BollingerPatch};
pub use ema::EmaParams;
pub use hma::HmaParams;
pub use macd::{MacdParams, MacdPatch};
pub use parabolic_sar::{ParabolicSarParams, ParabolicSarPatch};
pub use rsi::{RsiParams, RsiPatch};
pub use settings::{SettingControl, SettingDescriptor, SettingValue};
pub use sma::SmaParams;
pub use stoch_rsi::{StochRsiParams, StochRsiPatch};
pub use stochastic::{StochasticParams, StochasticPatch};
pub use volume::{VolumeParams, VolumePatch};

// =============================================================================
// Type tags
// =============================================================================

/// Closed, persisted tag naming the algorithm that produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorTypeId {
    #[serde(rename = "SMA")]
    Sma,
    #[serde(rename = "EMA")]
    Ema,
    #[serde(rename = "HMA")]
    Hma,
    #[serde(rename = "RSI")]
    Rsi,
    BollingerBands,
    #[serde(rename = "MACD")]
    Macd,
    Stochastic,
    #[serde(rename = "StochRSI")]
    StochRsi,
    #[serde(rename = "ParabolicSAR")]
    ParabolicSar,
    Volume,
}

impl IndicatorTypeId {
    pub const ALL: [IndicatorTypeId; 10] = [
        Self::Sma,
        Self::Ema,
        Self::Hma,
        Self::Rsi,
        Self::BollingerBands,
        Self::Macd,
        Self::Stochastic,
        Self::StochRsi,
        Self::ParabolicSar,
        Self::Volume,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sma => "SMA",
            Self::Ema => "EMA",
            Self::Hma => "HMA",
            Self::Rsi => "RSI",
            Self::BollingerBands => "BollingerBands",
            Self::Macd => "MACD",
            Self::Stochastic => "Stochastic",
            Self::StochRsi => "StochRSI",
            Self::ParabolicSar => "ParabolicSAR",
            Self::Volume => "Volume",
        }
    }
}

impl std::fmt::Display for IndicatorTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IndicatorTypeId {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| IndicatorError::UnknownType(s.to_string()))
    }
}

// =============================================================================
// Algorithm contract
// =============================================================================

/// How an indicator's vertical axis range is derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangePolicy {
    /// Observed min/max of the primary value.
    Primary,
    /// Observed min/max over the primary value and every secondary series.
    AllSeries,
    /// Constant bounds regardless of data.
    Fixed { min: f64, max: f64 },
    /// Lower bound pinned at zero, upper bound observed.
    ZeroFloor,
}

/// One calculation algorithm and its typed parameters.
pub trait Algorithm {
    /// Partial update accepted by [`Algorithm::apply`].
    type Patch;

    const TYPE_ID: IndicatorTypeId;
    const KIND: IndicatorKind;
    /// Number of secondary series carried in `IndicatorDataPoint::values`.
    const WIDTH: usize = 0;

    /// Display name embedding the parameters, e.g. `EMA (20)`.
    fn display_name(&self) -> String;

    /// Bars required before the output can hold any defined value.
    fn min_history(&self) -> usize;

    /// Compute one point per bar.  Only called when `bars.len()` satisfies
    /// [`Algorithm::min_history`].
    fn compute(&self, bars: &[Bar]) -> Vec<IndicatorDataPoint>;

    /// Apply a patch; returns `true` when previously computed data is stale.
    fn apply(&mut self, patch: Self::Patch) -> bool;

    /// Translate a UI setting into this algorithm's patch.
    fn patch_for(key: &str, value: &SettingValue) -> Result<Self::Patch, IndicatorError>;

    fn setting_value(&self, key: &str) -> Option<SettingValue>;

    fn settings(&self) -> Vec<SettingDescriptor>;

    fn default_color(&self) -> &'static str;

    fn range_policy(&self) -> RangePolicy {
        RangePolicy::Primary
    }

    fn level_lines(&self) -> Vec<LevelLine> {
        Vec::new()
    }

    /// Colors of the secondary series, in `values` order.
    fn secondary_colors(&self) -> Vec<String> {
        Vec::new()
    }

    /// Position of the histogram series inside `values`, if any.
    fn histogram_slot(&self) -> Option<usize> {
        None
    }

    /// Numbers shown in the legend for one point.
    fn legend_values(&self, point: &IndicatorDataPoint) -> Vec<f64> {
        vec![point.value]
    }
}

/// Error for a key the algorithm does not expose.
pub(crate) fn unknown_setting<A: Algorithm>(key: &str) -> IndicatorError {
    IndicatorError::UnknownSetting {
        type_id: A::TYPE_ID,
        key: key.to_string(),
    }
}

/// Run an algorithm, enforcing the length and insufficient-history contract.
fn run<A: Algorithm>(alg: &A, bars: &[Bar]) -> Vec<IndicatorDataPoint> {
    if bars.len() < alg.min_history() {
        return bars
            .iter()
            .map(|b| IndicatorDataPoint::undefined(b.time, A::WIDTH))
            .collect();
    }
    let out = alg.compute(bars);
    debug_assert_eq!(out.len(), bars.len());
    out
}

fn apply_setting<A: Algorithm>(
    alg: &mut A,
    key: &str,
    value: &SettingValue,
) -> Result<bool, IndicatorError> {
    let patch = A::patch_for(key, value)?;
    Ok(alg.apply(patch))
}

fn type_id_of<A: Algorithm>(_: &A) -> IndicatorTypeId {
    A::TYPE_ID
}

fn kind_of<A: Algorithm>(_: &A) -> IndicatorKind {
    A::KIND
}

fn width_of<A: Algorithm>(_: &A) -> usize {
    A::WIDTH
}

// =============================================================================
// Shared period/source parameters
// =============================================================================

/// Patch for the single-period moving averages (SMA, EMA, HMA).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodPatch {
    pub period: Option<usize>,
    pub source: Option<PriceSource>,
}

impl PeriodPatch {
    pub(crate) fn from_setting<A: Algorithm>(
        key: &str,
        value: &SettingValue,
    ) -> Result<Self, IndicatorError> {
        match key {
            "period" => Ok(Self {
                period: Some(value.as_period(key)?),
                ..Self::default()
            }),
            "source" => Ok(Self {
                source: Some(value.as_source(key)?),
                ..Self::default()
            }),
            _ => Err(unknown_setting::<A>(key)),
        }
    }
}

// =============================================================================
// Closed parameter set
// =============================================================================

/// Parameters of every supported algorithm, tagged by algorithm.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IndicatorParams {
    Sma(SmaParams),
    Ema(EmaParams),
    Hma(HmaParams),
    Rsi(RsiParams),
    BollingerBands(BollingerParams),
    Macd(MacdParams),
    Stochastic(StochasticParams),
    StochRsi(StochRsiParams),
    ParabolicSar(ParabolicSarParams),
    Volume(VolumeParams),
}

/// Typed partial update for one algorithm's parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamsPatch {
    Sma(PeriodPatch),
    Ema(PeriodPatch),
    Hma(PeriodPatch),
    Rsi(RsiPatch),
    BollingerBands(BollingerPatch),
    Macd(MacdPatch),
    Stochastic(StochasticPatch),
    StochRsi(StochRsiPatch),
    ParabolicSar(ParabolicSarPatch),
    Volume(VolumePatch),
}

macro_rules! dispatch {
    ($params:expr, $alg:ident => $body:expr) => {
        match $params {
            IndicatorParams::Sma($alg) => $body,
            IndicatorParams::Ema($alg) => $body,
            IndicatorParams::Hma($alg) => $body,
            IndicatorParams::Rsi($alg) => $body,
            IndicatorParams::BollingerBands($alg) => $body,
            IndicatorParams::Macd($alg) => $body,
            IndicatorParams::Stochastic($alg) => $body,
            IndicatorParams::StochRsi($alg) => $body,
            IndicatorParams::ParabolicSar($alg) => $body,
            IndicatorParams::Volume($alg) => $body,
        }
    };
}

impl IndicatorParams {
    /// Default parameters for a type tag.
    pub fn defaults_for(type_id: IndicatorTypeId) -> Self {
        match type_id {
            IndicatorTypeId::Sma => Self::Sma(SmaParams::default()),
            IndicatorTypeId::Ema => Self::Ema(EmaParams::default()),
            IndicatorTypeId::Hma => Self::Hma(HmaParams::default()),
            IndicatorTypeId::Rsi => Self::Rsi(RsiParams::default()),
            IndicatorTypeId::BollingerBands => Self::BollingerBands(BollingerParams::default()),
            IndicatorTypeId::Macd => Self::Macd(MacdParams::default()),
            IndicatorTypeId::Stochastic => Self::Stochastic(StochasticParams::default()),
            IndicatorTypeId::StochRsi => Self::StochRsi(StochRsiParams::default()),
            IndicatorTypeId::ParabolicSar => Self::ParabolicSar(ParabolicSarParams::default()),
            IndicatorTypeId::Volume => Self::Volume(VolumeParams::default()),
        }
    }

    /// Decode persisted options for `type_id`.  Missing fields fall back to
    /// defaults; fields belonging to other concerns (color, visibility) are
    /// ignored.
    pub fn decode(
        type_id: IndicatorTypeId,
        options: &serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match type_id {
            IndicatorTypeId::Sma => Self::Sma(SmaParams::deserialize(options)?),
            IndicatorTypeId::Ema => Self::Ema(EmaParams::deserialize(options)?),
            IndicatorTypeId::Hma => Self::Hma(HmaParams::deserialize(options)?),
            IndicatorTypeId::Rsi => Self::Rsi(RsiParams::deserialize(options)?),
            IndicatorTypeId::BollingerBands => {
                Self::BollingerBands(BollingerParams::deserialize(options)?)
            }
            IndicatorTypeId::Macd => Self::Macd(MacdParams::deserialize(options)?),
            IndicatorTypeId::Stochastic => {
                Self::Stochastic(StochasticParams::deserialize(options)?)
            }
            IndicatorTypeId::StochRsi => Self::StochRsi(StochRsiParams::deserialize(options)?),
            IndicatorTypeId::ParabolicSar => {
                Self::ParabolicSar(ParabolicSarParams::deserialize(options)?)
            }
            IndicatorTypeId::Volume => Self::Volume(VolumeParams::deserialize(options)?),
        })
    }

    pub fn type_id(&self) -> IndicatorTypeId {
        dispatch!(self, alg => type_id_of(alg))
    }

    pub fn kind(&self) -> IndicatorKind {
        dispatch!(self, alg => kind_of(alg))
    }

    pub fn display_name(&self) -> String {
        dispatch!(self, alg => alg.display_name())
    }

    pub fn min_history(&self) -> usize {
        dispatch!(self, alg => alg.min_history())
    }

    /// Compute the full output series for `bars`.
    pub fn calculate(&self, bars: &[Bar]) -> Vec<IndicatorDataPoint> {
        dispatch!(self, alg => run(alg, bars))
    }

    /// Apply a typed patch.  Returns whether computed data is now stale.
    pub fn apply(&mut self, patch: ParamsPatch) -> Result<bool, IndicatorError> {
        let expected = self.type_id();
        let stale = match (self, patch) {
            (Self::Sma(p), ParamsPatch::Sma(patch)) => p.apply(patch),
            (Self::Ema(p), ParamsPatch::Ema(patch)) => p.apply(patch),
            (Self::Hma(p), ParamsPatch::Hma(patch)) => p.apply(patch),
            (Self::Rsi(p), ParamsPatch::Rsi(patch)) => p.apply(patch),
            (Self::BollingerBands(p), ParamsPatch::BollingerBands(patch)) => p.apply(patch),
            (Self::Macd(p), ParamsPatch::Macd(patch)) => p.apply(patch),
            (Self::Stochastic(p), ParamsPatch::Stochastic(patch)) => p.apply(patch),
            (Self::StochRsi(p), ParamsPatch::StochRsi(patch)) => p.apply(patch),
            (Self::ParabolicSar(p), ParamsPatch::ParabolicSar(patch)) => p.apply(patch),
            (Self::Volume(p), ParamsPatch::Volume(patch)) => p.apply(patch),
            _ => return Err(IndicatorError::PatchMismatch { expected }),
        };
        Ok(stale)
    }

    /// Apply a UI setting by key.  Returns whether computed data is now stale.
    pub fn set_setting(&mut self, key: &str, value: &SettingValue) -> Result<bool, IndicatorError> {
        dispatch!(self, alg => apply_setting(alg, key, value))
    }

    pub fn setting_value(&self, key: &str) -> Option<SettingValue> {
        dispatch!(self, alg => alg.setting_value(key))
    }

    pub fn settings(&self) -> Vec<SettingDescriptor> {
        dispatch!(self, alg => alg.settings())
    }

    pub fn default_color(&self) -> &'static str {
        dispatch!(self, alg => alg.default_color())
    }

    pub fn range_policy(&self) -> RangePolicy {
        dispatch!(self, alg => alg.range_policy())
    }

    pub fn level_lines(&self) -> Vec<LevelLine> {
        dispatch!(self, alg => alg.level_lines())
    }

    pub fn secondary_colors(&self) -> Vec<String> {
        dispatch!(self, alg => alg.secondary_colors())
    }

    pub fn histogram_slot(&self) -> Option<usize> {
        dispatch!(self, alg => alg.histogram_slot())
    }

    pub fn legend_values(&self, point: &IndicatorDataPoint) -> Vec<f64> {
        dispatch!(self, alg => alg.legend_values(point))
    }

    /// Number of secondary series per data point.
    pub fn width(&self) -> usize {
        dispatch!(self, alg => width_of(alg))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::wavy_bars;
    use super::*;

    #[test]
    fn type_id_round_trips_through_str() {
        for t in IndicatorTypeId::ALL {
            assert_eq!(t.as_str().parse::<IndicatorTypeId>().unwrap(), t);
        }
        assert!("ADX".parse::<IndicatorTypeId>().is_err());
    }

    #[test]
    fn type_id_serialises_to_persisted_tag() {
        let json = serde_json::to_string(&IndicatorTypeId::StochRsi).unwrap();
        assert_eq!(json, "\"StochRSI\"");
        let json = serde_json::to_string(&IndicatorTypeId::BollingerBands).unwrap();
        assert_eq!(json, "\"BollingerBands\"");
    }

    #[test]
    fn every_algorithm_preserves_length() {
        for n in [0usize, 1, 2, 5, 40, 120] {
            let bars = wavy_bars(n);
            for t in IndicatorTypeId::ALL {
                let out = IndicatorParams::defaults_for(t).calculate(&bars);
                assert_eq!(out.len(), n, "{t} with {n} bars");
                for (p, b) in out.iter().zip(&bars) {
                    assert_eq!(p.time, b.time);
                }
            }
        }
    }

    #[test]
    fn short_input_is_entirely_undefined() {
        for t in IndicatorTypeId::ALL {
            let params = IndicatorParams::defaults_for(t);
            let need = params.min_history();
            if need == 0 {
                continue;
            }
            let out = params.calculate(&wavy_bars(need - 1));
            for p in &out {
                assert!(p.value.is_nan(), "{t} produced {} on short input", p.value);
                assert!(p.values.iter().all(|v| v.is_nan()));
            }
        }
    }

    #[test]
    fn kinds_are_fixed_per_type() {
        use IndicatorKind::*;
        let expect = [
            (IndicatorTypeId::Sma, Overlay),
            (IndicatorTypeId::Ema, Overlay),
            (IndicatorTypeId::Hma, Overlay),
            (IndicatorTypeId::BollingerBands, Overlay),
            (IndicatorTypeId::ParabolicSar, Overlay),
            (IndicatorTypeId::Rsi, Panel),
            (IndicatorTypeId::Macd, Panel),
            (IndicatorTypeId::Stochastic, Panel),
            (IndicatorTypeId::StochRsi, Panel),
            (IndicatorTypeId::Volume, Panel),
        ];
        for (t, kind) in expect {
            assert_eq!(IndicatorParams::defaults_for(t).kind(), kind, "{t}");
        }
    }

    #[test]
    fn mismatched_patch_is_rejected() {
        let mut params = IndicatorParams::defaults_for(IndicatorTypeId::Rsi);
        let err = params
            .apply(ParamsPatch::Sma(PeriodPatch {
                period: Some(5),
                source: None,
            }))
            .unwrap_err();
        assert!(matches!(
            err,
            IndicatorError::PatchMismatch {
                expected: IndicatorTypeId::Rsi
            }
        ));
    }

    #[test]
    fn decode_fills_missing_fields_with_defaults() {
        let options = serde_json::json!({ "period": 7, "color": "#fff" });
        let params = IndicatorParams::decode(IndicatorTypeId::Rsi, &options).unwrap();
        match params {
            IndicatorParams::Rsi(p) => {
                assert_eq!(p.period, 7);
                assert_eq!(p.overbought, 70.0);
            }
            other => panic!("unexpected params: {other:?}"),
        }
    }
}
