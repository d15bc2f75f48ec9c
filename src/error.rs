//! Indicator error types.

use thiserror::Error;

use crate::indicators::IndicatorTypeId;
use crate::types::IndicatorKind;

/// Errors surfaced by indicator option updates and manager bookkeeping.
///
/// Calculation itself never fails: insufficient history and degenerate
/// options resolve to NaN or documented fallback values instead.
#[derive(Debug, Error)]
pub enum IndicatorError {
    /// Persisted record names an algorithm this build does not know.
    #[error("unknown indicator type: {0}")]
    UnknownType(String),

    /// Indicator handed to the wrong collection.
    #[error("indicator {id} is {actual}, expected {expected}")]
    KindMismatch {
        id: String,
        expected: IndicatorKind,
        actual: IndicatorKind,
    },

    #[error("duplicate indicator id: {0}")]
    DuplicateId(String),

    #[error("indicator not found: {0}")]
    NotFound(String),

    /// Parameter patch built for a different algorithm.
    #[error("patch does not apply to {expected}")]
    PatchMismatch { expected: IndicatorTypeId },

    #[error("{type_id} has no setting named {key}")]
    UnknownSetting {
        type_id: IndicatorTypeId,
        key: String,
    },

    #[error("invalid value for setting {key}: {reason}")]
    InvalidSettingValue { key: String, reason: String },

    /// Persisted options could not be decoded for the named type.
    #[error("failed to decode options: {0}")]
    Decode(#[from] serde_json::Error),
}

impl IndicatorError {
    pub fn invalid_value(key: &str, reason: impl Into<String>) -> Self {
        IndicatorError::InvalidSettingValue {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
