//! Technical-analysis indicators for charting: calculation algorithms, the
//! per-chart indicator manager and layout persistence.

pub mod error;
pub mod indicator;
pub mod indicators;
pub mod manager;
pub mod persistence;
pub mod runtime_config;
pub mod types;

pub use error::IndicatorError;
pub use indicator::{Indicator, IndicatorOptions, IndicatorPatch, Style, StylePatch};
pub use indicators::{IndicatorParams, IndicatorTypeId, ParamsPatch, SettingValue};
pub use manager::{IndicatorManager, ManagerEvent};
pub use persistence::{
    FileStorage, IndicatorRecord, IndicatorStore, IndicatorsPayload, MemoryStorage, StorageAdapter,
};
pub use runtime_config::RuntimeConfig;
pub use types::{Bar, BarSeries, IndicatorDataPoint, IndicatorKind, PriceSource, ValueRange};
