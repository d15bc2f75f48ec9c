// =============================================================================
// Indicator Manager
// =============================================================================
//
// Owns every indicator attached to one chart: overlays and panels in two
// insertion-ordered collections, the shared bar series they compute against,
// and an optional listener notified of structural and data changes.
//
// Invariants:
//   - an instance's kind always matches the collection holding it
//   - ids are unique across both collections
//   - with a cached series, every held instance has data for that series
//
// Notifications are delivered synchronously.  The listener only sees the
// event, never the manager, so it cannot mutate the manager mid-dispatch.
// =============================================================================

use tracing::{debug, info, warn};

use crate::error::IndicatorError;
use crate::indicator::{Indicator, IndicatorPatch};
use crate::indicators::{IndicatorTypeId, SettingValue};
use crate::persistence::{IndicatorRecord, IndicatorsPayload, PAYLOAD_VERSION};
use crate::types::{BarSeries, IndicatorKind};

/// Change notification delivered to the manager's listener.
#[derive(Debug, Clone, PartialEq)]
pub enum ManagerEvent {
    Added { id: String, kind: IndicatorKind },
    Removed { id: String, kind: IndicatorKind },
    /// A panel indicator gained its own pane.
    PaneAdded { id: String },
    PaneRemoved { id: String },
    /// Options changed; `recalculated` is set when data was recomputed.
    Changed { id: String, recalculated: bool },
    /// A new bar series was installed and every indicator recomputed.
    DataUpdated { bars: usize },
}

pub type Listener = Box<dyn FnMut(&ManagerEvent)>;

#[derive(Default)]
pub struct IndicatorManager {
    overlays: Vec<Indicator>,
    panels: Vec<Indicator>,
    bars: Option<BarSeries>,
    listener: Option<Listener>,
}

impl std::fmt::Debug for IndicatorManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndicatorManager")
            .field("overlays", &self.overlays.len())
            .field("panels", &self.panels.len())
            .field("bars", &self.bars.as_ref().map(|b| b.len()))
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl IndicatorManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Listener ────────────────────────────────────────────────────────────

    pub fn set_listener(&mut self, listener: impl FnMut(&ManagerEvent) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    fn emit(&mut self, event: ManagerEvent) {
        if let Some(listener) = self.listener.as_mut() {
            listener(&event);
        }
    }

    // ── Membership ──────────────────────────────────────────────────────────

    pub fn add_overlay_indicator(&mut self, indicator: Indicator) -> Result<String, IndicatorError> {
        self.insert(indicator, IndicatorKind::Overlay)
    }

    pub fn add_panel_indicator(&mut self, indicator: Indicator) -> Result<String, IndicatorError> {
        self.insert(indicator, IndicatorKind::Panel)
    }

    /// Add to whichever collection matches the indicator's kind.
    pub fn add_indicator(&mut self, indicator: Indicator) -> Result<String, IndicatorError> {
        let kind = indicator.kind();
        self.insert(indicator, kind)
    }

    fn insert(
        &mut self,
        mut indicator: Indicator,
        expected: IndicatorKind,
    ) -> Result<String, IndicatorError> {
        if indicator.kind() != expected {
            return Err(IndicatorError::KindMismatch {
                id: indicator.id().to_string(),
                expected,
                actual: indicator.kind(),
            });
        }
        if self.get(indicator.id()).is_some() {
            return Err(IndicatorError::DuplicateId(indicator.id().to_string()));
        }

        if let Some(bars) = &self.bars {
            indicator.calculate(bars);
        }

        let id = indicator.id().to_string();
        info!(
            id = %id,
            type_id = %indicator.type_id(),
            kind = %expected,
            name = %indicator.name(),
            "Indicator added"
        );
        match expected {
            IndicatorKind::Overlay => self.overlays.push(indicator),
            IndicatorKind::Panel => self.panels.push(indicator),
        }

        self.emit(ManagerEvent::Added {
            id: id.clone(),
            kind: expected,
        });
        if expected == IndicatorKind::Panel {
            self.emit(ManagerEvent::PaneAdded { id: id.clone() });
        }
        Ok(id)
    }

    /// Remove and destroy the indicator with `id`.  Unknown ids are a no-op.
    pub fn remove_indicator(&mut self, id: &str) -> bool {
        let removed = if let Some(pos) = self.overlays.iter().position(|i| i.id() == id) {
            self.overlays.remove(pos)
        } else if let Some(pos) = self.panels.iter().position(|i| i.id() == id) {
            self.panels.remove(pos)
        } else {
            debug!(id, "remove_indicator: unknown id");
            return false;
        };
        self.retire(removed);
        true
    }

    /// Destroy and drop every indicator.  The cached series is kept.
    pub fn clear(&mut self) {
        let overlays = std::mem::take(&mut self.overlays);
        let panels = std::mem::take(&mut self.panels);
        for indicator in overlays.into_iter().chain(panels) {
            self.retire(indicator);
        }
    }

    fn retire(&mut self, mut indicator: Indicator) {
        indicator.destroy();
        let id = indicator.id().to_string();
        let kind = indicator.kind();
        info!(id = %id, kind = %kind, name = %indicator.name(), "Indicator removed");

        self.emit(ManagerEvent::Removed {
            id: id.clone(),
            kind,
        });
        if kind == IndicatorKind::Panel {
            self.emit(ManagerEvent::PaneRemoved { id });
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    pub fn get(&self, id: &str) -> Option<&Indicator> {
        self.iter().find(|i| i.id() == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Indicator> {
        self.overlays
            .iter_mut()
            .chain(self.panels.iter_mut())
            .find(|i| i.id() == id)
    }

    pub fn overlays(&self) -> &[Indicator] {
        &self.overlays
    }

    pub fn panels(&self) -> &[Indicator] {
        &self.panels
    }

    /// Overlays then panels, each in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Indicator> {
        self.overlays.iter().chain(self.panels.iter())
    }

    pub fn len(&self) -> usize {
        self.overlays.len() + self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bars(&self) -> Option<&BarSeries> {
        self.bars.as_ref()
    }

    // ── Data ────────────────────────────────────────────────────────────────

    /// Install a new series and recompute every indicator, overlays first.
    pub fn set_data(&mut self, bars: impl Into<BarSeries>) {
        let bars: BarSeries = bars.into();
        for indicator in self.overlays.iter_mut().chain(self.panels.iter_mut()) {
            indicator.calculate(&bars);
        }
        let len = bars.len();
        debug!(bars = len, indicators = self.len(), "Series updated");
        self.bars = Some(bars);
        self.emit(ManagerEvent::DataUpdated { bars: len });
    }

    /// Recompute one indicator against the cached series.  Returns `false`
    /// when the id is unknown or no series is cached.
    pub fn recalculate_indicator(&mut self, id: &str) -> bool {
        let Some(bars) = self.bars.clone() else {
            return false;
        };
        match self.get_mut(id) {
            Some(indicator) => {
                indicator.calculate(&bars);
                true
            }
            None => false,
        }
    }

    // ── Option updates ──────────────────────────────────────────────────────

    /// Apply a typed option patch, recomputing when the output changed.
    /// Returns whether data was stale.
    pub fn update_indicator(
        &mut self,
        id: &str,
        patch: IndicatorPatch,
    ) -> Result<bool, IndicatorError> {
        self.modify(id, |indicator| indicator.apply_patch(patch))
    }

    /// String-keyed variant of [`IndicatorManager::update_indicator`] for the
    /// settings UI.
    pub fn set_indicator_setting(
        &mut self,
        id: &str,
        key: &str,
        value: &SettingValue,
    ) -> Result<bool, IndicatorError> {
        self.modify(id, |indicator| indicator.set_setting_value(key, value))
    }

    fn modify(
        &mut self,
        id: &str,
        change: impl FnOnce(&mut Indicator) -> Result<bool, IndicatorError>,
    ) -> Result<bool, IndicatorError> {
        let indicator = self
            .get_mut(id)
            .ok_or_else(|| IndicatorError::NotFound(id.to_string()))?;
        let stale = change(&mut *indicator)?;
        let recalculated = stale && indicator.recalculate();
        debug!(id, stale, recalculated, name = %indicator.name(), "Indicator options changed");

        self.emit(ManagerEvent::Changed {
            id: id.to_string(),
            recalculated,
        });
        Ok(stale)
    }

    // ── Serialization ───────────────────────────────────────────────────────

    /// Snapshot every indicator as a persisted record, overlays first.
    pub fn serialize(&self) -> Vec<IndicatorRecord> {
        self.iter()
            .filter_map(|indicator| match IndicatorRecord::from_indicator(indicator) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(id = %indicator.id(), error = %e, "Failed to serialize indicator, skipping");
                    None
                }
            })
            .collect()
    }

    /// Replace every indicator with those described by `records`.
    ///
    /// Records naming an unknown type or carrying undecodable options are
    /// logged and skipped.  Returns the number of indicators restored.
    pub fn deserialize(&mut self, records: &[IndicatorRecord]) -> usize {
        self.clear();

        let mut restored = 0;
        for record in records {
            let type_id = match record.type_id.parse::<IndicatorTypeId>() {
                Ok(type_id) => type_id,
                Err(_) => {
                    warn!(id = %record.id, type_id = %record.type_id, "Unknown indicator type, skipping");
                    continue;
                }
            };
            let indicator = match Indicator::decode(record.id.clone(), type_id, &record.options) {
                Ok(indicator) => indicator,
                Err(e) => {
                    warn!(id = %record.id, type_id = %type_id, error = %e, "Undecodable indicator options, skipping");
                    continue;
                }
            };
            if indicator.kind() != record.kind {
                debug!(id = %record.id, stored = %record.kind, actual = %indicator.kind(), "Stored kind ignored");
            }
            match self.add_indicator(indicator) {
                Ok(_) => restored += 1,
                Err(e) => warn!(id = %record.id, error = %e, "Failed to restore indicator, skipping"),
            }
        }

        info!(restored, total = records.len(), "Indicators restored");
        restored
    }

    pub fn to_payload(&self) -> IndicatorsPayload {
        IndicatorsPayload {
            indicators: self.serialize(),
            version: PAYLOAD_VERSION,
        }
    }

    pub fn restore_payload(&mut self, payload: &IndicatorsPayload) -> usize {
        self.deserialize(&payload.indicators)
    }
}
