use crate::model::{find_record, MetricRecord, TimePoint};
use crate::prelude::CityId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapMode {
    /// Background visualization: no pointer interaction, decorative network shown.
    Decorative,
    Interactive,
}

impl MapMode {
    pub fn is_decorative(self) -> bool {
        matches!(self, MapMode::Decorative)
    }
}

/// What happens to the stored highlight when the map returns to Interactive mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightPolicy {
    /// Show the highlight stored before the map went decorative.
    #[default]
    Restore,
    /// Drop any stored highlight.
    Clear,
}

/// Single source of truth for the time slot, highlight, mode and active records.
///
/// Writers are the timeline, the section orchestrator and the map operations;
/// everything drawn on the map is derived from this value.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationState {
    time_index: usize,
    time_len: usize,
    highlighted: Option<CityId>,
    mode: MapMode,
    records: Vec<MetricRecord>,
    records_period: Option<TimePoint>,
    pinned_labels: bool,
}

impl VisualizationState {
    /// Index 0, no highlight, decorative mode, no records yet.
    pub fn new(time_len: usize) -> Self {
        Self {
            time_index: 0,
            time_len: time_len.max(1),
            highlighted: None,
            mode: MapMode::Decorative,
            records: Vec::new(),
            records_period: None,
            pinned_labels: false,
        }
    }

    pub fn time_index(&self) -> usize {
        self.time_index
    }

    pub fn time_len(&self) -> usize {
        self.time_len
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.highlighted.as_deref()
    }

    pub fn mode(&self) -> MapMode {
        self.mode
    }

    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }

    /// Period the current records belong to; may lag the time index while a load is pending.
    pub fn records_period(&self) -> Option<&TimePoint> {
        self.records_period.as_ref()
    }

    pub fn record_for(&self, city_id: &str) -> Option<&MetricRecord> {
        find_record(&self.records, city_id)
    }

    pub fn pinned_labels(&self) -> bool {
        self.pinned_labels
    }

    /// Out-of-range indices are rejected without touching the state.
    pub(crate) fn set_time_index(&mut self, index: usize) -> bool {
        if index >= self.time_len {
            return false;
        }
        self.time_index = index;
        true
    }

    pub(crate) fn set_highlighted(&mut self, city: Option<CityId>) {
        self.highlighted = city;
    }

    pub(crate) fn set_mode(&mut self, mode: MapMode) {
        self.mode = mode;
    }

    pub(crate) fn replace_records(&mut self, period: TimePoint, records: Vec<MetricRecord>) {
        self.records_period = Some(period);
        self.records = records;
    }

    pub(crate) fn set_pinned_labels(&mut self, visible: bool) {
        self.pinned_labels = visible;
    }
}
