use crate::prelude::CityId;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Per-city tourism metrics for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub city_id: CityId,
    #[serde(default)]
    pub city_name: String,
    pub visitors: u64,
    #[serde(default)]
    pub revenue: f64,
    /// Rating on a 0..=5 scale.
    #[serde(default, deserialize_with = "rating")]
    pub satisfaction: f64,
    #[serde(rename = "avg_stay", default, deserialize_with = "non_negative")]
    pub avg_stay_days: f64,
}

fn rating<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    f64::deserialize(deserializer).map(|value| value.clamp(0.0, 5.0))
}

fn non_negative<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    f64::deserialize(deserializer).map(|value| value.max(0.0))
}

impl MetricRecord {
    pub fn new(
        city_id: &str,
        city_name: &str,
        visitors: u64,
        revenue: f64,
        satisfaction: f64,
        avg_stay_days: f64,
    ) -> Self {
        Self {
            city_id: city_id.to_string(),
            city_name: city_name.to_string(),
            visitors,
            revenue,
            satisfaction: satisfaction.clamp(0.0, 5.0),
            avg_stay_days: avg_stay_days.max(0.0),
        }
    }
}

/// Monthly dataset keyed by `MM-YYYY`, as served by `tourism-data.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetTable {
    periods: BTreeMap<String, Vec<MetricRecord>>,
}

impl DatasetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, records: Vec<MetricRecord>) {
        self.periods.insert(key.into(), records);
    }

    /// Records for the key, `None` when missing or empty.
    pub fn period(&self, key: &str) -> Option<&[MetricRecord]> {
        self.periods
            .get(key)
            .map(Vec::as_slice)
            .filter(|records| !records.is_empty())
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

pub fn find_record<'a>(records: &'a [MetricRecord], city_id: &str) -> Option<&'a MetricRecord> {
    records.iter().find(|record| record.city_id == city_id)
}
