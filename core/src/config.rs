use crate::math::{CurveSettings, GeoBounds};
use crate::model::{City, CityCatalog, GeoPoint, TimePoint};
use crate::prelude::CityId;
use crate::state::HighlightPolicy;
use crate::story::orchestrator::SectionSpec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lower bound for scroll/resize coalescing windows.
pub const MIN_PACING_MS: u64 = 100;

/// Fixed viewport of the background map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    pub center: GeoPoint,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub bounds: GeoBounds,
    pub curve: CurveSettings,
    /// Degrees of latitude between a city and its floating label.
    pub label_offset_lat: f64,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            center: GeoPoint::new(39.8, -98.5),
            zoom: 5.0,
            min_zoom: 4.5,
            max_zoom: 6.0,
            bounds: GeoBounds::usa(),
            curve: CurveSettings::default(),
            label_offset_lat: 0.5,
        }
    }
}

/// Everything the story page is parameterized by.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    pub time_points: Vec<TimePoint>,
    pub cities: Vec<City>,
    pub sections: Vec<SectionSpec>,
    /// Cities labeled after every period rebuild, besides the highlighted one.
    pub always_labeled: Vec<CityId>,
    pub map: MapSettings,
    pub playback_period_ms: u64,
    /// Scroll depth, as a fraction of the hero height, that flips the map interactive.
    pub hero_threshold_ratio: f64,
    pub visibility_threshold: f64,
    pub midline_fraction: f64,
    pub scroll_throttle_ms: u64,
    pub resize_debounce_ms: u64,
    pub banner_ms: u64,
    pub highlight_policy: HighlightPolicy,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            time_points: TimePoint::default_sequence(),
            cities: CityCatalog::default_cities(),
            sections: SectionSpec::default_story(),
            always_labeled: vec!["nyc".into(), "lasvegas".into()],
            map: MapSettings::default(),
            playback_period_ms: 3000,
            hero_threshold_ratio: 0.7,
            visibility_threshold: 0.6,
            midline_fraction: 0.5,
            scroll_throttle_ms: MIN_PACING_MS,
            resize_debounce_ms: 200,
            banner_ms: 5000,
            highlight_policy: HighlightPolicy::Restore,
        }
    }
}

impl StoryConfig {
    /// Time points to use; an empty list falls back to the default story periods.
    pub fn timeline(&self) -> Vec<TimePoint> {
        if self.time_points.is_empty() {
            log::warn!("story config has no time points, using defaults");
            TimePoint::default_sequence()
        } else {
            self.time_points.clone()
        }
    }

    pub fn catalog(&self) -> CityCatalog {
        CityCatalog::new(self.cities.clone())
    }

    pub fn playback_period(&self) -> Duration {
        Duration::from_millis(self.playback_period_ms.max(1))
    }

    pub fn scroll_throttle(&self) -> Duration {
        Duration::from_millis(self.scroll_throttle_ms.max(MIN_PACING_MS))
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms.max(MIN_PACING_MS))
    }

    pub fn banner_lifetime(&self) -> Duration {
        Duration::from_millis(self.banner_ms)
    }
}
