use serde::Serialize;
use tourcore::map::{CityLabel, FlowLine, MapSurface, MarkerSpec};
use tourcore::state::MapMode;
use tourcore::StoryEngine;

/// Snapshot of the page state served to external viewers.
#[derive(Debug, Clone, Serialize)]
pub struct VisualizationModel {
    pub time_index: usize,
    pub period_label: Option<String>,
    pub progress_percent: f64,
    pub playing: bool,
    pub mode: MapMode,
    pub highlighted: Option<String>,
    pub active_section: Option<String>,
    pub decorative: bool,
    pub markers: Vec<MarkerSpec>,
    pub flows: Vec<FlowLine>,
    pub labels: Vec<CityLabel>,
}

impl Default for VisualizationModel {
    fn default() -> Self {
        Self {
            time_index: 0,
            period_label: None,
            progress_percent: 0.0,
            playing: false,
            mode: MapMode::Decorative,
            highlighted: None,
            active_section: None,
            decorative: true,
            markers: Vec::new(),
            flows: Vec::new(),
            labels: Vec::new(),
        }
    }
}

impl VisualizationModel {
    pub fn capture<S: MapSurface>(engine: &StoryEngine<S>) -> Self {
        let state = engine.state();
        let scene = engine.scene();
        Self {
            time_index: state.time_index(),
            period_label: state.records_period().map(|p| p.label.clone()),
            progress_percent: engine.timeline_view().progress_percent,
            playing: engine.timeline().is_playing(),
            mode: state.mode(),
            highlighted: state.highlighted().map(str::to_string),
            active_section: engine.active_section().map(|s| s.id.clone()),
            decorative: scene.flows.is_decorative(),
            flows: scene.flows.lines().to_vec(),
            markers: scene.markers,
            labels: scene.labels,
        }
    }
}
