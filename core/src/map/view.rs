use crate::config::MapSettings;
use crate::map::detail::CityDetail;
use crate::map::flow::{build_decorative_network, build_flow_lines};
use crate::map::markers::{build_labels, build_markers};
use crate::map::period::{PeriodLoaded, PeriodRequest, PeriodSequence};
use crate::map::surface::{FlowLayer, FlowLine, MapSurface, Scene};
use crate::model::{CityCatalog, GeoPoint, TimePoint};
use crate::prelude::{CityId, ContainerHandle, MapInitResult};
use crate::state::{HighlightPolicy, MapMode, VisualizationState};
use crate::telemetry::{LogManager, MetricsRecorder};
use std::sync::Arc;

/// Owns the map surface and re-renders it from [`VisualizationState`].
///
/// Nothing drawn is kept here besides the precomputed decorative network;
/// every operation mutates the state and then presents a freshly derived scene.
pub struct MapView<S> {
    catalog: Arc<CityCatalog>,
    settings: MapSettings,
    always_labeled: Vec<CityId>,
    policy: HighlightPolicy,
    decorative: Arc<[FlowLine]>,
    sequence: PeriodSequence,
    surface: S,
    mounted: bool,
    logger: LogManager,
    metrics: Arc<MetricsRecorder>,
}

impl<S: MapSurface> MapView<S> {
    pub fn new(
        catalog: Arc<CityCatalog>,
        settings: MapSettings,
        always_labeled: Vec<CityId>,
        policy: HighlightPolicy,
        surface: S,
    ) -> Self {
        let decorative = build_decorative_network(&catalog, &settings.curve);
        Self {
            catalog,
            settings,
            always_labeled,
            policy,
            decorative,
            sequence: PeriodSequence::default(),
            surface,
            mounted: false,
            logger: LogManager::new("map"),
            metrics: Arc::new(MetricsRecorder::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn initialize(
        &mut self,
        state: &VisualizationState,
        container: &ContainerHandle,
    ) -> MapInitResult<()> {
        self.surface.mount(container, &self.settings)?;
        self.mounted = true;
        self.logger.record(&format!(
            "map mounted in `{}` with {} cities",
            container.element_id,
            self.catalog.len()
        ));
        self.render(state);
        Ok(())
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Idempotent; only an actual mode change re-renders.
    pub fn set_mode(&mut self, state: &mut VisualizationState, decorative: bool) {
        let target = if decorative {
            MapMode::Decorative
        } else {
            MapMode::Interactive
        };
        if state.mode() == target {
            return;
        }

        self.logger.record(&format!("setting map mode: {:?}", target));
        state.set_mode(target);
        match target {
            MapMode::Decorative => {
                if self.mounted {
                    self.surface.close_popups();
                }
            }
            MapMode::Interactive => {
                if self.policy == HighlightPolicy::Clear {
                    state.set_highlighted(None);
                }
            }
        }
        self.render(state);
    }

    /// Stamps a period update; the records stay stale until [`MapView::apply_period`].
    pub fn request_period(&mut self, time_point: TimePoint) -> PeriodRequest {
        let request = self.sequence.issue(time_point);
        self.metrics.record_fetch_issued();
        self.logger.trace(&format!(
            "period {} requested with token {}",
            request.time_point.key(),
            request.token
        ));
        request
    }

    /// Installs resolved records unless a later request has been issued since.
    pub fn apply_period(&mut self, state: &mut VisualizationState, loaded: PeriodLoaded) -> bool {
        if !self.sequence.is_current(loaded.token) {
            self.metrics.record_stale_discarded();
            self.logger.trace(&format!(
                "discarding stale period {} (token {}, latest {})",
                loaded.time_point.key(),
                loaded.token,
                self.sequence.latest()
            ));
            return false;
        }

        self.logger.record(&format!(
            "updating city markers for {} ({} records)",
            loaded.time_point.label,
            loaded.records.len()
        ));
        state.replace_records(loaded.time_point, loaded.records);
        state.set_pinned_labels(true);
        self.metrics.record_period_applied();
        self.render(state);
        true
    }

    /// No-op in decorative mode or for ids outside the catalog.
    pub fn highlight_city(&mut self, state: &mut VisualizationState, city_id: &str) -> bool {
        if state.mode().is_decorative() || !self.catalog.contains(city_id) {
            return false;
        }
        self.logger.trace(&format!("highlighting city {}", city_id));
        state.set_highlighted(Some(city_id.to_string()));
        self.render(state);
        true
    }

    pub fn highlight_nearest(&mut self, state: &mut VisualizationState, point: &GeoPoint) -> bool {
        if state.mode().is_decorative() {
            return false;
        }
        match self.catalog.nearest(point).map(|city| city.id.clone()) {
            Some(id) => self.highlight_city(state, &id),
            None => false,
        }
    }

    pub fn clear_highlights(&mut self, state: &mut VisualizationState) {
        self.logger.trace("clearing highlights");
        state.set_highlighted(None);
        state.set_pinned_labels(false);
        self.render(state);
    }

    /// Highlights the city and opens its detail card; no-op in decorative mode.
    pub fn show_detail(&mut self, state: &mut VisualizationState, city_id: &str) -> Option<CityDetail> {
        if !self.highlight_city(state, city_id) {
            return None;
        }
        let city = self.catalog.get(city_id)?;
        let detail = CityDetail::build(city, state.record_for(city_id));
        self.logger.record(&format!("showing detail for city {}", city_id));
        if self.mounted {
            self.surface.open_detail(&detail);
        }
        Some(detail)
    }

    /// Closes the detail surface and drops the highlight it set.
    pub fn close_detail(&mut self, state: &mut VisualizationState) {
        if self.mounted {
            self.surface.close_popups();
        }
        self.clear_highlights(state);
    }

    pub fn resize(&mut self) {
        if self.mounted {
            self.surface.invalidate_size();
        }
    }

    /// Scene for the given state; a pure function of records, highlight and mode.
    pub fn scene(&self, state: &VisualizationState) -> Scene {
        let interactive = !state.mode().is_decorative();
        let highlighted = if interactive { state.highlighted() } else { None };
        let records = state.records();

        let flows = if interactive {
            FlowLayer::DataDriven(build_flow_lines(
                &self.catalog,
                records,
                highlighted,
                interactive,
                &self.settings.curve,
            ))
        } else {
            FlowLayer::Decorative(self.decorative.clone())
        };

        let labels = if interactive {
            let pinned: &[CityId] = if state.pinned_labels() {
                &self.always_labeled
            } else {
                &[]
            };
            build_labels(
                &self.catalog,
                records,
                pinned,
                highlighted,
                self.settings.label_offset_lat,
            )
        } else {
            Vec::new()
        };

        Scene {
            mode: state.mode(),
            markers: build_markers(&self.catalog, records, highlighted, interactive),
            flows,
            labels,
        }
    }

    pub fn catalog(&self) -> &CityCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &MapSettings {
        &self.settings
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn decorative_network(&self) -> &Arc<[FlowLine]> {
        &self.decorative
    }

    fn render(&mut self, state: &VisualizationState) {
        if !self.mounted {
            return;
        }
        let scene = self.scene(state);
        self.surface.present(&scene);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{fallback_for, fallback_table};
    use crate::map::surface::HeadlessSurface;

    fn mounted_view(policy: HighlightPolicy) -> (MapView<HeadlessSurface>, VisualizationState) {
        let catalog = Arc::new(CityCatalog::new(CityCatalog::default_cities()));
        let mut view = MapView::new(
            catalog,
            MapSettings::default(),
            vec!["nyc".into(), "lasvegas".into()],
            policy,
            HeadlessSurface::new(),
        );
        let state = VisualizationState::new(3);
        view.initialize(&state, &ContainerHandle::new("map-container"))
            .unwrap();
        (view, state)
    }

    fn load(view: &mut MapView<HeadlessSurface>, state: &mut VisualizationState, key: &str) {
        let (month, year) = key.split_once('-').unwrap();
        let request = view.request_period(TimePoint::new(month, year, key));
        let loaded = PeriodLoaded {
            token: request.token,
            time_point: request.time_point,
            records: fallback_for(&fallback_table(), key),
        };
        assert!(view.apply_period(state, loaded));
    }

    #[test]
    fn initialize_fails_without_renderer() {
        let catalog = Arc::new(CityCatalog::new(CityCatalog::default_cities()));
        let mut view = MapView::new(
            catalog,
            MapSettings::default(),
            Vec::new(),
            HighlightPolicy::Restore,
            HeadlessSurface::unavailable(),
        );
        let state = VisualizationState::new(3);
        assert!(view
            .initialize(&state, &ContainerHandle::new("map-container"))
            .is_err());
        assert!(!view.is_mounted());
    }

    #[test]
    fn highlight_is_ignored_in_decorative_mode() {
        let (mut view, mut state) = mounted_view(HighlightPolicy::Restore);
        assert!(!view.highlight_city(&mut state, "nyc"));
        assert!(state.highlighted().is_none());
        assert!(view.show_detail(&mut state, "nyc").is_none());
    }

    #[test]
    fn second_highlight_replaces_first() {
        let (mut view, mut state) = mounted_view(HighlightPolicy::Restore);
        view.set_mode(&mut state, false);
        load(&mut view, &mut state, "11-2024");
        view.highlight_city(&mut state, "nyc");
        view.highlight_city(&mut state, "miami");

        let scene = view.surface().scene().unwrap().clone();
        let active: Vec<_> = scene.active_markers().map(|m| m.city_id.as_str()).collect();
        assert_eq!(active, vec!["miami"]);
        assert_eq!(scene.front_marker().unwrap().city_id, "miami");
        for line in scene.flows.lines() {
            assert_eq!(line.emphasized, line.touches("miami"));
        }
        assert!(scene.labels.iter().any(|l| l.city_id == "miami" && l.active));
    }

    #[test]
    fn unknown_city_is_ignored() {
        let (mut view, mut state) = mounted_view(HighlightPolicy::Restore);
        view.set_mode(&mut state, false);
        view.highlight_city(&mut state, "nyc");
        assert!(!view.highlight_city(&mut state, "gotham"));
        assert_eq!(state.highlighted(), Some("nyc"));
    }

    #[test]
    fn clear_highlights_removes_every_label() {
        let (mut view, mut state) = mounted_view(HighlightPolicy::Restore);
        view.set_mode(&mut state, false);
        load(&mut view, &mut state, "11-2024");
        view.highlight_city(&mut state, "chicago");
        assert_eq!(view.surface().scene().unwrap().labels.len(), 3);

        view.clear_highlights(&mut state);
        let scene = view.surface().scene().unwrap();
        assert!(state.highlighted().is_none());
        assert!(scene.labels.is_empty());
        assert_eq!(scene.active_markers().count(), 0);
        assert!(scene.flows.lines().iter().all(|l| !l.emphasized));
    }

    #[test]
    fn mode_round_trip_restores_interactive_scene() {
        let (mut view, mut state) = mounted_view(HighlightPolicy::Restore);
        view.set_mode(&mut state, false);
        load(&mut view, &mut state, "12-2024");
        view.highlight_city(&mut state, "dc");
        let before = view.surface().scene().unwrap().clone();

        view.set_mode(&mut state, true);
        let decorative = view.surface().scene().unwrap().clone();
        assert!(decorative.flows.is_decorative());
        assert!(decorative.markers.iter().all(|m| !m.interactive && !m.active));
        assert!(decorative.labels.is_empty());
        assert_eq!(view.surface().popups_closed(), 1);

        view.set_mode(&mut state, false);
        let after = view.surface().scene().unwrap().clone();
        assert_eq!(before, after);
        assert!(!after.flows.is_decorative());
    }

    #[test]
    fn clear_policy_drops_highlight_on_return() {
        let (mut view, mut state) = mounted_view(HighlightPolicy::Clear);
        view.set_mode(&mut state, false);
        view.highlight_city(&mut state, "boston");
        view.set_mode(&mut state, true);
        assert_eq!(state.highlighted(), Some("boston"));
        view.set_mode(&mut state, false);
        assert!(state.highlighted().is_none());
    }

    #[test]
    fn set_mode_is_idempotent() {
        let (mut view, mut state) = mounted_view(HighlightPolicy::Restore);
        let presents = view.surface().presents();
        view.set_mode(&mut state, true);
        assert_eq!(view.surface().presents(), presents);
        assert_eq!(view.surface().popups_closed(), 0);
    }

    #[test]
    fn decorative_network_is_shared_not_rebuilt() {
        let (mut view, mut state) = mounted_view(HighlightPolicy::Restore);
        load(&mut view, &mut state, "11-2024");
        let scene = view.scene(&state);
        match scene.flows {
            FlowLayer::Decorative(lines) => {
                assert!(Arc::ptr_eq(&lines, view.decorative_network()))
            }
            FlowLayer::DataDriven(_) => panic!("expected decorative layer"),
        }
    }

    #[test]
    fn stale_period_is_discarded() {
        let (mut view, mut state) = mounted_view(HighlightPolicy::Restore);
        let first = view.request_period(TimePoint::new("11", "2024", "November 2024"));
        let second = view.request_period(TimePoint::new("12", "2024", "December 2024"));
        let december = fallback_for(&fallback_table(), "12-2024");

        assert!(view.apply_period(
            &mut state,
            PeriodLoaded {
                token: second.token,
                time_point: second.time_point,
                records: december.clone(),
            }
        ));
        assert!(!view.apply_period(
            &mut state,
            PeriodLoaded {
                token: first.token,
                time_point: first.time_point,
                records: fallback_for(&fallback_table(), "11-2024"),
            }
        ));
        assert_eq!(state.records(), december.as_slice());
        assert_eq!(state.records_period().unwrap().month, "12");
    }

    #[test]
    fn nearest_highlight_and_detail() {
        let (mut view, mut state) = mounted_view(HighlightPolicy::Restore);
        view.set_mode(&mut state, false);
        load(&mut view, &mut state, "11-2024");
        assert!(view.highlight_nearest(&mut state, &GeoPoint::new(36.0, -115.0)));
        assert_eq!(state.highlighted(), Some("lasvegas"));

        let detail = view.show_detail(&mut state, "nyc").unwrap();
        assert_eq!(detail.rating.full, 4);
        assert_eq!(state.highlighted(), Some("nyc"));
        assert_eq!(view.surface().detail().unwrap().city_id, "nyc");
    }

    #[test]
    fn resize_invalidates_only_when_mounted() {
        let (mut view, _) = mounted_view(HighlightPolicy::Restore);
        view.resize();
        view.resize();
        assert_eq!(view.surface().invalidations(), 2);
    }
}
