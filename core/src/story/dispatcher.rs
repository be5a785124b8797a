//! Synchronous event dispatcher owning the visualization state.
//!
//! Hosts translate UI callbacks into [`Event`]s and execute the returned
//! [`Command`]s (fetches, timers, scrolling, banners). Every state mutation
//! happens inside [`StoryEngine::dispatch`], so update order is the order in
//! which events are dispatched.

use crate::config::StoryConfig;
use crate::map::{MapSurface, MapView, PeriodLoaded, PeriodRequest, Scene};
use crate::model::GeoPoint;
use crate::prelude::{CityId, ContainerHandle};
use crate::state::VisualizationState;
use crate::story::effects::{select_effects, Capabilities, EffectsStrategy, Reveal};
use crate::story::orchestrator::{
    PageChrome, ScrollFrame, SectionLayout, SectionOrchestrator, SectionSpec,
};
use crate::story::pacing::{Debounce, Throttle};
use crate::telemetry::{LogManager, MetricsRecorder, MetricsSnapshot};
use crate::timeline::{TickOutcome, TimelineController, TimelineUpdate, TimelineView};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Raw scroll sample; coalesced by the scroll throttle.
    Scrolled { frame: ScrollFrame, at: Instant },
    /// Lets pending throttled/debounced work run once its window has passed.
    PacingTick { at: Instant },
    SectionsMeasured(Vec<SectionLayout>),
    TimelineItemClicked(usize),
    TimelineMarkerClicked { month: String, year: String },
    PlayPauseClicked,
    PlaybackTick,
    CityClicked(CityId),
    NearestCity(GeoPoint),
    DetailClosed,
    PeriodLoaded(PeriodLoaded),
    ViewportResized { at: Instant },
    JourneyStarted,
}

/// Side effects the host executes on behalf of the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Resolve through the dataset provider and dispatch [`Event::PeriodLoaded`].
    FetchPeriod(PeriodRequest),
    /// Dispatch [`Event::PlaybackTick`] every `period` until stopped.
    StartPlayback { period: Duration },
    StopPlayback,
    ScrollToSection(String),
    ShowBanner { message: String, lifetime: Duration },
}

pub struct StoryEngine<S> {
    config: StoryConfig,
    state: VisualizationState,
    map: MapView<S>,
    timeline: TimelineController,
    timeline_view: TimelineView,
    orchestrator: SectionOrchestrator,
    effects: Box<dyn EffectsStrategy>,
    scroll: Throttle<ScrollFrame>,
    resize: Debounce<()>,
    last_frame: Option<ScrollFrame>,
    chrome: Option<PageChrome>,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
    ready: bool,
}

impl<S: MapSurface> StoryEngine<S> {
    pub fn new(config: StoryConfig, surface: S, capabilities: Capabilities) -> Self {
        let points = config.timeline();
        let metrics = Arc::new(MetricsRecorder::new());
        let map = MapView::new(
            Arc::new(config.catalog()),
            config.map.clone(),
            config.always_labeled.clone(),
            config.highlight_policy,
            surface,
        )
        .with_metrics(metrics.clone());
        let effects = select_effects(
            capabilities,
            config.visibility_threshold,
            config.midline_fraction,
        );
        let orchestrator = SectionOrchestrator::new(
            config.sections.clone(),
            effects.detector(),
            config.hero_threshold_ratio,
        );
        let state = VisualizationState::new(points.len());
        let timeline = TimelineController::new(points, config.playback_period());
        let timeline_view = timeline.view(0);

        Self {
            scroll: Throttle::new(config.scroll_throttle()),
            resize: Debounce::new(config.resize_debounce()),
            config,
            state,
            map,
            timeline,
            timeline_view,
            orchestrator,
            effects,
            last_frame: None,
            chrome: None,
            metrics,
            logger: LogManager::new("story"),
            ready: false,
        }
    }

    /// Mounts the map and loads the first period. A mount failure yields a
    /// banner and leaves the engine inert.
    pub fn start(&mut self, container: &ContainerHandle) -> Vec<Command> {
        if let Err(err) = self.map.initialize(&self.state, container) {
            log::error!("map initialization failed: {}", err);
            return vec![Command::ShowBanner {
                message: err.user_message().to_string(),
                lifetime: self.config.banner_lifetime(),
            }];
        }
        self.ready = true;
        self.logger.record(&format!(
            "story started with {} effects",
            self.effects.name()
        ));

        let mut commands = Vec::new();
        if let Some(update) = self.timeline.set_index(&mut self.state, 0, true) {
            self.apply_timeline(update, &mut commands);
        }
        commands
    }

    pub fn dispatch(&mut self, event: Event) -> Vec<Command> {
        if !self.ready {
            self.logger
                .trace(&format!("map not initialized, dropping {:?}", event));
            return Vec::new();
        }

        let mut commands = Vec::new();
        match event {
            Event::Scrolled { frame, at } => {
                if let Some(frame) = self.scroll.offer(at, frame) {
                    self.apply_scroll(frame, &mut commands);
                }
            }
            Event::PacingTick { at } => {
                if let Some(frame) = self.scroll.flush(at) {
                    self.apply_scroll(frame, &mut commands);
                }
                if self.resize.poll(at).is_some() {
                    self.logger.trace("window resized, updating map");
                    self.map.resize();
                }
            }
            Event::SectionsMeasured(layouts) => {
                self.orchestrator.measure(layouts);
                if let Some(frame) = self.last_frame {
                    self.apply_scroll(frame, &mut commands);
                }
            }
            Event::TimelineItemClicked(index) => {
                self.map.set_mode(&mut self.state, false);
                self.select_index(index, &mut commands);
            }
            Event::TimelineMarkerClicked { month, year } => {
                let index = self.timeline.position_of(&month, &year).unwrap_or(0);
                self.select_index(index, &mut commands);
                if let Some(section) = self.orchestrator.first_section_for(&month, &year) {
                    commands.push(Command::ScrollToSection(section.id.clone()));
                }
            }
            Event::PlayPauseClicked => {
                if self.timeline.toggle() {
                    commands.push(Command::StartPlayback {
                        period: self.timeline.period(),
                    });
                } else {
                    commands.push(Command::StopPlayback);
                }
            }
            Event::PlaybackTick => {
                let outcome = self.timeline.tick(&mut self.state);
                let finished = matches!(outcome, TickOutcome::Finished(_));
                if let TickOutcome::Advanced(update) | TickOutcome::Finished(update) = outcome {
                    self.apply_timeline(update, &mut commands);
                }
                if finished {
                    commands.push(Command::StopPlayback);
                }
            }
            Event::CityClicked(city_id) => {
                self.map.show_detail(&mut self.state, &city_id);
            }
            Event::NearestCity(point) => {
                self.map.highlight_nearest(&mut self.state, &point);
            }
            Event::DetailClosed => {
                self.map.close_detail(&mut self.state);
            }
            Event::PeriodLoaded(loaded) => {
                self.map.apply_period(&mut self.state, loaded);
            }
            Event::ViewportResized { at } => {
                self.resize.offer(at, ());
            }
            Event::JourneyStarted => {
                self.map.set_mode(&mut self.state, false);
                if let Some(section) = self.orchestrator.first_section() {
                    commands.push(Command::ScrollToSection(section.id.clone()));
                }
            }
        }
        commands
    }

    fn select_index(&mut self, index: usize, commands: &mut Vec<Command>) {
        if let Some(update) = self.timeline.set_index(&mut self.state, index, true) {
            self.apply_timeline(update, commands);
        }
    }

    fn apply_timeline(&mut self, update: TimelineUpdate, commands: &mut Vec<Command>) {
        self.timeline_view = update.view;
        if let Some(point) = update.period {
            commands.push(Command::FetchPeriod(self.map.request_period(point)));
        }
    }

    fn apply_scroll(&mut self, frame: ScrollFrame, commands: &mut Vec<Command>) {
        self.last_frame = Some(frame);
        let observation = self.orchestrator.observe(&frame, self.timeline.points());
        self.chrome = Some(observation.chrome);

        if let Some(mode) = observation.mode_change {
            self.map.set_mode(&mut self.state, mode.is_decorative());
        }

        if let Some(entry) = observation.entered {
            self.map.set_mode(&mut self.state, false);
            if let Some(index) = entry.time_index {
                if let Some(update) = self.timeline.set_index(&mut self.state, index, false) {
                    self.apply_timeline(update, commands);
                }
            }
            self.map.clear_highlights(&mut self.state);
            if let Some(city_id) = entry.highlight.as_deref() {
                self.map.highlight_city(&mut self.state, city_id);
            }
        }
    }

    pub fn state(&self) -> &VisualizationState {
        &self.state
    }

    pub fn config(&self) -> &StoryConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn scene(&self) -> Scene {
        self.map.scene(&self.state)
    }

    pub fn map(&self) -> &MapView<S> {
        &self.map
    }

    pub fn surface(&self) -> &S {
        self.map.surface()
    }

    pub fn surface_mut(&mut self) -> &mut S {
        self.map.surface_mut()
    }

    pub fn timeline(&self) -> &TimelineController {
        &self.timeline
    }

    pub fn timeline_view(&self) -> &TimelineView {
        &self.timeline_view
    }

    pub fn chrome(&self) -> Option<PageChrome> {
        self.chrome
    }

    pub fn active_section(&self) -> Option<&SectionSpec> {
        self.orchestrator.active_section()
    }

    pub fn sections(&self) -> &[SectionSpec] {
        self.orchestrator.sections()
    }

    pub fn effects(&self) -> &dyn EffectsStrategy {
        self.effects.as_ref()
    }

    /// Presentation of every measured section for the last scroll frame.
    pub fn section_reveals(&self) -> Vec<(String, Reveal)> {
        let frame = self.last_frame.unwrap_or(ScrollFrame {
            scroll_top: 0.0,
            viewport_height: 0.0,
            scroll_height: 0.0,
            hero_height: 0.0,
        });
        self.orchestrator
            .layouts()
            .iter()
            .map(|layout| (layout.id.clone(), self.effects.section_reveal(layout, &frame)))
            .collect()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Recorder shared with the host's dataset provider.
    pub fn metrics_recorder(&self) -> Arc<MetricsRecorder> {
        self.metrics.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapSettings;
    use crate::dataset::{fallback_for, fallback_table};
    use crate::map::{CityDetail, HeadlessSurface};
    use crate::prelude::MapInitResult;
    use crate::state::{HighlightPolicy, MapMode};

    /// Surface double that logs every call in order.
    #[derive(Default)]
    struct RecordingSurface {
        calls: Vec<&'static str>,
        last: Option<Scene>,
    }

    impl MapSurface for RecordingSurface {
        fn mount(&mut self, _container: &ContainerHandle, _settings: &MapSettings) -> MapInitResult<()> {
            self.calls.push("mount");
            Ok(())
        }

        fn present(&mut self, scene: &Scene) {
            self.calls.push("present");
            self.last = Some(scene.clone());
        }

        fn close_popups(&mut self) {
            self.calls.push("close_popups");
        }

        fn open_detail(&mut self, _detail: &CityDetail) {
            self.calls.push("open_detail");
        }

        fn invalidate_size(&mut self) {
            self.calls.push("invalidate_size");
        }
    }

    const VIEWPORT: f64 = 1000.0;

    fn frame(scroll_top: f64) -> ScrollFrame {
        ScrollFrame {
            scroll_top,
            viewport_height: VIEWPORT,
            scroll_height: 7000.0,
            hero_height: 1000.0,
        }
    }

    fn layouts(config: &StoryConfig) -> Vec<SectionLayout> {
        config
            .sections
            .iter()
            .enumerate()
            .map(|(i, section)| SectionLayout {
                id: section.id.clone(),
                top: 1000.0 * (i + 1) as f64,
                height: 1000.0,
            })
            .collect()
    }

    fn resolve(command: &Command) -> Option<Event> {
        match command {
            Command::FetchPeriod(request) => Some(Event::PeriodLoaded(PeriodLoaded {
                token: request.token,
                time_point: request.time_point.clone(),
                records: fallback_for(&fallback_table(), &request.time_point.key()),
            })),
            _ => None,
        }
    }

    struct Harness<S> {
        engine: StoryEngine<S>,
        clock: Instant,
    }

    impl<S: MapSurface> Harness<S> {
        fn started(config: StoryConfig, surface: S, capabilities: Capabilities) -> Self {
            let sections = layouts(&config);
            let mut engine = StoryEngine::new(config, surface, capabilities);
            let commands = engine.start(&ContainerHandle::new("map-container"));
            let mut harness = Self {
                engine,
                clock: Instant::now(),
            };
            harness.settle(commands);
            harness.engine.dispatch(Event::SectionsMeasured(sections));
            harness
        }

        /// Resolves fetches in issue order, as an instant provider would.
        fn settle(&mut self, commands: Vec<Command>) -> Vec<Command> {
            let mut rest = Vec::new();
            for command in commands {
                match resolve(&command) {
                    Some(event) => {
                        let more = self.engine.dispatch(event);
                        rest.extend(self.settle(more));
                    }
                    None => rest.push(command),
                }
            }
            rest
        }

        fn send(&mut self, event: Event) -> Vec<Command> {
            let commands = self.engine.dispatch(event);
            self.settle(commands)
        }

        fn scroll_to(&mut self, scroll_top: f64) {
            self.clock += Duration::from_millis(150);
            let at = self.clock;
            self.send(Event::Scrolled {
                frame: frame(scroll_top),
                at,
            });
        }
    }

    fn headless(policy: HighlightPolicy) -> Harness<HeadlessSurface> {
        let config = StoryConfig {
            highlight_policy: policy,
            ..Default::default()
        };
        Harness::started(config, HeadlessSurface::new(), Capabilities::full())
    }

    #[test]
    fn start_loads_first_period_in_decorative_mode() {
        let harness = headless(HighlightPolicy::Restore);
        let state = harness.engine.state();
        assert_eq!(state.mode(), MapMode::Decorative);
        assert_eq!(state.time_index(), 0);
        assert_eq!(state.records().len(), 7);
        assert!(harness.engine.surface().scene().unwrap().flows.is_decorative());
    }

    #[test]
    fn failed_mount_shows_banner_and_goes_inert() {
        let mut engine = StoryEngine::new(
            StoryConfig::default(),
            HeadlessSurface::unavailable(),
            Capabilities::full(),
        );
        let commands = engine.start(&ContainerHandle::new("map-container"));
        assert_eq!(
            commands,
            vec![Command::ShowBanner {
                message: "Map library not available. Please check your internet connection and refresh the page."
                    .into(),
                lifetime: Duration::from_secs(5),
            }]
        );
        assert!(engine.dispatch(Event::TimelineItemClicked(1)).is_empty());
        assert_eq!(engine.state().time_index(), 0);
    }

    #[test]
    fn timeline_click_reports_progress_and_fill() {
        let mut harness = headless(HighlightPolicy::Restore);
        for (index, progress) in [(0, 0.0), (1, 50.0), (2, 100.0)] {
            harness.send(Event::TimelineItemClicked(index));
            let view = harness.engine.timeline_view();
            assert_eq!(view.progress_percent, progress);
            assert_eq!(view.active.iter().filter(|a| **a).count(), index + 1);
            assert_eq!(
                harness.engine.state().records_period().unwrap(),
                &harness.engine.timeline().points()[index]
            );
        }
        assert_eq!(harness.engine.state().mode(), MapMode::Interactive);
    }

    #[test]
    fn last_issued_period_wins_over_last_resolved() {
        let mut harness = headless(HighlightPolicy::Restore);
        let first = harness.engine.dispatch(Event::TimelineItemClicked(1));
        let second = harness.engine.dispatch(Event::TimelineItemClicked(2));

        // the later request resolves first
        for command in second.iter().chain(first.iter()) {
            if let Some(event) = resolve(command) {
                harness.engine.dispatch(event);
            }
        }

        let january = fallback_for(&fallback_table(), "01-2025");
        assert_eq!(harness.engine.state().records(), january.as_slice());
        assert_eq!(harness.engine.metrics().stale_discarded, 1);
    }

    #[test]
    fn clicking_two_cities_leaves_only_the_second_active() {
        let mut harness = headless(HighlightPolicy::Restore);
        harness.send(Event::TimelineItemClicked(0));
        harness.send(Event::CityClicked("nyc".into()));
        harness.send(Event::CityClicked("boston".into()));

        let scene = harness.engine.scene();
        let active: Vec<_> = scene.active_markers().map(|m| m.city_id.clone()).collect();
        assert_eq!(active, vec!["boston".to_string()]);
        for line in scene.flows.lines() {
            assert_eq!(line.emphasized, line.touches("boston"));
        }
        assert_eq!(harness.engine.surface().detail().unwrap().city_id, "boston");
    }

    #[test]
    fn closing_detail_clears_highlight_and_labels() {
        let mut harness = headless(HighlightPolicy::Restore);
        harness.send(Event::TimelineItemClicked(1));
        harness.send(Event::CityClicked("chicago".into()));
        assert!(!harness.engine.scene().labels.is_empty());

        harness.send(Event::DetailClosed);
        let scene = harness.engine.surface().scene().unwrap();
        assert!(harness.engine.state().highlighted().is_none());
        assert!(scene.labels.is_empty());
        assert!(harness.engine.surface().detail().is_none());
    }

    #[test]
    fn hero_round_trip_restores_interactive_scene() {
        let mut harness = headless(HighlightPolicy::Restore);
        harness.scroll_to(2000.0);
        assert_eq!(harness.engine.state().mode(), MapMode::Interactive);
        assert_eq!(harness.engine.state().highlighted(), Some("nyc"));
        let interactive = harness.engine.scene();

        harness.scroll_to(100.0);
        let decorative = harness.engine.scene();
        assert!(decorative.flows.is_decorative());
        assert!(decorative.markers.iter().all(|m| !m.interactive));

        harness.scroll_to(2000.0);
        assert_eq!(harness.engine.state().mode(), MapMode::Interactive);
        assert_eq!(harness.engine.scene(), interactive);
    }

    #[test]
    fn clear_policy_starts_clean_after_hero() {
        let mut harness = headless(HighlightPolicy::Clear);
        harness.scroll_to(2000.0);
        assert_eq!(harness.engine.state().highlighted(), Some("nyc"));
        harness.scroll_to(100.0);
        harness.scroll_to(2000.0);
        assert_eq!(harness.engine.state().mode(), MapMode::Interactive);
        assert!(harness.engine.state().highlighted().is_none());
    }

    #[test]
    fn sections_move_timeline_without_fetching() {
        let mut harness = headless(HighlightPolicy::Restore);
        harness.scroll_to(4000.0);
        assert_eq!(harness.engine.active_section().unwrap().id, "christmas-travel");
        assert_eq!(harness.engine.state().time_index(), 1);
        assert_eq!(harness.engine.state().highlighted(), Some("chicago"));
        assert_eq!(harness.engine.timeline_view().progress_percent, 50.0);
        // records still belong to the period loaded at start
        assert_eq!(harness.engine.state().records_period().unwrap().month, "11");

        harness.scroll_to(6000.0);
        assert_eq!(harness.engine.state().time_index(), 1);
        assert!(harness.engine.state().highlighted().is_none());
    }

    #[test]
    fn playback_runs_one_pass_and_stops() {
        let mut harness = headless(HighlightPolicy::Restore);
        let commands = harness.send(Event::PlayPauseClicked);
        assert_eq!(
            commands,
            vec![Command::StartPlayback {
                period: Duration::from_millis(3000)
            }]
        );

        assert!(harness.send(Event::PlaybackTick).is_empty());
        assert_eq!(harness.engine.state().time_index(), 1);
        assert!(harness.engine.timeline().is_playing());

        assert_eq!(harness.send(Event::PlaybackTick), vec![Command::StopPlayback]);
        assert_eq!(harness.engine.state().time_index(), 2);
        assert_eq!(harness.engine.state().records_period().unwrap().month, "01");
        assert!(!harness.engine.timeline().is_playing());
    }

    #[test]
    fn marker_click_selects_period_and_scrolls() {
        let mut harness = headless(HighlightPolicy::Restore);
        let commands = harness.send(Event::TimelineMarkerClicked {
            month: "12".into(),
            year: "2024".into(),
        });
        assert_eq!(
            commands,
            vec![Command::ScrollToSection("christmas-travel".into())]
        );
        assert_eq!(harness.engine.state().time_index(), 1);
    }

    #[test]
    fn journey_start_forces_interactive_and_scrolls() {
        let mut harness = headless(HighlightPolicy::Restore);
        let commands = harness.send(Event::JourneyStarted);
        assert_eq!(
            commands,
            vec![Command::ScrollToSection("thanksgiving-prep".into())]
        );
        assert_eq!(harness.engine.state().mode(), MapMode::Interactive);
    }

    #[test]
    fn scroll_bursts_are_coalesced_not_dropped() {
        let mut harness = headless(HighlightPolicy::Restore);
        let start = harness.clock + Duration::from_secs(1);
        harness.send(Event::Scrolled {
            frame: frame(300.0),
            at: start,
        });
        harness.send(Event::Scrolled {
            frame: frame(2000.0),
            at: start + Duration::from_millis(30),
        });
        assert_eq!(harness.engine.state().mode(), MapMode::Decorative);

        harness.send(Event::PacingTick {
            at: start + Duration::from_millis(120),
        });
        assert_eq!(harness.engine.state().mode(), MapMode::Interactive);
        assert_eq!(harness.engine.active_section().unwrap().id, "nyc-thanksgiving");
    }

    #[test]
    fn resize_is_debounced() {
        let config = StoryConfig::default();
        let mut harness = Harness::started(config, RecordingSurface::default(), Capabilities::default());
        let start = harness.clock;
        for offset in [0, 50, 120] {
            harness.send(Event::ViewportResized {
                at: start + Duration::from_millis(offset),
            });
        }
        harness.send(Event::PacingTick {
            at: start + Duration::from_millis(250),
        });
        harness.send(Event::PacingTick {
            at: start + Duration::from_millis(400),
        });
        let resizes = harness
            .engine
            .surface()
            .calls
            .iter()
            .filter(|c| **c == "invalidate_size")
            .count();
        assert_eq!(resizes, 1);
    }

    #[test]
    fn going_decorative_closes_popups_before_redraw() {
        let mut harness = Harness::started(
            StoryConfig::default(),
            RecordingSurface::default(),
            Capabilities::default(),
        );
        harness.scroll_to(2000.0);
        harness.surface_calls_reset();
        harness.scroll_to(100.0);
        assert_eq!(
            harness.engine.surface().calls,
            vec!["close_popups", "present"]
        );
        assert!(harness
            .engine
            .surface()
            .last
            .as_ref()
            .unwrap()
            .flows
            .is_decorative());
    }

    impl Harness<RecordingSurface> {
        fn surface_calls_reset(&mut self) {
            self.engine.surface_mut().calls.clear();
        }
    }

    #[test]
    fn static_effects_reveal_everything() {
        let harness = Harness::started(
            StoryConfig::default(),
            HeadlessSurface::new(),
            Capabilities::default(),
        );
        let reveals = harness.engine.section_reveals();
        assert_eq!(reveals.len(), 6);
        assert!(reveals.iter().all(|(_, reveal)| reveal.is_final()));
    }
}
