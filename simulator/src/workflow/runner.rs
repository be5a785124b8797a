use crate::gui_bridge::model::VisualizationModel;
use crate::workflow::config::{ScriptStep, SessionConfig};
use serde::Serialize;
use std::future::pending;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::{interval, interval_at, sleep, sleep_until, Instant, Interval, MissedTickBehavior};
use tourcore::dataset::{DatasetProvider, DatasetSource, JsonFileSource, StaticSource};
use tourcore::map::{HeadlessSurface, PeriodRequest};
use tourcore::model::{DatasetTable, GeoPoint};
use tourcore::prelude::{ContainerHandle, DatasetResult};
use tourcore::story::{Command, Event, ScrollFrame};
use tourcore::telemetry::MetricsSnapshot;
use tourcore::StoryEngine;

/// Granularity at which pending scroll/resize work is flushed.
const PACING_TICK: Duration = Duration::from_millis(50);
/// Upper bound on the final wait for in-flight fetches and playback.
const SETTLE_LIMIT: Duration = Duration::from_secs(60);

/// Dataset backing a session.
pub enum SessionSource {
    File(JsonFileSource),
    Memory(StaticSource),
}

impl SessionSource {
    pub fn from_path(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => SessionSource::File(JsonFileSource::new(path)),
            None => SessionSource::Memory(StaticSource::default()),
        }
    }
}

impl DatasetSource for SessionSource {
    async fn load(&self) -> DatasetResult<DatasetTable> {
        match self {
            SessionSource::File(source) => source.load().await,
            SessionSource::Memory(source) => source.load().await,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub steps_run: usize,
    pub banners: Vec<String>,
    pub scrolls_requested: Vec<String>,
    pub final_scroll_top: f64,
    pub metrics: MetricsSnapshot,
    pub model: VisualizationModel,
}

#[derive(Clone)]
pub struct SessionRunner {
    config: SessionConfig,
}

impl SessionRunner {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Plays the scripted session against a headless map and reports the end state.
    pub async fn run(&self) -> anyhow::Result<SessionReport> {
        let config = &self.config;
        let mut surface = HeadlessSurface::new();
        if !config.page_containers.is_empty() {
            let ids: Vec<&str> = config.page_containers.iter().map(String::as_str).collect();
            surface = surface.with_containers(&ids);
        }

        let engine = StoryEngine::new(config.story.clone(), surface, config.capabilities);
        let provider = DatasetProvider::new(SessionSource::from_path(config.dataset.clone()))
            .with_metrics(engine.metrics_recorder());
        let (tx, rx) = unbounded_channel();

        let mut session = Session {
            config,
            engine,
            provider: Arc::new(provider),
            tx,
            rx,
            playback: None,
            pacing: interval(PACING_TICK),
            in_flight: 0,
            issued: 0,
            scroll_top: 0.0,
            banners: Vec::new(),
            scrolls_requested: Vec::new(),
        };
        session.pacing.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let commands = session
            .engine
            .start(&ContainerHandle::new(config.container.clone()));
        session.execute(commands);
        if !session.engine.is_ready() {
            log::warn!("map failed to initialize, skipping scripted steps");
            return Ok(session.report(0));
        }
        let layouts = config.page.layouts(&config.story);
        session.dispatch(Event::SectionsMeasured(layouts));

        let mut steps_run = 0;
        for step in &config.steps {
            log::debug!("step {}: {:?}", steps_run, step);
            session.step(step).await;
            steps_run += 1;
        }
        session.settle().await;

        Ok(session.report(steps_run))
    }
}

struct Session<'a> {
    config: &'a SessionConfig,
    engine: StoryEngine<HeadlessSurface>,
    provider: Arc<DatasetProvider<SessionSource>>,
    tx: UnboundedSender<Event>,
    rx: UnboundedReceiver<Event>,
    playback: Option<Interval>,
    pacing: Interval,
    in_flight: usize,
    issued: usize,
    scroll_top: f64,
    banners: Vec<String>,
    scrolls_requested: Vec<String>,
}

impl Session<'_> {
    async fn step(&mut self, step: &ScriptStep) {
        match step {
            ScriptStep::Wait { ms } => {
                self.pump_until(Instant::now() + Duration::from_millis(*ms))
                    .await
            }
            ScriptStep::Scroll { top } => self.scroll_to(*top),
            ScriptStep::ScrollToSection { id } => self.scroll_to_section(id),
            ScriptStep::ClickTimeline { index } => {
                self.dispatch(Event::TimelineItemClicked(*index))
            }
            ScriptStep::ClickMarker { month, year } => self.dispatch(Event::TimelineMarkerClicked {
                month: month.clone(),
                year: year.clone(),
            }),
            ScriptStep::PlayPause => self.dispatch(Event::PlayPauseClicked),
            ScriptStep::ClickCity { id } => self.dispatch(Event::CityClicked(id.clone())),
            ScriptStep::CloseDetail => self.dispatch(Event::DetailClosed),
            ScriptStep::Hover { lat, lon } => {
                self.dispatch(Event::NearestCity(GeoPoint::new(*lat, *lon)))
            }
            ScriptStep::Resize => self.dispatch(Event::ViewportResized {
                at: Instant::now().into_std(),
            }),
            ScriptStep::StartJourney => self.dispatch(Event::JourneyStarted),
        }
    }

    fn dispatch(&mut self, event: Event) {
        let commands = self.engine.dispatch(event);
        self.execute(commands);
    }

    fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::FetchPeriod(request) => self.spawn_fetch(request),
                Command::StartPlayback { period } => {
                    let mut ticks = interval_at(Instant::now() + period, period);
                    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    self.playback = Some(ticks);
                }
                Command::StopPlayback => self.playback = None,
                Command::ScrollToSection(id) => {
                    self.scrolls_requested.push(id.clone());
                    self.scroll_to_section(&id);
                }
                Command::ShowBanner { message, lifetime } => {
                    log::warn!("banner ({}s): {}", lifetime.as_secs(), message);
                    self.banners.push(message);
                }
            }
        }
    }

    fn spawn_fetch(&mut self, request: PeriodRequest) {
        let latency = Duration::from_millis(self.config.latency_for(self.issued));
        self.issued += 1;
        self.in_flight += 1;

        let provider = self.provider.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            sleep(latency).await;
            let loaded = provider.resolve(request).await;
            if tx.send(Event::PeriodLoaded(loaded)).is_err() {
                log::debug!("session ended before period resolved");
            }
        });
    }

    fn scroll_to(&mut self, top: f64) {
        let page = &self.config.page;
        let max_top = (page.scroll_height(&self.config.story) - page.viewport_height).max(0.0);
        self.scroll_top = top.clamp(0.0, max_top);
        let frame = ScrollFrame {
            scroll_top: self.scroll_top,
            viewport_height: page.viewport_height,
            scroll_height: page.scroll_height(&self.config.story),
            hero_height: page.hero_height,
        };
        self.dispatch(Event::Scrolled {
            frame,
            at: Instant::now().into_std(),
        });
    }

    fn scroll_to_section(&mut self, id: &str) {
        let top = self
            .config
            .page
            .layouts(&self.config.story)
            .into_iter()
            .find(|layout| layout.id == id)
            .map(|layout| layout.top);
        match top {
            Some(top) => self.scroll_to(top),
            None => log::warn!("no section `{}` on the page", id),
        }
    }

    async fn pump_until(&mut self, deadline: Instant) {
        loop {
            tokio::select! {
                _ = sleep_until(deadline) => break,
                Some(event) = self.rx.recv() => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    self.dispatch(event);
                }
                _ = next_tick(&mut self.playback) => self.dispatch(Event::PlaybackTick),
                _ = self.pacing.tick() => self.dispatch(Event::PacingTick {
                    at: Instant::now().into_std(),
                }),
            }
        }
    }

    /// Waits for outstanding fetches, playback and one last pacing window.
    async fn settle(&mut self) {
        let limit = Instant::now() + SETTLE_LIMIT;
        while (self.in_flight > 0 || self.playback.is_some()) && Instant::now() < limit {
            self.pump_until(Instant::now() + PACING_TICK).await;
        }
        self.pump_until(Instant::now() + PACING_TICK * 4).await;
    }

    fn report(&self, steps_run: usize) -> SessionReport {
        SessionReport {
            steps_run,
            banners: self.banners.clone(),
            scrolls_requested: self.scrolls_requested.clone(),
            final_scroll_top: self.scroll_top,
            metrics: self.engine.metrics(),
            model: VisualizationModel::capture(&self.engine),
        }
    }
}

async fn next_tick(playback: &mut Option<Interval>) {
    match playback {
        Some(ticks) => {
            ticks.tick().await;
        }
        None => pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::config::ScriptStep::*;
    use tourcore::state::MapMode;

    fn session(steps: Vec<ScriptStep>, latency: Vec<u64>) -> SessionConfig {
        SessionConfig {
            steps,
            fetch_latency_ms: latency,
            ..SessionConfig::from_args(3000, Vec::new(), None)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn playback_advances_every_period_then_stops() {
        let cfg = session(
            vec![ClickTimeline { index: 0 }, PlayPause, Wait { ms: 2900 }],
            vec![10],
        );
        let report = SessionRunner::new(cfg.clone()).run().await.unwrap();
        // settle waits out the remaining ticks
        assert_eq!(report.model.time_index, 2);
        assert!(!report.model.playing);
        assert_eq!(report.model.period_label.as_deref(), Some("January 2025"));

        let cfg = session(
            vec![ClickTimeline { index: 0 }, PlayPause, Wait { ms: 3100 }, PlayPause],
            vec![10],
        );
        let report = SessionRunner::new(cfg).run().await.unwrap();
        assert_eq!(report.model.time_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_early_fetch_does_not_overwrite_later_click() {
        let cfg = session(
            vec![
                Wait { ms: 10 },
                ClickTimeline { index: 1 },
                ClickTimeline { index: 2 },
            ],
            vec![0, 800, 20],
        );
        let report = SessionRunner::new(cfg).run().await.unwrap();
        assert_eq!(report.model.period_label.as_deref(), Some("January 2025"));
        assert_eq!(report.metrics.stale_discarded, 1);
        assert_eq!(report.metrics.fallbacks_served, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn scrolling_into_story_switches_map_to_interactive() {
        let cfg = session(
            vec![Scroll { top: 2000.0 }, Wait { ms: 200 }, Scroll { top: 2100.0 }],
            Vec::new(),
        );
        let report = SessionRunner::new(cfg).run().await.unwrap();
        assert_eq!(report.model.mode, MapMode::Interactive);
        assert_eq!(report.model.active_section.as_deref(), Some("nyc-thanksgiving"));
        assert_eq!(report.model.highlighted.as_deref(), Some("nyc"));
        assert!(!report.model.decorative);
    }

    #[tokio::test(start_paused = true)]
    async fn marker_click_scrolls_to_its_section() {
        let cfg = session(
            vec![ClickMarker {
                month: "01".into(),
                year: "2025".into(),
            }],
            Vec::new(),
        );
        let report = SessionRunner::new(cfg).run().await.unwrap();
        assert_eq!(report.scrolls_requested, vec!["january-patterns".to_string()]);
        assert_eq!(report.model.highlighted.as_deref(), Some("dc"));
        assert_eq!(report.model.time_index, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_container_reports_banner() {
        let cfg = SessionConfig {
            page_containers: vec!["sidebar".into()],
            ..session(vec![PlayPause], Vec::new())
        };
        let report = SessionRunner::new(cfg).run().await.unwrap();
        assert_eq!(report.steps_run, 0);
        assert_eq!(
            report.banners,
            vec!["Could not find map container element.".to_string()]
        );
    }
}
