use iced::{
    time,
    widget::{
        button, column, progress_bar, row, scrollable,
        scrollable::{AbsoluteOffset, Viewport},
        text, Canvas, Column, Container, Row,
    },
    window, Alignment, Color, Element, Length, Subscription, Task, Theme,
};
use map_canvas::CanvasSurface;
use source::HttpSource;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tourcore::dataset::DatasetProvider;
use tourcore::map::PeriodLoaded;
use tourcore::story::{Capabilities, ScrollFrame, SectionLayout};
use tourcore::{Command, ContainerHandle, Event, StoryConfig, StoryEngine};

mod map_canvas;
mod source;

const MAP_CONTAINER: &str = "map-container";
const HERO_HEIGHT: f32 = 640.0;
const SECTION_HEIGHT: f32 = 720.0;
const FOOTER_HEIGHT: f32 = 240.0;
const PACING_INTERVAL: Duration = Duration::from_millis(50);

fn main() -> iced::Result {
    env_logger::init();
    iced::application(Visualizer::boot, Visualizer::update, Visualizer::view)
        .title(application_title)
        .subscription(application_subscription)
        .theme(application_theme)
        .run()
}

fn application_title(state: &Visualizer) -> String {
    let index = state.engine.timeline_view().index;
    match state.engine.timeline().points().get(index) {
        Some(point) if state.engine.is_ready() => format!("US Tourism Flow - {}", point.label),
        _ => "US Tourism Flow".to_string(),
    }
}

fn application_subscription(state: &Visualizer) -> Subscription<Message> {
    let pacing = time::every(PACING_INTERVAL).map(|_| Message::PacingTick);
    let resize = window::resize_events().map(|_| Message::Resized);
    if state.engine.timeline().is_playing() {
        let playback = time::every(state.engine.timeline().period()).map(|_| Message::PlaybackTick);
        Subscription::batch([pacing, resize, playback])
    } else {
        Subscription::batch([pacing, resize])
    }
}

fn application_theme(_: &Visualizer) -> Theme {
    Theme::Light
}

fn story_scroll_id() -> iced::widget::Id {
    iced::widget::Id::new("story")
}

/// Section boxes as laid out by [`Visualizer::view`]; the story column has no spacing.
fn section_layouts(config: &StoryConfig) -> Vec<SectionLayout> {
    config
        .sections
        .iter()
        .enumerate()
        .map(|(i, section)| SectionLayout {
            id: section.id.clone(),
            top: (HERO_HEIGHT + SECTION_HEIGHT * i as f32) as f64,
            height: SECTION_HEIGHT as f64,
        })
        .collect()
}

fn scroll_frame(viewport: &Viewport) -> ScrollFrame {
    ScrollFrame {
        scroll_top: viewport.absolute_offset().y as f64,
        viewport_height: viewport.bounds().height as f64,
        scroll_height: viewport.content_bounds().height as f64,
        hero_height: HERO_HEIGHT as f64,
    }
}

struct Visualizer {
    engine: StoryEngine<CanvasSurface>,
    provider: Arc<DatasetProvider<HttpSource>>,
    layouts: Vec<SectionLayout>,
    banner: Option<String>,
    history: Vec<String>,
}

#[derive(Debug, Clone)]
enum Message {
    Scrolled(Viewport),
    PacingTick,
    PlaybackTick,
    Resized,
    TimelineItem(usize),
    TimelineMarker(usize),
    PlayPause,
    CityClicked(String),
    DetailClosed,
    JourneyStarted,
    PeriodLoaded(PeriodLoaded),
    BannerExpired,
}

impl Visualizer {
    fn boot() -> (Self, Task<Message>) {
        let config = StoryConfig::default();
        let source = HttpSource::from_env();
        log::info!("[visualizer] dataset endpoint {}", source.url());
        let layouts = section_layouts(&config);

        let mut engine = StoryEngine::new(config, CanvasSurface::new(), Capabilities::full());
        let provider = Arc::new(DatasetProvider::new(source).with_metrics(engine.metrics_recorder()));
        let mut commands = engine.start(&ContainerHandle::new(MAP_CONTAINER));
        commands.extend(engine.dispatch(Event::SectionsMeasured(layouts.clone())));

        let mut state = Self {
            engine,
            provider,
            layouts,
            banner: None,
            history: Vec::new(),
        };
        let task = state.execute(commands);
        (state, task)
    }

    fn update(state: &mut Self, message: Message) -> Task<Message> {
        let event = match message {
            Message::Scrolled(viewport) => Event::Scrolled {
                frame: scroll_frame(&viewport),
                at: Instant::now(),
            },
            Message::PacingTick => Event::PacingTick { at: Instant::now() },
            Message::PlaybackTick => Event::PlaybackTick,
            Message::Resized => Event::ViewportResized { at: Instant::now() },
            Message::TimelineItem(index) => Event::TimelineItemClicked(index),
            Message::TimelineMarker(index) => {
                let Some(point) = state.engine.timeline().points().get(index) else {
                    return Task::none();
                };
                Event::TimelineMarkerClicked {
                    month: point.month.clone(),
                    year: point.year.clone(),
                }
            }
            Message::PlayPause => Event::PlayPauseClicked,
            Message::CityClicked(id) => Event::CityClicked(id),
            Message::DetailClosed => Event::DetailClosed,
            Message::JourneyStarted => Event::JourneyStarted,
            Message::PeriodLoaded(loaded) => {
                state.push_history(format!(
                    "Loaded {} ({} cities)",
                    loaded.time_point.label,
                    loaded.records.len()
                ));
                Event::PeriodLoaded(loaded)
            }
            Message::BannerExpired => {
                state.banner = None;
                return Task::none();
            }
        };
        let commands = state.engine.dispatch(event);
        state.execute(commands)
    }

    fn execute(&mut self, commands: Vec<Command>) -> Task<Message> {
        let tasks: Vec<Task<Message>> = commands
            .into_iter()
            .map(|command| match command {
                Command::FetchPeriod(request) => {
                    let provider = self.provider.clone();
                    Task::perform(
                        async move { provider.resolve(request).await },
                        Message::PeriodLoaded,
                    )
                }
                Command::StartPlayback { period } => {
                    self.push_history(format!("Playback every {} ms", period.as_millis()));
                    Task::none()
                }
                Command::StopPlayback => {
                    self.push_history("Playback stopped".to_string());
                    Task::none()
                }
                Command::ScrollToSection(id) => {
                    match self.layouts.iter().find(|layout| layout.id == id) {
                        Some(layout) => iced::widget::operation::scroll_to(
                            story_scroll_id(),
                            AbsoluteOffset {
                                x: 0.0,
                                y: layout.top as f32,
                            },
                        ),
                        None => Task::none(),
                    }
                }
                Command::ShowBanner { message, lifetime } => {
                    self.push_history(format!("Banner: {}", message));
                    self.banner = Some(message);
                    Task::perform(tokio::time::sleep(lifetime), |_| Message::BannerExpired)
                }
            })
            .collect();
        Task::batch(tasks)
    }

    fn view(state: &Self) -> Element<'_, Message> {
        let chrome = state.engine.chrome();
        let header_title = if chrome.map(|c| c.header_scrolled).unwrap_or(false) {
            text("US Tourism Flow").size(18)
        } else {
            text("US Tourism Flow").size(26)
        };
        let header = column![
            header_title,
            progress_bar(0.0..=1.0, chrome.map(|c| c.progress as f32).unwrap_or(0.0)),
        ]
        .spacing(6)
        .padding(10);

        let mut banner = Column::new();
        if let Some(message) = &state.banner {
            banner = banner.push(
                Container::new(text(message.clone()).size(14).color(Color::from_rgb(0.8, 0.1, 0.1)))
                    .padding(10),
            );
        }

        let row = row![state.story_column(), state.map_column()]
            .spacing(20)
            .align_y(Alignment::Start)
            .padding(10);

        Container::new(column![header, banner, row])
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn story_column(&self) -> Element<'_, Message> {
        let indicator_hidden = self
            .engine
            .chrome()
            .map(|c| c.indicator_hidden)
            .unwrap_or(false);
        let mut hero = column![
            text("How America Travels").size(36),
            text("Follow a year of domestic tourism, city by city.").size(16),
            button("Start the journey").on_press(Message::JourneyStarted).padding(10),
        ]
        .spacing(14);
        if !indicator_hidden {
            hero = hero.push(text("Scroll to explore").size(12));
        }

        let reveals = self.engine.section_reveals();
        let active_id = self.engine.active_section().map(|s| s.id.clone());
        let points = self.engine.timeline().points();

        let mut story = Column::new().push(
            Container::new(hero)
                .height(Length::Fixed(HERO_HEIGHT))
                .padding(20),
        );
        for section in self.engine.sections() {
            let opacity = reveals
                .iter()
                .find(|(id, _)| *id == section.id)
                .map(|(_, reveal)| reveal.opacity)
                .unwrap_or(1.0);
            let ink = Color {
                a: opacity,
                ..Color::BLACK
            };
            let mut body = column![text(section.title.clone()).size(24).color(ink)].spacing(10);
            if active_id.as_deref() == Some(section.id.as_str()) {
                body = body.push(text("Now reading").size(12).color(ink));
            }
            if let (Some(month), Some(year)) = (&section.month, &section.year) {
                if let Some(index) = points.iter().position(|p| p.matches(month, year)) {
                    body = body.push(
                        button(text(format!("Show {} on the map", points[index].label)).size(14))
                            .on_press(Message::TimelineMarker(index)),
                    );
                }
            }
            if let Some(city) = &section.highlight {
                body = body.push(text(format!("Featured city: {}", city)).size(14).color(ink));
            }
            story = story.push(
                Container::new(body)
                    .height(Length::Fixed(SECTION_HEIGHT))
                    .padding(20),
            );
        }
        story = story.push(
            Container::new(text("Data: monthly visitor estimates per city.").size(12))
                .height(Length::Fixed(FOOTER_HEIGHT))
                .padding(20),
        );

        scrollable(story)
            .id(story_scroll_id())
            .on_scroll(Message::Scrolled)
            .width(Length::FillPortion(2))
            .height(Length::Fill)
            .into()
    }

    fn map_column(&self) -> Element<'_, Message> {
        let map: Element<'_, Message> = match self.engine.surface().program() {
            Some(program) => Canvas::new(program)
                .width(Length::Fill)
                .height(Length::Fixed(420.0))
                .into(),
            None => Container::new(text("Map unavailable").size(14))
                .height(Length::Fixed(420.0))
                .into(),
        };

        let view = self.engine.timeline_view();
        let timeline = self.engine.timeline().points().iter().enumerate().fold(
            Row::new().spacing(6),
            |row, (i, point)| {
                let active = view.active.get(i).copied().unwrap_or(false);
                let label = button(text(point.label.clone()).size(12)).on_press(Message::TimelineItem(i));
                row.push(if active {
                    label.style(button::primary)
                } else {
                    label.style(button::secondary)
                })
            },
        );
        let play_label = if self.engine.timeline().is_playing() { "Pause" } else { "Play" };
        let controls = row![
            button(play_label).on_press(Message::PlayPause).padding(8),
            text(format!("Progress: {:.0}%", view.progress_percent)).size(14),
        ]
        .spacing(12)
        .align_y(Alignment::Center);

        let interactive = !self.engine.state().mode().is_decorative();
        let cities = self.engine.map().catalog().iter().fold(
            Row::new().spacing(4),
            |row, city| {
                row.push(
                    button(text(format!("{} {}", city.emoji, city.display_name)).size(11))
                        .on_press_maybe(interactive.then(|| Message::CityClicked(city.id.clone()))),
                )
            },
        );

        let mut panel = column![
            map,
            progress_bar(0.0..=100.0, view.progress_percent as f32),
            timeline,
            controls,
            scrollable(cities).direction(scrollable::Direction::Horizontal(
                scrollable::Scrollbar::default()
            )),
        ]
        .spacing(10);

        if let Some(detail) = self.engine.surface().detail() {
            let attractions = detail
                .attractions
                .iter()
                .fold(Column::new().spacing(2), |col, item| {
                    col.push(text(format!("- {}", item)).size(12))
                });
            panel = panel.push(
                Container::new(
                    column![
                        text(format!("{} {}, {}", detail.glyph, detail.name, detail.state_code))
                            .size(20),
                        text(format!("Visitors: {}", detail.visitors)).size(14),
                        text(format!("Revenue: {}", detail.revenue)).size(14),
                        text(format!("Satisfaction: {}", detail.rating.label())).size(14),
                        text(format!("Average stay: {}", detail.avg_stay)).size(14),
                        text(detail.description.clone()).size(13),
                        attractions,
                        button("Close").on_press(Message::DetailClosed),
                    ]
                    .spacing(6),
                )
                .padding(12),
            );
        }

        let history = self
            .history
            .iter()
            .rev()
            .take(8)
            .fold(Column::new().spacing(2), |col, entry| {
                col.push(text(entry.clone()).size(11))
            });
        panel = panel.push(text("Activity").size(14)).push(history);

        Container::new(panel)
            .width(Length::FillPortion(3))
            .into()
    }

    fn push_history(&mut self, entry: String) {
        self.history.push(entry);
        if self.history.len() > 40 {
            self.history.remove(0);
        }
    }
}
