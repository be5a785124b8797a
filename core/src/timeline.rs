use crate::model::TimePoint;
use crate::state::VisualizationState;
use crate::telemetry::LogManager;
use std::time::Duration;

/// Rendered state of the timeline bar.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineView {
    pub index: usize,
    pub progress_percent: f64,
    /// One flag per time point: chronologically at or before the selection.
    pub active: Vec<bool>,
}

/// Outcome of an accepted index change.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineUpdate {
    pub view: TimelineView,
    /// Period the map has to load; `None` when propagation was suppressed.
    pub period: Option<TimePoint>,
}

/// What a playback tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Idle,
    Advanced(TimelineUpdate),
    /// Advanced onto the last time point and stopped playing.
    Finished(TimelineUpdate),
}

impl TickOutcome {
    pub fn update(&self) -> Option<&TimelineUpdate> {
        match self {
            TickOutcome::Idle => None,
            TickOutcome::Advanced(update) | TickOutcome::Finished(update) => Some(update),
        }
    }
}

/// Index selection, progressive fill and the playback state machine.
///
/// The controller does not own a timer: the host drives [`TimelineController::tick`]
/// at [`TimelineController::period`] while [`TimelineController::is_playing`].
pub struct TimelineController {
    points: Vec<TimePoint>,
    playing: bool,
    period: Duration,
    logger: LogManager,
}

impl TimelineController {
    pub fn new(points: Vec<TimePoint>, period: Duration) -> Self {
        Self {
            points,
            playing: false,
            period,
            logger: LogManager::new("timeline"),
        }
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn position_of(&self, month: &str, year: &str) -> Option<usize> {
        self.points.iter().position(|p| p.matches(month, year))
    }

    /// Selects `index`; out-of-range values are ignored.
    pub fn set_index(
        &mut self,
        state: &mut VisualizationState,
        index: usize,
        propagate: bool,
    ) -> Option<TimelineUpdate> {
        if index >= self.points.len() || !state.set_time_index(index) {
            self.logger
                .trace(&format!("ignoring out-of-range time index {}", index));
            return None;
        }

        let point = &self.points[index];
        self.logger.trace(&format!(
            "time index {} ({}), propagate={}",
            index, point.label, propagate
        ));
        Some(TimelineUpdate {
            view: self.view(index),
            period: propagate.then(|| point.clone()),
        })
    }

    /// Progress bar and progressive fill for `index`.
    pub fn view(&self, index: usize) -> TimelineView {
        let index = index.min(self.points.len().saturating_sub(1));
        let progress_percent = if self.points.len() <= 1 {
            100.0
        } else {
            index as f64 / (self.points.len() - 1) as f64 * 100.0
        };

        let selected = self.points.get(index).and_then(TimePoint::date);
        let active = self
            .points
            .iter()
            .enumerate()
            .map(|(i, point)| match (point.date(), selected) {
                (Some(date), Some(selected)) => date <= selected,
                _ => i <= index,
            })
            .collect();

        TimelineView {
            index,
            progress_percent,
            active,
        }
    }

    /// Returns true when playback actually started.
    pub fn play(&mut self) -> bool {
        if self.playing {
            return false;
        }
        self.logger.record("starting playback");
        self.playing = true;
        true
    }

    /// Returns true when playback was running.
    pub fn pause(&mut self) -> bool {
        if !self.playing {
            return false;
        }
        self.logger.record("pausing playback");
        self.playing = false;
        true
    }

    /// New playing state.
    pub fn toggle(&mut self) -> bool {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
        self.playing
    }

    /// One playback step: `(index + 1) mod N`, stopping once the last index is shown.
    pub fn tick(&mut self, state: &mut VisualizationState) -> TickOutcome {
        if !self.playing || self.points.is_empty() {
            return TickOutcome::Idle;
        }
        let next = (state.time_index() + 1) % self.points.len();
        let Some(update) = self.set_index(state, next, true) else {
            self.playing = false;
            return TickOutcome::Idle;
        };
        if next == self.points.len() - 1 {
            self.logger.record("playback reached the last time point");
            self.playing = false;
            TickOutcome::Finished(update)
        } else {
            TickOutcome::Advanced(update)
        }
    }
}
