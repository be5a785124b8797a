use crate::model::TimePoint;
use crate::prelude::CityId;
use crate::state::MapMode;
use crate::telemetry::LogManager;
use serde::{Deserialize, Serialize};

/// A narrative section and the period/city it talks about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSpec {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    /// City to highlight while the section is active; `None` clears.
    #[serde(default)]
    pub highlight: Option<CityId>,
}

impl SectionSpec {
    pub fn new(
        id: &str,
        title: &str,
        period: Option<(&str, &str)>,
        highlight: Option<&str>,
    ) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            month: period.map(|(month, _)| month.to_string()),
            year: period.map(|(_, year)| year.to_string()),
            highlight: highlight.map(str::to_string),
        }
    }

    pub fn matches_period(&self, month: &str, year: &str) -> bool {
        self.month.as_deref() == Some(month) && self.year.as_deref() == Some(year)
    }

    pub fn default_story() -> Vec<SectionSpec> {
        vec![
            SectionSpec::new(
                "thanksgiving-prep",
                "Thanksgiving Preparations",
                Some(("11", "2024")),
                None,
            ),
            SectionSpec::new(
                "nyc-thanksgiving",
                "New York City: Thanksgiving Parade Magic",
                Some(("11", "2024")),
                Some("nyc"),
            ),
            SectionSpec::new(
                "thanksgiving-peak",
                "Las Vegas: Holiday Weekend Getaway",
                Some(("11", "2024")),
                Some("lasvegas"),
            ),
            SectionSpec::new(
                "christmas-travel",
                "Chicago: Winter Wonderland",
                Some(("12", "2024")),
                Some("chicago"),
            ),
            SectionSpec::new(
                "january-patterns",
                "Washington D.C.: New Year, New Politics",
                Some(("01", "2025")),
                Some("dc"),
            ),
            SectionSpec::new("conclusion", "Looking Forward", None, None),
        ]
    }
}

/// Measured position of a section in document coordinates (px).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionLayout {
    pub id: String,
    pub top: f64,
    pub height: f64,
}

impl SectionLayout {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    fn visible_px(&self, frame: &ScrollFrame) -> f64 {
        let top = self.top.max(frame.scroll_top);
        let bottom = self.bottom().min(frame.viewport_bottom());
        (bottom - top).max(0.0)
    }

    /// Visible share, relative to what can fit in the viewport at once.
    pub fn visible_fraction(&self, frame: &ScrollFrame) -> f64 {
        let capacity = self.height.min(frame.viewport_height);
        if capacity <= 0.0 {
            return 0.0;
        }
        self.visible_px(frame) / capacity
    }

    pub fn straddles(&self, line: f64) -> bool {
        self.top <= line && line < self.bottom()
    }
}

/// Scroll geometry sampled by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollFrame {
    pub scroll_top: f64,
    pub viewport_height: f64,
    pub scroll_height: f64,
    pub hero_height: f64,
}

impl ScrollFrame {
    pub fn viewport_bottom(&self) -> f64 {
        self.scroll_top + self.viewport_height
    }
}

/// Picks the single active section from scroll geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SectionDetector {
    /// Sections at least `threshold` visible are candidates; the one under the
    /// midline wins, else the most visible one. Without candidates the section
    /// under the midline is taken.
    VisibilityThreshold { threshold: f64, midline: f64 },
    /// The section whose bounds straddle `fraction` of the viewport height.
    Midline { fraction: f64 },
}

impl SectionDetector {
    /// Index into `layouts`; when nothing qualifies the previous selection stays.
    pub fn select(
        &self,
        layouts: &[SectionLayout],
        frame: &ScrollFrame,
        previous: Option<usize>,
    ) -> Option<usize> {
        let selected = match *self {
            SectionDetector::VisibilityThreshold { threshold, midline } => {
                let line = frame.scroll_top + frame.viewport_height * midline;
                let candidates: Vec<(usize, f64)> = layouts
                    .iter()
                    .enumerate()
                    .map(|(i, layout)| (i, layout.visible_fraction(frame)))
                    .filter(|(_, fraction)| *fraction >= threshold)
                    .collect();
                candidates
                    .iter()
                    .find(|(i, _)| layouts[*i].straddles(line))
                    .or_else(|| {
                        candidates.iter().fold(None, |best: Option<&(usize, f64)>, c| {
                            match best {
                                Some(b) if b.1 >= c.1 => Some(b),
                                _ => Some(c),
                            }
                        })
                    })
                    .map(|(i, _)| *i)
                    .or_else(|| layouts.iter().position(|layout| layout.straddles(line)))
            }
            SectionDetector::Midline { fraction } => {
                let line = frame.scroll_top + frame.viewport_height * fraction;
                layouts.iter().position(|layout| layout.straddles(line))
            }
        };
        selected.or(previous)
    }
}

/// Header, scroll indicator and reading progress derived from the scroll position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageChrome {
    pub header_scrolled: bool,
    pub indicator_hidden: bool,
    /// Share of the page scrolled, in `[0, 1]`.
    pub progress: f64,
}

impl PageChrome {
    pub const HEADER_OFFSET: f64 = 50.0;
    pub const INDICATOR_OFFSET: f64 = 100.0;

    pub fn from_frame(frame: &ScrollFrame) -> Self {
        let scrollable = frame.scroll_height - frame.viewport_height;
        let progress = if scrollable > 0.0 {
            (frame.scroll_top / scrollable).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            header_scrolled: frame.scroll_top > Self::HEADER_OFFSET,
            indicator_hidden: frame.scroll_top > Self::INDICATOR_OFFSET,
            progress,
        }
    }
}

/// The section that just became active.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionEntry {
    pub id: String,
    pub highlight: Option<CityId>,
    /// Time index derived from the section's month; `None` leaves the timeline alone.
    pub time_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollObservation {
    pub chrome: PageChrome,
    /// Set only when the hero threshold was crossed by this frame.
    pub mode_change: Option<MapMode>,
    pub entered: Option<SectionEntry>,
}

/// Maps scroll geometry onto map mode changes and section entries.
pub struct SectionOrchestrator {
    sections: Vec<SectionSpec>,
    layouts: Vec<SectionLayout>,
    detector: SectionDetector,
    hero_threshold_ratio: f64,
    past_hero: bool,
    active: Option<usize>,
    logger: LogManager,
}

impl SectionOrchestrator {
    pub fn new(sections: Vec<SectionSpec>, detector: SectionDetector, hero_threshold_ratio: f64) -> Self {
        Self {
            sections,
            layouts: Vec::new(),
            detector,
            hero_threshold_ratio,
            past_hero: false,
            active: None,
            logger: LogManager::new("story"),
        }
    }

    pub fn sections(&self) -> &[SectionSpec] {
        &self.sections
    }

    pub fn layouts(&self) -> &[SectionLayout] {
        &self.layouts
    }

    pub fn detector(&self) -> SectionDetector {
        self.detector
    }

    pub fn active_section(&self) -> Option<&SectionSpec> {
        let layout = self.layouts.get(self.active?)?;
        self.section(&layout.id)
    }

    pub fn section(&self, id: &str) -> Option<&SectionSpec> {
        self.sections.iter().find(|section| section.id == id)
    }

    /// Replaces the measured layouts; entries for unknown sections are dropped.
    pub fn measure(&mut self, mut layouts: Vec<SectionLayout>) {
        layouts.retain(|layout| {
            let known = self.sections.iter().any(|section| section.id == layout.id);
            if !known {
                self.logger
                    .warn(&format!("ignoring layout for unknown section `{}`", layout.id));
            }
            known
        });
        layouts.sort_by(|a, b| a.top.total_cmp(&b.top));

        let active_id = self
            .active
            .and_then(|i| self.layouts.get(i))
            .map(|layout| layout.id.clone());
        self.active = active_id.and_then(|id| layouts.iter().position(|l| l.id == id));
        self.layouts = layouts;
    }

    /// First section about the given period.
    pub fn first_section_for(&self, month: &str, year: &str) -> Option<&SectionSpec> {
        self.sections.iter().find(|s| s.matches_period(month, year))
    }

    /// First section the reader lands on when starting the story.
    pub fn first_section(&self) -> Option<&SectionSpec> {
        self.sections.first()
    }

    pub fn observe(&mut self, frame: &ScrollFrame, points: &[TimePoint]) -> ScrollObservation {
        let chrome = PageChrome::from_frame(frame);

        let past_hero = frame.scroll_top > frame.hero_height * self.hero_threshold_ratio;
        let mode_change = (past_hero != self.past_hero).then(|| {
            self.past_hero = past_hero;
            if past_hero {
                MapMode::Interactive
            } else {
                MapMode::Decorative
            }
        });

        let selected = self.detector.select(&self.layouts, frame, self.active);
        let entered = if selected != self.active {
            self.active = selected;
            selected
                .and_then(|i| self.layouts.get(i))
                .and_then(|layout| self.section(&layout.id))
                .map(|section| {
                    self.logger
                        .record(&format!("entered section `{}`", section.id));
                    SectionEntry {
                        id: section.id.clone(),
                        highlight: section.highlight.clone(),
                        time_index: time_index_for(section, points),
                    }
                })
        } else {
            None
        };

        ScrollObservation {
            chrome,
            mode_change,
            entered,
        }
    }
}

/// First time point with the section's month, else the last one.
pub fn time_index_for(section: &SectionSpec, points: &[TimePoint]) -> Option<usize> {
    let month = section.month.as_deref()?;
    if points.is_empty() {
        return None;
    }
    Some(
        points
            .iter()
            .position(|point| point.month == month)
            .unwrap_or(points.len() - 1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: f64 = 1000.0;

    fn frame(scroll_top: f64) -> ScrollFrame {
        ScrollFrame {
            scroll_top,
            viewport_height: VIEWPORT,
            scroll_height: 7000.0,
            hero_height: 1000.0,
        }
    }

    /// Hero occupies 0..1000, then one 1000px section after another.
    fn stacked_layouts() -> Vec<SectionLayout> {
        SectionSpec::default_story()
            .iter()
            .enumerate()
            .map(|(i, section)| SectionLayout {
                id: section.id.clone(),
                top: 1000.0 * (i + 1) as f64,
                height: 1000.0,
            })
            .collect()
    }

    fn orchestrator(detector: SectionDetector) -> SectionOrchestrator {
        let mut orchestrator = SectionOrchestrator::new(SectionSpec::default_story(), detector, 0.7);
        orchestrator.measure(stacked_layouts());
        orchestrator
    }

    const VISIBILITY: SectionDetector = SectionDetector::VisibilityThreshold {
        threshold: 0.6,
        midline: 0.5,
    };
    const MIDLINE: SectionDetector = SectionDetector::Midline { fraction: 0.5 };

    #[test]
    fn detectors_agree_on_steady_state_selection() {
        let layouts = stacked_layouts();
        for scroll_top in [1000.0, 1300.0, 2450.0, 3000.0, 4200.0, 5900.0] {
            let frame = frame(scroll_top);
            let by_visibility = VISIBILITY.select(&layouts, &frame, None);
            let by_midline = MIDLINE.select(&layouts, &frame, None);
            assert_eq!(by_visibility, by_midline, "scroll_top {}", scroll_top);
            assert!(by_midline.is_some());
        }
    }

    #[test]
    fn jump_between_split_sections_leaves_no_stale_selection() {
        let layouts = stacked_layouts();
        let previous = VISIBILITY.select(&layouts, &frame(1000.0), None);
        assert_eq!(previous, Some(0));

        // 2450..3450 shows 55% of section 1 and 45% of section 2.
        let after_jump = frame(2450.0);
        assert_eq!(VISIBILITY.select(&layouts, &after_jump, previous), Some(1));
        assert_eq!(MIDLINE.select(&layouts, &after_jump, previous), Some(1));
        assert_eq!(VISIBILITY.select(&layouts, &after_jump, None), Some(1));
    }

    #[test]
    fn orchestrator_enters_section_on_split_viewport() {
        let mut orchestrator = orchestrator(VISIBILITY);
        let points = TimePoint::default_sequence();
        orchestrator.observe(&frame(1000.0), &points);
        let observation = orchestrator.observe(&frame(2450.0), &points);
        let expected = SectionSpec::default_story()[1].id.clone();
        assert_eq!(observation.entered.map(|entry| entry.id), Some(expected.clone()));
        assert_eq!(orchestrator.active_section().map(|s| s.id.clone()), Some(expected));
    }

    #[test]
    fn nothing_qualifying_keeps_previous() {
        let layouts = stacked_layouts();
        assert_eq!(MIDLINE.select(&layouts, &frame(0.0), Some(3)), Some(3));
        assert_eq!(VISIBILITY.select(&layouts, &frame(0.0), None), None);
    }

    #[test]
    fn tall_section_counts_as_visible_when_filling_viewport() {
        let layouts = vec![SectionLayout {
            id: "conclusion".into(),
            top: 0.0,
            height: 4000.0,
        }];
        assert_eq!(VISIBILITY.select(&layouts, &frame(1500.0), None), Some(0));
    }

    #[test]
    fn hero_threshold_switches_mode_once_per_crossing() {
        let mut orchestrator = orchestrator(MIDLINE);
        let points = TimePoint::default_sequence();
        assert_eq!(orchestrator.observe(&frame(500.0), &points).mode_change, None);
        assert_eq!(
            orchestrator.observe(&frame(750.0), &points).mode_change,
            Some(MapMode::Interactive)
        );
        assert_eq!(orchestrator.observe(&frame(900.0), &points).mode_change, None);
        assert_eq!(
            orchestrator.observe(&frame(200.0), &points).mode_change,
            Some(MapMode::Decorative)
        );
    }

    #[test]
    fn entering_sections_reports_highlight_and_time_index() {
        let mut orchestrator = orchestrator(VISIBILITY);
        let points = TimePoint::default_sequence();

        let entry = orchestrator.observe(&frame(2000.0), &points).entered.unwrap();
        assert_eq!(entry.id, "nyc-thanksgiving");
        assert_eq!(entry.highlight.as_deref(), Some("nyc"));
        assert_eq!(entry.time_index, Some(0));

        assert!(orchestrator.observe(&frame(2100.0), &points).entered.is_none());

        let entry = orchestrator.observe(&frame(5000.0), &points).entered.unwrap();
        assert_eq!(entry.id, "january-patterns");
        assert_eq!(entry.time_index, Some(2));

        let entry = orchestrator.observe(&frame(6000.0), &points).entered.unwrap();
        assert_eq!(entry.id, "conclusion");
        assert!(entry.highlight.is_none());
        assert!(entry.time_index.is_none());
    }

    #[test]
    fn chrome_follows_scroll_offsets() {
        let chrome = PageChrome::from_frame(&frame(60.0));
        assert!(chrome.header_scrolled);
        assert!(!chrome.indicator_hidden);
        let chrome = PageChrome::from_frame(&frame(9000.0));
        assert!(chrome.indicator_hidden);
        assert_eq!(chrome.progress, 1.0);
        assert_eq!(PageChrome::from_frame(&frame(3000.0)).progress, 0.5);
    }

    #[test]
    fn unknown_layouts_are_dropped_and_periods_resolve() {
        let mut orchestrator = orchestrator(MIDLINE);
        let mut layouts = stacked_layouts();
        layouts.push(SectionLayout {
            id: "footer".into(),
            top: 9000.0,
            height: 200.0,
        });
        orchestrator.measure(layouts);
        assert_eq!(orchestrator.layouts().len(), 6);
        assert_eq!(
            orchestrator.first_section_for("12", "2024").unwrap().id,
            "christmas-travel"
        );
        assert!(orchestrator.first_section_for("02", "2025").is_none());
    }
}
