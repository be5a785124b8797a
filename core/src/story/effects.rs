use crate::story::orchestrator::{SectionDetector, SectionLayout, ScrollFrame};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Optional facilities of the host page, probed once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Timeline/scroll-triggered animation support.
    pub animation: bool,
    /// Visibility observation of section elements.
    pub visibility_observer: bool,
}

impl Capabilities {
    pub fn full() -> Self {
        Self {
            animation: true,
            visibility_observer: true,
        }
    }
}

/// Presentation of an element: opacity, vertical offset in px and the
/// transition used to get there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reveal {
    pub opacity: f32,
    pub offset_y: f32,
    pub transition: Duration,
}

impl Reveal {
    pub const VISIBLE: Reveal = Reveal {
        opacity: 1.0,
        offset_y: 0.0,
        transition: Duration::ZERO,
    };

    pub fn hidden(offset_y: f32) -> Self {
        Self {
            opacity: 0.0,
            offset_y,
            transition: Duration::ZERO,
        }
    }

    pub fn is_final(&self) -> bool {
        self.opacity >= 1.0 && self.offset_y == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageElement {
    Logo,
    HeroContent,
    HeroTitle,
    HeroText,
    HeroButton,
    ScrollIndicator,
}

/// One step of the page-load entrance sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entrance {
    pub element: PageElement,
    pub from: Reveal,
    pub delay: Duration,
    pub duration: Duration,
}

/// Presentation policy chosen once from [`Capabilities`].
pub trait EffectsStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// How the active narrative section is picked from scroll geometry.
    fn detector(&self) -> SectionDetector;

    /// Entrance sequence played after the page loads.
    fn entrances(&self) -> Vec<Entrance>;

    /// Presentation of a section's content wrapper for the given frame.
    fn section_reveal(&self, layout: &SectionLayout, frame: &ScrollFrame) -> Reveal;
}

/// Content slides in once a section's top passes 70% of the viewport.
pub struct RichAnimation {
    detector: SectionDetector,
}

const SECTION_TRIGGER: f64 = 0.7;
const SECTION_OFFSET: f32 = 50.0;

impl EffectsStrategy for RichAnimation {
    fn name(&self) -> &'static str {
        "rich-animation"
    }

    fn detector(&self) -> SectionDetector {
        self.detector
    }

    fn entrances(&self) -> Vec<Entrance> {
        let ms = Duration::from_millis;
        let step = |element, offset_y, delay, duration| Entrance {
            element,
            from: Reveal::hidden(offset_y),
            delay: ms(delay),
            duration: ms(duration),
        };
        vec![
            step(PageElement::Logo, -30.0, 0, 800),
            step(PageElement::HeroContent, 30.0, 0, 1000),
            step(PageElement::HeroTitle, 20.0, 300, 800),
            step(PageElement::HeroText, 20.0, 500, 800),
            step(PageElement::HeroButton, 0.0, 800, 800),
            step(PageElement::ScrollIndicator, 20.0, 1200, 800),
        ]
    }

    fn section_reveal(&self, layout: &SectionLayout, frame: &ScrollFrame) -> Reveal {
        let trigger = frame.scroll_top + frame.viewport_height * SECTION_TRIGGER;
        if layout.top < trigger {
            Reveal {
                transition: Duration::from_millis(800),
                ..Reveal::VISIBLE
            }
        } else {
            Reveal::hidden(SECTION_OFFSET)
        }
    }
}

/// Everything appears in its final state immediately.
pub struct StaticFallback {
    detector: SectionDetector,
}

impl EffectsStrategy for StaticFallback {
    fn name(&self) -> &'static str {
        "static-fallback"
    }

    fn detector(&self) -> SectionDetector {
        self.detector
    }

    fn entrances(&self) -> Vec<Entrance> {
        Vec::new()
    }

    fn section_reveal(&self, _layout: &SectionLayout, _frame: &ScrollFrame) -> Reveal {
        Reveal::VISIBLE
    }
}

pub fn select_effects(
    capabilities: Capabilities,
    visibility_threshold: f64,
    midline_fraction: f64,
) -> Box<dyn EffectsStrategy> {
    let detector = if capabilities.visibility_observer {
        SectionDetector::VisibilityThreshold {
            threshold: visibility_threshold,
            midline: midline_fraction,
        }
    } else {
        SectionDetector::Midline {
            fraction: midline_fraction,
        }
    };

    if capabilities.animation {
        log::info!("animation support detected, using rich effects");
        Box::new(RichAnimation { detector })
    } else {
        log::warn!("animation support not available, using static fallback");
        Box::new(StaticFallback { detector })
    }
}
