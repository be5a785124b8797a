pub mod dispatcher;
pub mod effects;
pub mod orchestrator;
pub mod pacing;

pub use dispatcher::{Command, Event, StoryEngine};
pub use effects::{select_effects, Capabilities, EffectsStrategy, Reveal};
pub use orchestrator::{
    PageChrome, ScrollFrame, SectionDetector, SectionLayout, SectionOrchestrator, SectionSpec,
};
pub use pacing::{Debounce, Throttle};
