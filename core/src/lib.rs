//! Map/timeline state-sync engine for the tourism-flows story page.
//!
//! One [`state::VisualizationState`] is written by the timeline, the section
//! orchestrator and the map operations; the map scene is always derived from
//! it. Hosts drive everything through [`story::StoryEngine`].

pub mod config;
pub mod dataset;
pub mod map;
pub mod math;
pub mod model;
pub mod prelude;
pub mod state;
pub mod story;
pub mod telemetry;
pub mod timeline;

pub use config::StoryConfig;
pub use prelude::{CityId, ContainerHandle, DatasetError, MapInitError};
pub use state::{HighlightPolicy, MapMode, VisualizationState};
pub use story::{Command, Event, StoryEngine};
