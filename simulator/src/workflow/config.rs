use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tourcore::story::{Capabilities, SectionLayout};
use tourcore::StoryConfig;

/// Simulated page geometry, in px.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PageGeometry {
    pub viewport_height: f64,
    pub hero_height: f64,
    pub section_height: f64,
    pub footer_height: f64,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            viewport_height: 900.0,
            hero_height: 900.0,
            section_height: 1100.0,
            footer_height: 300.0,
        }
    }
}

impl PageGeometry {
    /// Sections stacked below the hero in declaration order.
    pub fn layouts(&self, story: &StoryConfig) -> Vec<SectionLayout> {
        story
            .sections
            .iter()
            .enumerate()
            .map(|(i, section)| SectionLayout {
                id: section.id.clone(),
                top: self.hero_height + self.section_height * i as f64,
                height: self.section_height,
            })
            .collect()
    }

    pub fn scroll_height(&self, story: &StoryConfig) -> f64 {
        self.hero_height + self.section_height * story.sections.len() as f64 + self.footer_height
    }
}

/// One reader action in a scripted session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptStep {
    Wait { ms: u64 },
    Scroll { top: f64 },
    ScrollToSection { id: String },
    ClickTimeline { index: usize },
    ClickMarker { month: String, year: String },
    PlayPause,
    ClickCity { id: String },
    CloseDetail,
    Hover { lat: f64, lon: f64 },
    Resize,
    StartJourney,
}

fn default_container() -> String {
    "map-container".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub story: StoryConfig,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub page: PageGeometry,
    /// Element the map mounts into.
    #[serde(default = "default_container")]
    pub container: String,
    /// Containers present on the simulated page; empty means any.
    #[serde(default)]
    pub page_containers: Vec<String>,
    /// JSON dataset; the built-in fallback tables answer when absent.
    #[serde(default)]
    pub dataset: Option<PathBuf>,
    /// Fetch latencies, used round-robin per issued request.
    #[serde(default)]
    pub fetch_latency_ms: Vec<u64>,
    #[serde(default)]
    pub steps: Vec<ScriptStep>,
}

impl SessionConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading session config {}", path_ref.display()))?;
        let config: SessionConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing session config {}", path_ref.display()))?;
        Ok(config)
    }

    /// The default reader tour: scroll through every section, replay the
    /// timeline, then inspect a city.
    pub fn from_args(playback_ms: u64, fetch_latency_ms: Vec<u64>, dataset: Option<PathBuf>) -> Self {
        let story = StoryConfig {
            playback_period_ms: playback_ms,
            ..Default::default()
        };
        let page = PageGeometry::default();
        let mut steps = vec![ScriptStep::Wait { ms: 500 }];
        for layout in page.layouts(&story) {
            steps.push(ScriptStep::Scroll { top: layout.top });
            steps.push(ScriptStep::Wait { ms: 400 });
        }
        steps.extend([
            ScriptStep::ClickTimeline { index: 0 },
            ScriptStep::PlayPause,
            ScriptStep::Wait {
                ms: playback_ms.saturating_mul(3),
            },
            ScriptStep::ClickCity { id: "miami".into() },
            ScriptStep::Wait { ms: 200 },
            ScriptStep::CloseDetail,
        ]);

        Self {
            story,
            capabilities: Capabilities::full(),
            page,
            container: default_container(),
            page_containers: Vec::new(),
            dataset,
            fetch_latency_ms,
            steps,
        }
    }

    pub fn latency_for(&self, request: usize) -> u64 {
        if self.fetch_latency_ms.is_empty() {
            0
        } else {
            self.fetch_latency_ms[request % self.fetch_latency_ms.len()]
        }
    }
}
