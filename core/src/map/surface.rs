use crate::config::MapSettings;
use crate::map::detail::CityDetail;
use crate::model::GeoPoint;
use crate::prelude::{CityId, ContainerHandle, MapInitError, MapInitResult};
use crate::state::MapMode;
use serde::Serialize;
use std::sync::Arc;

/// Straight RGBA color with a fractional alpha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// `on`/`off` lengths of a dashed stroke.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DashPattern {
    pub on: f32,
    pub off: f32,
}

impl DashPattern {
    pub const EMPHASIZED: DashPattern = DashPattern { on: 4.0, off: 6.0 };
    pub const NORMAL: DashPattern = DashPattern { on: 3.0, off: 8.0 };
    pub const DECORATIVE: DashPattern = DashPattern { on: 2.0, off: 10.0 };
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineStyle {
    pub color: Rgba,
    pub weight: f64,
    pub opacity: f64,
    pub dash: DashPattern,
}

/// Direction marker placed at the middle of a flow line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlowArrow {
    pub position: GeoPoint,
    pub angle_deg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowLine {
    pub source: CityId,
    pub target: CityId,
    pub path: Vec<GeoPoint>,
    pub style: LineStyle,
    pub emphasized: bool,
    pub tooltip: Option<String>,
    pub arrow: Option<FlowArrow>,
}

impl FlowLine {
    pub fn touches(&self, city_id: &str) -> bool {
        self.source == city_id || self.target == city_id
    }
}

/// The visible line set: exactly one of the two networks is shown at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowLayer {
    Decorative(Arc<[FlowLine]>),
    DataDriven(Vec<FlowLine>),
}

impl FlowLayer {
    pub fn lines(&self) -> &[FlowLine] {
        match self {
            FlowLayer::Decorative(lines) => &lines[..],
            FlowLayer::DataDriven(lines) => lines.as_slice(),
        }
    }

    pub fn is_decorative(&self) -> bool {
        matches!(self, FlowLayer::Decorative(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerSpec {
    pub city_id: CityId,
    pub position: GeoPoint,
    pub glyph: String,
    pub radius: f64,
    pub active: bool,
    /// Pointer events (hover tooltip, click detail) are enabled.
    pub interactive: bool,
    pub popup: Option<String>,
}

/// Floating label shown above a city.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityLabel {
    pub city_id: CityId,
    pub position: GeoPoint,
    pub glyph: String,
    pub name: String,
    pub visitors: String,
    pub active: bool,
}

/// Everything the renderer draws; markers are listed back to front.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub mode: MapMode,
    pub markers: Vec<MarkerSpec>,
    pub flows: FlowLayer,
    pub labels: Vec<CityLabel>,
}

impl Scene {
    pub fn active_markers(&self) -> impl Iterator<Item = &MarkerSpec> {
        self.markers.iter().filter(|marker| marker.active)
    }

    pub fn front_marker(&self) -> Option<&MarkerSpec> {
        self.markers.last()
    }
}

/// Capabilities consumed from the map rendering library.
pub trait MapSurface {
    /// Binds a fixed, non-pannable map to the container.
    fn mount(&mut self, container: &ContainerHandle, settings: &MapSettings) -> MapInitResult<()>;
    /// Replaces every marker, line and label with the given scene.
    fn present(&mut self, scene: &Scene);
    fn close_popups(&mut self);
    fn open_detail(&mut self, detail: &CityDetail);
    fn invalidate_size(&mut self);
}

/// In-memory surface that keeps the last presented scene; used by headless drivers.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    available: bool,
    known_containers: Option<Vec<String>>,
    scene: Option<Scene>,
    detail: Option<CityDetail>,
    presents: usize,
    popups_closed: usize,
    invalidations: usize,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self {
            available: true,
            ..Default::default()
        }
    }

    /// A surface whose rendering library failed to load.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Only the listed container ids can be mounted.
    pub fn with_containers(mut self, ids: &[&str]) -> Self {
        self.known_containers = Some(ids.iter().map(|id| id.to_string()).collect());
        self
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn detail(&self) -> Option<&CityDetail> {
        self.detail.as_ref()
    }

    pub fn presents(&self) -> usize {
        self.presents
    }

    pub fn popups_closed(&self) -> usize {
        self.popups_closed
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations
    }
}

impl MapSurface for HeadlessSurface {
    fn mount(&mut self, container: &ContainerHandle, _settings: &MapSettings) -> MapInitResult<()> {
        if !self.available {
            return Err(MapInitError::RendererUnavailable);
        }
        if let Some(known) = &self.known_containers {
            if !known.contains(&container.element_id) {
                return Err(MapInitError::ContainerMissing(
                    container.element_id.clone(),
                ));
            }
        }
        Ok(())
    }

    fn present(&mut self, scene: &Scene) {
        self.scene = Some(scene.clone());
        self.presents += 1;
    }

    fn close_popups(&mut self) {
        self.detail = None;
        self.popups_closed += 1;
    }

    fn open_detail(&mut self, detail: &CityDetail) {
        self.detail = Some(detail.clone());
    }

    fn invalidate_size(&mut self) {
        self.invalidations += 1;
    }
}
