use iced::{
    mouse,
    widget::canvas::{self, Frame, Geometry, LineDash, Path, Stroke},
    Color, Pixels, Point, Rectangle, Renderer, Theme,
};
use tourcore::config::MapSettings;
use tourcore::map::{CityDetail, MapSurface, Rgba, Scene};
use tourcore::math::GeoBounds;
use tourcore::model::GeoPoint;
use tourcore::prelude::{ContainerHandle, MapInitError, MapInitResult};

/// Map surface backed by an iced canvas; keeps what the canvas should draw.
#[derive(Debug)]
pub struct CanvasSurface {
    bounds: GeoBounds,
    scene: Option<Scene>,
    detail: Option<CityDetail>,
    invalidations: usize,
}

impl CanvasSurface {
    pub fn new() -> Self {
        Self {
            bounds: GeoBounds::usa(),
            scene: None,
            detail: None,
            invalidations: 0,
        }
    }

    pub fn detail(&self) -> Option<&CityDetail> {
        self.detail.as_ref()
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations
    }

    /// Canvas program for the current scene, if one has been presented.
    pub fn program(&self) -> Option<MapCanvas> {
        self.scene.as_ref().map(|scene| MapCanvas {
            scene: scene.clone(),
            bounds: self.bounds,
        })
    }
}

impl MapSurface for CanvasSurface {
    fn mount(&mut self, container: &ContainerHandle, settings: &MapSettings) -> MapInitResult<()> {
        if container.element_id.trim().is_empty() {
            return Err(MapInitError::ContainerMissing(container.element_id.clone()));
        }
        self.bounds = settings.bounds;
        log::info!("[map] mounted into `{}`", container.element_id);
        Ok(())
    }

    fn present(&mut self, scene: &Scene) {
        self.scene = Some(scene.clone());
    }

    fn close_popups(&mut self) {
        self.detail = None;
    }

    fn open_detail(&mut self, detail: &CityDetail) {
        self.detail = Some(detail.clone());
    }

    fn invalidate_size(&mut self) {
        self.invalidations += 1;
    }
}

fn color(rgba: Rgba, opacity: f32) -> Color {
    Color::from_rgba8(rgba.r, rgba.g, rgba.b, (rgba.a * opacity).clamp(0.0, 1.0))
}

#[derive(Clone)]
pub struct MapCanvas {
    scene: Scene,
    bounds: GeoBounds,
}

const LINE_HIT_PX: f32 = 5.0;

impl MapCanvas {
    /// Marker popup under the cursor, else the tooltip of a flow line passing near it.
    fn hover_text(&self, cursor: Point, width: f32, height: f32) -> Option<&str> {
        let project = |point: &GeoPoint| {
            let (x, y) = self.bounds.project(point, width, height);
            Point::new(x, y)
        };

        let marker = self.scene.markers.iter().rev().find(|marker| {
            marker.interactive && project(&marker.position).distance(cursor) <= marker.radius as f32
        });
        if let Some(popup) = marker.and_then(|marker| marker.popup.as_deref()) {
            return Some(popup);
        }

        self.scene
            .flows
            .lines()
            .iter()
            .filter(|line| line.tooltip.is_some())
            .find(|line| {
                line.path
                    .iter()
                    .any(|point| project(point).distance(cursor) <= LINE_HIT_PX)
            })
            .and_then(|line| line.tooltip.as_deref())
    }
}

impl canvas::Program<super::Message> for MapCanvas {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        frame.fill_rectangle(
            Point::ORIGIN,
            bounds.size(),
            Color::from_rgb(0.93, 0.95, 0.97),
        );
        let project = |point: &GeoPoint| {
            let (x, y) = self.bounds.project(point, bounds.width, bounds.height);
            Point::new(x, y)
        };

        for line in self.scene.flows.lines() {
            if line.path.len() < 2 {
                continue;
            }
            let path = Path::new(|builder| {
                for (i, point) in line.path.iter().enumerate() {
                    if i == 0 {
                        builder.move_to(project(point));
                    } else {
                        builder.line_to(project(point));
                    }
                }
            });
            let segments = [line.style.dash.on, line.style.dash.off];
            let stroke_color = color(line.style.color, line.style.opacity as f32);
            frame.stroke(
                &path,
                Stroke {
                    line_dash: LineDash {
                        segments: &segments,
                        offset: 0,
                    },
                    ..Stroke::default()
                        .with_width(line.style.weight as f32)
                        .with_color(stroke_color)
                },
            );

            if let Some(arrow) = &line.arrow {
                let tip = project(&arrow.position);
                let heading = (arrow.angle_deg as f32).to_radians();
                let (dx, dy) = (heading.sin(), -heading.cos());
                let (nx, ny) = (-dy, dx);
                let head = Path::new(|builder| {
                    builder.move_to(Point::new(tip.x + dx * 6.0, tip.y + dy * 6.0));
                    builder.line_to(Point::new(tip.x - dx * 4.0 + nx * 4.0, tip.y - dy * 4.0 + ny * 4.0));
                    builder.line_to(Point::new(tip.x - dx * 4.0 - nx * 4.0, tip.y - dy * 4.0 - ny * 4.0));
                    builder.close();
                });
                frame.fill(&head, stroke_color);
            }
        }

        for marker in &self.scene.markers {
            let center = project(&marker.position);
            let fill = if marker.active {
                Color::from_rgb8(0xFF, 0x6B, 0x9D)
            } else {
                Color::from_rgb8(0x8B, 0x5C, 0xF6)
            };
            let dot = Path::new(|builder| builder.circle(center, marker.radius as f32));
            frame.fill(&dot, fill);
            frame.stroke(
                &dot,
                Stroke::default().with_width(2.0).with_color(Color::WHITE),
            );
            frame.fill_text(canvas::Text {
                content: marker.glyph.clone(),
                position: Point::new(center.x - 7.0, center.y - 8.0),
                color: Color::BLACK,
                size: Pixels(14.0),
                ..canvas::Text::default()
            });
        }

        for label in &self.scene.labels {
            let anchor = project(&label.position);
            let weight = if label.active { 1.0 } else { 0.75 };
            frame.fill_text(canvas::Text {
                content: format!("{} {}  {}", label.glyph, label.name, label.visitors),
                position: Point::new(anchor.x - 30.0, anchor.y - 14.0),
                color: Color::from_rgba(0.1, 0.1, 0.2, weight),
                size: Pixels(13.0),
                ..canvas::Text::default()
            });
        }

        if let Some(position) = cursor.position_in(bounds) {
            if let Some(hover) = self.hover_text(position, bounds.width, bounds.height) {
                let lines = hover.lines().count().max(1) as f32;
                let width = hover.lines().map(|l| l.chars().count()).max().unwrap_or(0) as f32 * 7.0;
                let anchor = Point::new(
                    (position.x + 12.0).min((bounds.width - width - 12.0).max(0.0)),
                    (position.y + 12.0).min((bounds.height - lines * 16.0 - 12.0).max(0.0)),
                );
                frame.fill_rectangle(
                    anchor,
                    iced::Size::new(width + 12.0, lines * 16.0 + 8.0),
                    Color::from_rgba(1.0, 1.0, 1.0, 0.92),
                );
                frame.fill_text(canvas::Text {
                    content: hover.to_string(),
                    position: Point::new(anchor.x + 6.0, anchor.y + 4.0),
                    color: Color::from_rgb(0.1, 0.1, 0.2),
                    size: Pixels(12.0),
                    ..canvas::Text::default()
                });
            }
        }

        vec![frame.into_geometry()]
    }
}
