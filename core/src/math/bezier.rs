use crate::model::GeoPoint;
use serde::{Deserialize, Serialize};

/// Shape of the curved connectors drawn between cities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveSettings {
    /// Control-point offset as a fraction of the chord length.
    pub offset_factor: f64,
    /// Number of segments; the polyline has `steps + 1` points.
    pub steps: usize,
}

impl Default for CurveSettings {
    fn default() -> Self {
        Self {
            offset_factor: 0.15,
            steps: 20,
        }
    }
}

impl CurveSettings {
    fn normalized_steps(&self) -> usize {
        self.steps.max(20)
    }
}

/// Quadratic Bézier between two endpoints, bent perpendicular to the chord.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BezierCurve {
    pub start: GeoPoint,
    pub control: GeoPoint,
    pub end: GeoPoint,
}

impl BezierCurve {
    /// The offset is always `(dlon, -dlat) * factor` relative to start→end.
    pub fn between(start: GeoPoint, end: GeoPoint, settings: &CurveSettings) -> Self {
        let mid_lat = (start.lat + end.lat) / 2.0;
        let mid_lon = (start.lon + end.lon) / 2.0;
        let offset_lat = (end.lon - start.lon) * settings.offset_factor;
        let offset_lon = -(end.lat - start.lat) * settings.offset_factor;
        Self {
            start,
            control: GeoPoint::new(mid_lat + offset_lat, mid_lon + offset_lon),
            end,
        }
    }

    pub fn point_at(&self, t: f64) -> GeoPoint {
        let u = 1.0 - t;
        let a = u * u;
        let b = 2.0 * u * t;
        let c = t * t;
        GeoPoint::new(
            a * self.start.lat + b * self.control.lat + c * self.end.lat,
            a * self.start.lon + b * self.control.lon + c * self.end.lon,
        )
    }

    pub fn sample(&self, steps: usize) -> Vec<GeoPoint> {
        (0..=steps)
            .map(|i| self.point_at(i as f64 / steps as f64))
            .collect()
    }
}

/// Polyline approximation of the curved connector between two cities.
pub fn curved_path(start: GeoPoint, end: GeoPoint, settings: &CurveSettings) -> Vec<GeoPoint> {
    BezierCurve::between(start, end, settings).sample(settings.normalized_steps())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_starts_and_ends_on_endpoints() {
        let start = GeoPoint::new(40.0, -74.0);
        let end = GeoPoint::new(36.0, -115.0);
        let path = curved_path(start, end, &CurveSettings::default());
        assert_eq!(path.len(), 21);
        assert_eq!(path[0], start);
        let last = path[path.len() - 1];
        assert!((last.lat - end.lat).abs() < 1e-9);
        assert!((last.lon - end.lon).abs() < 1e-9);
    }

    #[test]
    fn midpoint_bends_off_the_chord() {
        let start = GeoPoint::new(0.0, 0.0);
        let end = GeoPoint::new(0.0, 10.0);
        let curve = BezierCurve::between(start, end, &CurveSettings::default());
        let mid = curve.point_at(0.5);
        // control sits 1.5 degrees north of the chord midpoint
        assert!((curve.control.lat - 1.5).abs() < 1e-9);
        assert!((mid.lat - 0.75).abs() < 1e-9);
        assert!((mid.lon - 5.0).abs() < 1e-9);
    }

    #[test]
    fn step_count_never_drops_below_twenty() {
        let settings = CurveSettings {
            offset_factor: 0.15,
            steps: 4,
        };
        let path = curved_path(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0), &settings);
        assert_eq!(path.len(), 21);
    }
}
