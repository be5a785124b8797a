use crate::model::GeoPoint;
use serde::{Deserialize, Serialize};

/// Geographic rectangle the map is locked to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south_west: GeoPoint,
    pub north_east: GeoPoint,
}

impl GeoBounds {
    /// Continental United States.
    pub fn usa() -> Self {
        Self {
            south_west: GeoPoint::new(24.396308, -125.0),
            north_east: GeoPoint::new(49.384358, -66.934570),
        }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&point.lat)
            && (self.south_west.lon..=self.north_east.lon).contains(&point.lon)
    }

    /// Equirectangular projection into a `width` x `height` pixel box, y down.
    pub fn project(&self, point: &GeoPoint, width: f32, height: f32) -> (f32, f32) {
        let lon_span = self.north_east.lon - self.south_west.lon;
        let lat_span = self.north_east.lat - self.south_west.lat;
        if lon_span <= 0.0 || lat_span <= 0.0 {
            return (0.0, 0.0);
        }
        let x = (point.lon - self.south_west.lon) / lon_span;
        let y = (self.north_east.lat - point.lat) / lat_span;
        (x as f32 * width, y as f32 * height)
    }

    /// Inverse of [`GeoBounds::project`].
    pub fn unproject(&self, x: f32, y: f32, width: f32, height: f32) -> GeoPoint {
        if width <= 0.0 || height <= 0.0 {
            return self.center();
        }
        let lon_span = self.north_east.lon - self.south_west.lon;
        let lat_span = self.north_east.lat - self.south_west.lat;
        GeoPoint::new(
            self.north_east.lat - (y / height) as f64 * lat_span,
            self.south_west.lon + (x / width) as f64 * lon_span,
        )
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lon + self.north_east.lon) / 2.0,
        )
    }
}
