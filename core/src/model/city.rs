use crate::prelude::CityId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Planar distance in degrees; good enough for nearest-city lookups.
    pub fn planar_distance(&self, other: &GeoPoint) -> f64 {
        ((other.lat - self.lat).powi(2) + (other.lon - self.lon).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: CityId,
    pub display_name: String,
    pub state_code: String,
    pub coordinates: GeoPoint,
    pub emoji: String,
}

impl City {
    pub fn new(id: &str, name: &str, state: &str, lat: f64, lon: f64, emoji: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: name.to_string(),
            state_code: state.to_string(),
            coordinates: GeoPoint::new(lat, lon),
            emoji: emoji.to_string(),
        }
    }

    /// `"New York City, NY"`.
    pub fn title(&self) -> String {
        format!("{}, {}", self.display_name, self.state_code)
    }
}

/// Static city table. Insertion order is the default draw and label priority.
#[derive(Debug, Clone, Default)]
pub struct CityCatalog {
    cities: Vec<City>,
    index: HashMap<CityId, usize>,
}

impl CityCatalog {
    /// Builds the catalog; a repeated id keeps its first position.
    pub fn new(cities: Vec<City>) -> Self {
        let mut ordered: Vec<City> = Vec::with_capacity(cities.len());
        let mut index = HashMap::with_capacity(cities.len());
        for city in cities {
            if index.contains_key(&city.id) {
                log::warn!("duplicate city id `{}` ignored", city.id);
                continue;
            }
            index.insert(city.id.clone(), ordered.len());
            ordered.push(city);
        }
        Self {
            cities: ordered,
            index,
        }
    }

    pub fn get(&self, id: &str) -> Option<&City> {
        self.index.get(id).map(|&pos| &self.cities[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &City> {
        self.cities.iter()
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn nearest(&self, point: &GeoPoint) -> Option<&City> {
        self.cities.iter().min_by(|a, b| {
            a.coordinates
                .planar_distance(point)
                .total_cmp(&b.coordinates.planar_distance(point))
        })
    }

    /// Base city table of the story page.
    pub fn default_cities() -> Vec<City> {
        vec![
            City::new("nyc", "New York City", "NY", 40.7128, -74.0060, "🗽"),
            City::new("dc", "Washington D.C.", "DC", 38.9072, -77.0369, "🏛️"),
            City::new("lasvegas", "Las Vegas", "NV", 36.1699, -115.1398, "🎰"),
            City::new("chicago", "Chicago", "IL", 41.8781, -87.6298, "🌆"),
            City::new("boston", "Boston", "MA", 42.3601, -71.0589, "🎓"),
            City::new("miami", "Miami", "FL", 25.7617, -80.1918, "🏖️"),
            City::new("sanfrancisco", "San Francisco", "CA", 37.7749, -122.4194, "🌉"),
            City::new("orlando", "Orlando", "FL", 28.5383, -81.3792, "🎡"),
            City::new("neworleans", "New Orleans", "LA", 29.9511, -90.0715, "🎭"),
            City::new("seattle", "Seattle", "WA", 47.6062, -122.3321, "☕"),
        ]
    }
}
