use crate::map::markers::{format_visitors, NOT_AVAILABLE};
use crate::math::StatsHelper;
use crate::model::{City, MetricRecord};
use crate::prelude::CityId;
use serde::Serialize;

pub const FULL_STAR: char = '★';
pub const HALF_STAR: char = '⯨';
pub const EMPTY_STAR: char = '☆';

/// Five-slot rating: one full star per whole point, a half star when the
/// fractional part is at least 0.5.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StarRating {
    pub full: u8,
    pub half: u8,
    pub empty: u8,
    pub value: f64,
}

impl StarRating {
    pub fn from_satisfaction(value: f64) -> Self {
        let value = if value.is_finite() {
            value.clamp(0.0, 5.0)
        } else {
            0.0
        };
        let full = value.floor() as u8;
        let half = u8::from(full < 5 && value - value.floor() >= 0.5);
        Self {
            full,
            half,
            empty: 5 - full - half,
            value,
        }
    }

    pub fn glyphs(&self) -> String {
        std::iter::repeat(FULL_STAR)
            .take(self.full as usize)
            .chain(std::iter::repeat(HALF_STAR).take(self.half as usize))
            .chain(std::iter::repeat(EMPTY_STAR).take(self.empty as usize))
            .collect()
    }

    /// `4.3/5`.
    pub fn label(&self) -> String {
        format!("{}/5", self.value)
    }
}

/// Content of the city detail surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityDetail {
    pub city_id: CityId,
    pub glyph: String,
    pub name: String,
    pub state_code: String,
    pub visitors: String,
    pub revenue: String,
    pub rating: StarRating,
    pub avg_stay: String,
    pub description: String,
    pub attractions: Vec<String>,
}

impl CityDetail {
    pub fn build(city: &City, record: Option<&MetricRecord>) -> Self {
        let revenue = record
            .filter(|r| r.revenue > 0.0)
            .map(|r| format!("${}", StatsHelper::format_compact(r.revenue)))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let avg_stay = record
            .filter(|r| r.avg_stay_days > 0.0)
            .map(|r| format!("{} days", r.avg_stay_days))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        Self {
            city_id: city.id.clone(),
            glyph: city.emoji.clone(),
            name: city.display_name.clone(),
            state_code: city.state_code.clone(),
            visitors: format_visitors(record),
            revenue,
            rating: StarRating::from_satisfaction(record.map(|r| r.satisfaction).unwrap_or(0.0)),
            avg_stay,
            description: city_description(&city.id).to_string(),
            attractions: top_attractions(&city.id)
                .iter()
                .map(|a| a.to_string())
                .collect(),
        }
    }
}

pub fn city_description(city_id: &str) -> &'static str {
    match city_id {
        "nyc" => "New York City is the largest city in the United States and one of the most important financial and cultural centers in the world. It features iconic landmarks such as the Statue of Liberty, Times Square, and Central Park. Millions of tourists visit annually to experience this vibrant \"city that never sleeps.\"",
        "dc" => "As the capital of the United States, Washington D.C. is home to numerous national museums and monuments. The White House, Capitol Building, and Lincoln Memorial are among the most visited attractions. The city's cherry blossom season also draws many tourists.",
        "lasvegas" => "Las Vegas is known for its luxury casino hotels, entertainment shows, and vibrant nightlife. This desert city attracts visitors from around the world with its unique themed hotels and world-class performances.",
        "chicago" => "Chicago is the third-largest city in the United States, famous for its distinctive architecture, deep musical heritage, and culinary scene. Michigan Avenue, Millennium Park, and Willis Tower are must-visit attractions.",
        "boston" => "Boston is one of the oldest cities in America, with rich historical sites and premier educational institutions. The Freedom Trail, Quincy Market, and Fenway Park are essential stops for visitors.",
        "miami" => "Miami is renowned for its beautiful beaches, vibrant nightlife, and diverse cultural scene. South Beach, Art Deco Historic District, and Little Havana attract millions of visitors seeking sunshine and excitement.",
        "sanfrancisco" => "San Francisco is famous for its iconic Golden Gate Bridge, historic cable cars, and picturesque hills. The city offers a unique blend of natural beauty, cultural diversity, and technological innovation.",
        _ => "No detailed description available",
    }
}

pub fn top_attractions(city_id: &str) -> &'static [&'static str] {
    match city_id {
        "nyc" => &["Central Park", "Statue of Liberty", "Empire State Building", "Times Square", "Metropolitan Museum of Art"],
        "dc" => &["National Mall", "Smithsonian Museums", "Lincoln Memorial", "White House", "Capitol Building"],
        "lasvegas" => &["The Strip", "Bellagio Fountains", "Fremont Street", "Grand Canyon Tours", "Cirque du Soleil Shows"],
        "chicago" => &["Millennium Park", "Art Institute of Chicago", "Willis Tower", "Navy Pier", "Field Museum"],
        "boston" => &["Freedom Trail", "Fenway Park", "Quincy Market", "Harvard University", "New England Aquarium"],
        "miami" => &["South Beach", "Art Deco Historic District", "Wynwood Walls", "Little Havana", "Bayside Marketplace"],
        "sanfrancisco" => &["Golden Gate Bridge", "Alcatraz Island", "Fisherman's Wharf", "Chinatown", "Cable Cars"],
        _ => &[],
    }
}
