use crate::model::GeoPoint;

pub struct StatsHelper;

impl StatsHelper {
    /// Flow strength between a source and target city, capped at 100.
    pub fn flow_strength(source_visitors: u64, target_visitors: u64) -> f64 {
        (source_visitors as f64 / 10_000.0 + target_visitors as f64 / 20_000.0).min(100.0)
    }

    /// Marker radius on a square-root scale so area tracks visitor volume.
    pub fn marker_radius(visitors: Option<u64>) -> f64 {
        const MIN_VISITORS: f64 = 200_000.0;
        const MAX_VISITORS: f64 = 1_200_000.0;
        const MIN_RADIUS: f64 = 8.0;
        const MAX_RADIUS: f64 = 20.0;

        match visitors {
            Some(visitors) if visitors > 0 => {
                let clamped = (visitors as f64).clamp(MIN_VISITORS, MAX_VISITORS);
                MIN_RADIUS
                    + ((clamped - MIN_VISITORS) / (MAX_VISITORS - MIN_VISITORS)).sqrt()
                        * (MAX_RADIUS - MIN_RADIUS)
            }
            _ => 10.0,
        }
    }

    /// Heading from `from` to `to` in degrees, measured as atan2(dlon, dlat).
    pub fn heading_deg(from: &GeoPoint, to: &GeoPoint) -> f64 {
        (to.lon - from.lon).atan2(to.lat - from.lat).to_degrees()
    }

    /// `1.2M`, `850.0K`, `999`.
    pub fn format_compact(value: f64) -> String {
        if value >= 1_000_000.0 {
            format!("{:.1}M", value / 1_000_000.0)
        } else if value >= 1_000.0 {
            format!("{:.1}K", value / 1_000.0)
        } else {
            format!("{}", value)
        }
    }
}
