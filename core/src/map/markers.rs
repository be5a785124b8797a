use crate::map::surface::{CityLabel, MarkerSpec};
use crate::math::StatsHelper;
use crate::model::{find_record, City, CityCatalog, GeoPoint, MetricRecord};
use crate::prelude::CityId;

pub const NOT_AVAILABLE: &str = "N/A";

pub fn format_visitors(record: Option<&MetricRecord>) -> String {
    record
        .map(|r| StatsHelper::format_compact(r.visitors as f64))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Hover popup text for a marker; fields without data show `N/A`.
pub fn popup_text(city: &City, record: Option<&MetricRecord>) -> String {
    let mut lines = vec![city.title()];
    match record {
        Some(record) => {
            lines.push(format!("Visitors: {}", format_visitors(Some(record))));
            if record.revenue > 0.0 {
                lines.push(format!(
                    "Revenue: ${}",
                    StatsHelper::format_compact(record.revenue)
                ));
            }
            if record.satisfaction > 0.0 {
                lines.push(format!("Satisfaction: {:.1}/5.0", record.satisfaction));
            }
            if record.avg_stay_days > 0.0 {
                lines.push(format!("Avg. Stay: {} days", record.avg_stay_days));
            }
        }
        None => lines.push(format!("Visitors: {}", NOT_AVAILABLE)),
    }
    lines.join("\n")
}

/// Markers in draw order; the highlighted city is moved to the front (last).
pub fn build_markers(
    catalog: &CityCatalog,
    records: &[MetricRecord],
    highlighted: Option<&str>,
    interactive: bool,
) -> Vec<MarkerSpec> {
    let mut markers: Vec<MarkerSpec> = catalog
        .iter()
        .map(|city| {
            let record = find_record(records, &city.id);
            MarkerSpec {
                city_id: city.id.clone(),
                position: city.coordinates,
                glyph: city.emoji.clone(),
                radius: StatsHelper::marker_radius(record.map(|r| r.visitors)),
                active: highlighted == Some(city.id.as_str()),
                interactive,
                popup: interactive.then(|| popup_text(city, record)),
            }
        })
        .collect();

    if let Some(pos) = markers.iter().position(|marker| marker.active) {
        let front = markers.remove(pos);
        markers.push(front);
    }
    markers
}

/// Floating labels: the pinned cities (when shown) followed by the highlighted one.
pub fn build_labels(
    catalog: &CityCatalog,
    records: &[MetricRecord],
    pinned: &[CityId],
    highlighted: Option<&str>,
    offset_lat: f64,
) -> Vec<CityLabel> {
    let mut ids: Vec<&str> = pinned.iter().map(String::as_str).collect();
    if let Some(id) = highlighted {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    ids.into_iter()
        .filter_map(|id| catalog.get(id))
        .map(|city| CityLabel {
            city_id: city.id.clone(),
            position: GeoPoint::new(city.coordinates.lat + offset_lat, city.coordinates.lon),
            glyph: city.emoji.clone(),
            name: city.display_name.clone(),
            visitors: format_visitors(find_record(records, &city.id)),
            active: highlighted == Some(city.id.as_str()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{fallback_for, fallback_table};

    fn catalog() -> CityCatalog {
        CityCatalog::new(CityCatalog::default_cities())
    }

    #[test]
    fn highlighted_marker_is_drawn_last_and_alone_active() {
        let records = fallback_for(&fallback_table(), "11-2024");
        let markers = build_markers(&catalog(), &records, Some("chicago"), true);
        assert_eq!(markers.len(), 10);
        assert_eq!(markers.last().unwrap().city_id, "chicago");
        assert_eq!(markers.iter().filter(|m| m.active).count(), 1);
    }

    #[test]
    fn cities_without_records_show_placeholders() {
        let records = fallback_for(&fallback_table(), "11-2024");
        let markers = build_markers(&catalog(), &records, None, true);
        let seattle = markers.iter().find(|m| m.city_id == "seattle").unwrap();
        assert_eq!(seattle.radius, 10.0);
        assert!(seattle.popup.as_deref().unwrap().contains("Visitors: N/A"));
    }

    #[test]
    fn decorative_markers_carry_no_popup() {
        let markers = build_markers(&catalog(), &[], None, false);
        assert!(markers.iter().all(|m| !m.interactive && m.popup.is_none()));
    }

    #[test]
    fn popup_lists_available_stats() {
        let city = City::new("nyc", "New York City", "NY", 40.7, -74.0, "🗽");
        let record = MetricRecord::new("nyc", "New York City", 850_000, 1.2e9, 4.3, 3.2);
        let text = popup_text(&city, Some(&record));
        assert_eq!(
            text,
            "New York City, NY\nVisitors: 850.0K\nRevenue: $1200.0M\nSatisfaction: 4.3/5.0\nAvg. Stay: 3.2 days"
        );
    }

    #[test]
    fn labels_merge_pinned_and_highlight_without_duplicates() {
        let records = fallback_for(&fallback_table(), "12-2024");
        let pinned = vec!["nyc".to_string(), "lasvegas".to_string()];
        let labels = build_labels(&catalog(), &records, &pinned, Some("nyc"), 0.5);
        assert_eq!(labels.len(), 2);
        assert!(labels[0].active);
        assert_eq!(labels[0].visitors, "1.2M");
        assert!((labels[0].position.lat - 41.2128).abs() < 1e-9);

        let labels = build_labels(&catalog(), &records, &[], Some("dc"), 0.5);
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].city_id, "dc");
    }
}
