//! Tourism-flow connectors between cities.
//!
//! Data-driven lines rank cities by visitors for the active period and connect
//! each rank to a few of the top ranks, giving a hub-and-spoke network instead
//! of a dense mesh. The decorative network links every city pair once and does
//! not depend on the period data.

use crate::map::surface::{DashPattern, FlowArrow, FlowLine, LineStyle, Rgba};
use crate::math::{curved_path, CurveSettings, StatsHelper};
use crate::model::{City, CityCatalog, GeoPoint, MetricRecord};
use std::sync::Arc;

pub const EMPHASIS_COLOR: Rgba = Rgba::rgb(0xFE, 0x2C, 0x6D);
pub const FLOW_COLOR: Rgba = Rgba::rgb(0x8A, 0x44, 0xF7);
pub const DECORATIVE_COLOR: Rgba = Rgba::rgba(138, 68, 247, 0.15);

/// Number of top ranks a source at `rank` connects to.
pub fn max_connections(rank: usize) -> usize {
    if rank < 2 {
        4
    } else if rank < 4 {
        2
    } else {
        1
    }
}

pub fn flow_style(strength: f64, emphasized: bool) -> LineStyle {
    if emphasized {
        LineStyle {
            color: EMPHASIS_COLOR,
            weight: strength / 15.0,
            opacity: 0.7,
            dash: DashPattern::EMPHASIZED,
        }
    } else {
        LineStyle {
            color: FLOW_COLOR,
            weight: strength / 25.0,
            opacity: 0.4,
            dash: DashPattern::NORMAL,
        }
    }
}

fn decorative_style() -> LineStyle {
    LineStyle {
        color: DECORATIVE_COLOR,
        weight: 1.0,
        opacity: 1.0,
        dash: DashPattern::DECORATIVE,
    }
}

/// Arrow at the path midpoint, oriented along the two samples before it.
fn midpoint_arrow(path: &[GeoPoint]) -> Option<FlowArrow> {
    if path.len() <= 10 {
        return None;
    }
    let mid = path.len() / 2;
    let position = path[mid];
    Some(FlowArrow {
        position,
        angle_deg: StatsHelper::heading_deg(&path[mid - 2], &position),
    })
}

/// Builds the data-driven network for the active records.
///
/// Records for cities outside the catalog are not ranked. The sort is stable,
/// so ties keep dataset order.
pub fn build_flow_lines(
    catalog: &CityCatalog,
    records: &[MetricRecord],
    highlighted: Option<&str>,
    interactive: bool,
    curve: &CurveSettings,
) -> Vec<FlowLine> {
    let mut ranked: Vec<(&MetricRecord, &City)> = records
        .iter()
        .filter_map(|record| catalog.get(&record.city_id).map(|city| (record, city)))
        .collect();
    ranked.sort_by(|a, b| b.0.visitors.cmp(&a.0.visitors));

    let mut lines = Vec::new();
    for (i, (source, source_city)) in ranked.iter().enumerate() {
        let limit = max_connections(i).min(ranked.len());
        for (j, (target, target_city)) in ranked.iter().enumerate().take(limit) {
            if i == j {
                continue;
            }
            let strength = StatsHelper::flow_strength(source.visitors, target.visitors);
            let emphasized = highlighted
                .map(|id| source.city_id == id || target.city_id == id)
                .unwrap_or(false);
            let path = curved_path(source_city.coordinates, target_city.coordinates, curve);
            let arrow = midpoint_arrow(&path);
            let tooltip = interactive.then(|| {
                format!(
                    "Tourism flow: {} ↔ {}",
                    source_city.display_name, target_city.display_name
                )
            });

            lines.push(FlowLine {
                source: source.city_id.clone(),
                target: target.city_id.clone(),
                path,
                style: flow_style(strength, emphasized),
                emphasized,
                tooltip,
                arrow,
            });
        }
    }
    lines
}

/// One faint curve per unordered city pair.
pub fn build_decorative_network(catalog: &CityCatalog, curve: &CurveSettings) -> Arc<[FlowLine]> {
    let cities: Vec<&City> = catalog.iter().collect();
    let mut lines = Vec::with_capacity(cities.len() * cities.len().saturating_sub(1) / 2);
    for (i, first) in cities.iter().enumerate() {
        for second in &cities[i + 1..] {
            lines.push(FlowLine {
                source: first.id.clone(),
                target: second.id.clone(),
                path: curved_path(first.coordinates, second.coordinates, curve),
                style: decorative_style(),
                emphasized: false,
                tooltip: None,
                arrow: None,
            });
        }
    }
    lines.into()
}
