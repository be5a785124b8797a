use anyhow::Context;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tourcore::model::{City, DatasetTable, MetricRecord, TimePoint};

/// Configuration for generating a synthetic monthly dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u64,
    /// Visitors of the busiest city before noise and seasonality.
    pub peak_visitors: u64,
    /// Relative jitter applied to every metric, `0.0..1.0`.
    pub noise: f64,
    /// Cities without a record in each generated period.
    pub sparse_cities: usize,
    pub description: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            peak_visitors: 1_000_000,
            noise: 0.1,
            sparse_cities: 3,
            description: None,
        }
    }
}

impl GeneratorConfig {
    fn normalized_noise(&self) -> f64 {
        self.noise.clamp(0.0, 0.9)
    }
}

/// Holiday months draw more visitors.
fn seasonality(point: &TimePoint) -> f64 {
    match point.month.as_str() {
        "11" => 1.0,
        "12" => 1.2,
        "01" => 0.8,
        _ => 0.9,
    }
}

fn build_period(
    config: &GeneratorConfig,
    rng: &mut StdRng,
    cities: &[City],
    point: &TimePoint,
) -> Vec<MetricRecord> {
    let noise = config.normalized_noise();
    let covered = cities.len().saturating_sub(config.sparse_cities).max(1);

    cities
        .iter()
        .take(covered)
        .enumerate()
        .map(|(rank, city)| {
            let decay = 1.0 / (1.0 + rank as f64 * 0.35);
            let mut jitter = || 1.0 + rng.gen_range(-noise..=noise);
            let visitors =
                (config.peak_visitors as f64 * decay * seasonality(point) * jitter()).round();
            let spend_per_visitor = 1_300.0 * jitter();
            let satisfaction = (4.3 * jitter()).min(5.0);
            let avg_stay = (3.5 * jitter() * 10.0).round() / 10.0;

            MetricRecord::new(
                &city.id,
                &city.display_name,
                visitors.max(0.0) as u64,
                (visitors * spend_per_visitor).round(),
                (satisfaction * 10.0).round() / 10.0,
                avg_stay,
            )
        })
        .collect()
}

/// One period per time point, keyed `MM-YYYY`; reproducible for a given seed.
pub fn build_dataset(
    config: &GeneratorConfig,
    cities: &[City],
    points: &[TimePoint],
) -> DatasetTable {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut table = DatasetTable::new();
    for point in points {
        table.insert(point.key(), build_period(config, &mut rng, cities, point));
    }
    table
}

pub fn write_dataset<P: AsRef<Path>>(table: &DatasetTable, path: P) -> anyhow::Result<()> {
    let path_ref = path.as_ref();
    if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating dataset directory {}", parent.display()))?;
    }
    let contents = serde_json::to_string_pretty(table).context("serializing dataset")?;
    fs::write(path_ref, contents)
        .with_context(|| format!("writing dataset {}", path_ref.display()))?;
    Ok(())
}
