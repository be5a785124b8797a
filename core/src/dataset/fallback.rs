//! Hardcoded period tables served when the live dataset cannot be used.

use crate::model::{DatasetTable, MetricRecord};

pub const DEFAULT_KEY: &str = "default";

fn rec(id: &str, name: &str, visitors: u64, revenue: f64, rating: f64, stay: f64) -> MetricRecord {
    MetricRecord::new(id, name, visitors, revenue, rating, stay)
}

/// Fallback table keyed by `MM-YYYY`, plus the generic `default` entry.
pub fn fallback_table() -> DatasetTable {
    let mut table = DatasetTable::new();
    table.insert(
        "11-2024",
        vec![
            rec("nyc", "New York City", 850_000, 1_200_000_000.0, 4.3, 3.2),
            rec("dc", "Washington D.C.", 320_000, 450_000_000.0, 4.5, 2.7),
            rec("lasvegas", "Las Vegas", 780_000, 980_000_000.0, 4.1, 3.5),
            rec("chicago", "Chicago", 410_000, 520_000_000.0, 4.0, 2.3),
            rec("boston", "Boston", 290_000, 380_000_000.0, 4.4, 2.5),
            rec("miami", "Miami", 560_000, 780_000_000.0, 4.6, 4.0),
            rec("sanfrancisco", "San Francisco", 480_000, 720_000_000.0, 4.2, 3.1),
        ],
    );
    table.insert(
        "12-2024",
        vec![
            rec("nyc", "New York City", 1_200_000, 1_850_000_000.0, 4.5, 3.5),
            rec("dc", "Washington D.C.", 380_000, 520_000_000.0, 4.3, 2.9),
            rec("lasvegas", "Las Vegas", 950_000, 1_350_000_000.0, 4.4, 3.8),
            rec("chicago", "Chicago", 450_000, 580_000_000.0, 4.1, 2.5),
            rec("boston", "Boston", 320_000, 420_000_000.0, 4.2, 2.6),
            rec("miami", "Miami", 720_000, 980_000_000.0, 4.7, 4.5),
            rec("sanfrancisco", "San Francisco", 420_000, 650_000_000.0, 4.0, 2.9),
        ],
    );
    table.insert(
        "01-2025",
        vec![
            rec("nyc", "New York City", 720_000, 980_000_000.0, 4.2, 3.0),
            rec("dc", "Washington D.C.", 420_000, 580_000_000.0, 4.4, 3.1),
            rec("lasvegas", "Las Vegas", 820_000, 1_150_000_000.0, 4.3, 3.6),
            rec("chicago", "Chicago", 280_000, 350_000_000.0, 3.9, 2.2),
            rec("boston", "Boston", 230_000, 310_000_000.0, 4.0, 2.4),
            rec("miami", "Miami", 840_000, 1_180_000_000.0, 4.8, 4.7),
            rec("sanfrancisco", "San Francisco", 390_000, 590_000_000.0, 4.1, 2.8),
        ],
    );
    table.insert(
        DEFAULT_KEY,
        vec![
            rec("nyc", "New York City", 500_000, 750_000_000.0, 4.0, 3.0),
            rec("dc", "Washington D.C.", 300_000, 400_000_000.0, 4.2, 2.5),
            rec("lasvegas", "Las Vegas", 600_000, 800_000_000.0, 4.0, 3.0),
            rec("chicago", "Chicago", 350_000, 450_000_000.0, 3.8, 2.0),
            rec("boston", "Boston", 250_000, 300_000_000.0, 4.0, 2.0),
            rec("miami", "Miami", 400_000, 600_000_000.0, 4.2, 3.5),
            rec("sanfrancisco", "San Francisco", 300_000, 450_000_000.0, 4.0, 2.5),
        ],
    );
    table
}

/// Records for `key`, or the `default` entry when the key is not predefined.
pub fn fallback_for(table: &DatasetTable, key: &str) -> Vec<MetricRecord> {
    table
        .period(key)
        .or_else(|| table.period(DEFAULT_KEY))
        .map(<[MetricRecord]>::to_vec)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_key_uses_default_table() {
        let table = fallback_table();
        let records = fallback_for(&table, "06-2023");
        assert_eq!(records.len(), 7);
        assert_eq!(records[0].visitors, 500_000);
    }

    #[test]
    fn december_peak_is_nyc() {
        let records = fallback_for(&fallback_table(), "12-2024");
        let top = records.iter().max_by_key(|r| r.visitors).unwrap();
        assert_eq!(top.city_id, "nyc");
    }
}
