use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One selectable (month, year) slot in the narrative timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePoint {
    /// Two-digit month, `"01"`..`"12"`.
    pub month: String,
    /// Four-digit year.
    pub year: String,
    pub label: String,
}

impl TimePoint {
    pub fn new(month: &str, year: &str, label: &str) -> Self {
        Self {
            month: month.to_string(),
            year: year.to_string(),
            label: label.to_string(),
        }
    }

    /// First day of the month, used for chronological comparison.
    pub fn date(&self) -> Option<NaiveDate> {
        month_start(&self.month, &self.year)
    }

    /// Dataset key in `MM-YYYY` form.
    pub fn key(&self) -> String {
        dataset_key(&self.month, &self.year)
    }

    pub fn matches(&self, month: &str, year: &str) -> bool {
        self.month == month && self.year == year
    }

    /// The three periods covered by the story page.
    pub fn default_sequence() -> Vec<TimePoint> {
        vec![
            TimePoint::new("11", "2024", "November 2024"),
            TimePoint::new("12", "2024", "December 2024"),
            TimePoint::new("01", "2025", "January 2025"),
        ]
    }
}

pub fn month_start(month: &str, year: &str) -> Option<NaiveDate> {
    let month: u32 = month.trim().parse().ok()?;
    let year: i32 = year.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

pub fn dataset_key(month: &str, year: &str) -> String {
    format!("{}-{}", month, year)
}
