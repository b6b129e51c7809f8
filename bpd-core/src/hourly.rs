use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// The total precipitation observed during one clock hour of one cell.
/// Derived by the hourly aggregator; consumed read-only downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyTotal {
    pub cell_id: i64,
    pub date: NaiveDate,
    pub hour: u32,
    pub total_mm: f64,
}

impl HourlyTotal {
    /// The timestamp of the hour start.
    pub fn timestamp(&self) -> NaiveDateTime {
        self.date.and_hms_opt(self.hour, 0, 0).unwrap()
    }

    /// The source year this total belongs to.
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Calendar month, 1-12.
    pub fn month(&self) -> u32 {
        self.date.month()
    }
}

impl Ord for HourlyTotal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cell_id
            .cmp(&other.cell_id)
            .then(self.date.cmp(&other.date))
            .then(self.hour.cmp(&other.hour))
    }
}

impl Eq for HourlyTotal {}

impl PartialEq for HourlyTotal {
    fn eq(&self, other: &Self) -> bool {
        self.cell_id == other.cell_id && self.date == other.date && self.hour == other.hour
    }
}

impl PartialOrd for HourlyTotal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
