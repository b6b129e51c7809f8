//! Query result model structs for the time-series store.

use serde::Serialize;

/// Grid cell centroid geometry.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CellInfo {
    pub cell_id: i64,
    pub lon: f64,
    pub lat: f64,
}

/// A single (time, value) pair as stored, used for result inspection.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimeValue {
    /// Store timestamp string ("YYYY-MM-DD HH:MM").
    pub time: String,
    pub value: f64,
}
