use crate::error::{BasinError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Timestamp format used by the time-series store: "2031-01-03 06:00"
pub const STORE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Timestamp format used by raw gauge CSV exports: "2023.01.03 06:15"
pub const GAUGE_TIME_FORMAT: &str = "%Y.%m.%d %H:%M";

/// Meteorological variables carried by the time-series store.
/// Only `Precipitation` concerns the disaggregation core; temperature and
/// radiation pass through untouched for other consumers.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum Variable {
    Precipitation,
    Temperature,
    Radiation,
}

impl Variable {
    /// The store tag for this variable (`pr`, `tas`, `rsds`).
    pub fn tag(&self) -> &'static str {
        match self {
            Variable::Precipitation => "pr",
            Variable::Temperature => "tas",
            Variable::Radiation => "rsds",
        }
    }

    /// Parse a store tag back into a variable.
    pub fn from_tag(tag: &str) -> Option<Variable> {
        match tag {
            "pr" => Some(Variable::Precipitation),
            "tas" => Some(Variable::Temperature),
            "rsds" => Some(Variable::Radiation),
            _ => None,
        }
    }
}

/// A single record from the time-series store. Immutable once ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub cell_id: i64,
    pub variable: Variable,
    pub value: f64,
}

impl Observation {
    /// Parse a store timestamp ("YYYY-MM-DD HH:MM").
    pub fn parse_store_timestamp(s: &str) -> Result<NaiveDateTime> {
        NaiveDateTime::parse_from_str(s, STORE_TIME_FORMAT)
            .map_err(|_| BasinError::TimestampParse(s.to_string()))
    }

    /// Parse a raw gauge timestamp ("YYYY.MM.DD HH:MM").
    pub fn parse_gauge_timestamp(s: &str) -> Result<NaiveDateTime> {
        NaiveDateTime::parse_from_str(s, GAUGE_TIME_FORMAT)
            .map_err(|_| BasinError::TimestampParse(s.to_string()))
    }

    /// Format a timestamp the way the store expects it.
    pub fn format_store_timestamp(ts: &NaiveDateTime) -> String {
        ts.format(STORE_TIME_FORMAT).to_string()
    }
}

impl Ord for Observation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cell_id
            .cmp(&other.cell_id)
            .then(self.timestamp.cmp(&other.timestamp))
    }
}

impl Eq for Observation {}

impl PartialEq for Observation {
    fn eq(&self, other: &Self) -> bool {
        self.cell_id == other.cell_id && self.timestamp == other.timestamp
    }
}

impl PartialOrd for Observation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
