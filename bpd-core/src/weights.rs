use crate::error::{BasinError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tolerance within which a candidate triple's components must sum to 1.
/// Triples outside it are rejected at build time, never at use time.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Relative tolerance for the disaggregated-sum runtime check.
pub const SUM_PRESERVATION_TOLERANCE: f64 = 1e-9;

/// Weight-table granularity: key candidates by month and 3-hour block start,
/// or by month only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    MonthHour,
    MonthOnly,
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "month-hour" => Ok(Granularity::MonthHour),
            "month-only" => Ok(Granularity::MonthOnly),
            other => Err(format!(
                "unknown granularity '{other}' (expected 'month-hour' or 'month-only')"
            )),
        }
    }
}

/// The climatological bucket grouping candidate triples.
/// `hour` is the 3-hour block start (0, 3, ..., 21); `None` selects the
/// coarser month-only regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WeightKey {
    pub cell_id: i64,
    pub month: u32,
    pub hour: Option<u32>,
}

impl WeightKey {
    pub fn fine(cell_id: i64, month: u32, block_hour: u32) -> Self {
        WeightKey {
            cell_id,
            month,
            hour: Some(block_hour),
        }
    }

    pub fn coarse(cell_id: i64, month: u32) -> Self {
        WeightKey {
            cell_id,
            month,
            hour: None,
        }
    }

    /// The month-only key covering this one.
    pub fn coarsened(&self) -> Self {
        WeightKey {
            cell_id: self.cell_id,
            month: self.month,
            hour: None,
        }
    }
}

/// A normalized intra-block distribution: how one historical year split a
/// 3-hour precipitation total across its three constituent hours.
///
/// Construction validates non-negativity and the unit-sum invariant, then
/// renormalizes so the stored components sum to exactly 1. Sum preservation
/// downstream is therefore purely a multiplication, not a compensating
/// correction.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTriple {
    year: i32,
    weights: [f64; 3],
}

impl WeightTriple {
    pub fn new(year: i32, raw: [f64; 3]) -> Result<Self> {
        let sum: f64 = raw.iter().sum();
        let valid = raw.iter().all(|w| w.is_finite() && *w >= 0.0);
        if !valid || (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(BasinError::MalformedTriple { year, sum });
        }
        Ok(WeightTriple {
            year,
            weights: raw.map(|w| w / sum),
        })
    }

    /// Build a triple from the three hourly totals of one historical block.
    /// The block total must be positive; zero-sum blocks carry no shape
    /// information and must be excluded before this point.
    pub fn from_hourly(year: i32, hours: [f64; 3]) -> Result<Self> {
        let total: f64 = hours.iter().sum();
        if !total.is_finite() || total <= 0.0 {
            return Err(BasinError::MalformedTriple { year, sum: total });
        }
        Self::new(year, hours.map(|h| h / total))
    }

    /// The source year this triple was derived from.
    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn weights(&self) -> &[f64; 3] {
        &self.weights
    }

    /// Distribute a 3-hour total across the block's hours.
    pub fn apply(&self, total_mm: f64) -> [f64; 3] {
        self.weights.map(|w| w * total_mm)
    }
}
