use crate::block::{is_block_aligned, BLOCK_HOURS};
use crate::error::{BasinError, Result};
use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;
use std::cmp::Ordering;

/// A future 3-hour precipitation total awaiting disaggregation.
/// Read-only input; the constructor rejects starts that do not sit on the
/// fixed 0/3/6/.../21 block schedule.
#[derive(Debug, Clone)]
pub struct FutureBlock {
    pub cell_id: i64,
    pub start: NaiveDateTime,
    pub total_mm: f64,
}

impl FutureBlock {
    pub fn new(cell_id: i64, start: NaiveDateTime, total_mm: f64) -> Result<Self> {
        if !is_block_aligned(&start) {
            return Err(BasinError::UnalignedBlock(start));
        }
        Ok(FutureBlock {
            cell_id,
            start,
            total_mm,
        })
    }

    /// Timestamps of the three constituent hours, at offsets 0, 1, 2 from
    /// the block start.
    pub fn hour_timestamps(&self) -> [NaiveDateTime; BLOCK_HOURS as usize] {
        [
            self.start,
            self.start + TimeDelta::try_hours(1).unwrap(),
            self.start + TimeDelta::try_hours(2).unwrap(),
        ]
    }
}

impl Ord for FutureBlock {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cell_id
            .cmp(&other.cell_id)
            .then(self.start.cmp(&other.start))
    }
}

impl Eq for FutureBlock {}

impl PartialEq for FutureBlock {
    fn eq(&self, other: &Self) -> bool {
        self.cell_id == other.cell_id && self.start == other.start
    }
}

impl PartialOrd for FutureBlock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One disaggregated hour of output, appended to the store once per run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyResult {
    pub cell_id: i64,
    pub timestamp: NaiveDateTime,
    pub value_mm: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2031, 7, 12)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_new_rejects_unaligned_start() {
        assert!(FutureBlock::new(5, ts(4), 1.0).is_err());
        assert!(FutureBlock::new(5, ts(6), 1.0).is_ok());
    }

    #[test]
    fn test_hour_timestamps() {
        let block = FutureBlock::new(5, ts(6), 1.0).unwrap();
        let stamps = block.hour_timestamps();
        assert_eq!(stamps[0], ts(6));
        assert_eq!(stamps[1], ts(7));
        assert_eq!(stamps[2], ts(8));
    }

    #[test]
    fn test_enumeration_order() {
        let a = FutureBlock::new(1, ts(21), 0.0).unwrap();
        let b = FutureBlock::new(2, ts(0), 0.0).unwrap();
        let c = FutureBlock::new(1, ts(0), 0.0).unwrap();
        let mut blocks = vec![a.clone(), b.clone(), c.clone()];
        blocks.sort();
        assert_eq!(blocks, vec![c, a, b]);
    }
}
