use chrono::{NaiveDateTime, TimeDelta, Timelike};
use std::mem::replace;

/// Number of hours in one disaggregation block.
pub const BLOCK_HOURS: u32 = 3;

/// Start hour of the aligned 3-hour block containing `hour`.
/// Blocks follow the fixed 0/3/6/9/12/15/18/21 schedule.
pub fn block_start_hour(hour: u32) -> u32 {
    hour - hour % BLOCK_HOURS
}

/// Whether a timestamp sits exactly on a 3-hour block boundary.
pub fn is_block_aligned(ts: &NaiveDateTime) -> bool {
    ts.minute() == 0 && ts.second() == 0 && ts.hour() % BLOCK_HOURS == 0
}

/// Truncate a timestamp down to the start of its containing 3-hour block.
pub fn containing_block_start(ts: &NaiveDateTime) -> NaiveDateTime {
    ts.date()
        .and_hms_opt(block_start_hour(ts.hour()), 0, 0)
        .unwrap()
}

/// A block range iterator that yields each aligned 3-hour block start from
/// the start timestamp through the end timestamp (inclusive).
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct BlockRange(pub NaiveDateTime, pub NaiveDateTime);

impl Iterator for BlockRange {
    type Item = NaiveDateTime;
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 <= self.1 {
            let next = self.0 + TimeDelta::try_hours(BLOCK_HOURS as i64).unwrap();
            Some(replace(&mut self.0, next))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_block_start_hour() {
        assert_eq!(block_start_hour(0), 0);
        assert_eq!(block_start_hour(2), 0);
        assert_eq!(block_start_hour(3), 3);
        assert_eq!(block_start_hour(13), 12);
        assert_eq!(block_start_hour(23), 21);
    }

    #[test]
    fn test_is_block_aligned() {
        assert!(is_block_aligned(&ts(6, 0)));
        assert!(!is_block_aligned(&ts(7, 0)));
        assert!(!is_block_aligned(&ts(6, 15)));
    }

    #[test]
    fn test_containing_block_start() {
        assert_eq!(containing_block_start(&ts(8, 45)), ts(6, 0));
        assert_eq!(containing_block_start(&ts(21, 0)), ts(21, 0));
    }

    #[test]
    fn test_block_range_iteration() {
        let range = BlockRange(ts(0, 0), ts(9, 0));
        let starts: Vec<NaiveDateTime> = range.collect();
        assert_eq!(starts.len(), 4);
        assert_eq!(starts[0], ts(0, 0));
        assert_eq!(starts[3], ts(9, 0));
    }

    #[test]
    fn test_block_range_crosses_midnight() {
        let start = ts(21, 0);
        let end = NaiveDate::from_ymd_opt(2023, 1, 6)
            .unwrap()
            .and_hms_opt(3, 0, 0)
            .unwrap();
        let starts: Vec<NaiveDateTime> = BlockRange(start, end).collect();
        assert_eq!(starts.len(), 3);
        assert_eq!(starts[1].hour(), 0);
    }

    #[test]
    fn test_block_range_empty() {
        let starts: Vec<NaiveDateTime> = BlockRange(ts(6, 0), ts(3, 0)).collect();
        assert_eq!(starts.len(), 0);
    }
}
