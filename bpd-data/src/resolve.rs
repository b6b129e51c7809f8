//! Period resolution: mapping a future block onto its climatological key.
//!
//! The finer month-hour key is preferred whenever it has candidates, even a
//! single one; whether a miss may fall back to the month-only key is
//! configuration, not policy baked in here. Resolution never fails silently
//! and never substitutes an invented distribution.

use crate::weights::WeightTable;
use bpd_core::block::block_start_hour;
use bpd_core::error::{BasinError, Result};
use bpd_core::weights::{Granularity, WeightKey, WeightTriple};
use chrono::{Datelike, NaiveDateTime, Timelike};

/// How a block's key was matched, carried into the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchLevel {
    /// Matched at the fine month-hour granularity.
    MonthHour,
    /// Matched at month-only granularity because that is the configured
    /// granularity.
    MonthOnly,
    /// Fell back to the month-only key after a month-hour miss; recorded as
    /// a fallback, not a fine-grained match.
    MonthFallback,
}

/// A resolved climatological period.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedPeriod {
    pub key: WeightKey,
    pub level: MatchLevel,
}

/// Resolve the weight key for a future block start.
///
/// Returns the matched period and its candidate triples (always non-empty),
/// or [`BasinError::NoClimatologicalBasis`] when no permitted granularity
/// has candidates.
pub fn resolve_period<'a>(
    table: &'a WeightTable,
    cell_id: i64,
    block_start: NaiveDateTime,
    granularity: Granularity,
    fallback_enabled: bool,
) -> Result<(ResolvedPeriod, &'a [WeightTriple])> {
    let month = block_start.month();

    if granularity == Granularity::MonthHour {
        let fine = WeightKey::fine(cell_id, month, block_start_hour(block_start.hour()));
        let candidates = table.candidates(&fine);
        if !candidates.is_empty() {
            return Ok((
                ResolvedPeriod {
                    key: fine,
                    level: MatchLevel::MonthHour,
                },
                candidates,
            ));
        }
        if !fallback_enabled {
            return Err(BasinError::NoClimatologicalBasis {
                cell_id,
                block_start,
            });
        }
    }

    let coarse = WeightKey::coarse(cell_id, month);
    let candidates = table.candidates(&coarse);
    if !candidates.is_empty() {
        let level = match granularity {
            Granularity::MonthOnly => MatchLevel::MonthOnly,
            Granularity::MonthHour => MatchLevel::MonthFallback,
        };
        return Ok((ResolvedPeriod { key: coarse, level }, candidates));
    }

    Err(BasinError::NoClimatologicalBasis {
        cell_id,
        block_start,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpd_core::weights::WeightTriple;
    use chrono::NaiveDate;

    fn ts(month: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2031, month, 10)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn table_with(keys: &[WeightKey]) -> WeightTable {
        let mut table = WeightTable::default();
        for key in keys {
            table.insert_candidate(
                *key,
                WeightTriple::new(2023, [0.2, 0.3, 0.5]).unwrap(),
            );
        }
        table
    }

    #[test]
    fn test_fine_match_preferred() {
        let table = table_with(&[WeightKey::fine(7, 1, 0), WeightKey::coarse(7, 1)]);
        let (period, candidates) =
            resolve_period(&table, 7, ts(1, 0), Granularity::MonthHour, true).unwrap();
        assert_eq!(period.level, MatchLevel::MonthHour);
        assert_eq!(period.key, WeightKey::fine(7, 1, 0));
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_fallback_is_recorded_as_fallback() {
        // fine key (7, 1, 0) empty, coarse (7, 1) populated
        let table = table_with(&[WeightKey::coarse(7, 1)]);
        let (period, _) =
            resolve_period(&table, 7, ts(1, 0), Granularity::MonthHour, true).unwrap();
        assert_eq!(period.level, MatchLevel::MonthFallback);
        assert_eq!(period.key, WeightKey::coarse(7, 1));
    }

    #[test]
    fn test_fallback_disabled_reports_no_basis() {
        let table = table_with(&[WeightKey::coarse(7, 1)]);
        let err = resolve_period(&table, 7, ts(1, 0), Granularity::MonthHour, false);
        assert!(matches!(
            err,
            Err(BasinError::NoClimatologicalBasis { cell_id: 7, .. })
        ));
    }

    #[test]
    fn test_month_only_granularity_skips_fine_key() {
        let table = table_with(&[WeightKey::fine(7, 1, 0), WeightKey::coarse(7, 1)]);
        let (period, _) =
            resolve_period(&table, 7, ts(1, 0), Granularity::MonthOnly, true).unwrap();
        assert_eq!(period.level, MatchLevel::MonthOnly);
        assert_eq!(period.key, WeightKey::coarse(7, 1));
    }

    #[test]
    fn test_empty_table_reports_no_basis() {
        let table = WeightTable::default();
        let err = resolve_period(&table, 7, ts(1, 0), Granularity::MonthHour, true);
        assert!(matches!(err, Err(BasinError::NoClimatologicalBasis { .. })));
    }

    #[test]
    fn test_block_hour_is_truncated_to_schedule() {
        let table = table_with(&[WeightKey::fine(7, 1, 6)]);
        // 06:00 block key also serves a start inside the same block
        let (period, _) =
            resolve_period(&table, 7, ts(1, 6), Granularity::MonthHour, false).unwrap();
        assert_eq!(period.key, WeightKey::fine(7, 1, 6));
    }
}
