//! Hourly aggregation of raw sub-hourly precipitation observations.
//!
//! An observation stamped `t` belongs to the hour starting at the truncation
//! of `t`, so each observation maps to exactly one hour and nothing is ever
//! counted twice. Hours with no usable source value are handled per the
//! configured [`GapPolicy`]; precipitation is never fabricated.

use crate::config::GapPolicy;
use bpd_core::block::containing_block_start;
use bpd_core::hourly::HourlyTotal;
use bpd_core::observation::{Observation, Variable};
use chrono::{NaiveDateTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The aggregator output: per-hour totals plus the hours that had no usable
/// source data, under the policy that produced them.
#[derive(Debug, Clone)]
pub struct HourlyAggregate {
    pub totals: Vec<HourlyTotal>,
    /// Hours inside each cell's observed span with no usable source value.
    /// Excluded from `totals` under [`GapPolicy::Exclude`], present as zero
    /// totals under [`GapPolicy::ZeroFill`].
    pub gaps: Vec<(i64, NaiveDateTime)>,
    pub policy: GapPolicy,
}

/// A 3-hour aggregate of the same history, produced alongside the hourly
/// one for downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreeHourTotal {
    pub cell_id: i64,
    pub start: NaiveDateTime,
    pub total_mm: f64,
}

fn hour_start(ts: &NaiveDateTime) -> NaiveDateTime {
    ts.date().and_hms_opt(ts.hour(), 0, 0).unwrap()
}

/// Group raw precipitation observations by hour, summing per cell.
///
/// Only precipitation records participate; other variables pass through the
/// store untouched and are ignored here. A non-finite or negative source
/// value makes its whole hour unusable (a gap), since a partial sum would
/// misrepresent the hour.
pub fn aggregate_hourly(observations: &[Observation], policy: GapPolicy) -> HourlyAggregate {
    // (cell, hour start) -> (sum, usable)
    let mut hours: BTreeMap<(i64, NaiveDateTime), (f64, bool)> = BTreeMap::new();
    for obs in observations {
        if obs.variable != Variable::Precipitation {
            continue;
        }
        let slot = hours
            .entry((obs.cell_id, hour_start(&obs.timestamp)))
            .or_insert((0.0, true));
        if obs.value.is_finite() && obs.value >= 0.0 {
            slot.0 += obs.value;
        } else {
            slot.1 = false;
        }
    }

    // Walk each cell's observed span hour by hour so interior gaps surface.
    let mut spans: BTreeMap<i64, (NaiveDateTime, NaiveDateTime)> = BTreeMap::new();
    for (cell_id, ts) in hours.keys() {
        spans
            .entry(*cell_id)
            .and_modify(|(first, last)| {
                if ts < first {
                    *first = *ts;
                }
                if ts > last {
                    *last = *ts;
                }
            })
            .or_insert((*ts, *ts));
    }

    let mut totals = Vec::new();
    let mut gaps = Vec::new();
    for (cell_id, (first, last)) in spans {
        let mut ts = first;
        while ts <= last {
            match hours.get(&(cell_id, ts)) {
                Some((sum, true)) => totals.push(HourlyTotal {
                    cell_id,
                    date: ts.date(),
                    hour: ts.hour(),
                    total_mm: *sum,
                }),
                _ => {
                    gaps.push((cell_id, ts));
                    if policy == GapPolicy::ZeroFill {
                        totals.push(HourlyTotal {
                            cell_id,
                            date: ts.date(),
                            hour: ts.hour(),
                            total_mm: 0.0,
                        });
                    }
                }
            }
            ts = ts + TimeDelta::try_hours(1).unwrap();
        }
    }

    log::info!(
        "[bpd] aggregate: {} hourly totals, {} gap hours ({:?})",
        totals.len(),
        gaps.len(),
        policy
    );
    HourlyAggregate {
        totals,
        gaps,
        policy,
    }
}

/// Sum hourly totals into aligned 3-hour blocks (0/3/6/.../21 schedule).
pub fn aggregate_three_hourly(totals: &[HourlyTotal]) -> Vec<ThreeHourTotal> {
    let mut blocks: BTreeMap<(i64, NaiveDateTime), f64> = BTreeMap::new();
    for total in totals {
        let start = containing_block_start(&total.timestamp());
        *blocks.entry((total.cell_id, start)).or_insert(0.0) += total.total_mm;
    }
    blocks
        .into_iter()
        .map(|((cell_id, start), total_mm)| ThreeHourTotal {
            cell_id,
            start,
            total_mm,
        })
        .collect()
}
