//! Weight table construction from aggregated hourly history.
//!
//! Every valid historical 3-hour block yields one raw shape triple; per
//! climatological key and source year those collapse into a single candidate
//! (slot-wise mean, renormalized). Candidates are never averaged across
//! years — inter-annual variability is exactly what the disaggregator
//! samples from.

use bpd_core::block::containing_block_start;
use bpd_core::error::Result;
use bpd_core::hourly::HourlyTotal;
use bpd_core::weights::{WeightKey, WeightTriple};
use chrono::{Datelike, NaiveDateTime, TimeDelta, Timelike};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::io;

/// Candidate weight triples grouped by climatological key, one per source
/// year, built once per run and shared immutably thereafter.
///
/// Fine keys carry the 3-hour block start; coarse keys cover a whole month.
/// Candidate lists are held in year-ascending order so the mapping from a
/// generator draw to a year is stable across runs and implementations.
#[derive(Debug, Clone, Default)]
pub struct WeightTable {
    fine: HashMap<WeightKey, Vec<WeightTriple>>,
    coarse: HashMap<WeightKey, Vec<WeightTriple>>,
}

impl WeightTable {
    /// The candidate triples for a key, empty when the key is unknown.
    pub fn candidates(&self, key: &WeightKey) -> &[WeightTriple] {
        let map = if key.hour.is_some() {
            &self.fine
        } else {
            &self.coarse
        };
        map.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Insert a candidate, keeping its list sorted by year.
    pub fn insert_candidate(&mut self, key: WeightKey, triple: WeightTriple) {
        let map = if key.hour.is_some() {
            &mut self.fine
        } else {
            &mut self.coarse
        };
        let list = map.entry(key).or_default();
        let pos = list.partition_point(|t| t.year() < triple.year());
        list.insert(pos, triple);
    }

    pub fn n_fine_keys(&self) -> usize {
        self.fine.len()
    }

    pub fn n_coarse_keys(&self) -> usize {
        self.coarse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fine.is_empty() && self.coarse.is_empty()
    }

    /// All rows in deterministic order, for serialization.
    fn sorted_rows(&self) -> Vec<WeightRow> {
        self.fine
            .iter()
            .chain(self.coarse.iter())
            .flat_map(|(key, triples)| triples.iter().map(move |t| WeightRow::new(key, t)))
            .sorted_by_key(|row| (row.cell_id, row.month, row.hour, row.year))
            .collect()
    }

    /// Write the table as CSV: `year,cell_id,month,hour,w0,w1,w2`, with an
    /// empty hour for month-only rows.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for row in self.sorted_rows() {
            wtr.serialize(row)?;
        }
        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    /// Read a table back from CSV. Rows whose triple fails validation are
    /// logged and excluded — build-time rejection, never use-time.
    pub fn read_csv<R: io::Read>(reader: R) -> Result<WeightTable> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut table = WeightTable::default();
        let mut rejected = 0usize;
        for result in rdr.deserialize::<WeightRow>() {
            let row = result?;
            let key = WeightKey {
                cell_id: row.cell_id,
                month: row.month,
                hour: row.hour,
            };
            match WeightTriple::new(row.year, [row.w0, row.w1, row.w2]) {
                Ok(triple) => table.insert_candidate(key, triple),
                Err(e) => {
                    log::warn!("[bpd] weights: rejecting stored triple: {}", e);
                    rejected += 1;
                }
            }
        }
        if rejected > 0 {
            log::warn!("[bpd] weights: {} stored triples rejected", rejected);
        }
        Ok(table)
    }
}

/// Serialized weight-table row.
#[derive(Debug, Serialize, Deserialize)]
struct WeightRow {
    year: i32,
    cell_id: i64,
    month: u32,
    hour: Option<u32>,
    w0: f64,
    w1: f64,
    w2: f64,
}

impl WeightRow {
    fn new(key: &WeightKey, triple: &WeightTriple) -> Self {
        let [w0, w1, w2] = *triple.weights();
        WeightRow {
            year: triple.year(),
            cell_id: key.cell_id,
            month: key.month,
            hour: key.hour,
            w0,
            w1,
            w2,
        }
    }
}

/// Build-time statistics and rejected identities.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Blocks that contributed a shape triple.
    pub blocks_used: usize,
    /// Blocks excluded because their total was zero (no shape information).
    pub blocks_zero_total: usize,
    /// Blocks excluded because a constituent hour was missing, identified
    /// by cell and block start.
    pub gapped_blocks: Vec<(i64, NaiveDateTime)>,
    pub fine_triples: usize,
    pub coarse_triples: usize,
    /// `(key, year)` combinations whose reduced triple failed validation.
    pub malformed_rejected: Vec<(WeightKey, i32)>,
}

/// Convert hourly history into a [`WeightTable`].
///
/// Block boundaries follow the fixed 0/3/6/.../21 schedule. A block
/// participates only when all three constituent hours are present; a year
/// with no valid blocks for a key contributes no triple for that key.
pub fn build_weight_table(totals: &[HourlyTotal]) -> (WeightTable, BuildReport) {
    let index: HashMap<(i64, NaiveDateTime), f64> = totals
        .iter()
        .map(|t| ((t.cell_id, t.timestamp()), t.total_mm))
        .collect();
    let block_starts: BTreeSet<(i64, NaiveDateTime)> = totals
        .iter()
        .map(|t| (t.cell_id, containing_block_start(&t.timestamp())))
        .collect();

    let mut report = BuildReport::default();
    // (key, year) -> (slot-wise sum of raw triples, block count)
    let mut acc: HashMap<(WeightKey, i32), ([f64; 3], u32)> = HashMap::new();

    for (cell_id, start) in block_starts {
        let mut hours = [0.0f64; 3];
        let mut complete = true;
        for (offset, slot) in hours.iter_mut().enumerate() {
            let ts = start + TimeDelta::try_hours(offset as i64).unwrap();
            match index.get(&(cell_id, ts)) {
                Some(v) => *slot = *v,
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if !complete {
            report.gapped_blocks.push((cell_id, start));
            continue;
        }
        let total: f64 = hours.iter().sum();
        if total <= 0.0 {
            report.blocks_zero_total += 1;
            continue;
        }
        let raw = hours.map(|h| h / total);
        let year = start.year();
        let fine = WeightKey::fine(cell_id, start.month(), start.hour());
        for key in [fine, fine.coarsened()] {
            let slot = acc.entry((key, year)).or_insert(([0.0; 3], 0));
            for (sum, r) in slot.0.iter_mut().zip(raw.iter()) {
                *sum += r;
            }
            slot.1 += 1;
        }
        report.blocks_used += 1;
    }

    let mut table = WeightTable::default();
    for ((key, year), (sums, n)) in acc {
        let mean = sums.map(|s| s / n as f64);
        match WeightTriple::new(year, mean) {
            Ok(triple) => {
                if key.hour.is_some() {
                    report.fine_triples += 1;
                } else {
                    report.coarse_triples += 1;
                }
                table.insert_candidate(key, triple);
            }
            Err(e) => {
                log::warn!("[bpd] weights: {}", e);
                report.malformed_rejected.push((key, year));
            }
        }
    }
    report.malformed_rejected.sort();

    log::info!(
        "[bpd] weights: built {} fine / {} coarse triples from {} blocks ({} zero-total, {} gapped, {} malformed)",
        report.fine_triples,
        report.coarse_triples,
        report.blocks_used,
        report.blocks_zero_total,
        report.gapped_blocks.len(),
        report.malformed_rejected.len()
    );
    (table, report)
}
