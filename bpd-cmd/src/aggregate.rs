//! Hourly aggregation command: store observations in, hourly CSV out.

use anyhow::Context;
use bpd_core::error::BasinError;
use bpd_core::observation::Observation;
use bpd_data::aggregate::{aggregate_hourly, aggregate_three_hourly};
use bpd_data::config::GapPolicy;
use bpd_db::Database;
use log::{info, warn};

/// How many gap identities to spell out before collapsing to a count.
const GAP_REPORT_LIMIT: usize = 10;

/// Aggregate historical precipitation observations into per-hour totals.
///
/// Reads observations for the selected cells (all observation-bearing cells
/// by default) and window from the store, writes the hourly totals CSV and,
/// when requested, the 3-hourly totals CSV alongside it.
#[allow(clippy::too_many_arguments)]
pub fn run_aggregate(
    db_path: &str,
    cell_id: Option<i64>,
    start: Option<&str>,
    end: Option<&str>,
    zero_fill: bool,
    hourly_csv: &str,
    three_hourly_csv: Option<&str>,
) -> anyhow::Result<()> {
    let db = Database::open(db_path).with_context(|| format!("failed to open store {db_path}"))?;

    let start_ts = start
        .map(Observation::parse_store_timestamp)
        .transpose()
        .context("invalid --start (expected YYYY-MM-DD HH:MM)")?;
    let end_ts = end
        .map(Observation::parse_store_timestamp)
        .transpose()
        .context("invalid --end (expected YYYY-MM-DD HH:MM)")?;

    let cells = match cell_id {
        Some(cell) => vec![cell],
        None => db.query_observation_cells()?,
    };
    if cells.is_empty() {
        anyhow::bail!("store has no precipitation observations; load gauge data first");
    }
    info!("Aggregating {} cells from {}", cells.len(), db_path);

    let mut observations = Vec::new();
    for cell in &cells {
        observations.extend(db.query_precipitation(*cell, start_ts.as_ref(), end_ts.as_ref())?);
    }

    let policy = if zero_fill {
        GapPolicy::ZeroFill
    } else {
        GapPolicy::Exclude
    };
    let aggregate = aggregate_hourly(&observations, policy);
    info!(
        "Aggregated {} hourly totals, {} gap hours under {:?}",
        aggregate.totals.len(),
        aggregate.gaps.len(),
        aggregate.policy
    );
    for (cell_id, timestamp) in aggregate.gaps.iter().take(GAP_REPORT_LIMIT) {
        warn!(
            "{}",
            BasinError::DataGap {
                cell_id: *cell_id,
                timestamp: *timestamp,
            }
        );
    }
    if aggregate.gaps.len() > GAP_REPORT_LIMIT {
        warn!("... and {} more gap hours", aggregate.gaps.len() - GAP_REPORT_LIMIT);
    }

    let mut wtr = csv::Writer::from_path(hourly_csv)
        .with_context(|| format!("failed to create {hourly_csv}"))?;
    for total in &aggregate.totals {
        wtr.serialize(total)?;
    }
    wtr.flush()?;
    info!("Hourly totals written to {}", hourly_csv);

    if let Some(path) = three_hourly_csv {
        let blocks = aggregate_three_hourly(&aggregate.totals);
        let mut wtr =
            csv::Writer::from_path(path).with_context(|| format!("failed to create {path}"))?;
        for block in &blocks {
            wtr.serialize(block)?;
        }
        wtr.flush()?;
        info!("{} three-hourly totals written to {}", blocks.len(), path);
    }

    Ok(())
}
