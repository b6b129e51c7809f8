//! Weight table command: hourly CSV in, weight table CSV out.

use anyhow::Context;
use bpd_core::hourly::HourlyTotal;
use bpd_data::weights::build_weight_table;
use log::{info, warn};
use std::fs::File;

/// Build the climatological weight table from aggregated hourly history.
pub fn run_build_weights(hourly_csv: &str, weights_csv: &str) -> anyhow::Result<()> {
    let mut rdr = csv::Reader::from_path(hourly_csv)
        .with_context(|| format!("failed to open {hourly_csv}"))?;
    let totals = rdr
        .deserialize::<HourlyTotal>()
        .collect::<Result<Vec<_>, _>>()
        .context("failed to parse hourly totals CSV")?;
    info!("Read {} hourly totals from {}", totals.len(), hourly_csv);

    let (table, report) = build_weight_table(&totals);
    if table.is_empty() {
        warn!("No valid blocks in the history; weight table is empty");
    }
    for (key, year) in &report.malformed_rejected {
        warn!(
            "Rejected malformed triple for cell {} month {} hour {:?} year {}",
            key.cell_id, key.month, key.hour, year
        );
    }

    let file =
        File::create(weights_csv).with_context(|| format!("failed to create {weights_csv}"))?;
    table.write_csv(file)?;
    info!(
        "Weight table written to {}: {} fine keys, {} coarse keys ({} blocks used, {} zero-total, {} gapped)",
        weights_csv,
        table.n_fine_keys(),
        table.n_coarse_keys(),
        report.blocks_used,
        report.blocks_zero_total,
        report.gapped_blocks.len()
    );
    Ok(())
}
