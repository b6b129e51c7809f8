//! Disaggregation command: future blocks and a weight table in, hourly
//! results appended to the store (and optionally exported as CSV).

use anyhow::Context;
use bpd_core::weights::Granularity;
use bpd_data::config::{DisaggConfig, GapPolicy};
use bpd_data::disagg::disaggregate_blocks;
use bpd_data::weights::WeightTable;
use bpd_db::Database;
use log::{info, warn};
use std::fs::File;

/// How many affected identities to spell out per failure kind before
/// collapsing to a count.
const REPORT_IDENTITY_LIMIT: usize = 10;

/// Run the stochastic disaggregation over the store's future blocks.
#[allow(clippy::too_many_arguments)]
pub fn run_disaggregate(
    db_path: &str,
    weights_csv: &str,
    cell_id: Option<i64>,
    limit: Option<usize>,
    seed: Option<u64>,
    granularity: &str,
    no_fallback: bool,
    results_csv: Option<&str>,
) -> anyhow::Result<()> {
    let granularity: Granularity = granularity
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let db = Database::open(db_path).with_context(|| format!("failed to open store {db_path}"))?;
    let file =
        File::open(weights_csv).with_context(|| format!("failed to open {weights_csv}"))?;
    let table = WeightTable::read_csv(file)?;
    if table.is_empty() {
        anyhow::bail!("weight table {weights_csv} is empty; build it first");
    }

    let blocks = db.query_future_blocks(cell_id, limit)?;
    if blocks.is_empty() {
        anyhow::bail!("no future blocks to disaggregate");
    }
    info!("Disaggregating {} future blocks", blocks.len());

    let config = DisaggConfig {
        granularity,
        base_seed: seed,
        fallback_enabled: !no_fallback,
        gap_policy: GapPolicy::Exclude,
    };
    let (results, report) = disaggregate_blocks(blocks, &table, &config);

    info!(
        "Run complete (base seed {}): {} blocks -> {} hourly results",
        report.base_seed,
        report.blocks_total,
        results.len()
    );
    info!(
        "Matches: {} month-hour, {} month-only, {} fallback, {} dry; max sum deviation {:.3e}",
        report.matched_month_hour,
        report.matched_month_only,
        report.matched_fallback,
        report.dry_blocks,
        report.max_sum_deviation
    );
    report_identities("no climatological basis", &report.no_basis);
    report_identities("sum invariant violation", &report.sum_violations);
    if report.blocks_withheld > 0 {
        warn!(
            "{} blocks withheld from output due to poisoned cell/key combinations",
            report.blocks_withheld
        );
    }

    db.insert_hourly_results(&results)?;
    info!("Results appended to {}", db_path);

    if let Some(path) = results_csv {
        let mut wtr =
            csv::Writer::from_path(path).with_context(|| format!("failed to create {path}"))?;
        for result in &results {
            wtr.serialize(result)?;
        }
        wtr.flush()?;
        info!("Results exported to {}", path);
    }

    Ok(())
}

fn report_identities(kind: &str, affected: &[(i64, chrono::NaiveDateTime)]) {
    if affected.is_empty() {
        return;
    }
    warn!("{} blocks: {}", kind, affected.len());
    for (cell_id, start) in affected.iter().take(REPORT_IDENTITY_LIMIT) {
        warn!("  cell {} at {}", cell_id, start);
    }
    if affected.len() > REPORT_IDENTITY_LIMIT {
        warn!("  ... and {} more", affected.len() - REPORT_IDENTITY_LIMIT);
    }
}
