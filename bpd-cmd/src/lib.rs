//! Command implementations for the basin disaggregation CLI.
//!
//! Provides the three pipeline stages as subcommands: hourly aggregation of
//! historical observations, weight table construction, and stochastic
//! disaggregation of future blocks.

use clap::Subcommand;

pub mod aggregate;
pub mod disaggregate;
pub mod weights;

#[derive(Subcommand)]
pub enum Command {
    /// Aggregate raw historical observations into hourly totals
    Aggregate {
        /// Path to the SQLite time-series store
        #[arg(short, long)]
        db_path: String,

        /// Only aggregate a single cell (default: every cell in the store)
        #[arg(long)]
        cell_id: Option<i64>,

        /// Start of the aggregation window ("YYYY-MM-DD HH:MM")
        #[arg(long)]
        start: Option<String>,

        /// End of the aggregation window ("YYYY-MM-DD HH:MM")
        #[arg(long)]
        end: Option<String>,

        /// Write explicit zeros for gap hours instead of excluding them
        #[arg(long)]
        zero_fill: bool,

        /// Output path for the hourly totals CSV
        #[arg(short = 'o', long)]
        hourly_csv: String,

        /// Optional output path for the 3-hourly totals CSV
        #[arg(long)]
        three_hourly_csv: Option<String>,
    },

    /// Build the climatological weight table from hourly history
    BuildWeights {
        /// Input hourly totals CSV (from the aggregate command)
        #[arg(short = 'i', long)]
        hourly_csv: String,

        /// Output path for the weight table CSV
        #[arg(short = 'w', long)]
        weights_csv: String,
    },

    /// Disaggregate future 3-hour blocks into hourly values
    Disaggregate {
        /// Path to the SQLite time-series store
        #[arg(short, long)]
        db_path: String,

        /// Weight table CSV (from the build-weights command)
        #[arg(short = 'w', long)]
        weights_csv: String,

        /// Only process a single cell (for test runs)
        #[arg(long)]
        cell_id: Option<i64>,

        /// Only process this many blocks (for test runs)
        #[arg(long)]
        limit: Option<usize>,

        /// Base random seed (default: drawn at run start and logged)
        #[arg(long)]
        seed: Option<u64>,

        /// Weight granularity: "month-hour" or "month-only"
        #[arg(long, default_value = "month-hour")]
        granularity: String,

        /// Disable the month-only fallback for month-hour misses
        #[arg(long)]
        no_fallback: bool,

        /// Optional CSV export of the hourly results
        #[arg(long)]
        results_csv: Option<String>,
    },
}

pub fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Aggregate {
            db_path,
            cell_id,
            start,
            end,
            zero_fill,
            hourly_csv,
            three_hourly_csv,
        } => aggregate::run_aggregate(
            &db_path,
            cell_id,
            start.as_deref(),
            end.as_deref(),
            zero_fill,
            &hourly_csv,
            three_hourly_csv.as_deref(),
        ),
        Command::BuildWeights {
            hourly_csv,
            weights_csv,
        } => weights::run_build_weights(&hourly_csv, &weights_csv),
        Command::Disaggregate {
            db_path,
            weights_csv,
            cell_id,
            limit,
            seed,
            granularity,
            no_fallback,
            results_csv,
        } => disaggregate::run_disaggregate(
            &db_path,
            &weights_csv,
            cell_id,
            limit,
            seed,
            &granularity,
            no_fallback,
            results_csv.as_deref(),
        ),
    }
}
