/// Error types for the basin disaggregation crates
use chrono::NaiveDateTime;
use thiserror::Error;

/// Main error type for disaggregation operations
#[derive(Error, Debug)]
pub enum BasinError {
    /// An hour or block has no usable source data; recovered locally by
    /// exclusion, never by fabricating precipitation
    #[error("No usable source data for cell {cell_id} at {timestamp}")]
    DataGap {
        cell_id: i64,
        timestamp: NaiveDateTime,
    },

    /// No candidate years exist at any permitted granularity for a key
    #[error("No climatological basis for cell {cell_id} at {block_start}")]
    NoClimatologicalBasis {
        cell_id: i64,
        block_start: NaiveDateTime,
    },

    /// A selected weight triple failed to reproduce the block total
    #[error("Hourly sum {actual} drifted from block total {expected} for cell {cell_id} at {block_start}")]
    SumInvariantViolation {
        cell_id: i64,
        block_start: NaiveDateTime,
        expected: f64,
        actual: f64,
    },

    /// A candidate triple does not sum to 1 within tolerance; rejected at
    /// build time, never at use time
    #[error("Weight triple for year {year} sums to {sum}, not 1")]
    MalformedTriple { year: i32, sum: f64 },

    /// A block start is not aligned to the 0/3/6/.../21 schedule
    #[error("Block start {0} is not aligned to a 3-hour boundary")]
    UnalignedBlock(NaiveDateTime),

    /// Timestamp parsing failed
    #[error("Failed to parse timestamp: {0}")]
    TimestampParse(String),

    /// Failed to parse CSV data
    #[error("Failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),
}

/// Type alias for Results using BasinError
pub type Result<T> = std::result::Result<T, BasinError>;
