//! SQL schema definitions for the basin time-series store.
//!
//! Contains CREATE TABLE statements for all input and output tables.
//! The schema is applied as a single batch when the database is initialized.

/// Returns the full SQL schema as a single batch string.
///
/// This creates the following tables:
///
/// **Input tables:**
/// - `cells` - Grid cell centroid geometry (cell_id, lon, lat)
/// - `observations` - Historical records keyed by (time, cell_id, variable),
///   with `variable` one of `pr`, `tas`, `rsds`
/// - `future_blocks` - Future 3-hour precipitation totals stamped at the
///   block start (time, cell_id, pr)
///
/// **Output table:**
/// - `hourly_results` - Disaggregated hourly precipitation (time, cell_id, pr)
pub fn create_schema() -> &'static str {
    r#"
    CREATE TABLE IF NOT EXISTS cells (
        cell_id INTEGER PRIMARY KEY,
        lon REAL NOT NULL,
        lat REAL NOT NULL
    );

    CREATE TABLE IF NOT EXISTS observations (
        time TEXT NOT NULL,
        cell_id INTEGER NOT NULL,
        variable TEXT NOT NULL,
        value REAL NOT NULL,
        PRIMARY KEY (time, cell_id, variable)
    );
    CREATE INDEX IF NOT EXISTS idx_obs_cell ON observations(cell_id, variable);
    CREATE INDEX IF NOT EXISTS idx_obs_time ON observations(time);

    CREATE TABLE IF NOT EXISTS future_blocks (
        time TEXT NOT NULL,
        cell_id INTEGER NOT NULL,
        pr REAL NOT NULL,
        PRIMARY KEY (time, cell_id)
    );
    CREATE INDEX IF NOT EXISTS idx_future_cell ON future_blocks(cell_id);

    CREATE TABLE IF NOT EXISTS hourly_results (
        time TEXT NOT NULL,
        cell_id INTEGER NOT NULL,
        pr REAL NOT NULL,
        PRIMARY KEY (time, cell_id)
    );
    CREATE INDEX IF NOT EXISTS idx_result_cell ON hourly_results(cell_id);

    "#
}
