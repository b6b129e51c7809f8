//! Typed query methods for the time-series store.
//!
//! All reads are bulk range queries issued at the edges of a run; the
//! disaggregation core never touches the store mid-computation. Store
//! timestamps are TEXT in `YYYY-MM-DD HH:MM` form, so lexicographic range
//! comparisons are chronological.

use crate::models::{CellInfo, TimeValue};
use crate::Database;
use bpd_core::future::{FutureBlock, HourlyResult};
use bpd_core::observation::{Observation, Variable};
use chrono::NaiveDateTime;
use rusqlite::params;

/// Lower bound used when a range query has no explicit start.
const TIME_MIN: &str = "0001-01-01 00:00";
/// Upper bound used when a range query has no explicit end.
const TIME_MAX: &str = "9999-12-31 23:59";

impl Database {
    /// Get historical precipitation observations for one cell, optionally
    /// bounded to a time window. Ordered chronologically.
    pub fn query_precipitation(
        &self,
        cell_id: i64,
        start: Option<&NaiveDateTime>,
        end: Option<&NaiveDateTime>,
    ) -> anyhow::Result<Vec<Observation>> {
        let start_s = start
            .map(Observation::format_store_timestamp)
            .unwrap_or_else(|| TIME_MIN.to_string());
        let end_s = end
            .map(Observation::format_store_timestamp)
            .unwrap_or_else(|| TIME_MAX.to_string());

        let mut stmt = self.conn().prepare(
            "SELECT time, value FROM observations
             WHERE cell_id = ?1 AND variable = 'pr' AND time >= ?2 AND time <= ?3
             ORDER BY time",
        )?;
        let rows = stmt
            .query_map(params![cell_id, start_s, end_s], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut observations = Vec::with_capacity(rows.len());
        for (time, value) in rows {
            observations.push(Observation {
                timestamp: Observation::parse_store_timestamp(&time)?,
                cell_id,
                variable: Variable::Precipitation,
                value,
            });
        }
        log::info!(
            "[bpd] query: query_precipitation returned {} records for cell {}",
            observations.len(),
            cell_id
        );
        Ok(observations)
    }

    /// Get future 3-hour blocks, optionally filtered to one cell and/or
    /// row-limited (both for test runs). Ordered by cell then time.
    ///
    /// Rows whose timestamp does not sit on a 3-hour boundary are store
    /// corruption; they are skipped with a warning rather than disaggregated
    /// from a wrong alignment.
    pub fn query_future_blocks(
        &self,
        cell_id: Option<i64>,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<FutureBlock>> {
        let mut stmt = self.conn().prepare(
            "SELECT cell_id, time, pr FROM future_blocks
             WHERE (?1 IS NULL OR cell_id = ?1)
             ORDER BY cell_id, time
             LIMIT ?2",
        )?;
        let limit_param = limit.map(|l| l as i64).unwrap_or(-1);
        let rows = stmt
            .query_map(params![cell_id, limit_param], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut blocks = Vec::with_capacity(rows.len());
        let mut skipped = 0usize;
        for (cell, time, pr) in rows {
            let start = Observation::parse_store_timestamp(&time)?;
            match FutureBlock::new(cell, start, pr) {
                Ok(block) => blocks.push(block),
                Err(e) => {
                    log::warn!("[bpd] query: skipping future block for cell {}: {}", cell, e);
                    skipped += 1;
                }
            }
        }
        log::info!(
            "[bpd] query: query_future_blocks returned {} blocks, skipped {}",
            blocks.len(),
            skipped
        );
        Ok(blocks)
    }

    /// List the cells that actually carry precipitation observations.
    /// Unlike [`query_cells`](Self::query_cells), this does not depend on
    /// the `cells` metadata table being populated.
    pub fn query_observation_cells(&self) -> anyhow::Result<Vec<i64>> {
        let mut stmt = self.conn().prepare(
            "SELECT DISTINCT cell_id FROM observations WHERE variable = 'pr' ORDER BY cell_id",
        )?;
        let rows = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// List all known grid cells.
    pub fn query_cells(&self) -> anyhow::Result<Vec<CellInfo>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT cell_id, lon, lat FROM cells ORDER BY cell_id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CellInfo {
                    cell_id: row.get(0)?,
                    lon: row.get(1)?,
                    lat: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Append disaggregated hourly results. Re-running a block replaces its
    /// previous rows, keeping re-executed runs idempotent.
    pub fn insert_hourly_results(&self, results: &[HourlyResult]) -> anyhow::Result<usize> {
        let mut stmt = self.conn().prepare(
            "INSERT OR REPLACE INTO hourly_results (time, cell_id, pr) VALUES (?1, ?2, ?3)",
        )?;
        for r in results {
            stmt.execute(params![
                Observation::format_store_timestamp(&r.timestamp),
                r.cell_id,
                r.value_mm
            ])?;
        }
        log::info!("[bpd] query: appended {} hourly results", results.len());
        Ok(results.len())
    }

    /// Get disaggregated hourly results for one cell, ordered chronologically.
    pub fn query_hourly_results(&self, cell_id: i64) -> anyhow::Result<Vec<TimeValue>> {
        let mut stmt = self.conn().prepare(
            "SELECT time, pr FROM hourly_results WHERE cell_id = ?1 ORDER BY time",
        )?;
        let rows = stmt
            .query_map(params![cell_id], |row| {
                Ok(TimeValue {
                    time: row.get(0)?,
                    value: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use bpd_core::future::HourlyResult;
    use bpd_core::observation::Observation;

    #[test]
    fn precipitation_range_query_is_bounded() {
        let db = Database::open_in_memory().unwrap();
        db.load_gauge_csv(
            3,
            "time;pr\n2023.01.05 06:15;0.4\n2023.01.05 07:15;0.2\n2023.01.06 06:15;0.1\n",
        )
        .unwrap();

        let start = Observation::parse_store_timestamp("2023-01-05 00:00").unwrap();
        let end = Observation::parse_store_timestamp("2023-01-05 23:59").unwrap();
        let obs = db.query_precipitation(3, Some(&start), Some(&end)).unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].value, 0.4);
    }

    #[test]
    fn future_blocks_filter_and_limit() {
        let db = Database::open_in_memory().unwrap();
        db.load_future_blocks(
            "1,2031-07-12 06:00,0.5\n2,2031-07-12 06:00,0.3\n1,2031-07-12 09:00,0.1\n",
        )
        .unwrap();

        let only_one = db.query_future_blocks(Some(1), None).unwrap();
        assert_eq!(only_one.len(), 2);
        assert!(only_one.iter().all(|b| b.cell_id == 1));

        let limited = db.query_future_blocks(None, Some(1)).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn unaligned_future_block_is_skipped() {
        let db = Database::open_in_memory().unwrap();
        db.load_future_blocks("1,2031-07-12 07:00,0.5\n1,2031-07-12 09:00,0.1\n")
            .unwrap();
        let blocks = db.query_future_blocks(None, None).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].total_mm, 0.1);
    }

    #[test]
    fn hourly_results_replace_on_rerun() {
        let db = Database::open_in_memory().unwrap();
        let ts = Observation::parse_store_timestamp("2031-07-12 06:00").unwrap();
        let first = vec![HourlyResult {
            cell_id: 9,
            timestamp: ts,
            value_mm: 0.2,
        }];
        let second = vec![HourlyResult {
            cell_id: 9,
            timestamp: ts,
            value_mm: 0.3,
        }];
        db.insert_hourly_results(&first).unwrap();
        db.insert_hourly_results(&second).unwrap();
        let rows = db.query_hourly_results(9).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 0.3);
    }
}
