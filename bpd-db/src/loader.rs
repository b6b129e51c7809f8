//! CSV loading functions for populating the time-series store.
//!
//! Each loader parses CSV data from a string slice and inserts rows into the
//! corresponding table. Rows that fail to parse are skipped and counted,
//! never guessed at.
//!
//! # CSV Formats
//!
//! - **Cells** (has headers): `cell_id,lon,lat`
//! - **Gauge observations** (has headers, `;` separated): `time;pr` with
//!   timestamps as `YYYY.MM.DD HH:MM` — the upstream gauge export format
//! - **Future blocks** (no headers): `cell_id,time,pr` with timestamps as
//!   `YYYY-MM-DD HH:MM` stamped at the 3-hour block start

use crate::Database;
use bpd_core::observation::Observation;
use rusqlite::params;

impl Database {
    /// Load grid cell metadata from CSV string.
    ///
    /// Expected format (with headers): `cell_id,lon,lat`
    pub fn load_cells(&self, csv_data: &str) -> anyhow::Result<usize> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(csv_data.as_bytes());

        let mut count = 0usize;
        for result in rdr.records() {
            let r = result?;
            let cell_id: i64 = r.get(0).unwrap_or("").trim().parse()?;
            let lon: f64 = r.get(1).unwrap_or("").trim().parse()?;
            let lat: f64 = r.get(2).unwrap_or("").trim().parse()?;

            self.conn().execute(
                "INSERT OR REPLACE INTO cells (cell_id, lon, lat) VALUES (?1, ?2, ?3)",
                params![cell_id, lon, lat],
            )?;
            count += 1;
        }
        log::info!("[bpd] loader: loaded {} cells", count);
        Ok(count)
    }

    /// Load raw gauge precipitation observations for one cell.
    ///
    /// Expected format (with headers, `;` separated): `time;pr` where `time`
    /// is `YYYY.MM.DD HH:MM`. Timestamps are re-stamped into the store
    /// format; rows with unparseable timestamps or non-numeric values are
    /// skipped and counted.
    ///
    /// # Example CSV
    /// ```text
    /// time;pr
    /// 2023.01.05 06:15;0.4
    /// ```
    pub fn load_gauge_csv(&self, cell_id: i64, csv_data: &str) -> anyhow::Result<usize> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b';')
            .flexible(true)
            .from_reader(csv_data.as_bytes());

        let mut count = 0usize;
        let mut skipped = 0usize;
        for result in rdr.records() {
            let r = result?;
            let time_str = r.get(0).unwrap_or("").trim();
            let value_str = r.get(1).unwrap_or("").trim();

            let timestamp = match Observation::parse_gauge_timestamp(time_str) {
                Ok(ts) => ts,
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            };
            let value: f64 = match value_str.parse() {
                Ok(v) => v,
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            };

            self.conn().execute(
                "INSERT OR REPLACE INTO observations (time, cell_id, variable, value)
                 VALUES (?1, ?2, 'pr', ?3)",
                params![Observation::format_store_timestamp(&timestamp), cell_id, value],
            )?;
            count += 1;
        }
        log::info!(
            "[bpd] loader: loaded {} gauge observations for cell {}, skipped {}",
            count,
            cell_id,
            skipped
        );
        Ok(count)
    }

    /// Load future 3-hour precipitation blocks from CSV string.
    ///
    /// Expected format (no headers): `cell_id,time,pr` where `time` is the
    /// block start in store format (`YYYY-MM-DD HH:MM`). Rows with
    /// unparseable fields are skipped and counted.
    ///
    /// # Example CSV
    /// ```text
    /// 17,2031-07-12 06:00,0.5
    /// ```
    pub fn load_future_blocks(&self, csv_data: &str) -> anyhow::Result<usize> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(csv_data.as_bytes());

        let mut count = 0usize;
        let mut skipped = 0usize;
        for result in rdr.records() {
            let r = result?;
            let cell_str = r.get(0).unwrap_or("").trim();
            let time_str = r.get(1).unwrap_or("").trim();
            let value_str = r.get(2).unwrap_or("").trim();

            let cell_id: i64 = match cell_str.parse() {
                Ok(c) => c,
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            };
            if Observation::parse_store_timestamp(time_str).is_err() {
                skipped += 1;
                continue;
            }
            let value: f64 = match value_str.parse() {
                Ok(v) => v,
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            };

            self.conn().execute(
                "INSERT OR REPLACE INTO future_blocks (time, cell_id, pr) VALUES (?1, ?2, ?3)",
                params![time_str, cell_id, value],
            )?;
            count += 1;
        }
        log::info!(
            "[bpd] loader: loaded {} future blocks, skipped {}",
            count,
            skipped
        );
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;

    #[test]
    fn load_gauge_csv_skips_bad_rows() {
        let db = Database::open_in_memory().unwrap();
        let data = "time;pr\n2023.01.05 06:15;0.4\n2023.01.05 06:30;n/a\nbogus;0.2\n";
        let count = db.load_gauge_csv(17, data).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn load_future_blocks_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let data = "17,2031-07-12 06:00,0.5\n17,2031-07-12 09:00,0.0\n";
        let count = db.load_future_blocks(data).unwrap();
        assert_eq!(count, 2);
        let blocks = db.query_future_blocks(None, None).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].total_mm, 0.5);
    }

    #[test]
    fn load_cells_parses_headers() {
        let db = Database::open_in_memory().unwrap();
        let count = db
            .load_cells("cell_id,lon,lat\n17,19.81,48.05\n18,19.84,48.05\n")
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(db.query_cells().unwrap().len(), 2);
    }
}
