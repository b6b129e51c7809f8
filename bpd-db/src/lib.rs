//! SQLite time-series store layer for basin meteorological data.
//!
//! This crate wraps the uniform store the disaggregation core collaborates
//! with: append-only records of `(timestamp, cell_id, variable, value)`,
//! future 3-hour precipitation totals, and the disaggregated hourly output.
//! The core does not manage the store's schema migrations or durability; it
//! only issues range queries per cell and time window and appends results.
//!
//! # Usage
//!
//! ```rust
//! use bpd_db::Database;
//!
//! let db = Database::open_in_memory().unwrap();
//! db.load_gauge_csv(17, "time;pr\n2023.01.05 06:15;0.4\n").unwrap();
//! let obs = db.query_precipitation(17, None, None).unwrap();
//! assert_eq!(obs.len(), 1);
//! ```
//!
//! # Tables
//!
//! See [`schema::create_schema`] for the full SQL schema.

pub mod schema;
mod loader;
pub mod models;
mod queries;

use rusqlite::Connection;
use std::path::Path;

/// SQLite store holding observations, future blocks and hourly results.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if necessary) a file-backed store with the full
    /// schema applied.
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(schema::create_schema())?;
        Ok(Self { conn })
    }

    /// Create a new in-memory store with the full schema applied.
    /// Used by tests; data does not survive the connection.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(schema::create_schema())?;
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}
