#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `DuckDB` storage for the footprint engine.
//!
//! One database file holds the factor catalog, the travel location
//! directory, activity records and the versioned emission history.
//! [`FootprintDb`] implements every storage trait the engine reads and
//! writes through, so a single handle can serve as catalog, activity
//! source and emission store for a batch.
//!
//! Each table has a module of plain functions taking a `&Connection`;
//! multi-row writes go through [`with_transaction`].

pub mod activities;
pub mod emissions;
pub mod factors;
pub mod locations;
pub mod paths;
pub mod seed;

mod db;

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::Connection;
use footprint_calc::StoreError;
use footprint_factor::CatalogError;

pub use db::FootprintDb;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` error.
    #[error("Database error: {0}")]
    Duck(#[from] duckdb::Error),

    /// Filesystem error while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON column could not be encoded or decoded.
    #[error("JSON column error: {0}")]
    Json(#[from] serde_json::Error),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

impl From<DbError> for CatalogError {
    fn from(e: DbError) -> Self {
        Self::Backend(Box::new(e))
    }
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        Self::Backend(Box::new(e))
    }
}

/// Runs `f` between `BEGIN TRANSACTION` and `COMMIT`. If `f` fails the
/// transaction is rolled back and its error returned.
///
/// # Errors
///
/// Returns the error from `f`, or a [`DbError`] if the transaction cannot
/// be opened or committed.
pub fn with_transaction<T, E: From<DbError>>(
    conn: &Connection,
    f: impl FnOnce(&Connection) -> Result<T, E>,
) -> Result<T, E> {
    conn.execute_batch("BEGIN TRANSACTION")
        .map_err(DbError::from)?;

    match f(conn) {
        Ok(value) => {
            conn.execute_batch("COMMIT").map_err(DbError::from)?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                log::error!("Rollback failed: {rollback}");
            }
            Err(e)
        }
    }
}

/// Timestamps are stored as RFC 3339 text with microsecond precision.
pub(crate) fn timestamp_text(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DbError::Conversion {
            message: format!("invalid timestamp {text:?}: {e}"),
        })
}

pub(crate) fn parse_column<T: FromStr>(column: &str, text: &str) -> Result<T, DbError> {
    text.parse().map_err(|_| DbError::Conversion {
        message: format!("unexpected {column} value {text:?}"),
    })
}
