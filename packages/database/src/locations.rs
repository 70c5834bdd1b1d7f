//! The `locations` table: airports and train stations.

use duckdb::{Connection, Statement};
use footprint_factor_models::{Location, LocationId, TransportMode};

use crate::{DbError, parse_column};

pub(crate) const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS locations (
    id BIGINT PRIMARY KEY,
    transport_mode TEXT NOT NULL,
    name TEXT NOT NULL,
    latitude DOUBLE NOT NULL,
    longitude DOUBLE NOT NULL,
    iata_code TEXT,
    country_code TEXT
);";

const SELECT_LOCATIONS: &str =
    "SELECT id, transport_mode, name, latitude, longitude, iata_code, country_code FROM locations";

/// Inserts or replaces locations by id.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub fn upsert_locations(conn: &Connection, locations: &[Location]) -> Result<(), DbError> {
    if locations.is_empty() {
        return Ok(());
    }

    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO locations
            (id, transport_mode, name, latitude, longitude, iata_code, country_code)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )?;

    for location in locations {
        stmt.execute(duckdb::params![
            location.id,
            location.transport_mode.to_string(),
            location.name,
            location.latitude,
            location.longitude,
            location.iata_code.as_deref(),
            location.country_code.as_deref(),
        ])?;
    }

    Ok(())
}

/// Looks up one location.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or the row cannot be decoded.
pub fn load_location(conn: &Connection, id: LocationId) -> Result<Option<Location>, DbError> {
    let mut stmt = conn.prepare(&format!("{SELECT_LOCATIONS} WHERE id = ?"))?;
    stmt.raw_bind_parameter(1, id)?;
    Ok(read_locations(&mut stmt)?.into_iter().next())
}

/// Lists locations, optionally only those of one transport mode, by id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be decoded.
pub fn load_locations(
    conn: &Connection,
    mode: Option<TransportMode>,
) -> Result<Vec<Location>, DbError> {
    if let Some(mode) = mode {
        let mut stmt = conn.prepare(&format!(
            "{SELECT_LOCATIONS} WHERE transport_mode = ? ORDER BY id"
        ))?;
        stmt.raw_bind_parameter(1, mode.to_string())?;
        read_locations(&mut stmt)
    } else {
        let mut stmt = conn.prepare(&format!("{SELECT_LOCATIONS} ORDER BY id"))?;
        read_locations(&mut stmt)
    }
}

fn read_locations(stmt: &mut Statement<'_>) -> Result<Vec<Location>, DbError> {
    stmt.raw_execute()?;

    let mut locations = Vec::new();
    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next()? {
        let mode: String = row.get(1)?;
        locations.push(Location {
            id: row.get(0)?,
            transport_mode: parse_column("transport_mode", &mode)?,
            name: row.get(2)?,
            latitude: row.get(3)?,
            longitude: row.get(4)?,
            iata_code: row.get(5)?,
            country_code: row.get(6)?,
        });
    }

    Ok(locations)
}
