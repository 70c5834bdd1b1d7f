//! The `emissions` table: append-only emission history.
//!
//! Rows are never updated except to clear `is_current` when newer results
//! for the same subject are committed. A commit retires every current row
//! of the subject, whatever its emission type, and inserts the new rows in
//! the same transaction.

use std::collections::BTreeSet;

use duckdb::{Connection, Statement};
use footprint_calc::StoreError;
use footprint_calc::store::check_committable;
use footprint_calc_models::{EmissionResult, SubjectId};

use crate::{DbError, parse_column, parse_timestamp, timestamp_text, with_transaction};

pub(crate) const CREATE_TABLE: &str = "CREATE SEQUENCE IF NOT EXISTS emission_row_id;
CREATE TABLE IF NOT EXISTS emissions (
    row_id BIGINT PRIMARY KEY DEFAULT nextval('emission_row_id'),
    subject_id BIGINT NOT NULL,
    emission_type TEXT NOT NULL,
    kg_co2eq DOUBLE,
    distance_km DOUBLE,
    annual_kwh DOUBLE,
    factor_ids_used TEXT NOT NULL,
    formula_version TEXT NOT NULL,
    computed_at TEXT NOT NULL,
    calculation_inputs TEXT NOT NULL,
    is_current BOOLEAN NOT NULL,
    incomplete_reason TEXT
);";

const SELECT_EMISSIONS: &str = "SELECT subject_id, emission_type, kg_co2eq, distance_km,
        annual_kwh, factor_ids_used, formula_version, computed_at, calculation_inputs,
        is_current, incomplete_reason
     FROM emissions";

/// Commits `results` as the current rows for their subject and emission
/// type, retiring the rows they replace.
///
/// # Errors
///
/// Returns [`StoreError::InvalidWrite`] for incomplete or duplicate
/// results, or a backend error. Nothing is written on error.
pub fn replace_current(
    conn: &Connection,
    results: &[EmissionResult],
) -> Result<Vec<EmissionResult>, StoreError> {
    check_committable(results)?;
    if results.is_empty() {
        return Ok(Vec::new());
    }

    let stored = with_transaction(conn, |conn| write_current(conn, results))?;
    log::debug!("Committed {} emission row(s)", stored.len());
    Ok(stored)
}

fn write_current(
    conn: &Connection,
    results: &[EmissionResult],
) -> Result<Vec<EmissionResult>, DbError> {
    let subjects: BTreeSet<SubjectId> = results.iter().map(|r| r.subject_id).collect();
    let mut retire = conn.prepare(
        "UPDATE emissions SET is_current = false WHERE subject_id = ? AND is_current",
    )?;
    for subject_id in &subjects {
        retire.execute(duckdb::params![subject_id])?;
    }

    let mut insert = conn.prepare(
        "INSERT INTO emissions (subject_id, emission_type, kg_co2eq, distance_km, annual_kwh,
            factor_ids_used, formula_version, computed_at, calculation_inputs, is_current,
            incomplete_reason)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, true, ?)",
    )?;

    let mut stored = Vec::with_capacity(results.len());
    for result in results {
        insert.execute(duckdb::params![
            result.subject_id,
            result.emission_type.to_string(),
            result.kg_co2eq,
            result.distance_km,
            result.annual_kwh,
            serde_json::to_string(&result.factor_ids_used)?,
            result.formula_version,
            timestamp_text(result.computed_at),
            serde_json::to_string(&result.calculation_inputs)?,
            result.incomplete_reason.as_deref(),
        ])?;

        let mut row = result.clone();
        row.is_current = true;
        stored.push(row);
    }

    Ok(stored)
}

/// Current rows of a subject, one per emission type, in emission type
/// order.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be decoded.
pub fn load_current(
    conn: &Connection,
    subject_id: SubjectId,
) -> Result<Vec<EmissionResult>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_EMISSIONS} WHERE subject_id = ? AND is_current"
    ))?;
    stmt.raw_bind_parameter(1, subject_id)?;
    let mut rows = read_emissions(&mut stmt)?;
    rows.sort_by_key(|r| r.emission_type);
    Ok(rows)
}

/// Every row of a subject, oldest first.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be decoded.
pub fn load_history(
    conn: &Connection,
    subject_id: SubjectId,
) -> Result<Vec<EmissionResult>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_EMISSIONS} WHERE subject_id = ? ORDER BY row_id"
    ))?;
    stmt.raw_bind_parameter(1, subject_id)?;
    read_emissions(&mut stmt)
}

fn read_emissions(stmt: &mut Statement<'_>) -> Result<Vec<EmissionResult>, DbError> {
    stmt.raw_execute()?;

    let mut results = Vec::new();
    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next()? {
        let emission_type: String = row.get(1)?;
        let factor_ids: String = row.get(5)?;
        let computed_at: String = row.get(7)?;
        let inputs: String = row.get(8)?;

        results.push(EmissionResult {
            subject_id: row.get(0)?,
            emission_type: parse_column("emission_type", &emission_type)?,
            kg_co2eq: row.get(2)?,
            distance_km: row.get(3)?,
            annual_kwh: row.get(4)?,
            factor_ids_used: serde_json::from_str(&factor_ids)?,
            formula_version: row.get(6)?,
            computed_at: parse_timestamp(&computed_at)?,
            calculation_inputs: serde_json::from_str(&inputs)?,
            is_current: row.get(9)?,
            incomplete_reason: row.get(10)?,
        });
    }

    Ok(results)
}
