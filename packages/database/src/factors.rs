//! The `factors` table: every version of every emission factor.
//!
//! Classification and values are stored as JSON text so new factor kinds
//! need no schema change. Validity bounds are RFC 3339 text; a NULL
//! `valid_to` marks the current version of a slot.

use duckdb::{Connection, Statement};
use footprint_factor::catalog::{check_insertable, check_supersedes};
use footprint_factor::{CatalogError, FactorDraft, Supersession};
use footprint_factor_models::{EmissionType, Factor, FactorId};

use crate::{DbError, parse_column, parse_timestamp, timestamp_text, with_transaction};

pub(crate) const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS factors (
    id BIGINT PRIMARY KEY,
    emission_type TEXT NOT NULL,
    classification TEXT NOT NULL,
    factor_values TEXT NOT NULL,
    valid_from TEXT NOT NULL,
    valid_to TEXT
);";

const SELECT_FACTORS: &str =
    "SELECT id, emission_type, classification, factor_values, valid_from, valid_to FROM factors";

/// Loads factor versions, optionally restricted to one emission type, in
/// ascending id order.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be decoded.
pub fn load_factors(
    conn: &Connection,
    emission_type: Option<EmissionType>,
) -> Result<Vec<Factor>, DbError> {
    if let Some(emission_type) = emission_type {
        let mut stmt = conn.prepare(&format!(
            "{SELECT_FACTORS} WHERE emission_type = ? ORDER BY id"
        ))?;
        stmt.raw_bind_parameter(1, emission_type.to_string())?;
        read_factors(&mut stmt)
    } else {
        let mut stmt = conn.prepare(&format!("{SELECT_FACTORS} ORDER BY id"))?;
        read_factors(&mut stmt)
    }
}

fn read_factors(stmt: &mut Statement<'_>) -> Result<Vec<Factor>, DbError> {
    stmt.raw_execute()?;

    let mut factors = Vec::new();
    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next()? {
        let id: FactorId = row.get(0)?;
        let emission_type: String = row.get(1)?;
        let classification: String = row.get(2)?;
        let values: String = row.get(3)?;
        let valid_from: String = row.get(4)?;
        let valid_to: Option<String> = row.get(5)?;

        factors.push(Factor {
            id,
            emission_type: parse_column("emission_type", &emission_type)?,
            classification: serde_json::from_str(&classification)?,
            values: serde_json::from_str(&values)?,
            valid_from: parse_timestamp(&valid_from)?,
            valid_to: valid_to.as_deref().map(parse_timestamp).transpose()?,
        });
    }

    Ok(factors)
}

/// Returns the id the next inserted factor should get.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn next_factor_id(conn: &Connection) -> Result<FactorId, DbError> {
    let id = conn.query_row(
        "SELECT COALESCE(MAX(id), 0) + 1 FROM factors",
        duckdb::params![],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn insert_row(conn: &Connection, factor: &Factor) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO factors (id, emission_type, classification, factor_values, valid_from, valid_to)
         VALUES (?, ?, ?, ?, ?, ?)",
        duckdb::params![
            factor.id,
            factor.emission_type.to_string(),
            serde_json::to_string(&factor.classification)?,
            serde_json::to_string(&factor.values)?,
            timestamp_text(factor.valid_from),
            factor.valid_to.map(timestamp_text),
        ],
    )?;
    Ok(())
}

/// Inserts a factor row as-is after checking it does not add a second
/// current factor to its slot.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidFactor`] on a slot or id conflict, or a
/// backend error.
pub fn insert_factor(conn: &Connection, factor: &Factor) -> Result<(), CatalogError> {
    let existing = load_factors(conn, Some(factor.emission_type))?;
    check_insertable(&existing, factor)?;
    insert_row(conn, factor)?;
    Ok(())
}

/// Retires the current factor(s) in the draft's slot and inserts the draft
/// as the new current version, in one transaction.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidFactor`] if the draft starts before the
/// version it replaces, or a backend error. Nothing is written on error.
pub fn supersede_factor(
    conn: &Connection,
    draft: &FactorDraft,
) -> Result<Supersession, CatalogError> {
    with_transaction(conn, |conn| {
        let inserted = Factor {
            id: next_factor_id(conn)?,
            emission_type: draft.emission_type,
            classification: draft.classification.clone(),
            values: draft.values.clone(),
            valid_from: draft.valid_from,
            valid_to: None,
        };

        let current: Vec<Factor> = load_factors(conn, Some(draft.emission_type))?
            .into_iter()
            .filter(|f| f.is_current() && f.shares_slot_with(&inserted))
            .collect();
        for factor in &current {
            check_supersedes(factor, draft)?;
        }

        let retired: Vec<FactorId> = current.iter().map(|f| f.id).collect();
        retire(conn, &retired, draft)?;
        insert_row(conn, &inserted)?;

        log::info!(
            "Superseded {} factor(s) {retired:?} for {} {} with factor {}",
            retired.len(),
            inserted.emission_type,
            inserted.classification,
            inserted.id
        );

        Ok(Supersession { retired, inserted })
    })
}

fn retire(conn: &Connection, ids: &[FactorId], draft: &FactorDraft) -> Result<(), DbError> {
    let valid_to = timestamp_text(draft.valid_from);
    let mut stmt = conn.prepare("UPDATE factors SET valid_to = ? WHERE id = ?")?;
    for id in ids {
        stmt.execute(duckdb::params![valid_to, id])?;
    }
    Ok(())
}
