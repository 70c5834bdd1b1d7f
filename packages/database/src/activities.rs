//! The `activities` table: one activity record per subject.
//!
//! Inputs are stored as JSON text next to the record type string, exactly
//! as received. Decoding into a typed record happens at calculation time,
//! so a bad row only affects its own subject.

use duckdb::Connection;
use footprint_calc::StoredActivity;
use footprint_calc_models::SubjectId;

use crate::DbError;

pub(crate) const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS activities (
    subject_id BIGINT PRIMARY KEY,
    record_type TEXT NOT NULL,
    inputs TEXT NOT NULL,
    updated_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
);";

/// Inserts or replaces the activity of a subject.
///
/// # Errors
///
/// Returns [`DbError`] if the inputs cannot be encoded or the insert fails.
pub fn upsert_activity(conn: &Connection, activity: &StoredActivity) -> Result<(), DbError> {
    conn.execute(
        "INSERT OR REPLACE INTO activities (subject_id, record_type, inputs)
         VALUES (?, ?, ?)",
        duckdb::params![
            activity.subject_id,
            activity.record_type,
            serde_json::to_string(&activity.inputs)?,
        ],
    )?;
    Ok(())
}

/// Loads the activity of a subject.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or the stored inputs are not
/// valid JSON.
pub fn load_activity(
    conn: &Connection,
    subject_id: SubjectId,
) -> Result<Option<StoredActivity>, DbError> {
    let mut stmt =
        conn.prepare("SELECT record_type, inputs FROM activities WHERE subject_id = ?")?;
    stmt.raw_bind_parameter(1, subject_id)?;
    stmt.raw_execute()?;

    let mut rows = stmt.raw_query();
    if let Some(row) = rows.next()? {
        let record_type: String = row.get(0)?;
        let inputs: String = row.get(1)?;
        return Ok(Some(StoredActivity {
            subject_id,
            record_type,
            inputs: serde_json::from_str(&inputs)?,
        }));
    }

    Ok(None)
}

/// Lists every subject with an activity, ascending.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn subject_ids(conn: &Connection) -> Result<Vec<SubjectId>, DbError> {
    let mut stmt = conn.prepare("SELECT subject_id FROM activities ORDER BY subject_id")?;
    stmt.raw_execute()?;

    let mut ids = Vec::new();
    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next()? {
        ids.push(row.get(0)?);
    }

    Ok(ids)
}
