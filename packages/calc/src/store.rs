//! Storage seams for activities and emission results.
//!
//! [`EmissionStore::replace_current`] is where the one-current-row rule
//! lives: the results given for a subject become its whole current set.
//! Every previous current row of that subject is retired, including rows
//! of emission types the subject no longer produces, and the new rows are
//! inserted in the same unit of work.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use footprint_calc_models::{
    ActivityDecodeError, ActivityPayload, ActivityRecord, EmissionResult, SubjectId,
};

/// Errors raised by activity and emission storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage backend failed.
    #[error("Emission store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A write would break the one-current-row rule or store an
    /// incomplete result.
    #[error("Invalid emission write: {message}")]
    InvalidWrite {
        /// Description of what went wrong.
        message: String,
    },
}

/// An activity as stored: the record type string next to its inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredActivity {
    /// Subject the activity belongs to.
    pub subject_id: SubjectId,
    /// Record type string, decoded only when the activity is evaluated.
    pub record_type: String,
    /// Untagged inputs as stored.
    pub inputs: serde_json::Value,
}

impl StoredActivity {
    /// # Errors
    ///
    /// Returns the serialization error for non-finite inputs.
    pub fn from_record(record: &ActivityRecord) -> Result<Self, serde_json::Error> {
        Ok(Self {
            subject_id: record.subject_id,
            record_type: record.record_type().to_string(),
            inputs: record.activity.inputs_json()?,
        })
    }

    /// # Errors
    ///
    /// Returns [`ActivityDecodeError`] for an unknown record type or
    /// inputs that do not match it.
    pub fn decode(&self) -> Result<ActivityRecord, ActivityDecodeError> {
        Ok(ActivityRecord {
            subject_id: self.subject_id,
            activity: ActivityPayload::decode(&self.record_type, self.inputs.clone())?,
        })
    }
}

/// Read access to activity records.
pub trait ActivitySource {
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be read.
    fn activity(&self, subject_id: SubjectId) -> Result<Option<StoredActivity>, StoreError>;
}

/// Versioned emission result storage.
pub trait EmissionStore {
    /// Makes `results` the current rows of their subjects. Each subject's
    /// previous current rows are all retired, whatever their emission type,
    /// so a record that changes type leaves no stale current row. All rows
    /// are written in one unit of work; on error nothing changes.
    ///
    /// Returns the rows as stored (with `is_current` set).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidWrite`] for incomplete results or two
    /// results for the same subject and type, or a backend error.
    fn replace_current(
        &self,
        results: &[EmissionResult],
    ) -> Result<Vec<EmissionResult>, StoreError>;

    /// Current rows of a subject, one per emission type.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be read.
    fn current(&self, subject_id: SubjectId) -> Result<Vec<EmissionResult>, StoreError>;

    /// Every row of a subject, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be read.
    fn history(&self, subject_id: SubjectId) -> Result<Vec<EmissionResult>, StoreError>;
}

/// Checks that `results` can be committed as current rows.
///
/// # Errors
///
/// Returns [`StoreError::InvalidWrite`] describing the first problem.
pub fn check_committable(results: &[EmissionResult]) -> Result<(), StoreError> {
    let mut seen = BTreeSet::new();
    for result in results {
        if let Some(message) = result.incomplete_message() {
            return Err(StoreError::InvalidWrite { message });
        }
        if !seen.insert((result.subject_id, result.emission_type)) {
            return Err(StoreError::InvalidWrite {
                message: format!(
                    "two {} results for subject {} in one write",
                    result.emission_type, result.subject_id
                ),
            });
        }
    }
    Ok(())
}

/// Activity and emission storage in memory.
#[derive(Debug, Default)]
pub struct MemoryEmissionStore {
    activities: BTreeMap<SubjectId, StoredActivity>,
    rows: Mutex<Vec<EmissionResult>>,
}

impl MemoryEmissionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an activity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidWrite`] if the inputs cannot be
    /// serialized.
    pub fn insert_activity(&mut self, record: &ActivityRecord) -> Result<(), StoreError> {
        let stored = StoredActivity::from_record(record).map_err(|e| StoreError::InvalidWrite {
            message: e.to_string(),
        })?;
        self.insert_stored(stored);
        Ok(())
    }

    /// Adds or replaces an activity exactly as given.
    pub fn insert_stored(&mut self, stored: StoredActivity) {
        self.activities.insert(stored.subject_id, stored);
    }

    /// Every emission row, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if a writer panicked mid-write.
    pub fn rows(&self) -> Result<Vec<EmissionResult>, StoreError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<EmissionResult>>, StoreError> {
        self.rows
            .lock()
            .map_err(|_| StoreError::Backend("emission rows lock poisoned".into()))
    }
}

impl ActivitySource for MemoryEmissionStore {
    fn activity(&self, subject_id: SubjectId) -> Result<Option<StoredActivity>, StoreError> {
        Ok(self.activities.get(&subject_id).cloned())
    }
}

impl EmissionStore for MemoryEmissionStore {
    fn replace_current(
        &self,
        results: &[EmissionResult],
    ) -> Result<Vec<EmissionResult>, StoreError> {
        check_committable(results)?;

        let subjects: BTreeSet<SubjectId> = results.iter().map(|r| r.subject_id).collect();

        let mut rows = self.lock()?;
        for row in rows.iter_mut() {
            if row.is_current && subjects.contains(&row.subject_id) {
                row.is_current = false;
            }
        }

        let mut stored = Vec::with_capacity(results.len());
        for result in results {
            let mut row = result.clone();
            row.is_current = true;
            rows.push(row.clone());
            stored.push(row);
        }
        Ok(stored)
    }

    fn current(&self, subject_id: SubjectId) -> Result<Vec<EmissionResult>, StoreError> {
        let mut rows: Vec<EmissionResult> = self
            .lock()?
            .iter()
            .filter(|r| r.subject_id == subject_id && r.is_current)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.emission_type);
        Ok(rows)
    }

    fn history(&self, subject_id: SubjectId) -> Result<Vec<EmissionResult>, StoreError> {
        Ok(self
            .lock()?
            .iter()
            .filter(|r| r.subject_id == subject_id)
            .cloned()
            .collect())
    }
}
