//! Storage-facing traits for factors and travel locations.
//!
//! The calculation engine only reads through [`FactorCatalog`] and
//! [`LocationDirectory`]. Seeding and ingestion write through
//! [`FactorCatalogWriter`], which is where the one-current-per-slot
//! invariant is enforced.

use chrono::{DateTime, Utc};
use footprint_factor_models::{
    Classification, EmissionType, Factor, FactorId, FactorValues, Location, LocationId,
};
use serde::Deserialize;

/// Errors that can occur while reading or writing the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The storage backend failed.
    #[error("Catalog backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A factor write would break catalog invariants.
    #[error("Invalid factor: {message}")]
    InvalidFactor {
        /// Description of what went wrong.
        message: String,
    },
}

/// Read access to the factor catalog.
pub trait FactorCatalog {
    /// Returns every version (current and superseded) of every factor of
    /// the given type, in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the backend cannot be read.
    fn factors(&self, emission_type: EmissionType) -> Result<Vec<Factor>, CatalogError>;
}

/// Read access to travel endpoints.
pub trait LocationDirectory {
    /// Looks up a location by id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the backend cannot be read.
    fn location(&self, id: LocationId) -> Result<Option<Location>, CatalogError>;
}

/// A factor that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FactorDraft {
    /// Emission kind.
    pub emission_type: EmissionType,
    /// Classification; together with the type this identifies the slot.
    #[serde(default)]
    pub classification: Classification,
    /// Numeric payload.
    #[serde(default)]
    pub values: FactorValues,
    /// Start of validity. Also the end of the version being replaced.
    pub valid_from: DateTime<Utc>,
}

/// Outcome of [`FactorCatalogWriter::supersede_factor`].
#[derive(Debug, Clone, PartialEq)]
pub struct Supersession {
    /// Previously current factors whose `valid_to` was set.
    pub retired: Vec<FactorId>,
    /// The new current factor.
    pub inserted: Factor,
}

/// Write access used by seeding and ingestion.
pub trait FactorCatalogWriter {
    /// Inserts a factor row as-is (seed data carries its own ids and
    /// validity windows).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidFactor`] if the row would create a
    /// second current factor in its slot, or a backend error.
    fn insert_factor(&mut self, factor: &Factor) -> Result<(), CatalogError>;

    /// Replaces the current factor in the draft's slot (same emission type
    /// and classification). The old row's `valid_to` becomes the draft's
    /// `valid_from`; the draft is inserted as the new current row. Both
    /// happen in one unit of work.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidFactor`] if the draft starts before
    /// the version it replaces, or a backend error.
    fn supersede_factor(&mut self, draft: &FactorDraft) -> Result<Supersession, CatalogError>;
}

/// Checks that `factor` can be added next to `existing` rows of the same
/// catalog: its id must be new and, if it is current, its slot must not
/// already have a current factor.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidFactor`] describing the conflict.
pub fn check_insertable(existing: &[Factor], factor: &Factor) -> Result<(), CatalogError> {
    if existing.iter().any(|f| f.id == factor.id) {
        return Err(CatalogError::InvalidFactor {
            message: format!("factor id {} already exists", factor.id),
        });
    }
    let clash = factor
        .is_current()
        .then(|| {
            existing
                .iter()
                .find(|f| f.is_current() && f.shares_slot_with(factor))
        })
        .flatten();
    if let Some(current) = clash {
        return Err(CatalogError::InvalidFactor {
            message: format!(
                "factor {} would be a second current {} factor for {} (current: {})",
                factor.id, factor.emission_type, factor.classification, current.id
            ),
        });
    }
    Ok(())
}

/// Checks that retiring `current` at `draft.valid_from` leaves it a
/// non-empty validity window.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidFactor`] if the draft does not start
/// strictly after the current version.
pub fn check_supersedes(current: &Factor, draft: &FactorDraft) -> Result<(), CatalogError> {
    if draft.valid_from <= current.valid_from {
        return Err(CatalogError::InvalidFactor {
            message: format!(
                "{} factor {} for {} is valid from {}; replacement must start later than that (got {})",
                current.emission_type,
                current.id,
                current.classification,
                current.valid_from,
                draft.valid_from,
            ),
        });
    }
    Ok(())
}
