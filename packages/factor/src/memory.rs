//! In-memory catalog, used by tests and for dry runs over seed data.

use std::collections::BTreeMap;

use footprint_factor_models::{EmissionType, Factor, FactorId, Location, LocationId};

use crate::catalog::{
    CatalogError, FactorCatalog, FactorCatalogWriter, FactorDraft, LocationDirectory, Supersession,
    check_insertable, check_supersedes,
};

/// A catalog holding factors and locations in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    factors: Vec<Factor>,
    locations: BTreeMap<LocationId, Location>,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from existing rows.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidFactor`] if two current factors share
    /// a slot.
    pub fn from_rows(
        factors: impl IntoIterator<Item = Factor>,
        locations: impl IntoIterator<Item = Location>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for factor in factors {
            catalog.insert_factor(&factor)?;
        }
        for location in locations {
            catalog.insert_location(location);
        }
        Ok(catalog)
    }

    /// Adds or replaces a location.
    pub fn insert_location(&mut self, location: Location) {
        self.locations.insert(location.id, location);
    }

    /// All factor rows in id order.
    #[must_use]
    pub fn all_factors(&self) -> &[Factor] {
        &self.factors
    }

    fn next_id(&self) -> FactorId {
        self.factors.iter().map(|f| f.id).max().unwrap_or(0) + 1
    }
}

impl FactorCatalog for MemoryCatalog {
    fn factors(&self, emission_type: EmissionType) -> Result<Vec<Factor>, CatalogError> {
        Ok(self
            .factors
            .iter()
            .filter(|f| f.emission_type == emission_type)
            .cloned()
            .collect())
    }
}

impl LocationDirectory for MemoryCatalog {
    fn location(&self, id: LocationId) -> Result<Option<Location>, CatalogError> {
        Ok(self.locations.get(&id).cloned())
    }
}

impl FactorCatalogWriter for MemoryCatalog {
    fn insert_factor(&mut self, factor: &Factor) -> Result<(), CatalogError> {
        check_insertable(&self.factors, factor)?;

        let pos = self.factors.partition_point(|f| f.id < factor.id);
        self.factors.insert(pos, factor.clone());
        Ok(())
    }

    fn supersede_factor(&mut self, draft: &FactorDraft) -> Result<Supersession, CatalogError> {
        let inserted = Factor {
            id: self.next_id(),
            emission_type: draft.emission_type,
            classification: draft.classification.clone(),
            values: draft.values.clone(),
            valid_from: draft.valid_from,
            valid_to: None,
        };

        let current: Vec<usize> = self
            .factors
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_current() && f.shares_slot_with(&inserted))
            .map(|(i, _)| i)
            .collect();

        // Validate everything before touching any row.
        for &i in &current {
            check_supersedes(&self.factors[i], draft)?;
        }

        let mut retired = Vec::with_capacity(current.len());
        for i in current {
            self.factors[i].valid_to = Some(draft.valid_from);
            retired.push(self.factors[i].id);
        }
        self.factors.push(inserted.clone());

        log::info!(
            "Superseded {} factor(s) {retired:?} for {} {} with factor {}",
            retired.len(),
            inserted.emission_type,
            inserted.classification,
            inserted.id
        );

        Ok(Supersession { retired, inserted })
    }
}
