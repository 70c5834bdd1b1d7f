//! Loads the embedded reference data (seed factors and travel locations).
//!
//! Seeding is idempotent: factors whose id already exists are skipped and
//! locations are upserted, so running it twice leaves the catalog as is.

use std::collections::BTreeSet;

use footprint_factor::CatalogError;
use footprint_factor::registry::seed_factors;
use footprint_factor_models::FactorId;
use footprint_geodesy::locations::reference_locations;

use crate::{FootprintDb, factors, locations, with_transaction};

/// What a seeding run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Factors inserted by this run.
    pub factors_inserted: usize,
    /// Seed factors already present.
    pub factors_skipped: usize,
    /// Locations written.
    pub locations: usize,
}

/// Writes seed factors and reference locations in one transaction.
///
/// # Errors
///
/// Returns [`CatalogError`] if a seed factor conflicts with an existing
/// current factor, or a backend error. Nothing is written on error.
pub fn seed_reference_data(db: &FootprintDb) -> Result<SeedSummary, CatalogError> {
    let seeds = seed_factors();
    let places = reference_locations();

    let summary = with_transaction(db.connection(), |conn| {
        let existing: BTreeSet<FactorId> = factors::load_factors(conn, None)?
            .into_iter()
            .map(|f| f.id)
            .collect();

        let mut summary = SeedSummary::default();
        for factor in &seeds {
            if existing.contains(&factor.id) {
                summary.factors_skipped += 1;
            } else {
                factors::insert_factor(conn, factor)?;
                summary.factors_inserted += 1;
            }
        }

        locations::upsert_locations(conn, &places)?;
        summary.locations = places.len();
        Ok::<_, CatalogError>(summary)
    })?;

    log::info!(
        "Seeded {} factor(s) ({} already present) and {} location(s)",
        summary.factors_inserted,
        summary.factors_skipped,
        summary.locations
    );

    Ok(summary)
}
