//! The [`FootprintDb`] handle and its storage trait implementations.

use std::path::Path;

use duckdb::Connection;
use footprint_calc::{ActivitySource, EmissionStore, StoreError, StoredActivity};
use footprint_calc_models::{EmissionResult, SubjectId};
use footprint_factor::{
    CatalogError, FactorCatalog, FactorCatalogWriter, FactorDraft, LocationDirectory, Supersession,
};
use footprint_factor_models::{EmissionType, Factor, Location, LocationId};

use crate::{DbError, activities, emissions, factors, locations};

/// An open footprint database.
pub struct FootprintDb {
    conn: Connection,
}

impl FootprintDb {
    /// Opens (or creates) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema creation fails.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            crate::paths::ensure_dir(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::with_schema(conn)
    }

    /// Opens the database at [`crate::paths::default_db_path`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema creation fails.
    pub fn open_default() -> Result<Self, DbError> {
        Self::open(&crate::paths::default_db_path())
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema creation fails.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::with_schema(Connection::open_in_memory()?)
    }

    fn with_schema(conn: Connection) -> Result<Self, DbError> {
        create_schema(&conn)?;
        Ok(Self { conn })
    }

    /// The underlying connection, for the per-table functions.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    for ddl in [
        factors::CREATE_TABLE,
        locations::CREATE_TABLE,
        activities::CREATE_TABLE,
        emissions::CREATE_TABLE,
    ] {
        conn.execute_batch(ddl)?;
    }
    Ok(())
}

impl FactorCatalog for FootprintDb {
    fn factors(&self, emission_type: EmissionType) -> Result<Vec<Factor>, CatalogError> {
        Ok(factors::load_factors(&self.conn, Some(emission_type))?)
    }
}

impl LocationDirectory for FootprintDb {
    fn location(&self, id: LocationId) -> Result<Option<Location>, CatalogError> {
        Ok(locations::load_location(&self.conn, id)?)
    }
}

impl FactorCatalogWriter for FootprintDb {
    fn insert_factor(&mut self, factor: &Factor) -> Result<(), CatalogError> {
        factors::insert_factor(&self.conn, factor)
    }

    fn supersede_factor(&mut self, draft: &FactorDraft) -> Result<Supersession, CatalogError> {
        factors::supersede_factor(&self.conn, draft)
    }
}

impl ActivitySource for FootprintDb {
    fn activity(&self, subject_id: SubjectId) -> Result<Option<StoredActivity>, StoreError> {
        Ok(activities::load_activity(&self.conn, subject_id)?)
    }
}

impl EmissionStore for FootprintDb {
    fn replace_current(
        &self,
        results: &[EmissionResult],
    ) -> Result<Vec<EmissionResult>, StoreError> {
        emissions::replace_current(&self.conn, results)
    }

    fn current(&self, subject_id: SubjectId) -> Result<Vec<EmissionResult>, StoreError> {
        Ok(emissions::load_current(&self.conn, subject_id)?)
    }

    fn history(&self, subject_id: SubjectId) -> Result<Vec<EmissionResult>, StoreError> {
        Ok(emissions::load_history(&self.conn, subject_id)?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use footprint_calc::{
        BatchOptions, CalcConfig, EmissionEngine, NullProgress, recalculate_for_subjects,
    };
    use footprint_calc_models::{
        ActivityPayload, ActivityRecord, CloudSpendRecord, HeadcountRecord, TravelRecord,
    };
    use footprint_factor::{FactorQuery, resolve_factor};
    use footprint_factor_models::{Classification, FactorValues};

    use super::*;
    use crate::seed::seed_reference_data;

    fn seeded() -> FootprintDb {
        let db = FootprintDb::open_in_memory().unwrap();
        seed_reference_data(&db).unwrap();
        db
    }

    fn add(db: &FootprintDb, subject_id: SubjectId, activity: ActivityPayload) {
        let record = ActivityRecord {
            subject_id,
            activity,
        };
        activities::upsert_activity(
            db.connection(),
            &StoredActivity::from_record(&record).unwrap(),
        )
        .unwrap();
    }

    fn cloud(spending_amount: f64) -> ActivityPayload {
        ActivityPayload::ExternalCloud(CloudSpendRecord {
            provider: "aws".to_string(),
            service: None,
            spending_amount,
        })
    }

    fn recalculate(db: &FootprintDb, ids: &[SubjectId]) -> footprint_calc::BatchReport {
        let config = CalcConfig::default();
        let engine = EmissionEngine::new(db, db, &config);
        recalculate_for_subjects(
            &engine,
            db,
            db,
            ids,
            &BatchOptions::default(),
            &NullProgress,
        )
        .unwrap()
    }

    #[test]
    fn seeding_is_idempotent() {
        let db = seeded();
        let again = seed_reference_data(&db).unwrap();
        assert_eq!(again.factors_inserted, 0);
        assert_eq!(again.factors_skipped, 28);
        assert_eq!(factors::load_factors(db.connection(), None).unwrap().len(), 28);
        assert_eq!(
            locations::load_locations(db.connection(), None).unwrap().len(),
            16
        );
    }

    #[test]
    fn factors_roundtrip_through_json_columns() {
        let db = seeded();
        let trains = db.factors(EmissionType::Train).unwrap();
        assert_eq!(trains.len(), 6);
        assert!(trains.iter().all(Factor::is_current));

        let ch = resolve_factor(&db, &FactorQuery::train("ch")).unwrap().unwrap();
        assert_eq!(ch.factor.id, 11);
        assert_eq!(ch.factor.classification.get_str("country_code"), Some("CH"));

        let other = resolve_factor(&db, &FactorQuery::train("ES")).unwrap().unwrap();
        assert_eq!(other.factor.id, 16);
        assert!(other.fallback);
    }

    #[test]
    fn reads_locations() {
        let db = seeded();
        let zurich = db.location(1).unwrap().unwrap();
        assert_eq!(zurich.iata_code.as_deref(), Some("ZRH"));
        assert_eq!(zurich.country(), Some("CH"));
        assert!(db.location(9999).unwrap().is_none());
    }

    #[test]
    fn second_current_factor_in_slot_is_rejected() {
        let mut db = seeded();
        let duplicate = Factor {
            id: 500,
            emission_type: EmissionType::Train,
            classification: Classification::new().with("country_code", "CH"),
            values: FactorValues::new().with("impact_score", 0.01),
            valid_from: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            valid_to: None,
        };
        let err = db.insert_factor(&duplicate).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidFactor { .. }));
    }

    #[test]
    fn supersede_retires_old_version() {
        let mut db = seeded();
        let valid_from = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap();
        let outcome = db
            .supersede_factor(&FactorDraft {
                emission_type: EmissionType::ExternalCloud,
                classification: Classification::new().with("provider", "gcp"),
                values: FactorValues::new().with("kg_co2eq_per_currency_unit", 0.09),
                valid_from,
            })
            .unwrap();
        assert_eq!(outcome.retired, vec![63]);
        assert_eq!(outcome.inserted.id, 74);

        let clouds = db.factors(EmissionType::ExternalCloud).unwrap();
        let old = clouds.iter().find(|f| f.id == 63).unwrap();
        assert_eq!(old.valid_to, Some(valid_from));

        let before = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let query = FactorQuery::external_cloud("gcp", None);
        let historical = resolve_factor(&db, &query.clone().as_of(Some(before)))
            .unwrap()
            .unwrap();
        assert_eq!(historical.factor.id, 63);
        let current = resolve_factor(&db, &query).unwrap().unwrap();
        assert_eq!(current.factor.id, 74);
    }

    #[test]
    fn rejected_supersede_leaves_catalog_unchanged() {
        let mut db = seeded();
        let err = db
            .supersede_factor(&FactorDraft {
                emission_type: EmissionType::ExternalCloud,
                classification: Classification::new().with("provider", "gcp"),
                values: FactorValues::new().with("kg_co2eq_per_currency_unit", 0.09),
                valid_from: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            })
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidFactor { .. }));

        let clouds = db.factors(EmissionType::ExternalCloud).unwrap();
        assert_eq!(clouds.len(), 3);
        assert!(clouds.iter().all(Factor::is_current));
    }

    #[test]
    fn activities_keep_raw_inputs() {
        let db = seeded();
        add(&db, 7, cloud(10.0));
        activities::upsert_activity(
            db.connection(),
            &StoredActivity {
                subject_id: 8,
                record_type: "purchases".to_string(),
                inputs: serde_json::json!({"amount": 3}),
            },
        )
        .unwrap();

        assert_eq!(activities::subject_ids(db.connection()).unwrap(), vec![7, 8]);
        let stored = db.activity(8).unwrap().unwrap();
        assert_eq!(stored.record_type, "purchases");
        assert_eq!(stored.inputs["amount"], 3);
        assert!(db.activity(9).unwrap().is_none());
    }

    #[test]
    fn recalculation_versions_results() {
        let db = seeded();
        add(&db, 1, cloud(1000.0));
        let first = recalculate(&db, &[1]);
        assert_eq!(first.committed.len(), 1);

        add(&db, 1, cloud(2000.0));
        recalculate(&db, &[1]);

        let current = db.current(1).unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].kg_co2eq, Some(360.0));
        assert_eq!(current[0].factor_ids_used, vec![61]);

        let history = db.history(1).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kg_co2eq, Some(180.0));
        assert!(!history[0].is_current);
        assert!(history[1].is_current);
        assert_eq!(history[1].calculation_inputs, current[0].calculation_inputs);
    }

    #[test]
    fn stores_travel_and_headcount_rows() {
        let db = seeded();
        add(
            &db,
            2,
            ActivityPayload::Travel(TravelRecord {
                origin_location_id: 1,
                destination_location_id: 2,
                transport_mode: "plane".to_string(),
                cabin_class: None,
                number_of_trips: 1,
            }),
        );
        add(
            &db,
            3,
            ActivityPayload::Headcount(HeadcountRecord {
                fte: 1.0,
                category: None,
            }),
        );
        let report = recalculate(&db, &[2, 3]);
        assert_eq!(report.committed.len(), 5);

        let flight = db.current(2).unwrap();
        assert_eq!(flight[0].emission_type, EmissionType::Flight);
        assert!(flight[0].distance_km.is_some());

        let headcount = db.current(3).unwrap();
        let types: Vec<EmissionType> = headcount.iter().map(|r| r.emission_type).collect();
        assert_eq!(types, EmissionType::HEADCOUNT_SUBCATEGORIES.to_vec());
    }

    #[test]
    fn changing_transport_mode_retires_old_type() {
        let db = seeded();
        let trip = |from, to, mode: &str| {
            ActivityPayload::Travel(TravelRecord {
                origin_location_id: from,
                destination_location_id: to,
                transport_mode: mode.to_string(),
                cabin_class: None,
                number_of_trips: 1,
            })
        };
        add(&db, 5, trip(101, 102, "train"));
        recalculate(&db, &[5]);
        add(&db, 5, trip(1, 2, "plane"));
        recalculate(&db, &[5]);

        let current = db.current(5).unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].emission_type, EmissionType::Flight);

        let history = db.history(5).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.iter().filter(|r| r.is_current).count(), 1);
    }

    #[test]
    fn incomplete_results_are_not_stored() {
        let db = seeded();
        add(&db, 4, cloud(100.0));
        recalculate(&db, &[4]);

        add(
            &db,
            4,
            ActivityPayload::ExternalCloud(CloudSpendRecord {
                provider: "azure".to_string(),
                service: None,
                spending_amount: 100.0,
            }),
        );
        let report = recalculate(&db, &[4]);
        assert_eq!(report.incomplete.len(), 1);

        let current = db.current(4).unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].kg_co2eq, Some(18.0));
        assert_eq!(db.history(4).unwrap().len(), 1);
    }
}
