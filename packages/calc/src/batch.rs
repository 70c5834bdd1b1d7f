//! Batch recomputation with versioned persistence.
//!
//! Subjects are processed sequentially in fixed-size chunks. Each subject's
//! complete results replace its current rows in one store write;
//! incomplete results are reported and never replace a current row.

use footprint_calc_models::{ActivityDecodeError, EmissionResult, SubjectId};
use footprint_factor::{FactorCatalog, LocationDirectory};

use crate::CalcError;
use crate::engine::{AmbiguousMatch, EmissionEngine};
use crate::progress::ProgressCallback;
use crate::store::{ActivitySource, EmissionStore};

/// Subjects per chunk between progress log lines.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Tuning for [`recalculate_for_subjects`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Subjects handled between progress log lines.
    pub chunk_size: usize,
    /// Abort with [`CalcError::FactorNotResolved`] on the first incomplete
    /// result instead of skipping it.
    pub require_complete: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            require_complete: false,
        }
    }
}

/// A stored activity whose inputs could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidActivity {
    /// Subject whose inputs failed to decode.
    pub subject_id: SubjectId,
    /// The decode error.
    pub message: String,
}

/// Outcome of a batch recompute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Rows that became current.
    pub committed: Vec<EmissionResult>,
    /// Results that could not be computed; the previous current rows were
    /// kept.
    pub incomplete: Vec<EmissionResult>,
    /// Requested subjects with no activity record.
    pub missing_subjects: Vec<SubjectId>,
    /// Subjects skipped because their inputs failed to decode.
    pub invalid: Vec<InvalidActivity>,
    /// Ambiguous factor picks, by subject.
    pub ambiguities: Vec<(SubjectId, AmbiguousMatch)>,
}

impl BatchReport {
    /// One-line summary for logs and the CLI.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} committed, {} incomplete, {} missing, {} invalid, {} ambiguous",
            self.committed.len(),
            self.incomplete.len(),
            self.missing_subjects.len(),
            self.invalid.len(),
            self.ambiguities.len(),
        )
    }
}

/// Recomputes and persists emissions for `subject_ids`.
///
/// # Errors
///
/// * [`CalcError::MissingFormula`] if a stored record type has no formula;
///   the batch stops there
/// * [`CalcError::FactorNotResolved`] for an incomplete result when
///   `options.require_complete` is set
/// * [`CalcError::InvalidTransportMode`] or [`CalcError::Geodesy`] for
///   malformed trips
/// * [`CalcError::Catalog`] or [`CalcError::Store`] for storage failures
pub fn recalculate_for_subjects<C: FactorCatalog, L: LocationDirectory>(
    engine: &EmissionEngine<'_, C, L>,
    activities: &dyn ActivitySource,
    store: &dyn EmissionStore,
    subject_ids: &[SubjectId],
    options: &BatchOptions,
    progress: &dyn ProgressCallback,
) -> Result<BatchReport, CalcError> {
    let total = subject_ids.len();
    let mut report = BatchReport::default();
    let mut done = 0;

    progress.set_total(total as u64);
    progress.set_message("Recalculating emissions".to_string());
    log::info!("Recalculating emissions for {total} subject(s)");

    for chunk in subject_ids.chunks(options.chunk_size.max(1)) {
        for &subject_id in chunk {
            recalculate_subject(engine, activities, store, subject_id, options, &mut report)?;
            progress.inc(1);
        }
        done += chunk.len();
        log::info!("Recalculated {done}/{total} subjects");
    }

    let summary = report.summary();
    log::info!("Recalculation finished: {summary}");
    progress.finish(summary);

    Ok(report)
}

fn recalculate_subject<C: FactorCatalog, L: LocationDirectory>(
    engine: &EmissionEngine<'_, C, L>,
    activities: &dyn ActivitySource,
    store: &dyn EmissionStore,
    subject_id: SubjectId,
    options: &BatchOptions,
    report: &mut BatchReport,
) -> Result<(), CalcError> {
    let Some(stored) = activities.activity(subject_id)? else {
        log::warn!("No activity record for subject {subject_id}");
        report.missing_subjects.push(subject_id);
        return Ok(());
    };

    let record = match stored.decode() {
        Ok(record) => record,
        Err(ActivityDecodeError::UnknownRecordType { record_type }) => {
            log::error!("No formula for record type '{record_type}' (subject {subject_id})");
            return Err(CalcError::MissingFormula {
                subject_id,
                record_type,
            });
        }
        Err(e) => {
            log::warn!("Skipping subject {subject_id}: {e}");
            report.invalid.push(InvalidActivity {
                subject_id,
                message: e.to_string(),
            });
            return Ok(());
        }
    };

    let evaluation = engine.calculate(&record)?;
    report.ambiguities.extend(
        evaluation
            .ambiguities
            .into_iter()
            .map(|a| (subject_id, a)),
    );

    let (complete, incomplete): (Vec<_>, Vec<_>) = evaluation
        .results
        .into_iter()
        .partition(EmissionResult::is_complete);

    for result in &incomplete {
        let message = result.incomplete_message().unwrap_or_default();
        if options.require_complete {
            return Err(CalcError::FactorNotResolved { message });
        }
        log::warn!("{message}; keeping previous current value");
    }

    if !complete.is_empty() {
        report.committed.extend(store.replace_current(&complete)?);
    }
    report.incomplete.extend(incomplete);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use footprint_calc_models::{
        ActivityPayload, ActivityRecord, CloudSpendRecord, HeadcountRecord, TravelRecord,
    };
    use footprint_factor::MemoryCatalog;
    use footprint_factor::registry::seed_factors;
    use footprint_factor_models::EmissionType;
    use footprint_geodesy::locations::reference_locations;

    use super::*;
    use crate::config::CalcConfig;
    use crate::progress::NullProgress;
    use crate::store::{MemoryEmissionStore, StoredActivity};

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::from_rows(seed_factors(), reference_locations()).unwrap()
    }

    fn cloud(subject_id: SubjectId, provider: &str) -> ActivityRecord {
        ActivityRecord {
            subject_id,
            activity: ActivityPayload::ExternalCloud(CloudSpendRecord {
                provider: provider.to_string(),
                service: None,
                spending_amount: 1000.0,
            }),
        }
    }

    fn train(subject_id: SubjectId) -> ActivityRecord {
        ActivityRecord {
            subject_id,
            activity: ActivityPayload::Travel(TravelRecord {
                origin_location_id: 101,
                destination_location_id: 102,
                transport_mode: "train".to_string(),
                cabin_class: None,
                number_of_trips: 2,
            }),
        }
    }

    fn run(
        catalog: &MemoryCatalog,
        store: &MemoryEmissionStore,
        ids: &[SubjectId],
    ) -> Result<BatchReport, CalcError> {
        let config = CalcConfig::default();
        let engine = EmissionEngine::new(catalog, catalog, &config);
        recalculate_for_subjects(
            &engine,
            store,
            store,
            ids,
            &BatchOptions::default(),
            &NullProgress,
        )
    }

    #[test]
    fn recompute_keeps_exactly_one_current_row() {
        let catalog = catalog();
        let mut store = MemoryEmissionStore::new();
        store.insert_activity(&train(1)).unwrap();

        let first = run(&catalog, &store, &[1]).unwrap();
        let second = run(&catalog, &store, &[1]).unwrap();

        assert_eq!(first.committed.len(), 1);
        assert_eq!(second.committed.len(), 1);
        assert_eq!(first.committed[0].kg_co2eq, second.committed[0].kg_co2eq);

        let history = store.history(1).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.iter().filter(|r| r.is_current).count(), 1);
        assert!(history[1].is_current);
        assert_eq!(store.current(1).unwrap(), vec![history[1].clone()]);
    }

    #[test]
    fn changing_transport_mode_retires_old_type() {
        let catalog = catalog();
        let mut store = MemoryEmissionStore::new();
        store.insert_activity(&train(1)).unwrap();
        run(&catalog, &store, &[1]).unwrap();

        store
            .insert_activity(&ActivityRecord {
                subject_id: 1,
                activity: ActivityPayload::Travel(TravelRecord {
                    origin_location_id: 1,
                    destination_location_id: 2,
                    transport_mode: "plane".to_string(),
                    cabin_class: None,
                    number_of_trips: 1,
                }),
            })
            .unwrap();
        run(&catalog, &store, &[1]).unwrap();

        let current = store.current(1).unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].emission_type, EmissionType::Flight);

        let history = store.history(1).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].emission_type, EmissionType::Train);
        assert!(!history[0].is_current);
    }

    #[test]
    fn headcount_commits_four_current_rows() {
        let catalog = catalog();
        let mut store = MemoryEmissionStore::new();
        store
            .insert_activity(&ActivityRecord {
                subject_id: 3,
                activity: ActivityPayload::Headcount(HeadcountRecord {
                    fte: 1.0,
                    category: None,
                }),
            })
            .unwrap();

        run(&catalog, &store, &[3]).unwrap();
        run(&catalog, &store, &[3]).unwrap();

        let current = store.current(3).unwrap();
        let types: Vec<EmissionType> = current.iter().map(|r| r.emission_type).collect();
        assert_eq!(types, EmissionType::HEADCOUNT_SUBCATEGORIES.to_vec());
        assert_eq!(store.history(3).unwrap().len(), 8);
    }

    #[test]
    fn incomplete_result_keeps_previous_current_row() {
        let mut store = MemoryEmissionStore::new();
        store.insert_activity(&cloud(1, "aws")).unwrap();
        run(&catalog(), &store, &[1]).unwrap();

        let without_aws = MemoryCatalog::from_rows(
            seed_factors()
                .into_iter()
                .filter(|f| f.emission_type != EmissionType::ExternalCloud),
            [],
        )
        .unwrap();
        let report = run(&without_aws, &store, &[1]).unwrap();

        assert!(report.committed.is_empty());
        assert_eq!(report.incomplete.len(), 1);
        assert_eq!(report.incomplete[0].kg_co2eq, None);

        let current = store.current(1).unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].kg_co2eq, Some(180.0));
        assert_eq!(store.history(1).unwrap().len(), 1);
    }

    #[test]
    fn missing_and_invalid_subjects_are_reported() {
        let mut store = MemoryEmissionStore::new();
        store.insert_activity(&cloud(1, "gcp")).unwrap();
        store.insert_stored(StoredActivity {
            subject_id: 2,
            record_type: "headcount".to_string(),
            inputs: serde_json::json!({ "headcount": "many" }),
        });

        let report = run(&catalog(), &store, &[1, 2, 3]).unwrap();
        assert_eq!(report.committed.len(), 1);
        assert_eq!(report.missing_subjects, vec![3]);
        assert_eq!(report.invalid.len(), 1);
        assert_eq!(report.invalid[0].subject_id, 2);
        assert_eq!(
            report.summary(),
            "1 committed, 0 incomplete, 1 missing, 1 invalid, 0 ambiguous"
        );
    }

    #[test]
    fn unknown_record_type_stops_the_batch() {
        let mut store = MemoryEmissionStore::new();
        store.insert_stored(StoredActivity {
            subject_id: 1,
            record_type: "purchases".to_string(),
            inputs: serde_json::json!({}),
        });
        store.insert_activity(&cloud(2, "aws")).unwrap();

        let err = run(&catalog(), &store, &[1, 2]).unwrap_err();
        assert!(matches!(
            err,
            CalcError::MissingFormula { subject_id: 1, .. }
        ));
        assert!(store.current(2).unwrap().is_empty());
    }

    #[test]
    fn require_complete_turns_gaps_into_errors() {
        let catalog = catalog();
        let mut store = MemoryEmissionStore::new();
        store.insert_activity(&cloud(1, "azure")).unwrap();

        let config = CalcConfig::default();
        let engine = EmissionEngine::new(&catalog, &catalog, &config);
        let err = recalculate_for_subjects(
            &engine,
            &store,
            &store,
            &[1],
            &BatchOptions {
                require_complete: true,
                ..BatchOptions::default()
            },
            &NullProgress,
        )
        .unwrap_err();
        assert!(matches!(err, CalcError::FactorNotResolved { .. }));
    }

    #[test]
    fn progress_advances_once_per_subject() {
        struct Counting(AtomicU64, AtomicU64);

        impl ProgressCallback for Counting {
            fn set_total(&self, total: u64) {
                self.0.store(total, Ordering::SeqCst);
            }
            fn inc(&self, delta: u64) {
                self.1.fetch_add(delta, Ordering::SeqCst);
            }
            fn set_message(&self, _msg: String) {}
            fn finish(&self, _msg: String) {}
        }

        let catalog = catalog();
        let mut store = MemoryEmissionStore::new();
        for id in 1..=5 {
            store.insert_activity(&train(id)).unwrap();
        }
        let config = CalcConfig::default();
        let engine = EmissionEngine::new(&catalog, &catalog, &config);
        let progress = Counting(AtomicU64::new(0), AtomicU64::new(0));

        recalculate_for_subjects(
            &engine,
            &store,
            &store,
            &[1, 2, 3, 4, 5],
            &BatchOptions {
                chunk_size: 2,
                require_complete: false,
            },
            &progress,
        )
        .unwrap();

        assert_eq!(progress.0.load(Ordering::SeqCst), 5);
        assert_eq!(progress.1.load(Ordering::SeqCst), 5);
        assert_eq!(store.rows().unwrap().len(), 5);
    }
}
