//! The emission engine: resolves factors for an activity record and runs
//! the matching formula.

use chrono::{DateTime, Utc};
use footprint_calc_models::{
    ActivityPayload, ActivityRecord, AiUsageRecord, CloudSpendRecord, EmissionResult,
    EquipmentUsage, HeadcountRecord, TravelRecord,
};
use footprint_factor::{
    AmbiguityPolicy, FactorCatalog, FactorQuery, LocationDirectory, Resolution, resolve_factor,
};
use footprint_factor_models::payload::{
    FactorDecodeError, FlightFactor, HeadcountFactor, IntensityFactor, PowerFactor, SpendFactor,
    TrainFactor, UsageFactor,
};
use footprint_factor_models::{EmissionType, Factor, FactorId, TransportMode};
use footprint_geodesy::classify::train_country_code_for;
use footprint_geodesy::{flight_distance, haul_category};

use crate::CalcError;
use crate::config::CalcConfig;
use crate::formulas::{
    self, Calculation, GridIntensity, Lookup, MissingFactor, calculate_ai_usage_emission,
    calculate_cloud_spend_emission, calculate_equipment_emission, calculate_flight_emission,
    calculate_headcount_emissions, calculate_train_emission,
};

/// A factor pick that had equally specific competitors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousMatch {
    /// Emission type of the resolved factor.
    pub emission_type: EmissionType,
    /// Factor the resolver used.
    pub chosen: FactorId,
    /// Equally specific factors that were passed over.
    pub others: Vec<FactorId>,
}

/// Results of calculating one activity record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Evaluation {
    /// One result per emission type the record produces, complete or not.
    pub results: Vec<EmissionResult>,
    /// Ambiguous factor picks made along the way.
    pub ambiguities: Vec<AmbiguousMatch>,
}

/// Stateless calculator over borrowed reference data.
pub struct EmissionEngine<'a, C, L> {
    catalog: &'a C,
    locations: &'a L,
    config: &'a CalcConfig,
    as_of: Option<DateTime<Utc>>,
}

impl<'a, C: FactorCatalog, L: LocationDirectory> EmissionEngine<'a, C, L> {
    #[must_use]
    pub const fn new(catalog: &'a C, locations: &'a L, config: &'a CalcConfig) -> Self {
        Self {
            catalog,
            locations,
            config,
            as_of: None,
        }
    }

    /// Resolves factors as of `as_of` instead of using current factors.
    #[must_use]
    pub const fn at(mut self, as_of: Option<DateTime<Utc>>) -> Self {
        self.as_of = as_of;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &CalcConfig {
        self.config
    }

    /// Resolves a factor query under the engine's point in time and
    /// ambiguity policy.
    ///
    /// # Errors
    ///
    /// Returns [`CalcError::Catalog`] if the catalog cannot be read.
    pub fn resolve(&self, query: FactorQuery) -> Result<Option<Resolution>, CalcError> {
        let query = match self.as_of {
            Some(t) => query.as_of(Some(t)),
            None => query,
        };
        let query = match self.config.ambiguity_policy {
            AmbiguityPolicy::Reject => query.on_ambiguity(AmbiguityPolicy::Reject),
            AmbiguityPolicy::FirstMatch => query,
        };
        Ok(resolve_factor(self.catalog, &query)?)
    }

    /// Like [`Self::resolve`], but an unmatched query is an error.
    ///
    /// # Errors
    ///
    /// Returns [`CalcError::FactorNotResolved`] if nothing matches, or
    /// [`CalcError::Catalog`] if the catalog cannot be read.
    pub fn resolve_required(&self, query: FactorQuery) -> Result<Resolution, CalcError> {
        let missing = MissingFactor::new(query.emission_type(), query.classification());
        self.resolve(query)?
            .ok_or_else(|| CalcError::FactorNotResolved {
                message: missing.to_string(),
            })
    }

    /// Calculates every emission an activity record produces.
    ///
    /// Missing factors give incomplete results, not errors.
    ///
    /// # Errors
    ///
    /// * [`CalcError::InvalidTransportMode`] for a trip in an unknown mode
    /// * [`CalcError::Geodesy`] for out-of-range coordinates
    /// * [`CalcError::Catalog`] if reference data cannot be read
    pub fn calculate(&self, record: &ActivityRecord) -> Result<Evaluation, CalcError> {
        let mut ambiguities = Vec::new();

        let calculations = match &record.activity {
            ActivityPayload::Equipment(usage) => vec![self.equipment(usage, &mut ambiguities)?],
            ActivityPayload::Travel(trip) => vec![self.travel(trip, &mut ambiguities)?],
            ActivityPayload::Headcount(headcount) => {
                Vec::from(self.headcount(headcount, &mut ambiguities)?)
            }
            ActivityPayload::ExternalCloud(spend) => vec![self.cloud(spend, &mut ambiguities)?],
            ActivityPayload::ExternalAi(usage) => vec![self.ai(usage, &mut ambiguities)?],
        };

        let computed_at = Utc::now();
        let results = calculations
            .into_iter()
            .map(|c| c.into_result(record.subject_id, computed_at))
            .collect();

        Ok(Evaluation {
            results,
            ambiguities,
        })
    }

    fn lookup<P>(
        &self,
        query: FactorQuery,
        ambiguities: &mut Vec<AmbiguousMatch>,
    ) -> Result<Lookup<P>, CalcError>
    where
        P: for<'f> TryFrom<&'f Factor, Error = FactorDecodeError>,
    {
        let missing = MissingFactor::new(query.emission_type(), query.classification());

        let Some(resolution) = self.resolve(query)? else {
            return Ok(Err(missing));
        };
        if resolution.is_ambiguous() {
            ambiguities.push(AmbiguousMatch {
                emission_type: resolution.factor.emission_type,
                chosen: resolution.factor.id,
                others: resolution.ambiguous_with.clone(),
            });
        }

        Ok(P::try_from(&resolution.factor).map_err(|e| {
            log::warn!("Unusable factor {}: {e}", resolution.factor.id);
            missing.with_detail(e.to_string())
        }))
    }

    fn equipment(
        &self,
        usage: &EquipmentUsage,
        ambiguities: &mut Vec<AmbiguousMatch>,
    ) -> Result<Calculation, CalcError> {
        let power = self.lookup::<PowerFactor>(
            FactorQuery::equipment(&usage.submodule, &usage.class, usage.sub_class.as_deref()),
            ambiguities,
        )?;

        let country = usage
            .country_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(self.config.domestic_country_code.as_str())
            .to_ascii_uppercase();
        let intensity = match self.lookup::<IntensityFactor>(
            FactorQuery::electricity_mix(&country),
            ambiguities,
        )? {
            Ok(factor) => GridIntensity::from_factor(&country, &factor),
            Err(missing) => {
                log::warn!(
                    "{missing}; using default intensity {} kg/kWh",
                    self.config.default_kg_co2eq_per_kwh
                );
                GridIntensity::configured_default(&country, self.config)
            }
        };

        Ok(calculate_equipment_emission(
            usage,
            &power,
            &intensity,
            self.config,
        ))
    }

    fn travel(
        &self,
        trip: &TravelRecord,
        ambiguities: &mut Vec<AmbiguousMatch>,
    ) -> Result<Calculation, CalcError> {
        let mode = TransportMode::parse(&trip.transport_mode)?;

        let Some(origin) = self.locations.location(trip.origin_location_id)? else {
            return Ok(formulas::travel::unknown_location(
                mode,
                trip,
                trip.origin_location_id,
            ));
        };
        let Some(destination) = self.locations.location(trip.destination_location_id)? else {
            return Ok(formulas::travel::unknown_location(
                mode,
                trip,
                trip.destination_location_id,
            ));
        };

        match mode {
            TransportMode::Plane => {
                let haul = haul_category(flight_distance(&origin, &destination)?);
                let factor =
                    self.lookup::<FlightFactor>(FactorQuery::flight(haul), ambiguities)?;
                Ok(calculate_flight_emission(
                    &origin,
                    &destination,
                    trip.cabin_class,
                    trip.number_of_trips,
                    &factor,
                )?)
            }
            TransportMode::Train => {
                let country = train_country_code_for(
                    &self.config.domestic_country_code,
                    origin.country(),
                    destination.country(),
                );
                let factor =
                    self.lookup::<TrainFactor>(FactorQuery::train(&country), ambiguities)?;
                Ok(calculate_train_emission(
                    &origin,
                    &destination,
                    trip.cabin_class,
                    trip.number_of_trips,
                    &country,
                    &factor,
                )?)
            }
        }
    }

    fn headcount(
        &self,
        headcount: &HeadcountRecord,
        ambiguities: &mut Vec<AmbiguousMatch>,
    ) -> Result<[Calculation; 4], CalcError> {
        let category = headcount.category.as_deref();
        let factor =
            self.lookup::<HeadcountFactor>(FactorQuery::headcount(category), ambiguities)?;
        Ok(calculate_headcount_emissions(
            headcount.fte,
            category,
            &factor,
        ))
    }

    fn cloud(
        &self,
        spend: &CloudSpendRecord,
        ambiguities: &mut Vec<AmbiguousMatch>,
    ) -> Result<Calculation, CalcError> {
        let factor = self.lookup::<SpendFactor>(
            FactorQuery::external_cloud(&spend.provider, spend.service.as_deref()),
            ambiguities,
        )?;
        Ok(calculate_cloud_spend_emission(spend, &factor))
    }

    fn ai(
        &self,
        usage: &AiUsageRecord,
        ambiguities: &mut Vec<AmbiguousMatch>,
    ) -> Result<Calculation, CalcError> {
        let factor = self.lookup::<UsageFactor>(
            FactorQuery::external_ai(&usage.provider, usage.use_case.as_deref()),
            ambiguities,
        )?;
        Ok(calculate_ai_usage_emission(usage, &factor))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use footprint_calc_models::{
        CalculationInputs, EquipmentStatus, IntensitySource, Usage, formula_version,
    };
    use footprint_factor::registry::seed_factors;
    use footprint_factor::{FactorCatalogWriter, FactorDraft, MemoryCatalog};
    use footprint_factor_models::{Classification, FactorValues, HaulCategory, Location};
    use footprint_geodesy::locations::reference_locations;

    use super::*;

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::from_rows(seed_factors(), reference_locations()).unwrap()
    }

    fn equipment(subject_id: i64, sub_class: Option<&str>, country: Option<&str>) -> ActivityRecord {
        ActivityRecord {
            subject_id,
            activity: ActivityPayload::Equipment(EquipmentUsage {
                submodule: "scientific".to_string(),
                class: "Centrifugation".to_string(),
                sub_class: sub_class.map(str::to_string),
                status: EquipmentStatus::InService,
                usage: Usage::Hours {
                    active_hours_per_week: 40.0,
                    passive_hours_per_week: 128.0,
                },
                active_power_w: None,
                standby_power_w: None,
                country_code: country.map(str::to_string),
            }),
        }
    }

    fn trip(subject_id: i64, from: i64, to: i64, mode: &str) -> ActivityRecord {
        ActivityRecord {
            subject_id,
            activity: ActivityPayload::Travel(TravelRecord {
                origin_location_id: from,
                destination_location_id: to,
                transport_mode: mode.to_string(),
                cabin_class: None,
                number_of_trips: 1,
            }),
        }
    }

    fn only(evaluation: Evaluation) -> EmissionResult {
        assert_eq!(evaluation.results.len(), 1);
        evaluation.results.into_iter().next().unwrap()
    }

    #[test]
    fn equipment_uses_class_level_profile_and_domestic_grid() {
        let catalog = catalog();
        let config = CalcConfig::default();
        let engine = EmissionEngine::new(&catalog, &catalog, &config);

        let result = only(engine.calculate(&equipment(1, None, None)).unwrap());
        // (40 * 500 + 128 * 50) Wh * 52 / 1000 = 1372.8 kWh, * 0.125
        assert_eq!(result.annual_kwh, Some(1372.8));
        assert_eq!(result.kg_co2eq, Some(171.6));
        assert_eq!(result.factor_ids_used, vec![31, 21]);
        assert_eq!(result.formula_version, formula_version::EQUIPMENT);
        assert!(!result.is_current);
    }

    #[test]
    fn equipment_prefers_exact_sub_class() {
        let catalog = catalog();
        let config = CalcConfig::default();
        let engine = EmissionEngine::new(&catalog, &catalog, &config);

        let exact = only(
            engine
                .calculate(&equipment(1, Some("Ultra centrifuges"), None))
                .unwrap(),
        );
        assert_eq!(exact.factor_ids_used[0], 32);

        let generic = only(
            engine
                .calculate(&equipment(1, Some("Tabletop"), None))
                .unwrap(),
        );
        assert_eq!(generic.factor_ids_used[0], 31);
    }

    #[test]
    fn equipment_grid_falls_back_to_rest_of_world_then_default() {
        let catalog = catalog();
        let config = CalcConfig::default();
        let engine = EmissionEngine::new(&catalog, &catalog, &config);

        let abroad = only(engine.calculate(&equipment(1, None, Some("de"))).unwrap());
        assert_eq!(abroad.factor_ids_used, vec![31, 22]);

        let no_grid = MemoryCatalog::from_rows(
            seed_factors()
                .into_iter()
                .filter(|f| f.emission_type != EmissionType::ElectricityMix),
            [],
        )
        .unwrap();
        let engine = EmissionEngine::new(&no_grid, &no_grid, &config);
        let result = only(engine.calculate(&equipment(1, None, None)).unwrap());
        assert_eq!(result.factor_ids_used, vec![31]);
        assert_eq!(result.kg_co2eq, Some(171.6));
        let CalculationInputs::Equipment(inputs) = result.calculation_inputs else {
            panic!("expected equipment inputs");
        };
        assert_eq!(inputs.intensity_source, IntensitySource::Default);
        assert_eq!(inputs.country_code, "CH");
    }

    #[test]
    fn flight_is_classified_by_haul() {
        let catalog = catalog();
        let config = CalcConfig::default();
        let engine = EmissionEngine::new(&catalog, &catalog, &config);

        let short = only(engine.calculate(&trip(1, 1, 2, "flight")).unwrap());
        assert_eq!(short.emission_type, EmissionType::Flight);
        assert_eq!(short.factor_ids_used, vec![1]);

        let long = only(engine.calculate(&trip(2, 1, 7, "Plane")).unwrap());
        let CalculationInputs::Flight(inputs) = long.calculation_inputs else {
            panic!("expected flight inputs");
        };
        assert_eq!(inputs.haul_category, Some(HaulCategory::LongHaul));
        assert_eq!(long.factor_ids_used, vec![4]);
    }

    #[test]
    fn train_uses_foreign_country_then_rest_of_world() {
        let mut catalog = catalog();
        catalog.insert_location(Location {
            id: 900,
            transport_mode: TransportMode::Train,
            name: "Warszawa Centralna".to_string(),
            latitude: 52.2289,
            longitude: 21.0031,
            iata_code: None,
            country_code: Some("PL".to_string()),
        });
        let config = CalcConfig::default();
        let engine = EmissionEngine::new(&catalog, &catalog, &config);

        let domestic = only(engine.calculate(&trip(1, 101, 102, "train")).unwrap());
        assert_eq!(domestic.factor_ids_used, vec![11]);

        let to_vienna = only(engine.calculate(&trip(2, 101, 108, "train")).unwrap());
        assert_eq!(to_vienna.factor_ids_used, vec![15]);

        let to_warsaw = only(engine.calculate(&trip(3, 101, 900, "train")).unwrap());
        assert_eq!(to_warsaw.factor_ids_used, vec![16]);
        let CalculationInputs::Train(inputs) = to_warsaw.calculation_inputs else {
            panic!("expected train inputs");
        };
        assert_eq!(inputs.country_code.as_deref(), Some("PL"));
    }

    #[test]
    fn unknown_transport_mode_raises() {
        let catalog = catalog();
        let config = CalcConfig::default();
        let engine = EmissionEngine::new(&catalog, &catalog, &config);
        assert!(matches!(
            engine.calculate(&trip(1, 101, 102, "bus")),
            Err(CalcError::InvalidTransportMode(_))
        ));
    }

    #[test]
    fn unknown_location_is_incomplete() {
        let catalog = catalog();
        let config = CalcConfig::default();
        let engine = EmissionEngine::new(&catalog, &catalog, &config);
        let result = only(engine.calculate(&trip(1, 101, 4242, "train")).unwrap());
        assert_eq!(result.kg_co2eq, None);
        assert_eq!(
            result.incomplete_reason.as_deref(),
            Some("unknown location 4242")
        );
    }

    #[test]
    fn headcount_produces_four_rows_from_category_factor() {
        let catalog = catalog();
        let config = CalcConfig::default();
        let engine = EmissionEngine::new(&catalog, &catalog, &config);

        let evaluation = engine
            .calculate(&ActivityRecord {
                subject_id: 7,
                activity: ActivityPayload::Headcount(HeadcountRecord {
                    fte: 2.0,
                    category: Some("student".to_string()),
                }),
            })
            .unwrap();
        assert_eq!(evaluation.results.len(), 4);
        assert!(evaluation.results.iter().all(|r| r.factor_ids_used == vec![52]));
        assert_eq!(evaluation.results[0].emission_type, EmissionType::Food);
        assert_eq!(evaluation.results[0].kg_co2eq, Some(760.0));
    }

    #[test]
    fn ambiguous_matches_are_reported() {
        let catalog = MemoryCatalog::from_rows(
            [71, 72].map(|id| Factor {
                id,
                emission_type: EmissionType::ExternalAi,
                classification: if id == 71 {
                    Classification::new().with("provider", "openai").with("model", "a")
                } else {
                    Classification::new().with("provider", "openai").with("model", "b")
                },
                values: FactorValues::new().with("g_co2eq_per_unit", 1.0),
                valid_from: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                valid_to: None,
            }),
            [],
        )
        .unwrap();
        let usage = ActivityRecord {
            subject_id: 1,
            activity: ActivityPayload::ExternalAi(AiUsageRecord {
                provider: "openai".to_string(),
                use_case: None,
                frequency_per_day: 1.0,
                user_count: 1,
            }),
        };

        let config = CalcConfig::default();
        let evaluation = EmissionEngine::new(&catalog, &catalog, &config)
            .calculate(&usage)
            .unwrap();
        assert_eq!(evaluation.results[0].factor_ids_used, vec![71]);
        assert_eq!(
            evaluation.ambiguities,
            vec![AmbiguousMatch {
                emission_type: EmissionType::ExternalAi,
                chosen: 71,
                others: vec![72],
            }]
        );

        let strict = CalcConfig {
            ambiguity_policy: AmbiguityPolicy::Reject,
            ..CalcConfig::default()
        };
        let evaluation = EmissionEngine::new(&catalog, &catalog, &strict)
            .calculate(&usage)
            .unwrap();
        assert_eq!(evaluation.results[0].kg_co2eq, None);
        assert!(evaluation.ambiguities.is_empty());
    }

    #[test]
    fn point_in_time_uses_the_factor_valid_then() {
        let mut catalog = catalog();
        catalog
            .supersede_factor(&FactorDraft {
                emission_type: EmissionType::Train,
                classification: Classification::new().with("country_code", "CH"),
                values: FactorValues::new().with("impact_score", 0.02),
                valid_from: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            })
            .unwrap();
        let config = CalcConfig::default();

        let now = only(
            EmissionEngine::new(&catalog, &catalog, &config)
                .calculate(&trip(1, 101, 102, "train"))
                .unwrap(),
        );
        assert_ne!(now.factor_ids_used, vec![11]);

        let then = only(
            EmissionEngine::new(&catalog, &catalog, &config)
                .at(Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()))
                .calculate(&trip(1, 101, 102, "train"))
                .unwrap(),
        );
        assert_eq!(then.factor_ids_used, vec![11]);
    }

    #[test]
    fn resolve_required_reports_the_query() {
        let catalog = catalog();
        let config = CalcConfig::default();
        let engine = EmissionEngine::new(&catalog, &catalog, &config);

        let err = engine
            .resolve_required(FactorQuery::external_cloud("azure", None))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Factor not resolved: missing external_cloud factor for classification {provider=azure}"
        );
        assert_eq!(
            engine
                .resolve_required(FactorQuery::external_cloud("aws", Some("compute")))
                .unwrap()
                .factor
                .id,
            62
        );
    }
}
