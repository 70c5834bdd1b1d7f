//! Pure emission formulas.
//!
//! Each formula takes already-resolved, typed factor payloads and returns a
//! [`Calculation`]. A factor that could not be resolved is passed in as a
//! [`MissingFactor`] and yields an incomplete calculation (`kg_co2eq` of
//! `None`) instead of a zero.

pub mod equipment;
pub mod external;
pub mod headcount;
pub mod travel;

use chrono::{DateTime, Utc};
use footprint_calc_models::{CalculationInputs, EmissionResult, SubjectId};
use footprint_factor_models::{Classification, EmissionType, FactorId};

pub use equipment::{GridIntensity, calculate_equipment_emission};
pub use external::{
    WORKING_DAYS_PER_WEEK, WORKING_WEEKS_PER_YEAR, calculate_ai_usage_emission,
    calculate_cloud_spend_emission,
};
pub use headcount::calculate_headcount_emissions;
pub use travel::{calculate_flight_emission, calculate_train_emission};

/// Rounds to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A factor the formula needed but could not get.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingFactor {
    /// Emission type that was looked up.
    pub emission_type: EmissionType,
    /// Classification the lookup searched for.
    pub classification: Classification,
    /// Why a matching factor was unusable, e.g. a missing value.
    pub detail: Option<String>,
}

impl MissingFactor {
    #[must_use]
    pub const fn new(emission_type: EmissionType, classification: Classification) -> Self {
        Self {
            emission_type,
            classification,
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for MissingFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "missing {} factor for classification {}",
            self.emission_type, self.classification
        )?;
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

impl std::error::Error for MissingFactor {}

/// A resolved and decoded factor payload, or why there is none.
pub type Lookup<T> = Result<T, MissingFactor>;

/// Output of one formula, not yet attached to a subject.
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    /// Emission type the result is filed under.
    pub emission_type: EmissionType,
    /// Emissions in kg CO2-eq. `None` when incomplete.
    pub kg_co2eq: Option<f64>,
    /// Travel distance, for flights and trains.
    pub distance_km: Option<f64>,
    /// Yearly energy use, for equipment.
    pub annual_kwh: Option<f64>,
    /// Ids of every factor the formula read.
    pub factor_ids_used: Vec<FactorId>,
    /// Version tag of the formula that produced the result.
    pub formula_version: &'static str,
    /// Snapshot of every value the formula read.
    pub inputs: CalculationInputs,
    /// Why `kg_co2eq` is missing, when it is.
    pub incomplete_reason: Option<String>,
}

impl Calculation {
    /// Stamps the calculation with its subject and time. The result is not
    /// current until a store commits it.
    #[must_use]
    pub fn into_result(self, subject_id: SubjectId, computed_at: DateTime<Utc>) -> EmissionResult {
        EmissionResult {
            subject_id,
            emission_type: self.emission_type,
            kg_co2eq: self.kg_co2eq,
            distance_km: self.distance_km,
            annual_kwh: self.annual_kwh,
            factor_ids_used: self.factor_ids_used,
            formula_version: self.formula_version.to_string(),
            computed_at,
            calculation_inputs: self.inputs,
            is_current: false,
            incomplete_reason: self.incomplete_reason,
        }
    }
}
