#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Activity records and emission results.
//!
//! An [`ActivityRecord`] holds the physical inputs of one subject
//! (a piece of equipment, a trip, a headcount entry, ...). Calculating it
//! produces one or more [`EmissionResult`]s, the persisted shape consumed by
//! reporting. Every result carries a [`CalculationInputs`] snapshot with
//! enough detail to recompute the value by hand.

pub mod activity;
pub mod inputs;

use chrono::{DateTime, Utc};
use footprint_factor_models::{EmissionType, FactorId};
use serde::{Deserialize, Serialize};

pub use activity::{
    ActivityDecodeError, ActivityPayload, ActivityRecord, AiUsageRecord, CloudSpendRecord,
    EquipmentStatus, EquipmentUsage, HeadcountRecord, RecordType, TravelRecord, Usage,
};
pub use inputs::{
    AiUsageInputs, CalculationInputs, CloudSpendInputs, EquipmentInputs, HeadcountInputs,
    IntensitySource, TravelInputs,
};

/// Identifier of the activity record an emission belongs to.
pub type SubjectId = i64;

/// Formula tags recorded on every result.
///
/// Bump the suffix whenever a formula or one of its constants changes so
/// old rows stay attributable.
pub mod formula_version {
    /// Equipment power draw times grid intensity.
    pub const EQUIPMENT: &str = "equipment-power/v1";
    /// Flight distance times impact score times RFI.
    pub const FLIGHT: &str = "flight-distance/v1";
    /// Train distance times impact score.
    pub const TRAIN: &str = "train-distance/v1";
    /// FTE times per-FTE subcategory values.
    pub const HEADCOUNT: &str = "headcount-fte/v1";
    /// Spend times per-currency factor.
    pub const EXTERNAL_CLOUD: &str = "cloud-spend/v1";
    /// Requests per day extrapolated over 5 days and 46 weeks.
    pub const EXTERNAL_AI: &str = "ai-usage/v1";
}

/// A calculated emission, persisted as one row per subject and emission
/// type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionResult {
    /// Activity record this emission belongs to.
    pub subject_id: SubjectId,
    /// Emission category; headcount produces one row per subcategory.
    pub emission_type: EmissionType,
    /// kg CO2eq, or `None` when the calculation could not be completed.
    pub kg_co2eq: Option<f64>,
    /// Travel distance used, for travel records.
    pub distance_km: Option<f64>,
    /// Annual energy use, for equipment records.
    pub annual_kwh: Option<f64>,
    /// Factor rows used, in formula order.
    pub factor_ids_used: Vec<FactorId>,
    /// Formula tag, see [`formula_version`].
    pub formula_version: String,
    /// When the value was computed.
    pub computed_at: DateTime<Utc>,
    /// Snapshot of every input value.
    pub calculation_inputs: CalculationInputs,
    /// Whether this is the subject's current row.
    pub is_current: bool,
    /// Why `kg_co2eq` is `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incomplete_reason: Option<String>,
}

impl EmissionResult {
    /// Whether a numeric emission value was produced.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.kg_co2eq.is_some()
    }

    /// Operator-facing description of an incomplete result.
    #[must_use]
    pub fn incomplete_message(&self) -> Option<String> {
        if self.is_complete() {
            return None;
        }
        Some(format!(
            "no {} emission computed for subject {}: {}",
            self.emission_type,
            self.subject_id,
            self.incomplete_reason.as_deref().unwrap_or("unknown reason"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn result(kg: Option<f64>) -> EmissionResult {
        EmissionResult {
            subject_id: 9,
            emission_type: EmissionType::Train,
            kg_co2eq: kg,
            distance_km: Some(269.0),
            annual_kwh: None,
            factor_ids_used: vec![11],
            formula_version: formula_version::TRAIN.to_string(),
            computed_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            calculation_inputs: CalculationInputs::Headcount(HeadcountInputs {
                fte: 1.0,
                category: None,
                kg_per_fte: None,
            }),
            is_current: true,
            incomplete_reason: kg
                .is_none()
                .then(|| "missing train factor for {country_code=PL}".to_string()),
        }
    }

    #[test]
    fn persisted_shape_uses_snake_case_and_rfc3339() {
        let json = serde_json::to_value(result(Some(2.63))).unwrap();
        assert_eq!(json["subject_id"], 9);
        assert_eq!(json["emission_type"], "train");
        assert_eq!(json["kg_co2eq"], 2.63);
        assert_eq!(json["annual_kwh"], serde_json::Value::Null);
        assert_eq!(json["factor_ids_used"], serde_json::json!([11]));
        assert_eq!(json["computed_at"], "2025-03-01T12:00:00Z");
        assert_eq!(json["calculation_inputs"]["formula"], "headcount");
        assert!(json.get("incomplete_reason").is_none());
    }

    #[test]
    fn incomplete_results_explain_themselves() {
        assert_eq!(result(Some(1.0)).incomplete_message(), None);
        assert_eq!(
            result(None).incomplete_message().unwrap(),
            "no train emission computed for subject 9: missing train factor for {country_code=PL}"
        );
    }

    #[test]
    fn result_json_roundtrips() {
        let original = result(None);
        let json = serde_json::to_string(&original).unwrap();
        let parsed: EmissionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
    }
}
