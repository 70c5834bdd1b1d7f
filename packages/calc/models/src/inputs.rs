//! Calculation input snapshots.
//!
//! Each formula records every value it read, tagged by formula, so a
//! result can be recomputed by hand from its row alone.

use footprint_factor_models::{CabinClass, HaulCategory};
use serde::{Deserialize, Serialize};

use crate::activity::EquipmentStatus;

/// Where an equipment record's grid intensity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensitySource {
    /// Resolved from an electricity mix factor.
    Factor,
    /// No factor matched; the configured default was used.
    Default,
}

/// Inputs read by the equipment formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentInputs {
    /// Lab submodule the equipment belongs to.
    pub submodule: String,
    /// Equipment class used to pick the power factor.
    pub class: String,
    /// Optional sub-class narrowing the power factor.
    pub sub_class: Option<String>,
    /// Operating status of the equipment.
    pub status: EquipmentStatus,
    /// Hours per week the equipment runs at active power.
    pub active_usage_hours_per_week: f64,
    /// Hours per week the equipment sits at standby power.
    pub passive_usage_hours_per_week: f64,
    /// Active share of the week, when given as a percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_usage_percent: Option<f64>,
    /// Standby share of the week, when given as a percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passive_usage_percent: Option<f64>,
    /// Active power draw in watts.
    pub active_power_w: Option<f64>,
    /// Standby power draw in watts.
    pub standby_power_w: Option<f64>,
    /// Whether the power values came from the record rather than a factor.
    pub power_overridden: bool,
    /// Operating weeks per year.
    pub weeks_per_year: f64,
    /// Hours in a week, the cap on combined usage.
    pub hours_per_week: f64,
    /// Country whose grid intensity applies.
    pub country_code: String,
    /// Grid intensity in kg CO2-eq per kWh.
    pub kg_co2eq_per_kwh: f64,
    /// Whether the intensity came from a factor or the default.
    pub intensity_source: IntensitySource,
}

/// Shared by the flight and train formulas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelInputs {
    /// Transport mode as written on the record.
    pub transport_mode: String,
    /// Departure location id.
    pub origin_location_id: i64,
    /// Arrival location id.
    pub destination_location_id: i64,
    /// Departure location name, when the id resolved.
    pub origin_name: Option<String>,
    /// Arrival location name, when the id resolved.
    pub destination_name: Option<String>,
    /// Flight cabin class; always `None` for trains.
    pub cabin_class: Option<CabinClass>,
    /// Number of one-way trips.
    pub number_of_trips: u32,
    /// Unadjusted great-circle distance.
    pub great_circle_km: Option<f64>,
    /// Haul category picked from the flight distance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub haul_category: Option<HaulCategory>,
    /// Country used to pick the train factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    /// Impact score per passenger-km from the resolved factor.
    pub impact_score: Option<f64>,
    /// Radiative forcing multiplier applied to flights.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rfi_adjustment: Option<f64>,
}

/// Inputs read by the headcount formula, one snapshot per subcategory row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadcountInputs {
    /// Full-time equivalents on the record.
    pub fte: f64,
    /// Staff category used to pick the factor.
    pub category: Option<String>,
    /// Per-FTE value for the subcategory this row covers.
    pub kg_per_fte: Option<f64>,
}

/// Inputs read by the cloud spend formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudSpendInputs {
    /// Cloud provider name.
    pub provider: String,
    /// Optional service narrowing the factor.
    pub service: Option<String>,
    /// Amount spent, in currency units.
    pub spending_amount: f64,
    /// Factor value in kg CO2-eq per currency unit.
    pub kg_co2eq_per_currency_unit: Option<f64>,
}

/// Inputs read by the AI usage formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiUsageInputs {
    /// AI provider name.
    pub provider: String,
    /// Optional use case narrowing the factor.
    pub use_case: Option<String>,
    /// Requests per user per working day.
    pub frequency_per_day: f64,
    /// Number of users.
    pub user_count: u32,
    /// Working days per week.
    pub days_per_week: f64,
    /// Working weeks per year.
    pub weeks_per_year: f64,
    /// Factor value in g CO2-eq per request.
    pub g_co2eq_per_unit: Option<f64>,
}

/// Snapshot of the inputs behind one result, tagged by formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "formula", rename_all = "snake_case")]
pub enum CalculationInputs {
    Equipment(EquipmentInputs),
    Flight(TravelInputs),
    Train(TravelInputs),
    Headcount(HeadcountInputs),
    ExternalCloud(CloudSpendInputs),
    ExternalAi(AiUsageInputs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_tagged_by_formula() {
        let inputs = CalculationInputs::Flight(TravelInputs {
            transport_mode: "plane".to_string(),
            origin_location_id: 1,
            destination_location_id: 2,
            origin_name: Some("Zurich Airport".to_string()),
            destination_name: Some("Geneva Airport".to_string()),
            cabin_class: Some(CabinClass::Economy),
            number_of_trips: 1,
            great_circle_km: Some(227.0),
            haul_category: Some(HaulCategory::VeryShortHaul),
            country_code: None,
            impact_score: Some(0.25),
            rfi_adjustment: Some(1.0),
        });
        let json = serde_json::to_value(&inputs).unwrap();
        assert_eq!(json["formula"], "flight");
        assert_eq!(json["haul_category"], "very_short_haul");
        assert!(json.get("country_code").is_none());

        let parsed: CalculationInputs = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, inputs);
    }
}
