//! Headcount: one per-FTE profile split into four subcategories.

use footprint_calc_models::{CalculationInputs, HeadcountInputs, formula_version};
use footprint_factor_models::EmissionType;
use footprint_factor_models::payload::HeadcountFactor;

use super::{Calculation, Lookup, round2};

/// Computes the food, waste, commuting and grey energy emissions of `fte`
/// full-time equivalents. Each subcategory is `round2(fte * kg_per_fte)`.
#[must_use]
pub fn calculate_headcount_emissions(
    fte: f64,
    category: Option<&str>,
    factor: &Lookup<HeadcountFactor>,
) -> [Calculation; 4] {
    EmissionType::HEADCOUNT_SUBCATEGORIES.map(|subcategory| {
        let kg_per_fte = factor
            .as_ref()
            .ok()
            .and_then(|f| f.kg_per_fte(subcategory));

        Calculation {
            emission_type: subcategory,
            kg_co2eq: kg_per_fte.map(|kg| round2(fte * kg)),
            distance_km: None,
            annual_kwh: None,
            factor_ids_used: factor.iter().map(|f| f.factor_id).collect(),
            formula_version: formula_version::HEADCOUNT,
            inputs: CalculationInputs::Headcount(HeadcountInputs {
                fte,
                category: category.map(str::to_string),
                kg_per_fte,
            }),
            incomplete_reason: factor.as_ref().err().map(ToString::to_string),
        }
    })
}
