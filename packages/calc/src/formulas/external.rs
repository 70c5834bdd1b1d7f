//! External services: cloud spend and AI usage.

use footprint_calc_models::{
    AiUsageInputs, AiUsageRecord, CalculationInputs, CloudSpendInputs, CloudSpendRecord,
    formula_version,
};
use footprint_factor_models::EmissionType;
use footprint_factor_models::payload::{SpendFactor, UsageFactor};

use super::{Calculation, Lookup};

/// Working days per week assumed for AI usage.
pub const WORKING_DAYS_PER_WEEK: f64 = 5.0;

/// Working weeks per year assumed for AI usage.
pub const WORKING_WEEKS_PER_YEAR: f64 = 46.0;

/// `kg = spending_amount * kg_co2eq_per_currency_unit`. Not rounded.
#[must_use]
pub fn calculate_cloud_spend_emission(
    record: &CloudSpendRecord,
    factor: &Lookup<SpendFactor>,
) -> Calculation {
    let per_unit = factor.as_ref().ok().map(|f| f.kg_co2eq_per_currency_unit);

    Calculation {
        emission_type: EmissionType::ExternalCloud,
        kg_co2eq: per_unit.map(|kg| record.spending_amount * kg),
        distance_km: None,
        annual_kwh: None,
        factor_ids_used: factor.iter().map(|f| f.factor_id).collect(),
        formula_version: formula_version::EXTERNAL_CLOUD,
        inputs: CalculationInputs::ExternalCloud(CloudSpendInputs {
            provider: record.provider.clone(),
            service: record.service.clone(),
            spending_amount: record.spending_amount,
            kg_co2eq_per_currency_unit: per_unit,
        }),
        incomplete_reason: factor.as_ref().err().map(ToString::to_string),
    }
}

/// `kg = frequency_per_day * 5 * 46 * user_count * g_co2eq_per_unit / 1000`.
/// Not rounded.
#[must_use]
pub fn calculate_ai_usage_emission(
    record: &AiUsageRecord,
    factor: &Lookup<UsageFactor>,
) -> Calculation {
    let grams = factor.as_ref().ok().map(|f| f.g_co2eq_per_unit);
    let yearly_requests = record.frequency_per_day
        * WORKING_DAYS_PER_WEEK
        * WORKING_WEEKS_PER_YEAR
        * f64::from(record.user_count);

    Calculation {
        emission_type: EmissionType::ExternalAi,
        kg_co2eq: grams.map(|g| yearly_requests * g / 1000.0),
        distance_km: None,
        annual_kwh: None,
        factor_ids_used: factor.iter().map(|f| f.factor_id).collect(),
        formula_version: formula_version::EXTERNAL_AI,
        inputs: CalculationInputs::ExternalAi(AiUsageInputs {
            provider: record.provider.clone(),
            use_case: record.use_case.clone(),
            frequency_per_day: record.frequency_per_day,
            user_count: record.user_count,
            days_per_week: WORKING_DAYS_PER_WEEK,
            weeks_per_year: WORKING_WEEKS_PER_YEAR,
            g_co2eq_per_unit: grams,
        }),
        incomplete_reason: factor.as_ref().err().map(ToString::to_string),
    }
}
