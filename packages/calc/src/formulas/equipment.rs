//! Equipment: annual energy from weekly usage and power draw, times grid
//! intensity.

use footprint_calc_models::{
    CalculationInputs, EquipmentInputs, EquipmentUsage, IntensitySource, formula_version,
};
use footprint_factor_models::payload::{IntensityFactor, PowerFactor};
use footprint_factor_models::{EmissionType, FactorId};

use super::{Calculation, Lookup, round2};
use crate::config::CalcConfig;

/// Grid intensity applied to an equipment record.
#[derive(Debug, Clone, PartialEq)]
pub struct GridIntensity {
    /// Country whose grid the equipment draws from.
    pub country_code: String,
    /// Grid intensity in kg CO2-eq per kWh.
    pub kg_co2eq_per_kwh: f64,
    /// `None` when the configured default was used.
    pub factor_id: Option<FactorId>,
}

impl GridIntensity {
    #[must_use]
    pub fn from_factor(country_code: &str, factor: &IntensityFactor) -> Self {
        Self {
            country_code: country_code.to_string(),
            kg_co2eq_per_kwh: factor.kg_co2eq_per_kwh,
            factor_id: Some(factor.factor_id),
        }
    }

    #[must_use]
    pub fn configured_default(country_code: &str, config: &CalcConfig) -> Self {
        Self {
            country_code: country_code.to_string(),
            kg_co2eq_per_kwh: config.default_kg_co2eq_per_kwh,
            factor_id: None,
        }
    }

    const fn source(&self) -> IntensitySource {
        match self.factor_id {
            Some(_) => IntensitySource::Factor,
            None => IntensitySource::Default,
        }
    }
}

/// Computes equipment emissions.
///
/// ```text
/// weekly_wh  = active_h * active_w + passive_h * standby_w
/// annual_kwh = weekly_wh * weeks_per_year / 1000
/// kg         = annual_kwh * kg_co2eq_per_kwh    (0 unless in service)
/// ```
///
/// Power ratings on the record win over the power factor. When neither
/// supplies a rating that the usage needs, the result is incomplete.
/// `annual_kwh` is reported even for equipment that is not in service.
#[must_use]
pub fn calculate_equipment_emission(
    usage: &EquipmentUsage,
    power: &Lookup<PowerFactor>,
    intensity: &GridIntensity,
    config: &CalcConfig,
) -> Calculation {
    let (active_h, passive_h) = usage.usage.hours_per_week(config.hours_per_week);
    let percentages = usage.usage.percentages();

    let factor = power.as_ref().ok();
    let active_w = usage
        .active_power_w
        .or_else(|| factor.and_then(|f| f.active_power_w));
    let standby_w = usage
        .standby_power_w
        .or_else(|| factor.and_then(|f| f.standby_power_w));

    let mut factor_ids_used = Vec::new();
    let power_from_factor = (usage.active_power_w.is_none() && active_w.is_some())
        || (usage.standby_power_w.is_none() && standby_w.is_some());
    if let Some(f) = factor.filter(|_| power_from_factor) {
        factor_ids_used.push(f.factor_id);
    }
    if let Some(id) = intensity.factor_id {
        factor_ids_used.push(id);
    }

    let inputs = CalculationInputs::Equipment(EquipmentInputs {
        submodule: usage.submodule.clone(),
        class: usage.class.clone(),
        sub_class: usage.sub_class.clone(),
        status: usage.status,
        active_usage_hours_per_week: active_h,
        passive_usage_hours_per_week: passive_h,
        active_usage_percent: percentages.map(|(a, _)| a),
        passive_usage_percent: percentages.map(|(_, p)| p),
        active_power_w: active_w,
        standby_power_w: standby_w,
        power_overridden: usage.active_power_w.is_some() || usage.standby_power_w.is_some(),
        weeks_per_year: config.weeks_per_year,
        hours_per_week: config.hours_per_week,
        country_code: intensity.country_code.clone(),
        kg_co2eq_per_kwh: intensity.kg_co2eq_per_kwh,
        intensity_source: intensity.source(),
    });

    let weekly_wh = match (required(active_h, active_w), required(passive_h, standby_w)) {
        (Some(active), Some(passive)) => Some(active + passive),
        _ => None,
    };
    let Some(weekly_wh) = weekly_wh else {
        let reason = power.as_ref().err().map_or_else(
            || "missing power rating for equipment with non-zero usage".to_string(),
            ToString::to_string,
        );
        return Calculation {
            emission_type: EmissionType::Equipment,
            kg_co2eq: None,
            distance_km: None,
            annual_kwh: None,
            factor_ids_used,
            formula_version: formula_version::EQUIPMENT,
            inputs,
            incomplete_reason: Some(reason),
        };
    };

    let annual_kwh = weekly_wh * config.weeks_per_year / 1000.0;
    let kg = if usage.status.is_in_service() {
        round2(annual_kwh * intensity.kg_co2eq_per_kwh)
    } else {
        0.0
    };

    Calculation {
        emission_type: EmissionType::Equipment,
        kg_co2eq: Some(kg),
        distance_km: None,
        annual_kwh: Some(round2(annual_kwh)),
        factor_ids_used,
        formula_version: formula_version::EQUIPMENT,
        inputs,
        incomplete_reason: None,
    }
}

/// Watt-hours for `hours` at `watts`. A missing rating only matters when
/// the hours are non-zero.
fn required(hours: f64, watts: Option<f64>) -> Option<f64> {
    match watts {
        Some(w) => Some(hours * w),
        None if hours.abs() < f64::EPSILON => Some(0.0),
        None => None,
    }
}
