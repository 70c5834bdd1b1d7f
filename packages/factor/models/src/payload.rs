//! Typed factor payloads.
//!
//! Each emission type has a fixed set of numeric values. Resolved factors
//! are decoded into one of these structs right after resolution so that
//! formulas work with named fields instead of map lookups. A missing
//! required value is reported as a [`FactorDecodeError`], which callers
//! turn into an incomplete (null) result.

use serde::{Deserialize, Serialize};

use crate::{EmissionType, Factor, FactorId};

/// Error returned when a factor's open value map cannot be decoded into a
/// typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactorDecodeError {
    /// The factor belongs to a different emission type.
    WrongType {
        /// Offending factor.
        factor_id: FactorId,
        /// Type the payload requires.
        expected: EmissionType,
        /// Type found on the factor.
        actual: EmissionType,
    },
    /// A required numeric value is absent or not finite.
    MissingValue {
        /// Offending factor.
        factor_id: FactorId,
        /// Name of the absent value.
        key: &'static str,
    },
}

impl std::fmt::Display for FactorDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongType {
                factor_id,
                expected,
                actual,
            } => write!(
                f,
                "factor {factor_id} is a {actual} factor, expected {expected}"
            ),
            Self::MissingValue { factor_id, key } => {
                write!(f, "factor {factor_id} has no usable value for {key}")
            }
        }
    }
}

impl std::error::Error for FactorDecodeError {}

fn expect_type(factor: &Factor, expected: EmissionType) -> Result<(), FactorDecodeError> {
    if factor.emission_type == expected {
        Ok(())
    } else {
        Err(FactorDecodeError::WrongType {
            factor_id: factor.id,
            expected,
            actual: factor.emission_type,
        })
    }
}

fn require(factor: &Factor, key: &'static str) -> Result<f64, FactorDecodeError> {
    factor
        .values
        .get(key)
        .ok_or(FactorDecodeError::MissingValue {
            factor_id: factor.id,
            key,
        })
}

/// Power profile of an equipment class.
///
/// Both ratings are optional: equipment records may carry their own
/// ratings, which take precedence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerFactor {
    /// Source factor.
    pub factor_id: FactorId,
    /// Power draw while in active use, in watts.
    pub active_power_w: Option<f64>,
    /// Power draw while idle or on standby, in watts.
    pub standby_power_w: Option<f64>,
}

impl TryFrom<&Factor> for PowerFactor {
    type Error = FactorDecodeError;

    fn try_from(factor: &Factor) -> Result<Self, Self::Error> {
        expect_type(factor, EmissionType::Equipment)?;
        Ok(Self {
            factor_id: factor.id,
            active_power_w: factor.values.get("active_power_w"),
            standby_power_w: factor.values.get("standby_power_w"),
        })
    }
}

/// Electricity grid intensity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntensityFactor {
    /// Source factor.
    pub factor_id: FactorId,
    /// kg CO2eq emitted per kWh consumed.
    pub kg_co2eq_per_kwh: f64,
}

impl TryFrom<&Factor> for IntensityFactor {
    type Error = FactorDecodeError;

    fn try_from(factor: &Factor) -> Result<Self, Self::Error> {
        expect_type(factor, EmissionType::ElectricityMix)?;
        Ok(Self {
            factor_id: factor.id,
            kg_co2eq_per_kwh: require(factor, "kg_co2eq_per_kwh")?,
        })
    }
}

/// Flight impact for one haul category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlightFactor {
    /// Source factor.
    pub factor_id: FactorId,
    /// kg CO2eq per passenger-km.
    pub impact_score: f64,
    /// Radiative forcing index multiplier for non-CO2 effects at altitude.
    pub rfi_adjustment: f64,
}

impl TryFrom<&Factor> for FlightFactor {
    type Error = FactorDecodeError;

    fn try_from(factor: &Factor) -> Result<Self, Self::Error> {
        expect_type(factor, EmissionType::Flight)?;
        Ok(Self {
            factor_id: factor.id,
            impact_score: require(factor, "impact_score")?,
            rfi_adjustment: require(factor, "rfi_adjustment")?,
        })
    }
}

/// Train impact for one country.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainFactor {
    /// Source factor.
    pub factor_id: FactorId,
    /// kg CO2eq per passenger-km.
    pub impact_score: f64,
}

impl TryFrom<&Factor> for TrainFactor {
    type Error = FactorDecodeError;

    fn try_from(factor: &Factor) -> Result<Self, Self::Error> {
        expect_type(factor, EmissionType::Train)?;
        Ok(Self {
            factor_id: factor.id,
            impact_score: require(factor, "impact_score")?,
        })
    }
}

/// Annual per-FTE emissions for the four headcount subcategories.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadcountFactor {
    /// Source factor.
    pub factor_id: FactorId,
    /// kg CO2eq per FTE per year from food.
    pub food_kg: f64,
    /// kg CO2eq per FTE per year from waste.
    pub waste_kg: f64,
    /// kg CO2eq per FTE per year from commuting.
    pub transport_kg: f64,
    /// kg CO2eq per FTE per year from grey energy.
    pub grey_energy_kg: f64,
}

impl HeadcountFactor {
    /// Per-FTE value for one headcount subcategory, or `None` if the type
    /// is not a headcount subcategory.
    #[must_use]
    pub const fn kg_per_fte(&self, subcategory: EmissionType) -> Option<f64> {
        match subcategory {
            EmissionType::Food => Some(self.food_kg),
            EmissionType::Waste => Some(self.waste_kg),
            EmissionType::Transport => Some(self.transport_kg),
            EmissionType::GreyEnergy => Some(self.grey_energy_kg),
            _ => None,
        }
    }
}

impl TryFrom<&Factor> for HeadcountFactor {
    type Error = FactorDecodeError;

    fn try_from(factor: &Factor) -> Result<Self, Self::Error> {
        expect_type(factor, EmissionType::Headcount)?;
        Ok(Self {
            factor_id: factor.id,
            food_kg: require(factor, "food_kg")?,
            waste_kg: require(factor, "waste_kg")?,
            transport_kg: require(factor, "transport_kg")?,
            grey_energy_kg: require(factor, "grey_energy_kg")?,
        })
    }
}

/// Spend-based factor for external cloud services.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpendFactor {
    /// Source factor.
    pub factor_id: FactorId,
    /// kg CO2eq per unit of currency spent.
    pub kg_co2eq_per_currency_unit: f64,
}

impl TryFrom<&Factor> for SpendFactor {
    type Error = FactorDecodeError;

    fn try_from(factor: &Factor) -> Result<Self, Self::Error> {
        expect_type(factor, EmissionType::ExternalCloud)?;
        Ok(Self {
            factor_id: factor.id,
            kg_co2eq_per_currency_unit: require(factor, "kg_co2eq_per_currency_unit")?,
        })
    }
}

/// Usage-count factor for external AI providers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageFactor {
    /// Source factor.
    pub factor_id: FactorId,
    /// Grams CO2eq per request.
    pub g_co2eq_per_unit: f64,
}

impl TryFrom<&Factor> for UsageFactor {
    type Error = FactorDecodeError;

    fn try_from(factor: &Factor) -> Result<Self, Self::Error> {
        expect_type(factor, EmissionType::ExternalAi)?;
        Ok(Self {
            factor_id: factor.id,
            g_co2eq_per_unit: require(factor, "g_co2eq_per_unit")?,
        })
    }
}
