#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Emission factor types shared across the footprint workspace.
//!
//! A [`Factor`] is a versioned reference value (power profile, emission
//! intensity, distance-based impact score, per-FTE consumption) tagged with
//! a free-form [`Classification`] and a validity window. Formulas never read
//! the open value map directly: resolved factors are decoded into the typed
//! payloads in [`payload`] first.

pub mod classification;
pub mod location;
pub mod payload;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use classification::{ClassValue, Classification, FactorValues};
pub use location::{
    CabinClass, HaulCategory, InvalidTransportModeError, Location, LocationId, TransportMode,
};

/// Primary key of a row in the factor catalog.
pub type FactorId = i64;

/// What kind of emission a factor contributes to.
///
/// The same enum tags emission result rows, so the headcount
/// subcategories ([`Self::Food`], [`Self::Waste`], [`Self::Transport`],
/// [`Self::GreyEnergy`]) appear here even though they are produced from a
/// single [`Self::Headcount`] factor.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmissionType {
    /// Power profile of a piece of equipment.
    Equipment,
    /// Emission intensity of the electricity grid (kg CO2eq per kWh).
    ElectricityMix,
    /// Flight impact score per passenger-km, selected by haul category.
    Flight,
    /// Train impact score per passenger-km, selected by country.
    Train,
    /// Per-FTE consumption profile covering the four headcount subcategories.
    Headcount,
    /// Headcount subcategory: food.
    Food,
    /// Headcount subcategory: waste.
    Waste,
    /// Headcount subcategory: commuting transport.
    Transport,
    /// Headcount subcategory: grey energy of buildings and goods.
    GreyEnergy,
    /// Spend-based external cloud compute.
    ExternalCloud,
    /// Usage-count-based external AI provider.
    ExternalAi,
}

impl EmissionType {
    /// The four subcategories every headcount calculation produces, in
    /// reporting order.
    pub const HEADCOUNT_SUBCATEGORIES: [Self; 4] =
        [Self::Food, Self::Waste, Self::Transport, Self::GreyEnergy];

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Equipment,
            Self::ElectricityMix,
            Self::Flight,
            Self::Train,
            Self::Headcount,
            Self::Food,
            Self::Waste,
            Self::Transport,
            Self::GreyEnergy,
            Self::ExternalCloud,
            Self::ExternalAi,
        ]
    }
}

/// A row of the factor catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    /// Database primary key.
    pub id: FactorId,
    /// Emission kind this factor applies to.
    pub emission_type: EmissionType,
    /// Free-form classification the resolver matches against.
    #[serde(default)]
    pub classification: Classification,
    /// Numeric payload; meaning depends on [`Self::emission_type`].
    #[serde(default)]
    pub values: FactorValues,
    /// Start of the validity window (inclusive).
    pub valid_from: DateTime<Utc>,
    /// End of the validity window (exclusive). `None` means current.
    #[serde(default)]
    pub valid_to: Option<DateTime<Utc>>,
}

impl Factor {
    /// Whether this is the active (non-superseded) version.
    #[must_use]
    pub const fn is_current(&self) -> bool {
        self.valid_to.is_none()
    }

    /// Whether `as_of` falls inside `[valid_from, valid_to)`.
    #[must_use]
    pub fn is_valid_at(&self, as_of: DateTime<Utc>) -> bool {
        self.valid_from <= as_of && self.valid_to.is_none_or(|to| as_of < to)
    }

    /// Whether `other` occupies the same catalog slot, i.e. superseding one
    /// must retire the other.
    #[must_use]
    pub fn shares_slot_with(&self, other: &Self) -> bool {
        self.emission_type == other.emission_type && self.classification == other.classification
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn factor(valid_to: Option<DateTime<Utc>>) -> Factor {
        Factor {
            id: 1,
            emission_type: EmissionType::Train,
            classification: Classification::new().with("country_code", "CH"),
            values: FactorValues::new().with("impact_score", 0.00979),
            valid_from: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            valid_to,
        }
    }

    #[test]
    fn validity_window_is_half_open() {
        let to = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let f = factor(Some(to));

        assert!(!f.is_current());
        assert!(f.is_valid_at(f.valid_from));
        assert!(f.is_valid_at(Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap()));
        assert!(!f.is_valid_at(to));
        assert!(!f.is_valid_at(Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap()));
    }

    #[test]
    fn open_ended_window_is_current() {
        let f = factor(None);
        assert!(f.is_current());
        assert!(f.is_valid_at(Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn emission_type_string_forms() {
        for ty in EmissionType::all() {
            let parsed: EmissionType = ty.as_ref().parse().unwrap();
            assert_eq!(parsed, *ty);
        }
        assert_eq!(EmissionType::GreyEnergy.as_ref(), "grey_energy");
        assert_eq!(
            serde_json::to_string(&EmissionType::ExternalAi).unwrap(),
            "\"external_ai\""
        );
    }

    #[test]
    fn deserializes_factor_from_toml() {
        let f: Factor = toml::from_str(
            r#"
            id = 7
            emission_type = "equipment"
            valid_from = "2024-01-01T00:00:00Z"

            [classification]
            submodule = "scientific"
            class = "Centrifugation"

            [values]
            active_power_w = 500.0
            standby_power_w = 50.0
            "#,
        )
        .unwrap();

        assert_eq!(f.id, 7);
        assert!(f.is_current());
        assert_eq!(f.values.get("standby_power_w"), Some(50.0));
        assert_eq!(
            f.classification.get("class"),
            Some(&ClassValue::from("Centrifugation"))
        );
    }

    #[test]
    fn slot_is_type_and_classification() {
        let a = factor(None);
        let mut b = factor(None);
        b.id = 2;
        assert!(a.shares_slot_with(&b));

        b.classification = Classification::new().with("country_code", "DE");
        assert!(!a.shares_slot_with(&b));
    }
}
