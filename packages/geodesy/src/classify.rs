//! Mapping trips onto travel-factor classification keys.

use footprint_factor_models::HaulCategory;

/// Upper bound (exclusive) of [`HaulCategory::VeryShortHaul`], in km.
pub const VERY_SHORT_HAUL_MAX_KM: f64 = 800.0;
/// Upper bound (exclusive) of [`HaulCategory::ShortHaul`], in km.
pub const SHORT_HAUL_MAX_KM: f64 = 1500.0;
/// Upper bound (exclusive) of [`HaulCategory::MediumHaul`], in km.
pub const MEDIUM_HAUL_MAX_KM: f64 = 4000.0;

/// Country whose train factor applies to fully domestic trips.
pub const DOMESTIC_COUNTRY_CODE: &str = "CH";

/// Catch-all country bucket for train factors.
pub const REST_OF_WORLD: &str = "RoW";

/// Buckets a flight distance. Each bucket includes its lower bound.
#[must_use]
pub fn haul_category(distance_km: f64) -> HaulCategory {
    if distance_km < VERY_SHORT_HAUL_MAX_KM {
        HaulCategory::VeryShortHaul
    } else if distance_km < SHORT_HAUL_MAX_KM {
        HaulCategory::ShortHaul
    } else if distance_km < MEDIUM_HAUL_MAX_KM {
        HaulCategory::MediumHaul
    } else {
        HaulCategory::LongHaul
    }
}

fn known(code: Option<&str>) -> Option<&str> {
    code.map(str::trim).filter(|c| !c.is_empty())
}

/// Picks the single country whose train factor applies to a trip, using
/// [`DOMESTIC_COUNTRY_CODE`] as the home country.
///
/// See [`train_country_code_for`].
#[must_use]
pub fn train_country_code(origin: Option<&str>, destination: Option<&str>) -> String {
    train_country_code_for(DOMESTIC_COUNTRY_CODE, origin, destination)
}

/// Picks the single country whose train factor applies to a trip.
///
/// Fully domestic trips use the domestic code. Otherwise the foreign leg
/// decides, preferring the destination over the origin. Trips with no
/// known foreign endpoint (including domestic-to-unknown) fall back to
/// [`REST_OF_WORLD`]. Codes compare case-insensitively and are returned
/// upper-cased.
#[must_use]
pub fn train_country_code_for(
    domestic: &str,
    origin: Option<&str>,
    destination: Option<&str>,
) -> String {
    let origin = known(origin);
    let destination = known(destination);
    let is_domestic = |code: &str| code.eq_ignore_ascii_case(domestic);

    if origin.is_some_and(is_domestic) && destination.is_some_and(is_domestic) {
        return domestic.to_ascii_uppercase();
    }

    destination
        .filter(|c| !is_domestic(*c))
        .or_else(|| origin.filter(|c| !is_domestic(*c)))
        .map_or_else(|| REST_OF_WORLD.to_string(), str::to_ascii_uppercase)
}
