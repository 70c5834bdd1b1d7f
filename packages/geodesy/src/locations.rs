//! Reference travel endpoints embedded at compile time.
//!
//! `data/locations.toml` is baked into the binary via [`include_str!`] and
//! used to seed the location directory.

use footprint_factor_models::Location;
use serde::Deserialize;

/// Number of embedded reference locations. Enforced by a test.
#[cfg(test)]
const EXPECTED_LOCATION_COUNT: usize = 16;

const LOCATIONS_TOML: &str = include_str!("../data/locations.toml");

#[derive(Deserialize)]
struct LocationFile {
    locations: Vec<Location>,
}

/// Returns all embedded reference locations.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed. Since it is a compile-time
/// constant, a parse failure indicates a development error and is caught
/// by the tests below.
#[must_use]
pub fn reference_locations() -> Vec<Location> {
    toml::from_str::<LocationFile>(LOCATIONS_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse embedded locations.toml: {e}"))
        .locations
}
