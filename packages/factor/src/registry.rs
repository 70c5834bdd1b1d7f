//! Seed factor registry: loads the default catalog from embedded TOML.
//!
//! Each `.toml` file in `packages/factor/seeds/` is baked into the binary
//! at compile time via [`include_str!`]. Adding a seed file means creating
//! it and adding it to the list below.

use footprint_factor_models::Factor;
use serde::Deserialize;

/// Seed TOMLs embedded at compile time.
const SEED_TOMLS: &[(&str, &str)] = &[
    ("flight", include_str!("../seeds/flight.toml")),
    ("train", include_str!("../seeds/train.toml")),
    (
        "electricity_mix",
        include_str!("../seeds/electricity_mix.toml"),
    ),
    ("equipment", include_str!("../seeds/equipment.toml")),
    ("headcount", include_str!("../seeds/headcount.toml")),
    ("external", include_str!("../seeds/external.toml")),
];

/// Total number of seeded factors. Enforced by a test.
#[cfg(test)]
const EXPECTED_FACTOR_COUNT: usize = 28;

#[derive(Deserialize)]
struct SeedFile {
    factors: Vec<Factor>,
}

/// Parses a seed file of the form `[[factors]] ...`.
///
/// # Errors
///
/// Returns the TOML error if the content is malformed.
pub fn parse_seed_toml(content: &str) -> Result<Vec<Factor>, toml::de::Error> {
    Ok(toml::from_str::<SeedFile>(content)?.factors)
}

/// Returns all seed factors in ascending id order.
///
/// # Panics
///
/// Panics if any embedded TOML is malformed (a development error caught by
/// the tests below).
#[must_use]
pub fn seed_factors() -> Vec<Factor> {
    let mut factors: Vec<Factor> = SEED_TOMLS
        .iter()
        .flat_map(|(name, toml)| {
            parse_seed_toml(toml)
                .unwrap_or_else(|e| panic!("Failed to parse seed {name}.toml: {e}"))
        })
        .collect();
    factors.sort_by_key(|f| f.id);
    factors
}
