#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Travel distance and classification for professional travel.
//!
//! Computes great-circle distances between [`Location`]s with the
//! mode-specific adjustments used for emission accounting (a fixed detour
//! allowance for flights, a routing multiplier for trains), and classifies
//! trips into the keys used to select travel factors: a
//! [`HaulCategory`] for flights and a single lookup country for trains.
//!
//! Everything here is pure arithmetic. Coordinates are validated up front
//! and never clamped.
//!
//! [`Location`]: footprint_factor_models::Location
//! [`HaulCategory`]: footprint_factor_models::HaulCategory

pub mod classify;
pub mod distance;
pub mod locations;

pub use classify::{DOMESTIC_COUNTRY_CODE, REST_OF_WORLD, haul_category, train_country_code};
pub use distance::{
    EARTH_RADIUS_KM, FLIGHT_DETOUR_KM, TRAIN_ROUTING_FACTOR, flight_distance, haversine_distance,
    train_distance, travel_distance,
};

/// Errors raised by distance calculations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeodesyError {
    /// Latitude outside `[-90, 90]` or longitude outside `[-180, 180]`.
    #[error(
        "Invalid coordinate ({latitude}, {longitude}): latitude must be within [-90, 90] and longitude within [-180, 180]"
    )]
    InvalidCoordinate {
        /// Rejected latitude.
        latitude: f64,
        /// Rejected longitude.
        longitude: f64,
    },
}
