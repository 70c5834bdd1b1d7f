//! Travel reference data: endpoints, transport modes, haul buckets and
//! cabin classes.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Primary key of a row in the location directory.
pub type LocationId = i64;

/// Mode of a professional trip.
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
#[strum(ascii_case_insensitive)]
pub enum TransportMode {
    /// Air travel. Accepts both `plane` and `flight`.
    #[serde(alias = "flight")]
    #[strum(to_string = "plane", serialize = "flight")]
    Plane,
    /// Rail travel.
    #[strum(to_string = "train")]
    Train,
}

impl TransportMode {
    /// Parses a transport mode as received from callers.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransportModeError`] for anything other than
    /// `plane`, `flight` or `train` (case-insensitive).
    pub fn parse(value: &str) -> Result<Self, InvalidTransportModeError> {
        value
            .trim()
            .parse()
            .map_err(|_| InvalidTransportModeError {
                value: value.to_string(),
            })
    }
}

/// Error returned when a transport mode string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransportModeError {
    /// The rejected input.
    pub value: String,
}

impl std::fmt::Display for InvalidTransportModeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid transport mode {:?}: expected plane, flight or train",
            self.value
        )
    }
}

impl std::error::Error for InvalidTransportModeError {}

/// Coarse flight-distance bucket used to select a flight factor.
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
pub enum HaulCategory {
    /// Under 800 km.
    VeryShortHaul,
    /// 800 km up to 1500 km.
    ShortHaul,
    /// 1500 km up to 4000 km.
    MediumHaul,
    /// 4000 km and beyond.
    LongHaul,
}

/// Travel class. Recorded for audit; current formulas do not vary by class.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CabinClass {
    /// Flight economy.
    Economy,
    /// Flight premium economy.
    PremiumEconomy,
    /// Flight business.
    Business,
    /// Flight first.
    First,
    /// Train first class.
    #[serde(rename = "class_1")]
    #[strum(serialize = "class_1")]
    Class1,
    /// Train second class.
    #[serde(rename = "class_2")]
    #[strum(serialize = "class_2")]
    Class2,
}

/// A travel endpoint (airport or station).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Database primary key.
    pub id: LocationId,
    /// Whether this is an airport or a station.
    pub transport_mode: TransportMode,
    /// Human-readable name.
    pub name: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// IATA airport code, for airports.
    #[serde(default)]
    pub iata_code: Option<String>,
    /// ISO 3166-1 alpha-2 country code, if known.
    #[serde(default)]
    pub country_code: Option<String>,
}

impl Location {
    /// Country code with blank values treated as unknown.
    #[must_use]
    pub fn country(&self) -> Option<&str> {
        self.country_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}
