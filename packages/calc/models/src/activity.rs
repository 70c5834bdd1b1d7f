//! Activity records: the physical inputs behind each emission.

use footprint_factor_models::CabinClass;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::SubjectId;

/// Kind of activity record. Each variant maps to exactly one formula.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordType {
    Equipment,
    Travel,
    Headcount,
    ExternalCloud,
    ExternalAi,
}

impl RecordType {
    /// Returns all record types.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Equipment,
            Self::Travel,
            Self::Headcount,
            Self::ExternalCloud,
            Self::ExternalAi,
        ]
    }
}

/// Lifecycle status of a piece of equipment. Only in-service equipment
/// emits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EquipmentStatus {
    InService,
    InStock,
    Decommissioned,
}

impl EquipmentStatus {
    #[must_use]
    pub const fn is_in_service(self) -> bool {
        matches!(self, Self::InService)
    }
}

/// Weekly usage of a piece of equipment, either in hours or as a share of
/// the week.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", rename_all = "snake_case")]
pub enum Usage {
    Hours {
        active_hours_per_week: f64,
        passive_hours_per_week: f64,
    },
    Percent {
        active_percent: f64,
        passive_percent: f64,
    },
}

impl Usage {
    /// Converts to `(active, passive)` hours per week given the number of
    /// hours in a week.
    #[must_use]
    pub fn hours_per_week(self, hours_per_week: f64) -> (f64, f64) {
        match self {
            Self::Hours {
                active_hours_per_week,
                passive_hours_per_week,
            } => (active_hours_per_week, passive_hours_per_week),
            Self::Percent {
                active_percent,
                passive_percent,
            } => (
                active_percent / 100.0 * hours_per_week,
                passive_percent / 100.0 * hours_per_week,
            ),
        }
    }

    /// The raw percentages, when usage was given as a share of the week.
    #[must_use]
    pub const fn percentages(self) -> Option<(f64, f64)> {
        match self {
            Self::Hours { .. } => None,
            Self::Percent {
                active_percent,
                passive_percent,
            } => Some((active_percent, passive_percent)),
        }
    }
}

/// A piece of lab equipment and how much it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentUsage {
    /// Lab submodule, e.g. `it` or `scientific`.
    pub submodule: String,
    /// Equipment class used to pick the power factor.
    pub class: String,
    /// Optional sub-class narrowing the power factor.
    #[serde(default)]
    pub sub_class: Option<String>,
    /// Lifecycle status; only in-service equipment emits.
    pub status: EquipmentStatus,
    /// Weekly active and standby usage.
    pub usage: Usage,
    /// Overrides the catalog's active power when set.
    #[serde(default)]
    pub active_power_w: Option<f64>,
    /// Overrides the catalog's standby power when set.
    #[serde(default)]
    pub standby_power_w: Option<f64>,
    /// Grid the equipment draws from. Defaults to the domestic grid.
    #[serde(default)]
    pub country_code: Option<String>,
}

/// A trip between two reference locations.
///
/// `transport_mode` stays a string so an unknown mode surfaces as a
/// calculation error instead of a decode failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelRecord {
    /// Departure location id.
    pub origin_location_id: i64,
    /// Arrival location id.
    pub destination_location_id: i64,
    /// `plane` or `train`.
    pub transport_mode: String,
    /// Flight cabin class. Ignored for trains.
    #[serde(default)]
    pub cabin_class: Option<CabinClass>,
    /// Number of one-way trips.
    pub number_of_trips: u32,
}

/// Staff of a unit, in full-time equivalents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadcountRecord {
    /// Full-time equivalents.
    pub fte: f64,
    /// Population category, e.g. `student`. `None` uses the generic factor.
    #[serde(default)]
    pub category: Option<String>,
}

/// Spending on a cloud provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudSpendRecord {
    /// Cloud provider name, e.g. `aws`.
    pub provider: String,
    /// Optional service narrowing the factor.
    #[serde(default)]
    pub service: Option<String>,
    /// Amount spent, in currency units.
    pub spending_amount: f64,
}

/// Use of a generative AI service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiUsageRecord {
    /// AI provider name.
    pub provider: String,
    /// Optional use case narrowing the factor.
    #[serde(default)]
    pub use_case: Option<String>,
    /// Requests per user per working day.
    pub frequency_per_day: f64,
    /// Number of users.
    pub user_count: u32,
}

/// Typed inputs of an activity, tagged by record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record_type", content = "inputs", rename_all = "snake_case")]
pub enum ActivityPayload {
    Equipment(EquipmentUsage),
    Travel(TravelRecord),
    Headcount(HeadcountRecord),
    ExternalCloud(CloudSpendRecord),
    ExternalAi(AiUsageRecord),
}

impl ActivityPayload {
    #[must_use]
    pub const fn record_type(&self) -> RecordType {
        match self {
            Self::Equipment(_) => RecordType::Equipment,
            Self::Travel(_) => RecordType::Travel,
            Self::Headcount(_) => RecordType::Headcount,
            Self::ExternalCloud(_) => RecordType::ExternalCloud,
            Self::ExternalAi(_) => RecordType::ExternalAi,
        }
    }

    /// The untagged inputs as JSON, the shape stored next to a
    /// `record_type` column.
    ///
    /// # Errors
    ///
    /// Returns the serialization error, which only happens for non-finite
    /// numbers.
    pub fn inputs_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::Equipment(r) => serde_json::to_value(r),
            Self::Travel(r) => serde_json::to_value(r),
            Self::Headcount(r) => serde_json::to_value(r),
            Self::ExternalCloud(r) => serde_json::to_value(r),
            Self::ExternalAi(r) => serde_json::to_value(r),
        }
    }

    /// Decodes stored inputs given the stored record type string.
    ///
    /// # Errors
    ///
    /// * [`ActivityDecodeError::UnknownRecordType`] if no formula exists
    ///   for `record_type`
    /// * [`ActivityDecodeError::InvalidInputs`] if the JSON does not match
    ///   the record type's shape
    pub fn decode(record_type: &str, inputs: serde_json::Value) -> Result<Self, ActivityDecodeError> {
        let kind: RecordType =
            record_type
                .parse()
                .map_err(|_| ActivityDecodeError::UnknownRecordType {
                    record_type: record_type.to_string(),
                })?;

        let invalid = |e: serde_json::Error| ActivityDecodeError::InvalidInputs {
            record_type: kind,
            message: e.to_string(),
        };

        Ok(match kind {
            RecordType::Equipment => Self::Equipment(serde_json::from_value(inputs).map_err(invalid)?),
            RecordType::Travel => Self::Travel(serde_json::from_value(inputs).map_err(invalid)?),
            RecordType::Headcount => Self::Headcount(serde_json::from_value(inputs).map_err(invalid)?),
            RecordType::ExternalCloud => {
                Self::ExternalCloud(serde_json::from_value(inputs).map_err(invalid)?)
            }
            RecordType::ExternalAi => Self::ExternalAi(serde_json::from_value(inputs).map_err(invalid)?),
        })
    }
}

/// Error decoding a stored activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityDecodeError {
    UnknownRecordType {
        record_type: String,
    },
    InvalidInputs {
        record_type: RecordType,
        message: String,
    },
}

impl std::fmt::Display for ActivityDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownRecordType { record_type } => {
                write!(f, "No formula registered for record type '{record_type}'")
            }
            Self::InvalidInputs {
                record_type,
                message,
            } => write!(f, "Invalid {record_type} inputs: {message}"),
        }
    }
}

impl std::error::Error for ActivityDecodeError {}

/// One subject and its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Subject the activity belongs to.
    pub subject_id: SubjectId,
    /// Typed inputs.
    pub activity: ActivityPayload,
}

impl ActivityRecord {
    #[must_use]
    pub const fn record_type(&self) -> RecordType {
        self.activity.record_type()
    }
}
