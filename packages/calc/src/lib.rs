#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Emission calculation.
//!
//! [`EmissionEngine`] turns an activity record into emission results by
//! resolving the factors it needs and dispatching to the formula for its
//! record type. [`batch::recalculate_for_subjects`] runs the engine over
//! many subjects and persists results through an [`EmissionStore`], keeping
//! exactly one current row per subject and emission type.
//!
//! Missing reference data never produces a zero: the result carries
//! `kg_co2eq = None` and a reason, and it does not replace the previous
//! current value.

pub mod batch;
pub mod config;
pub mod engine;
pub mod formulas;
pub mod progress;
pub mod store;

use footprint_calc_models::SubjectId;
use footprint_factor::CatalogError;
use footprint_factor_models::InvalidTransportModeError;
use footprint_geodesy::GeodesyError;

pub use batch::{BatchOptions, BatchReport, recalculate_for_subjects};
pub use config::{CalcConfig, ConfigError};
pub use engine::{AmbiguousMatch, EmissionEngine, Evaluation};
pub use progress::{NullProgress, ProgressCallback};
pub use store::{
    ActivitySource, EmissionStore, MemoryEmissionStore, StoreError, StoredActivity,
};

/// Errors that can occur while calculating emissions.
#[derive(Debug, thiserror::Error)]
pub enum CalcError {
    /// A location has out-of-range coordinates.
    #[error(transparent)]
    Geodesy(#[from] GeodesyError),

    /// A trip names a transport mode other than plane or train.
    #[error(transparent)]
    InvalidTransportMode(#[from] InvalidTransportModeError),

    /// A stored record type has no formula.
    #[error("No formula for record type '{record_type}' (subject {subject_id})")]
    MissingFormula {
        /// Subject whose record could not be calculated.
        subject_id: SubjectId,
        /// The unrecognized record type.
        record_type: String,
    },

    /// No usable factor matched and the caller required one.
    #[error("Factor not resolved: {message}")]
    FactorNotResolved {
        /// What was missing, for operators.
        message: String,
    },

    /// Reference data could not be read.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Results or activities could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),
}
