#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Factor catalog access and factor resolution.
//!
//! The catalog itself lives behind the [`FactorCatalog`] trait (a `DuckDB`
//! implementation ships in `footprint_database`, an in-memory one in
//! [`memory`]). [`resolver`] picks the single applicable factor for a
//! classification query using specificity ordering and deterministic
//! tie-breaking.

pub mod catalog;
pub mod memory;
pub mod registry;
pub mod resolver;

pub use catalog::{
    CatalogError, FactorCatalog, FactorCatalogWriter, FactorDraft, LocationDirectory, Supersession,
};
pub use memory::MemoryCatalog;
pub use resolver::{AmbiguityPolicy, FactorQuery, Resolution, resolve, resolve_factor};
