//! Specificity-ordered factor resolution.
//!
//! A [`FactorQuery`] is an ordered list of classification keys. Each key is
//! either *required* (a candidate must carry it with the same value) or
//! *refining* (matching it makes a candidate more specific; a candidate
//! without it is still usable as a fallback). A candidate that carries a
//! queried key with a different value never matches.
//!
//! Among matching candidates the one matching the most query keys wins;
//! remaining ties go to the candidate with the fewest classification keys
//! beyond the query. Anything still tied is an ambiguity, handled per
//! [`AmbiguityPolicy`].

use chrono::{DateTime, Utc};
use footprint_factor_models::{
    ClassValue, Classification, EmissionType, Factor, FactorId, HaulCategory,
};
use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogError, FactorCatalog};

/// Catch-all country used when no country-specific factor exists.
const REST_OF_WORLD: &str = "RoW";

/// What to do when several equally specific factors match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Use the first match in catalog (id) order, log a warning and report
    /// the other candidates on the [`Resolution`].
    #[default]
    FirstMatch,
    /// Refuse to pick: log an error and resolve to nothing.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyRole {
    Required,
    Refining,
}

#[derive(Debug, Clone, PartialEq)]
struct QueryKey {
    key: String,
    value: ClassValue,
    role: KeyRole,
}

/// A classification query against one emission type.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorQuery {
    emission_type: EmissionType,
    keys: Vec<QueryKey>,
    as_of: Option<DateTime<Utc>>,
    ambiguity: AmbiguityPolicy,
}

impl FactorQuery {
    /// Creates an empty query that matches any current factor of the type.
    #[must_use]
    pub const fn new(emission_type: EmissionType) -> Self {
        Self {
            emission_type,
            keys: Vec::new(),
            as_of: None,
            ambiguity: AmbiguityPolicy::FirstMatch,
        }
    }

    /// Builds a query from a raw classification. Every key is refining, so
    /// the most specific non-conflicting candidate wins.
    #[must_use]
    pub fn from_classification(emission_type: EmissionType, classification: &Classification) -> Self {
        classification
            .iter()
            .fold(Self::new(emission_type), |query, (key, value)| {
                query.refine(key, value.clone())
            })
    }

    /// Adds a key every candidate must match exactly.
    #[must_use]
    pub fn require(mut self, key: &str, value: impl Into<ClassValue>) -> Self {
        self.push(key, value.into(), KeyRole::Required);
        self
    }

    /// Adds a key that makes a candidate more specific when matched.
    #[must_use]
    pub fn refine(mut self, key: &str, value: impl Into<ClassValue>) -> Self {
        self.push(key, value.into(), KeyRole::Refining);
        self
    }

    /// Adds a refining key if a value is given.
    #[must_use]
    pub fn refine_opt(self, key: &str, value: Option<&str>) -> Self {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => self.refine(key, v),
            None => self,
        }
    }

    fn push(&mut self, key: &str, value: ClassValue, role: KeyRole) {
        self.keys.retain(|k| k.key != key);
        self.keys.push(QueryKey {
            key: key.to_string(),
            value,
            role,
        });
    }

    /// Resolves against the versions valid at `as_of` instead of the
    /// current ones.
    #[must_use]
    pub const fn as_of(mut self, as_of: Option<DateTime<Utc>>) -> Self {
        self.as_of = as_of;
        self
    }

    /// Sets the ambiguity policy.
    #[must_use]
    pub const fn on_ambiguity(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity = policy;
        self
    }

    /// Emission type being queried.
    #[must_use]
    pub const fn emission_type(&self) -> EmissionType {
        self.emission_type
    }

    /// Point in time being queried, `None` for current factors.
    #[must_use]
    pub const fn point_in_time(&self) -> Option<DateTime<Utc>> {
        self.as_of
    }

    /// The queried keys as a classification, for messages and snapshots.
    #[must_use]
    pub fn classification(&self) -> Classification {
        self.keys
            .iter()
            .fold(Classification::new(), |c, k| c.with(&k.key, k.value.clone()))
    }

    // ── Canonical queries ────────────────────────────────────────────

    /// Power profile of an equipment class. `submodule` and `class` are
    /// required; `sub_class` is refining, so a class-level factor (no
    /// `sub_class`) is used when no exact sub-class factor exists.
    #[must_use]
    pub fn equipment(submodule: &str, class: &str, sub_class: Option<&str>) -> Self {
        Self::new(EmissionType::Equipment)
            .require("submodule", submodule)
            .require("class", class)
            .refine_opt("sub_class", sub_class)
    }

    /// Grid intensity for a country.
    #[must_use]
    pub fn electricity_mix(country_code: &str) -> Self {
        Self::new(EmissionType::ElectricityMix).require("country_code", normalize_country(country_code))
    }

    /// Flight impact for a haul category. Several matches for one category
    /// are a catalog error, so this query never picks among them.
    #[must_use]
    pub fn flight(haul: HaulCategory) -> Self {
        Self::new(EmissionType::Flight)
            .require("haul_category", haul.as_ref())
            .on_ambiguity(AmbiguityPolicy::Reject)
    }

    /// Train impact for a country.
    #[must_use]
    pub fn train(country_code: &str) -> Self {
        Self::new(EmissionType::Train).require("country_code", normalize_country(country_code))
    }

    /// Per-FTE headcount profile, optionally for a staff category.
    #[must_use]
    pub fn headcount(category: Option<&str>) -> Self {
        Self::new(EmissionType::Headcount).refine_opt("category", category)
    }

    /// Spend factor for an external cloud provider.
    #[must_use]
    pub fn external_cloud(provider: &str, service: Option<&str>) -> Self {
        Self::new(EmissionType::ExternalCloud)
            .require("provider", provider)
            .refine_opt("service", service)
    }

    /// Usage factor for an external AI provider.
    #[must_use]
    pub fn external_ai(provider: &str, use_case: Option<&str>) -> Self {
        Self::new(EmissionType::ExternalAi)
            .require("provider", provider)
            .refine_opt("use_case", use_case)
    }

    /// The same query with the country replaced by the catch-all bucket,
    /// or `None` if it already targets the catch-all.
    #[must_use]
    pub fn rest_of_world(&self) -> Option<Self> {
        let current = self.keys.iter().find(|k| k.key == "country_code")?;
        if current.value.as_str() == Some(REST_OF_WORLD) {
            return None;
        }
        let mut fallback = self.clone();
        fallback.push("country_code", ClassValue::from(REST_OF_WORLD), current.role);
        Some(fallback)
    }
}

fn normalize_country(code: &str) -> String {
    let code = code.trim();
    if code.eq_ignore_ascii_case(REST_OF_WORLD) {
        REST_OF_WORLD.to_string()
    } else {
        code.to_ascii_uppercase()
    }
}

/// The factor chosen for a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The chosen factor.
    pub factor: Factor,
    /// How many query keys the factor matched.
    pub matched_keys: usize,
    /// Whether the factor is a fallback (matched fewer keys than queried).
    pub fallback: bool,
    /// Other equally specific candidates, when the pick was ambiguous.
    pub ambiguous_with: Vec<FactorId>,
}

impl Resolution {
    /// Whether other candidates were equally specific.
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        !self.ambiguous_with.is_empty()
    }
}

/// Specificity of a matching candidate: more matched keys first, then
/// fewer unqueried keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rank {
    matched: usize,
    extra: usize,
}

impl Rank {
    const fn beats(self, other: Self) -> bool {
        self.matched > other.matched || (self.matched == other.matched && self.extra < other.extra)
    }
}

fn rank(query: &FactorQuery, factor: &Factor) -> Option<Rank> {
    if factor.emission_type != query.emission_type {
        return None;
    }
    let in_window = query
        .as_of
        .map_or_else(|| factor.is_current(), |t| factor.is_valid_at(t));
    if !in_window {
        return None;
    }

    let mut matched = 0;
    for key in &query.keys {
        match factor.classification.get(&key.key) {
            Some(value) if *value == key.value => matched += 1,
            Some(_) => return None,
            None if key.role == KeyRole::Required => return None,
            None => {}
        }
    }

    Some(Rank {
        matched,
        extra: factor.classification.len() - matched,
    })
}

/// Picks at most one factor for `query` among `candidates`.
///
/// Candidates are expected in catalog (ascending id) order; ties under
/// [`AmbiguityPolicy::FirstMatch`] go to the earliest one.
#[must_use]
pub fn resolve(query: &FactorQuery, candidates: &[Factor]) -> Option<Resolution> {
    let mut best: Option<Rank> = None;
    let mut tied: Vec<&Factor> = Vec::new();

    for factor in candidates {
        let Some(r) = rank(query, factor) else {
            continue;
        };
        match best {
            Some(b) if b.beats(r) => {}
            Some(b) if b == r => tied.push(factor),
            _ => {
                best = Some(r);
                tied.clear();
                tied.push(factor);
            }
        }
    }

    let best = best?;
    let (chosen, others) = tied.split_first()?;
    let ambiguous_with: Vec<FactorId> = others.iter().map(|f| f.id).collect();

    if !ambiguous_with.is_empty() {
        match query.ambiguity {
            AmbiguityPolicy::FirstMatch => log::warn!(
                "Ambiguous {} factor match for {}: using factor {}, also matched {ambiguous_with:?}",
                query.emission_type,
                query.classification(),
                chosen.id,
            ),
            AmbiguityPolicy::Reject => {
                log::error!(
                    "Catalog data error: {} {} factors match {} equally ({:?}); refusing to pick one",
                    tied.len(),
                    query.emission_type,
                    query.classification(),
                    tied.iter().map(|f| f.id).collect::<Vec<_>>(),
                );
                return None;
            }
        }
    }

    let fallback = best.matched < query.keys.len();
    if fallback {
        log::debug!(
            "Resolved {} {} to fallback factor {} ({} of {} keys matched)",
            query.emission_type,
            query.classification(),
            chosen.id,
            best.matched,
            query.keys.len(),
        );
    }

    Some(Resolution {
        factor: (*chosen).clone(),
        matched_keys: best.matched,
        fallback,
        ambiguous_with,
    })
}

/// Resolves a query against a catalog. Country-keyed queries (trains,
/// electricity mix) fall back to the catch-all bucket automatically.
///
/// # Errors
///
/// Returns [`CatalogError`] if the catalog cannot be read. An unmatched
/// query is `Ok(None)`, not an error.
pub fn resolve_factor(
    catalog: &dyn FactorCatalog,
    query: &FactorQuery,
) -> Result<Option<Resolution>, CatalogError> {
    let candidates = catalog.factors(query.emission_type)?;

    if let Some(resolution) = resolve(query, &candidates) {
        return Ok(Some(resolution));
    }

    let fallback = query.rest_of_world();
    let resolution = fallback.as_ref().and_then(|q| resolve(q, &candidates));
    if resolution.is_some() {
        log::debug!(
            "No {} factor for {}; using {REST_OF_WORLD} factor",
            query.emission_type,
            query.classification()
        );
    }
    Ok(resolution.map(|mut r| {
        r.fallback = true;
        r
    }))
}
