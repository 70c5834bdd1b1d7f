//! Calculation constants.
//!
//! Defaults cover the common case. A TOML file can override any field and
//! the `WEEKS_PER_YEAR`, `HOURS_PER_WEEK` and `DEFAULT_KG_CO2EQ_PER_KWH`
//! environment variables override the file.

use std::path::{Path, PathBuf};

use footprint_factor::AmbiguityPolicy;
use footprint_geodesy::DOMESTIC_COUNTRY_CODE;
use serde::{Deserialize, Serialize};

pub const WEEKS_PER_YEAR_ENV: &str = "WEEKS_PER_YEAR";
pub const HOURS_PER_WEEK_ENV: &str = "HOURS_PER_WEEK";
pub const DEFAULT_INTENSITY_ENV: &str = "DEFAULT_KG_CO2EQ_PER_KWH";

/// Errors loading a [`CalcConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value {value:?} for {name}: expected a number")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Invalid config: {message}")]
    Invalid { message: String },
}

/// Constants used by the formulas and the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalcConfig {
    /// Weeks of equipment use per year.
    pub weeks_per_year: f64,
    /// Hours in a week, used to convert percentage usage.
    pub hours_per_week: f64,
    /// Grid intensity used when no electricity mix factor matches.
    pub default_kg_co2eq_per_kwh: f64,
    /// Grid country for equipment without one, and the home country for
    /// train classification.
    pub domestic_country_code: String,
    /// How equally specific factor matches are handled.
    pub ambiguity_policy: AmbiguityPolicy,
}

impl Default for CalcConfig {
    fn default() -> Self {
        Self {
            weeks_per_year: 52.0,
            hours_per_week: 168.0,
            default_kg_co2eq_per_kwh: 0.125,
            domestic_country_code: DOMESTIC_COUNTRY_CODE.to_string(),
            ambiguity_policy: AmbiguityPolicy::default(),
        }
    }
}

impl CalcConfig {
    /// Parses a config file's contents. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the TOML is malformed or a value is out
    /// of range.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the config: defaults, then `path` if given, then environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// environment override is not a number.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                log::debug!("Loaded calculation config from {}", path.display());
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };
        config.with_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides looked up by environment variable name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if an override is not a number,
    /// or [`ConfigError::Invalid`] if the result is out of range.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let number = |name: &'static str| -> Result<Option<f64>, ConfigError> {
            lookup(name)
                .map(|value| {
                    value
                        .trim()
                        .parse::<f64>()
                        .map_err(|_| ConfigError::InvalidEnv { name, value })
                })
                .transpose()
        };

        if let Some(weeks) = number(WEEKS_PER_YEAR_ENV)? {
            self.weeks_per_year = weeks;
        }
        if let Some(hours) = number(HOURS_PER_WEEK_ENV)? {
            self.hours_per_week = hours;
        }
        if let Some(intensity) = number(DEFAULT_INTENSITY_ENV)? {
            self.default_kg_co2eq_per_kwh = intensity;
        }

        self.validate()?;
        Ok(self)
    }

    /// Checks that every constant is finite and in range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("weeks_per_year", self.weeks_per_year),
            ("hours_per_week", self.hours_per_week),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid {
                    message: format!("{name} must be a positive number, got {value}"),
                });
            }
        }
        if !self.default_kg_co2eq_per_kwh.is_finite() || self.default_kg_co2eq_per_kwh < 0.0 {
            return Err(ConfigError::Invalid {
                message: format!(
                    "default_kg_co2eq_per_kwh must be a non-negative number, got {}",
                    self.default_kg_co2eq_per_kwh
                ),
            });
        }
        if self.domestic_country_code.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "domestic_country_code must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = CalcConfig::default();
        assert!((config.weeks_per_year - 52.0).abs() < f64::EPSILON);
        assert!((config.hours_per_week - 168.0).abs() < f64::EPSILON);
        assert!((config.default_kg_co2eq_per_kwh - 0.125).abs() < f64::EPSILON);
        assert_eq!(config.domestic_country_code, "CH");
        assert_eq!(config.ambiguity_policy, AmbiguityPolicy::FirstMatch);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = CalcConfig::from_toml_str(
            r#"
            weeks_per_year = 47
            ambiguity_policy = "reject"
            "#,
        )
        .unwrap();
        assert!((config.weeks_per_year - 47.0).abs() < f64::EPSILON);
        assert!((config.hours_per_week - 168.0).abs() < f64::EPSILON);
        assert_eq!(config.ambiguity_policy, AmbiguityPolicy::Reject);
    }

    #[test]
    fn env_overrides_file_values() {
        let config = CalcConfig::from_toml_str("weeks_per_year = 47")
            .unwrap()
            .with_overrides(env(&[
                (WEEKS_PER_YEAR_ENV, "50"),
                (DEFAULT_INTENSITY_ENV, " 0.3 "),
            ]))
            .unwrap();
        assert!((config.weeks_per_year - 50.0).abs() < f64::EPSILON);
        assert!((config.default_kg_co2eq_per_kwh - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn non_numeric_env_is_rejected() {
        let err = CalcConfig::default()
            .with_overrides(env(&[(HOURS_PER_WEEK_ENV, "a week")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                name: HOURS_PER_WEEK_ENV,
                ..
            }
        ));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(CalcConfig::from_toml_str("hours_per_week = 0").is_err());
        assert!(CalcConfig::from_toml_str("default_kg_co2eq_per_kwh = -1.0").is_err());
        assert!(CalcConfig::from_toml_str("domestic_country_code = ' '").is_err());
    }
}
