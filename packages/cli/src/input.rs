//! Parsing of the files and arguments the CLI accepts.

use std::path::Path;

use footprint_calc_models::ActivityRecord;
use footprint_factor::FactorDraft;
use footprint_factor_models::ClassValue;
use serde::Deserialize;

#[derive(Deserialize)]
struct ActivityFile {
    activities: Vec<ActivityRecord>,
}

#[derive(Deserialize)]
struct DraftFile {
    factor: FactorDraft,
}

/// Reads a TOML file of `[[activities]]` entries.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not describe valid
/// activity records.
pub fn read_activities(path: &Path) -> Result<Vec<ActivityRecord>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    parse_activities(&content)
}

fn parse_activities(content: &str) -> Result<Vec<ActivityRecord>, Box<dyn std::error::Error>> {
    Ok(toml::from_str::<ActivityFile>(content)?.activities)
}

/// Reads a TOML file with a single `[factor]` table.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a factor draft.
pub fn read_draft(path: &Path) -> Result<FactorDraft, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    parse_draft(&content)
}

fn parse_draft(content: &str) -> Result<FactorDraft, Box<dyn std::error::Error>> {
    Ok(toml::from_str::<DraftFile>(content)?.factor)
}

/// Parses a `key=value` classification argument. Values that read as
/// numbers are numeric.
pub fn parse_key_value(arg: &str) -> Result<(String, ClassValue), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {arg:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in {arg:?}"));
    }

    let value = value.trim();
    let value = value
        .parse::<f64>()
        .map_or_else(|_| ClassValue::Text(value.to_string()), ClassValue::Number);
    Ok((key.to_string(), value))
}
