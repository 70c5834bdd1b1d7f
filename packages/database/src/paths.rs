//! Canonical file paths for the `DuckDB` data directory.

use std::path::{Path, PathBuf};

/// Overrides the database file location.
pub const DB_PATH_ENV: &str = "FOOTPRINT_DB";

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`. Falls back to the
/// current directory when the crate is built outside the workspace layout.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the database path: `$FOOTPRINT_DB` if set, otherwise
/// `data/footprint.duckdb`.
#[must_use]
pub fn default_db_path() -> PathBuf {
    std::env::var_os(DB_PATH_ENV)
        .filter(|p| !p.is_empty())
        .map_or_else(|| data_dir().join("footprint.duckdb"), PathBuf::from)
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
