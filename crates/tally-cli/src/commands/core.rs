//! Shared command utilities
//!
//! - `open_db` - Open the flag database
//! - `load_snapshot` - Read a snapshot file
//! - `load_config` - Resolve the effective config
//! - `parse_as_of` - Reference date from `--as-of`, or today

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tally_core::{config::TallyConfig, db::Database, snapshot::Snapshot};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    Snapshot::from_path(path)
        .with_context(|| format!("Failed to load snapshot {}", path.display()))
}

pub fn load_config() -> Result<TallyConfig> {
    TallyConfig::load().context("Failed to load config")
}

pub fn parse_as_of(as_of: Option<&str>) -> Result<NaiveDate> {
    match as_of {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .context("Invalid --as-of format (use YYYY-MM-DD)"),
        None => Ok(chrono::Local::now().date_naive()),
    }
}
