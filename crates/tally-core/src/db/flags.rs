//! Active/inactive flags for tracked annual payments
//!
//! Stored as the set of inactive category ids; anything not in the set is
//! active, so new annual categories start out active.

use std::collections::HashSet;
use std::sync::RwLock;

use rusqlite::params;
use tracing::debug;

use super::Database;
use crate::error::{Error, Result};

/// A persisted set of inactive category ids behind a get/toggle interface
pub trait FlagStore: Send + Sync {
    /// All category ids currently marked inactive
    fn inactive_ids(&self) -> Result<HashSet<String>>;

    fn is_active(&self, category_id: &str) -> Result<bool> {
        Ok(!self.inactive_ids()?.contains(category_id))
    }

    fn set_active(&self, category_id: &str, active: bool) -> Result<()>;

    /// Flip the flag, returning the new state (true = active)
    fn toggle(&self, category_id: &str) -> Result<bool> {
        let active = !self.is_active(category_id)?;
        self.set_active(category_id, active)?;
        Ok(active)
    }
}

impl FlagStore for Database {
    fn inactive_ids(&self) -> Result<HashSet<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT category_id FROM inactive_annual_payments")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    fn is_active(&self, category_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let inactive: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM inactive_annual_payments WHERE category_id = ?)",
            params![category_id],
            |row| row.get(0),
        )?;
        Ok(!inactive)
    }

    fn set_active(&self, category_id: &str, active: bool) -> Result<()> {
        let conn = self.conn()?;
        if active {
            conn.execute(
                "DELETE FROM inactive_annual_payments WHERE category_id = ?",
                params![category_id],
            )?;
        } else {
            conn.execute(
                "INSERT OR REPLACE INTO inactive_annual_payments (category_id, updated_at)
                 VALUES (?, CURRENT_TIMESTAMP)",
                params![category_id],
            )?;
        }
        debug!(category_id, active, "Updated annual payment flag");
        Ok(())
    }
}

/// Non-persistent flag store (for tests and one-off runs)
#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    inactive: RwLock<HashSet<String>>,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inactive<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inactive: RwLock::new(ids.into_iter().map(Into::into).collect()),
        }
    }
}

impl FlagStore for MemoryFlagStore {
    fn inactive_ids(&self) -> Result<HashSet<String>> {
        self.inactive
            .read()
            .map(|set| set.clone())
            .map_err(|_| Error::InvalidData("Failed to acquire flag store lock".into()))
    }

    fn set_active(&self, category_id: &str, active: bool) -> Result<()> {
        let mut set = self
            .inactive
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire flag store lock".into()))?;
        if active {
            set.remove(category_id);
        } else {
            set.insert(category_id.to_string());
        }
        Ok(())
    }
}
