//! Read-only data snapshot
//!
//! Transactions and categories live in the hosted backend. The data-access
//! layer exports them as a single JSON document, which is everything the
//! detectors need for one pass:
//!
//! ```json
//! { "transactions": [ ... ], "categories": [ ... ] }
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Category, Transaction};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Snapshot {
    pub fn new(transactions: Vec<Transaction>, categories: Vec<Category>) -> Self {
        Self {
            transactions,
            categories,
        }
    }

    /// Load a snapshot from a JSON file
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::NotFound(format!("Snapshot {}: {}", path.display(), e))
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load a snapshot from any JSON reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_reader(reader)?;
        snapshot.validate()?;
        debug!(
            transactions = snapshot.transactions.len(),
            categories = snapshot.categories.len(),
            "Loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Reject amounts that can't take part in arithmetic
    fn validate(&self) -> Result<()> {
        for tx in &self.transactions {
            if !tx.expense_amount.is_finite() || !tx.income_amount.is_finite() {
                return Err(Error::InvalidData(format!(
                    "Transaction {} has a non-finite amount",
                    tx.id
                )));
            }
            if tx.expense_amount < 0.0 || tx.income_amount < 0.0 {
                return Err(Error::InvalidData(format!(
                    "Transaction {} has a negative amount",
                    tx.id
                )));
            }
        }
        Ok(())
    }

    /// Categories indexed by id
    pub fn category_index(&self) -> HashMap<&str, &Category> {
        self.categories.iter().map(|c| (c.id.as_str(), c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "transactions": [
            {"id": "t1", "account_id": "a1", "date": "2024-01-15", "memo": "SPOTIFY",
             "expense_amount": 115.0, "income_amount": 0.0, "category_id": "c1", "currency": "MXN"}
        ],
        "categories": [
            {"id": "c1", "category": "Suscripciones", "subcategory": "Musica", "type": "expense"}
        ]
    }"#;

    #[test]
    fn test_from_reader() {
        let snapshot = Snapshot::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(snapshot.transactions.len(), 1);
        assert_eq!(snapshot.categories.len(), 1);
        assert!(snapshot.category_index().contains_key("c1"));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let snapshot = Snapshot::from_path(file.path()).unwrap();
        assert_eq!(snapshot.transactions[0].memo, "SPOTIFY");
    }

    #[test]
    fn test_missing_file() {
        let result = Snapshot::from_path(Path::new("/nonexistent/snapshot.json"));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_malformed_record_rejected() {
        let json = r#"{"transactions": [{"id": "t1", "date": "not-a-date"}]}"#;
        assert!(matches!(
            Snapshot::from_reader(json.as_bytes()),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let json = r#"{"transactions": [
            {"id": "t1", "account_id": "a1", "date": "2024-01-15", "memo": "X",
             "expense_amount": -5.0, "category_id": "c1"}
        ]}"#;
        assert!(matches!(
            Snapshot::from_reader(json.as_bytes()),
            Err(Error::InvalidData(_))
        ));
    }
}
