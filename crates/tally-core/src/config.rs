//! Detection configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/tally/config/tally.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Keys missing from an override file take their built-in default, so an
//! override only needs the settings it changes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/tally.toml");

/// How the grouper partitions matching transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupingStrategy {
    /// Single forward pass; a charge joins the first group whose seed it matches
    #[default]
    Greedy,
    /// Connected components of the match relation (union-find)
    Connected,
}

impl GroupingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greedy => "greedy",
            Self::Connected => "connected",
        }
    }
}

impl std::str::FromStr for GroupingStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "greedy" => Ok(Self::Greedy),
            "connected" | "union_find" | "union-find" => Ok(Self::Connected),
            _ => Err(format!("Unknown grouping strategy: {}", s)),
        }
    }
}

/// Settings for eligibility, normalization and matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub lookback_months: u32,
    pub key_length: usize,
    pub min_key_length: usize,
    pub amount_tolerance: f64,
    pub grouping: GroupingStrategy,
    pub eligible_categories: Vec<String>,
    pub processor_prefixes: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            lookback_months: 12,
            key_length: 10,
            min_key_length: 3,
            amount_tolerance: 0.10,
            grouping: GroupingStrategy::Greedy,
            eligible_categories: vec!["Subscriptions".into(), "Suscripciones".into()],
            processor_prefixes: [
                "paypal",
                "mercadopago",
                "mercado pago",
                "dlocal",
                "dlo",
                "conekta",
                "openpay",
                "clip",
                "sq",
                "pp",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Day-gap bands for the frequency classifier (inclusive on both ends)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyConfig {
    pub monthly_min_days: f64,
    pub monthly_max_days: f64,
    pub annual_min_days: f64,
    pub annual_max_days: f64,
}

impl Default for FrequencyConfig {
    fn default() -> Self {
        Self {
            monthly_min_days: 25.0,
            monthly_max_days: 35.0,
            annual_min_days: 350.0,
            annual_max_days: 380.0,
        }
    }
}

/// Service naming settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    pub use_ai: bool,
    pub fallback_name_len: usize,
    /// Extra context passed to the AI prompt (bank, country, language)
    pub prompt_hint: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            use_ai: true,
            fallback_name_len: 15,
            prompt_hint: String::new(),
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    pub detection: DetectionConfig,
    pub frequency: FrequencyConfig,
    pub naming: NamingConfig,
}

impl TallyConfig {
    /// Load config from the default override location, or the embedded defaults
    pub fn load() -> Result<Self> {
        match override_path() {
            Some(path) => Self::load_from(&path),
            None => Self::from_toml(DEFAULT_CONFIG),
        }
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate config from TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: TallyConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML (for `tally config`)
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    fn validate(&self) -> Result<()> {
        let d = &self.detection;
        if d.key_length == 0 {
            return Err(Error::Config("detection.key_length must be positive".into()));
        }
        if !(0.0..1.0).contains(&d.amount_tolerance) {
            return Err(Error::Config(format!(
                "detection.amount_tolerance must be in [0, 1), got {}",
                d.amount_tolerance
            )));
        }
        if d.lookback_months == 0 {
            return Err(Error::Config(
                "detection.lookback_months must be positive".into(),
            ));
        }

        let f = &self.frequency;
        if f.monthly_min_days > f.monthly_max_days || f.annual_min_days > f.annual_max_days {
            return Err(Error::Config(
                "frequency bands must have min <= max".into(),
            ));
        }
        if f.monthly_max_days >= f.annual_min_days {
            return Err(Error::Config(
                "frequency.monthly band must lie below the annual band".into(),
            ));
        }
        Ok(())
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("config").join("tally.toml"))
}

/// The override file, if one exists
pub fn override_path() -> Option<PathBuf> {
    default_config_path().filter(|p| p.exists())
}
