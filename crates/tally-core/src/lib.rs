//! Tally Core Library
//!
//! Shared functionality for the Tally recurring-charge tracker:
//! - Snapshot loading (transactions + categories as JSON)
//! - Recurring charge grouping and frequency classification
//! - Annual payment tracking with persisted active/inactive flags
//! - Service naming via pluggable local AI backends, with a keyword fallback
//! - Prompt library for customizable AI prompts
//! - Layered configuration for detection thresholds

pub mod ai;
pub mod annual;
pub mod config;
pub mod db;
pub mod detect;
pub mod error;
pub mod models;
pub mod naming;
pub mod prompts;
pub mod snapshot;

/// Test utilities including mock Ollama server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{AIBackend, AIClient, MockBackend, OllamaBackend, OpenAICompatibleBackend};
pub use annual::{track_annual_payments, AnnualSummary};
pub use config::{GroupingStrategy, TallyConfig};
pub use db::{Database, FlagStore, MemoryFlagStore};
pub use detect::{Matcher, Normalizer, SubscriptionDetector, SubscriptionSummary};
pub use error::{Error, Result};
pub use models::{
    Category, CategoryType, Frequency, Payment, ServiceClassification, ServiceGroup,
    TrackedAnnualPayment, Transaction,
};
pub use naming::{FallbackClassifier, KeywordClassifier, ServiceClassifier};
pub use prompts::{Prompt, PromptId, PromptLibrary};
pub use snapshot::Snapshot;
