//! Integration tests for tally-core
//!
//! These tests exercise the full snapshot → detect → name workflow, and the
//! annual tracker against a real database.

use std::io::Write;

use chrono::NaiveDate;
use tally_core::{
    ai::{AIClient, MockBackend, OllamaBackend},
    annual::{track_annual_payments, visible, AnnualSummary},
    config::{GroupingStrategy, TallyConfig},
    db::{Database, FlagStore, MemoryFlagStore},
    detect::{SubscriptionDetector, SubscriptionSummary},
    models::Frequency,
    prompts::PromptLibrary,
    snapshot::Snapshot,
    test_utils::{MockBehavior, MockOllamaServer},
};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
}

/// Snapshot export with:
/// - Spotify: three monthly charges with rotating reference numbers
/// - Netflix: two monthly charges
/// - An Amazon marketplace charge billed on the same day and amount monthly
/// - A groceries expense (not eligible) and an income row (never an expense)
/// - One annual-tracking category (car insurance) with two yearly payments
fn snapshot_json() -> &'static str {
    r#"{
  "transactions": [
    {"id": "t1", "accountId": "acc-1", "date": "2024-01-15", "comments": "SPOTIFY*1234", "expenseAmount": 179.0, "incomeAmount": 0, "categoryId": "subs", "currency": "MXN"},
    {"id": "t2", "accountId": "acc-1", "date": "2024-02-15", "comments": "SPOTIFY*5678", "expenseAmount": 179.0, "incomeAmount": 0, "categoryId": "subs", "currency": "MXN"},
    {"id": "t3", "accountId": "acc-1", "date": "2024-03-15", "comments": "SPOTIFY*9012", "expenseAmount": 179.0, "incomeAmount": 0, "categoryId": "subs", "currency": "MXN"},
    {"id": "n1", "accountId": "acc-1", "date": "2024-02-20", "comments": "NETFLIX.COM", "expenseAmount": 219.0, "incomeAmount": 0, "categoryId": "subs", "currency": "MXN"},
    {"id": "n2", "accountId": "acc-1", "date": "2024-03-20", "comments": "NETFLIX.COM", "expenseAmount": 219.0, "incomeAmount": 0, "categoryId": "subs", "currency": "MXN"},
    {"id": "a1", "accountId": "acc-1", "date": "2024-02-03", "comments": "AMZN MKTP 8812", "expenseAmount": 99.0, "incomeAmount": 0, "categoryId": "subs", "currency": "MXN"},
    {"id": "a2", "accountId": "acc-1", "date": "2024-03-03", "comments": "AMZN MKTP 1044", "expenseAmount": 99.0, "incomeAmount": 0, "categoryId": "subs", "currency": "MXN"},
    {"id": "g1", "accountId": "acc-1", "date": "2024-03-10", "comments": "SUPERMERCADO", "expenseAmount": 850.0, "incomeAmount": 0, "categoryId": "food", "currency": "MXN"},
    {"id": "i1", "accountId": "acc-1", "date": "2024-03-01", "comments": "NOMINA", "expenseAmount": 0, "incomeAmount": 30000.0, "categoryId": "salary", "currency": "MXN"},
    {"id": "s1", "accountId": "acc-1", "date": "2023-06-01", "comments": "SEGURO AUTO", "expenseAmount": 8100.0, "incomeAmount": 0, "categoryId": "car-ins", "currency": "MXN"},
    {"id": "s2", "accountId": "acc-1", "date": "2024-06-01", "comments": "SEGURO AUTO", "expenseAmount": 8500.0, "incomeAmount": 0, "categoryId": "car-ins", "currency": "MXN"}
  ],
  "categories": [
    {"id": "subs", "category": "Subscriptions", "subcategory": "", "type": "expense"},
    {"id": "food", "category": "Food", "subcategory": "Groceries", "type": "expense"},
    {"id": "salary", "category": "Salary", "type": "income"},
    {"id": "car-ins", "category": "SEGURO", "subcategory": "Auto", "type": "expense", "annualTracking": true},
    {"id": "tax", "category": "Taxes", "subcategory": "Predial", "type": "expense", "annualTracking": true}
  ]
}"#
}

fn load_snapshot() -> Snapshot {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(snapshot_json().as_bytes())
        .expect("Failed to write snapshot");
    Snapshot::from_path(file.path()).expect("Failed to load snapshot")
}

fn names(groups: &[tally_core::ServiceGroup]) -> Vec<&str> {
    groups.iter().map(|g| g.service_name.as_str()).collect()
}

// =============================================================================
// Subscription Detection
// =============================================================================

#[test]
fn test_snapshot_to_services_offline() {
    let snapshot = load_snapshot();
    assert_eq!(snapshot.transactions.len(), 11);

    let detector = SubscriptionDetector::new(&TallyConfig::default()).expect("detector");
    let groups = detector.detect_offline(&snapshot, date("2024-03-31"));

    // Groceries and income never show up
    assert_eq!(names(&groups), vec!["AMZN", "Spotify", "Netflix"]);

    let spotify = &groups[1];
    assert_eq!(spotify.frequency, Frequency::Monthly);
    assert_eq!(spotify.last_payment, date("2024-03-15"));
    assert_eq!(spotify.next_payment, date("2024-04-15"));
    assert_eq!(spotify.total_paid, 537.0);
    assert_eq!(spotify.transactions.len(), 3);
    assert_eq!(spotify.transactions[0].id, "t3");
}

#[test]
fn test_groups_partition_eligible_transactions() {
    let snapshot = load_snapshot();
    let detector = SubscriptionDetector::new(&TallyConfig::default()).expect("detector");
    let groups = detector.detect_offline(&snapshot, date("2024-03-31"));

    let mut ids: Vec<&str> = groups
        .iter()
        .flat_map(|g| g.transactions.iter().map(|tx| tx.id.as_str()))
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["a1", "a2", "n1", "n2", "t1", "t2", "t3"]);
}

#[test]
fn test_detection_is_repeatable() {
    let snapshot = load_snapshot();
    let detector = SubscriptionDetector::new(&TallyConfig::default()).expect("detector");

    let first = detector.detect_offline(&snapshot, date("2024-03-31"));
    let second = detector.detect_offline(&snapshot, date("2024-03-31"));
    assert_eq!(first, second);
}

#[test]
fn test_lookback_window_excludes_old_charges() {
    let snapshot = load_snapshot();
    let detector = SubscriptionDetector::new(&TallyConfig::default()).expect("detector");

    // Nothing from early 2024 is inside a twelve-month window ending here
    let groups = detector.detect_offline(&snapshot, date("2025-04-30"));
    assert!(groups.is_empty());
}

#[test]
fn test_connected_strategy_from_config() {
    let config = TallyConfig::from_toml(
        r#"
[detection]
grouping = "connected"
"#,
    )
    .expect("config");
    assert_eq!(config.detection.grouping, GroupingStrategy::Connected);

    let snapshot = load_snapshot();
    let detector = SubscriptionDetector::new(&config).expect("detector");
    let groups = detector.detect_offline(&snapshot, date("2024-03-31"));

    // Nothing here chains across services, so both strategies agree
    let greedy = SubscriptionDetector::new(&TallyConfig::default())
        .expect("detector")
        .detect_offline(&snapshot, date("2024-03-31"));
    assert_eq!(names(&groups), names(&greedy));
}

#[test]
fn test_summary_over_snapshot() {
    let snapshot = load_snapshot();
    let detector = SubscriptionDetector::new(&TallyConfig::default()).expect("detector");
    let groups = detector.detect_offline(&snapshot, date("2024-03-31"));
    let summary = SubscriptionSummary::from_groups(&groups);

    assert_eq!(summary.service_count, 3);
    assert!((summary.monthly_estimate - (179.0 + 219.0 + 99.0)).abs() < 1e-9);
    assert_eq!(summary.total_paid, 537.0 + 438.0 + 198.0);
}

// =============================================================================
// Service Naming
// =============================================================================

#[tokio::test]
async fn test_failing_ai_falls_back_to_keywords() {
    let snapshot = load_snapshot();
    let client = AIClient::Mock(MockBackend::failing());
    let detector =
        SubscriptionDetector::with_classifier(&TallyConfig::default(), &client).expect("detector");

    let groups = detector.detect(&snapshot, date("2024-03-31")).await;
    let offline = detector.detect_offline(&snapshot, date("2024-03-31"));
    assert_eq!(groups, offline);
}

#[tokio::test]
async fn test_mock_ai_names_services() {
    let snapshot = load_snapshot();
    let client = AIClient::mock();
    let detector =
        SubscriptionDetector::with_classifier(&TallyConfig::default(), &client).expect("detector");

    let groups = detector.detect(&snapshot, date("2024-03-31")).await;
    assert_eq!(names(&groups), vec!["Amazon", "Spotify", "Netflix"]);
    assert_eq!(groups[0].description, "shopping");
}

#[tokio::test]
async fn test_ollama_names_services() {
    let server = MockOllamaServer::start().await;
    let client = AIClient::Ollama(OllamaBackend::with_prompts(
        &server.url(),
        "test-model",
        PromptLibrary::embedded_only(),
    ));

    let snapshot = load_snapshot();
    let detector =
        SubscriptionDetector::with_classifier(&TallyConfig::default(), &client).expect("detector");
    let groups = detector.detect(&snapshot, date("2024-03-31")).await;

    assert_eq!(names(&groups), vec!["Amazon", "Spotify", "Netflix"]);
}

#[tokio::test]
async fn test_ollama_garbage_falls_back_to_keywords() {
    let server = MockOllamaServer::start_with(MockBehavior::Garbage).await;
    let client = AIClient::Ollama(OllamaBackend::with_prompts(
        &server.url(),
        "test-model",
        PromptLibrary::embedded_only(),
    ));

    let snapshot = load_snapshot();
    let detector =
        SubscriptionDetector::with_classifier(&TallyConfig::default(), &client).expect("detector");
    let groups = detector.detect(&snapshot, date("2024-03-31")).await;

    assert_eq!(names(&groups), vec!["AMZN", "Spotify", "Netflix"]);
}

#[tokio::test]
async fn test_ollama_incomplete_answer_falls_back_to_keywords() {
    let server = MockOllamaServer::start_with(MockBehavior::Incomplete).await;
    let client = AIClient::Ollama(OllamaBackend::with_prompts(
        &server.url(),
        "test-model",
        PromptLibrary::embedded_only(),
    ));

    let snapshot = load_snapshot();
    let detector =
        SubscriptionDetector::with_classifier(&TallyConfig::default(), &client).expect("detector");
    let groups = detector.detect(&snapshot, date("2024-03-31")).await;

    // A dropped memo means the whole answer is discarded
    assert_eq!(names(&groups), vec!["AMZN", "Spotify", "Netflix"]);
}

#[tokio::test]
async fn test_ollama_server_error_falls_back_to_keywords() {
    let server = MockOllamaServer::start_with(MockBehavior::ServerError).await;
    let client = AIClient::Ollama(OllamaBackend::with_prompts(
        &server.url(),
        "test-model",
        PromptLibrary::embedded_only(),
    ));

    let snapshot = load_snapshot();
    let detector =
        SubscriptionDetector::with_classifier(&TallyConfig::default(), &client).expect("detector");
    let groups = detector.detect(&snapshot, date("2024-03-31")).await;

    assert_eq!(groups.len(), 3);
    assert_eq!(groups[1].service_name, "Spotify");
}

// =============================================================================
// Annual Payments
// =============================================================================

#[test]
fn test_annual_tracking_from_snapshot() {
    let snapshot = load_snapshot();
    let flags = MemoryFlagStore::new();
    let inactive = flags.inactive_ids().expect("flags");

    let tracked = track_annual_payments(&snapshot.categories, &snapshot.transactions, &inactive);

    // Taxes has no payments and is skipped
    assert_eq!(tracked.len(), 1);
    let seguro = &tracked[0];
    assert_eq!(seguro.category.display_name(), "SEGURO / Auto");
    assert_eq!(seguro.last_payment.date, date("2024-06-01"));
    assert_eq!(seguro.last_payment.amount, 8500.0);
    assert_eq!(seguro.next_payment, date("2025-06-01"));
    assert_eq!(seguro.payment_history.len(), 2);
    assert_eq!(seguro.payment_history[1].transaction_id, "s1");
    assert!(seguro.active);
}

#[test]
fn test_annual_toggle_persists_in_database() {
    let snapshot = load_snapshot();
    let db = Database::in_memory().expect("Failed to create database");

    assert!(!db.toggle("car-ins").expect("toggle"));
    let inactive = db.inactive_ids().expect("flags");
    let tracked = track_annual_payments(&snapshot.categories, &snapshot.transactions, &inactive);

    assert!(!tracked[0].active);
    assert!(visible(&tracked, false).is_empty());
    assert_eq!(visible(&tracked, true).len(), 1);

    let summary = AnnualSummary::from_payments(&tracked);
    assert_eq!(summary.active_count, 0);
    assert_eq!(summary.inactive_count, 1);
    assert_eq!(summary.estimated_annual_total, 0.0);

    // Inactive entries keep their projection
    assert_eq!(tracked[0].next_payment, date("2025-06-01"));

    assert!(db.toggle("car-ins").expect("toggle"));
    let inactive = db.inactive_ids().expect("flags");
    let tracked = track_annual_payments(&snapshot.categories, &snapshot.transactions, &inactive);
    assert!(tracked[0].active);
    assert_eq!(AnnualSummary::from_payments(&tracked).estimated_annual_total, 8500.0);
}

#[test]
fn test_database_reopen_keeps_flags() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tally.db");
    let path = path.to_str().expect("utf-8 path");

    {
        let db = Database::new_unencrypted(path).expect("open");
        db.set_active("car-ins", false).expect("set");
    }

    let db = Database::new_unencrypted(path).expect("reopen");
    assert!(!db.is_active("car-ins").expect("read"));
    assert!(db.is_active("tax").expect("read"));
}
