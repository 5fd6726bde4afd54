//! Subscription command implementations

use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;
use tally_core::ai::AIBackend;
use tally_core::detect::{Normalizer, SubscriptionDetector, SubscriptionSummary};
use tally_core::models::{Frequency, ServiceGroup};
use tally_core::naming::KeywordClassifier;
use tracing::{debug, info};

use super::{configured_client, load_config, load_snapshot, parse_as_of, truncate};

pub async fn cmd_subscriptions(
    data: &Path,
    as_of: Option<&str>,
    no_ai: bool,
    model: Option<&str>,
    json: bool,
) -> Result<()> {
    let config = load_config()?;
    let snapshot = load_snapshot(data)?;
    let as_of = parse_as_of(as_of)?;

    let ai = if no_ai || !config.naming.use_ai {
        None
    } else {
        configured_client(&config.naming, model)
    };

    let groups = match &ai {
        Some(client) => {
            info!(backend = client.kind(), model = client.model(), "Naming services with AI");
            SubscriptionDetector::with_classifier(&config, client)?
                .detect(&snapshot, as_of)
                .await
        }
        None => {
            debug!("No AI backend, naming services with keywords");
            SubscriptionDetector::new(&config)?.detect_offline(&snapshot, as_of)
        }
    };

    let summary = SubscriptionSummary::from_groups(&groups);

    if json {
        let output = serde_json::json!({
            "as_of": as_of,
            "services": groups,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_services(&groups, &summary, as_of);
    Ok(())
}

fn frequency_icon(frequency: Frequency) -> &'static str {
    match frequency {
        Frequency::Monthly => "🔁",
        Frequency::Annual => "📅",
        Frequency::Irregular => "❔",
    }
}

fn print_services(groups: &[ServiceGroup], summary: &SubscriptionSummary, as_of: NaiveDate) {
    if groups.is_empty() {
        println!("No recurring charges found up to {}.", as_of);
        println!("Check that subscription charges use an eligible category:");
        println!("  tally config");
        return;
    }

    println!();
    println!("📋 Recurring Charges (as of {})", as_of);
    println!("   ─────────────────────────────────────────────────────────────");

    for group in groups {
        println!(
            "   {} {:20} │ {:>10.2} {:<3} │ {:<9} │ {} charges │ next {}",
            frequency_icon(group.frequency),
            truncate(&group.service_name, 20),
            group.last_amount(),
            group.currency,
            group.frequency.as_str(),
            group.transactions.len(),
            group.next_payment
        );
    }

    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {} services │ ~{:.2}/month │ {:.2} paid",
        summary.service_count, summary.monthly_estimate, summary.total_paid
    );
}

/// Show the grouping key and keyword name for a memo
pub fn cmd_normalize(memo: &str) -> Result<()> {
    let config = load_config()?;
    let normalizer = Normalizer::from_config(&config.detection)?;
    let keywords = KeywordClassifier::new(config.naming.fallback_name_len);

    let key = normalizer.key(memo);
    let key_len = key.chars().count();
    let (name, description) = keywords.name_for(memo);

    println!("🔤 \"{}\"", memo);
    println!("   Key:      \"{}\" ({} chars)", key, key_len);
    if key_len > config.detection.min_key_length {
        println!("   Matching: by key, or by amount and day of month");
    } else {
        println!(
            "   Matching: by amount and day of month only (key needs more than {} chars)",
            config.detection.min_key_length
        );
    }
    println!("   Service:  {} ({})", name, description);

    Ok(())
}
