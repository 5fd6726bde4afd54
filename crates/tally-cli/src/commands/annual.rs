//! Annual payment command implementations

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::annual::{track_annual_payments, visible, AnnualSummary};
use tally_core::db::FlagStore;

use super::{load_snapshot, truncate};

pub fn cmd_annual_list(flags: &dyn FlagStore, data: &Path, show_all: bool, json: bool) -> Result<()> {
    let snapshot = load_snapshot(data)?;
    let inactive = flags
        .inactive_ids()
        .context("Failed to read annual payment flags")?;

    let tracked = track_annual_payments(&snapshot.categories, &snapshot.transactions, &inactive);
    let summary = AnnualSummary::from_payments(&tracked);
    let shown = visible(&tracked, show_all);

    if json {
        let output = serde_json::json!({
            "payments": shown,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if tracked.is_empty() {
        println!("No annual payments tracked yet.");
        println!("Enable annual tracking on a category and record a payment in it.");
        return Ok(());
    }

    println!();
    println!("📅 Annual Payments");
    println!("   ─────────────────────────────────────────────────────────────");

    for payment in &shown {
        let icon = if payment.active { "✅" } else { "⏸️ " };
        println!(
            "   {} {:28} │ {:>10.2} │ last {} │ next {} │ {}",
            icon,
            truncate(&payment.category.display_name(), 28),
            payment.last_payment.amount,
            payment.last_payment.date,
            payment.next_payment,
            payment.category.id
        );
    }

    let hidden = tracked.len() - shown.len();
    if hidden > 0 {
        println!("   ({} inactive hidden, use --all to show)", hidden);
    }

    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {} active, {} inactive │ ~{:.2}/year",
        summary.active_count, summary.inactive_count, summary.estimated_annual_total
    );

    Ok(())
}

pub fn cmd_annual_toggle(flags: &dyn FlagStore, category_id: &str) -> Result<()> {
    let active = flags
        .toggle(category_id)
        .context("Failed to toggle annual payment")?;
    print_flag(category_id, active);
    Ok(())
}

pub fn cmd_annual_set(flags: &dyn FlagStore, category_id: &str, active: bool) -> Result<()> {
    flags
        .set_active(category_id, active)
        .context("Failed to update annual payment")?;
    print_flag(category_id, active);
    Ok(())
}

fn print_flag(category_id: &str, active: bool) {
    if active {
        println!("✅ Annual payment {} is now active", category_id);
    } else {
        println!("⏸️  Annual payment {} is now inactive", category_id);
        println!("   Show it again with: tally annual --data FILE --all");
    }
}
