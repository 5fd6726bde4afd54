//! Annual payment tracking
//!
//! Categories flagged with `annual_tracking` hold yearly obligations (car
//! insurance, property tax, domain renewals). For each one we take the most
//! recent expense as the last payment and project the next one a calendar
//! year later. Users can mark an obligation inactive; that only affects
//! totals and display, never the projection.

use std::collections::{HashMap, HashSet};

use chrono::{Months, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::models::{Category, Payment, Transaction, TrackedAnnualPayment};

/// Build the tracked payments for every annual-tracking category with at
/// least one expense. Output is ordered by next payment, then category name.
pub fn track_annual_payments(
    categories: &[Category],
    transactions: &[Transaction],
    inactive: &HashSet<String>,
) -> Vec<TrackedAnnualPayment> {
    let mut by_category: HashMap<&str, Vec<&Transaction>> = HashMap::new();
    for tx in transactions.iter().filter(|tx| tx.is_expense()) {
        by_category
            .entry(tx.category_id.as_str())
            .or_default()
            .push(tx);
    }

    let mut tracked: Vec<TrackedAnnualPayment> = categories
        .iter()
        .filter(|c| c.annual_tracking)
        .filter_map(|category| {
            let Some(expenses) = by_category.get(category.id.as_str()) else {
                debug!(category = %category.display_name(), "Annual category has no payments");
                return None;
            };

            let mut history: Vec<Payment> = expenses.iter().map(|tx| Payment::from(*tx)).collect();
            history.sort_by(|a, b| {
                b.date
                    .cmp(&a.date)
                    .then_with(|| a.transaction_id.cmp(&b.transaction_id))
            });

            let last_payment = history.first()?.clone();
            let next_payment = next_annual_payment(last_payment.date);
            let active = !inactive.contains(&category.id);

            Some(TrackedAnnualPayment {
                category: category.clone(),
                last_payment,
                next_payment,
                payment_history: history,
                active,
            })
        })
        .collect();

    tracked.sort_by(|a, b| {
        a.next_payment
            .cmp(&b.next_payment)
            .then_with(|| a.category.display_name().cmp(&b.category.display_name()))
    });

    debug!(tracked = tracked.len(), "Tracked annual payments");
    tracked
}

/// One calendar year after `last`; Feb 29 clamps to Feb 28
pub fn next_annual_payment(last: NaiveDate) -> NaiveDate {
    last.checked_add_months(Months::new(12))
        .unwrap_or(NaiveDate::MAX)
}

/// Entries to display: everything when `show_all`, otherwise only active ones
pub fn visible(payments: &[TrackedAnnualPayment], show_all: bool) -> Vec<&TrackedAnnualPayment> {
    payments
        .iter()
        .filter(|p| show_all || p.active)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnualSummary {
    pub active_count: usize,
    pub inactive_count: usize,
    /// Sum of the last payment of every active obligation
    pub estimated_annual_total: f64,
}

impl AnnualSummary {
    pub fn from_payments(payments: &[TrackedAnnualPayment]) -> Self {
        let active: Vec<_> = payments.iter().filter(|p| p.active).collect();
        Self {
            active_count: active.len(),
            inactive_count: payments.len() - active.len(),
            estimated_annual_total: active.iter().map(|p| p.last_payment.amount).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryType;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn category(id: &str, name: &str, tracked: bool) -> Category {
        Category {
            id: id.to_string(),
            category: name.to_string(),
            subcategory: String::new(),
            category_type: CategoryType::Expense,
            annual_tracking: tracked,
        }
    }

    fn expense(id: &str, category_id: &str, d: &str, memo: &str, amount: f64) -> Transaction {
        Transaction {
            id: id.to_string(),
            account_id: "acct".to_string(),
            date: date(d),
            memo: memo.to_string(),
            expense_amount: amount,
            income_amount: 0.0,
            category_id: category_id.to_string(),
            currency: "MXN".to_string(),
        }
    }

    #[test]
    fn test_single_annual_payment() {
        let categories = vec![category("seguro", "Seguros", true)];
        let transactions = vec![expense(
            "t1",
            "seguro",
            "2024-06-01",
            "SEGURO AUTO ANUAL",
            12_000.0,
        )];

        let tracked = track_annual_payments(&categories, &transactions, &HashSet::new());
        assert_eq!(tracked.len(), 1);

        let p = &tracked[0];
        assert_eq!(p.last_payment.date, date("2024-06-01"));
        assert_eq!(p.last_payment.amount, 12_000.0);
        assert_eq!(p.next_payment, date("2025-06-01"));
        assert_eq!(p.payment_history.len(), 1);
        assert!(p.active);
    }

    #[test]
    fn test_history_newest_first() {
        let categories = vec![category("predial", "Predial", true)];
        let transactions = vec![
            expense("a", "predial", "2022-01-20", "PREDIAL 2022", 3_000.0),
            expense("c", "predial", "2024-01-18", "PREDIAL 2024", 3_400.0),
            expense("b", "predial", "2023-01-25", "PREDIAL 2023", 3_200.0),
        ];

        let tracked = track_annual_payments(&categories, &transactions, &HashSet::new());
        let dates: Vec<NaiveDate> = tracked[0].payment_history.iter().map(|p| p.date).collect();
        assert_eq!(
            dates,
            vec![date("2024-01-18"), date("2023-01-25"), date("2022-01-20")]
        );
        assert_eq!(tracked[0].last_payment.transaction_id, "c");
        assert_eq!(tracked[0].next_payment, date("2025-01-18"));
    }

    #[test]
    fn test_untracked_and_empty_categories_skipped() {
        let categories = vec![
            category("seguro", "Seguros", true),
            category("comida", "Comida", false),
            category("dominio", "Dominios", true),
        ];
        let mut refund = expense("r", "dominio", "2024-02-01", "REEMBOLSO", 0.0);
        refund.income_amount = 300.0;
        let transactions = vec![
            expense("t1", "seguro", "2024-06-01", "SEGURO", 12_000.0),
            expense("t2", "comida", "2024-06-02", "TACOS", 150.0),
            refund,
        ];

        let tracked = track_annual_payments(&categories, &transactions, &HashSet::new());
        assert_eq!(tracked.len(), 1);
        assert_eq!(tracked[0].category.id, "seguro");
    }

    #[test]
    fn test_inactive_flag_does_not_change_projection() {
        let categories = vec![category("seguro", "Seguros", true)];
        let transactions = vec![expense("t1", "seguro", "2024-06-01", "SEGURO", 12_000.0)];
        let inactive: HashSet<String> = ["seguro".to_string()].into_iter().collect();

        let tracked = track_annual_payments(&categories, &transactions, &inactive);
        assert!(!tracked[0].active);
        assert_eq!(tracked[0].next_payment, date("2025-06-01"));

        assert!(visible(&tracked, false).is_empty());
        assert_eq!(visible(&tracked, true).len(), 1);
    }

    #[test]
    fn test_summary_counts_active_only() {
        let categories = vec![
            category("seguro", "Seguros", true),
            category("predial", "Predial", true),
        ];
        let transactions = vec![
            expense("t1", "seguro", "2024-06-01", "SEGURO", 12_000.0),
            expense("t2", "predial", "2024-01-18", "PREDIAL", 3_400.0),
        ];
        let inactive: HashSet<String> = ["predial".to_string()].into_iter().collect();

        let tracked = track_annual_payments(&categories, &transactions, &inactive);
        let summary = AnnualSummary::from_payments(&tracked);
        assert_eq!(summary.active_count, 1);
        assert_eq!(summary.inactive_count, 1);
        assert_eq!(summary.estimated_annual_total, 12_000.0);
    }

    #[test]
    fn test_ordered_by_next_payment() {
        let categories = vec![
            category("seguro", "Seguros", true),
            category("predial", "Predial", true),
        ];
        let transactions = vec![
            expense("t1", "seguro", "2024-06-01", "SEGURO", 12_000.0),
            expense("t2", "predial", "2024-01-18", "PREDIAL", 3_400.0),
        ];

        let tracked = track_annual_payments(&categories, &transactions, &HashSet::new());
        assert_eq!(tracked[0].category.id, "predial");
        assert_eq!(tracked[1].category.id, "seguro");
    }

    #[test]
    fn test_leap_day_clamps() {
        assert_eq!(next_annual_payment(date("2024-02-29")), date("2025-02-28"));
    }
}
