//! Domain models for Tally

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A ledger movement as exported by the data-access layer
///
/// Exactly one of `expense_amount` / `income_amount` is positive; the other is
/// zero. That invariant is enforced upstream and not re-checked here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(alias = "accountId")]
    pub account_id: String,
    pub date: NaiveDate,
    /// Free-text bank description ("comments" in the hosted app)
    #[serde(alias = "comments", alias = "description")]
    pub memo: String,
    #[serde(alias = "expenseAmount", default)]
    pub expense_amount: f64,
    #[serde(alias = "incomeAmount", default)]
    pub income_amount: f64,
    #[serde(alias = "categoryId")]
    pub category_id: String,
    #[serde(default)]
    pub currency: String,
}

impl Transaction {
    /// Whether this movement is an outflow
    pub fn is_expense(&self) -> bool {
        self.expense_amount > 0.0
    }
}

/// Category classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    #[serde(alias = "Income")]
    Income,
    #[serde(alias = "Expense")]
    Expense,
    #[serde(alias = "Contribution")]
    Contribution,
    #[serde(alias = "Withdrawal")]
    Withdrawal,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Contribution => "contribution",
            Self::Withdrawal => "withdrawal",
        }
    }
}

impl std::str::FromStr for CategoryType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "contribution" => Ok(Self::Contribution),
            "withdrawal" => Ok(Self::Withdrawal),
            _ => Err(format!("Unknown category type: {}", s)),
        }
    }
}

impl std::fmt::Display for CategoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A (category, subcategory) pair owned by the hosted backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    /// Opt-in flag for the annual payment tracker
    #[serde(alias = "annualTracking", default)]
    pub annual_tracking: bool,
}

impl Category {
    /// "Category / Subcategory", or just the category when there is no subcategory
    pub fn display_name(&self) -> String {
        if self.subcategory.is_empty() {
            self.category.clone()
        } else {
            format!("{} / {}", self.category, self.subcategory)
        }
    }
}

/// How often a recurring charge appears to bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Monthly,
    Annual,
    Irregular,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Annual => "annual",
            Self::Irregular => "irregular",
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "annual" | "yearly" => Ok(Self::Annual),
            "irregular" => Ok(Self::Irregular),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recurring charge: transactions judged to belong to the same service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceGroup {
    pub service_name: String,
    pub description: String,
    /// Members, most recent first. Never empty.
    pub transactions: Vec<Transaction>,
    pub frequency: Frequency,
    pub last_payment: NaiveDate,
    pub next_payment: NaiveDate,
    pub total_paid: f64,
    pub currency: String,
}

impl ServiceGroup {
    /// Amount of the most recent charge
    pub fn last_amount(&self) -> f64 {
        self.transactions
            .first()
            .map(|t| t.expense_amount)
            .unwrap_or(0.0)
    }
}

/// A single payment shown in an annual payment's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub transaction_id: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub memo: String,
}

impl From<&Transaction> for Payment {
    fn from(tx: &Transaction) -> Self {
        Self {
            transaction_id: tx.id.clone(),
            date: tx.date,
            amount: tx.expense_amount,
            memo: tx.memo.clone(),
        }
    }
}

/// A category the user tracks as a yearly obligation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedAnnualPayment {
    pub category: Category,
    pub last_payment: Payment,
    pub next_payment: NaiveDate,
    /// Every expense in the category, most recent first
    pub payment_history: Vec<Payment>,
    pub active: bool,
}

/// Result of naming a set of memos: one named service and the memos it covers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceClassification {
    #[serde(alias = "serviceName")]
    pub service_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "originalComments", alias = "comments")]
    pub original_comments: Vec<String>,
}
