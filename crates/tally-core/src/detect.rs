//! Recurring-charge detection
//!
//! Finds services a user pays for repeatedly by looking at a year of expense
//! transactions in the subscription categories:
//!
//! 1. Normalize each memo to a short comparison key
//! 2. Group transactions whose keys match, or whose amounts are close and
//!    fall on the same day of the month
//! 3. Classify each group's billing frequency from its average payment gap
//! 4. Name each group (AI backend when available, keyword table otherwise)
//! 5. Project the next payment date
//!
//! Everything except naming is synchronous and deterministic for a given
//! snapshot and as-of date.

use std::collections::HashMap;

use chrono::{Datelike, Months, NaiveDate};
use regex::Regex;
use tracing::{debug, info};

use crate::config::{DetectionConfig, FrequencyConfig, GroupingStrategy, TallyConfig};
use crate::error::Result;
use crate::models::{
    Category, CategoryType, Frequency, ServiceClassification, ServiceGroup, Transaction,
};
use crate::naming::{FallbackClassifier, KeywordClassifier, ServiceClassifier};
use crate::snapshot::Snapshot;

/// Reduces a memo to a short key that survives reference numbers and
/// payment-processor noise ("PAYPAL *SPOTIFY P0123" -> "spotifyp")
#[derive(Debug, Clone)]
pub struct Normalizer {
    processor_tags: Option<Regex>,
    key_length: usize,
}

impl Normalizer {
    pub fn new(processor_prefixes: &[String], key_length: usize) -> Result<Self> {
        let mut alternatives: Vec<String> = processor_prefixes
            .iter()
            .map(|p| strip_noise(&p.to_lowercase()))
            .filter(|p| !p.is_empty())
            .collect();
        // Longest first: alternation takes the first branch that matches
        alternatives.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        alternatives.dedup();

        let processor_tags = if alternatives.is_empty() {
            None
        } else {
            let escaped: Vec<String> = alternatives.iter().map(|p| regex::escape(p)).collect();
            Some(Regex::new(&format!("^(?:{})+", escaped.join("|")))?)
        };

        Ok(Self {
            processor_tags,
            key_length,
        })
    }

    pub fn from_config(config: &DetectionConfig) -> Result<Self> {
        Self::new(&config.processor_prefixes, config.key_length)
    }

    /// Comparison key for a memo. Empty memo gives an empty key.
    ///
    /// Processor tags are removed after digits, whitespace and punctuation,
    /// so "DLO SPOTIFY", "DLO*SPOTIFY 12" and "SPOTIFY" share a key. Tags are
    /// only removed from the front of the memo.
    pub fn key(&self, memo: &str) -> String {
        let stripped = strip_noise(&memo.to_lowercase());
        let untagged = match &self.processor_tags {
            Some(re) => re
                .find(&stripped)
                .map_or(stripped.as_str(), |m| &stripped[m.end()..]),
            None => stripped.as_str(),
        };
        untagged.chars().take(self.key_length).collect()
    }
}

/// Drop digits, whitespace, asterisks and other ASCII punctuation
fn strip_noise(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_numeric() && !c.is_whitespace() && !c.is_ascii_punctuation())
        .collect()
}

/// Decides whether two transactions are charges from the same service
#[derive(Debug, Clone)]
pub struct Matcher {
    normalizer: Normalizer,
    min_key_length: usize,
    amount_tolerance: f64,
}

impl Matcher {
    pub fn new(normalizer: Normalizer, min_key_length: usize, amount_tolerance: f64) -> Self {
        Self {
            normalizer,
            min_key_length,
            amount_tolerance,
        }
    }

    pub fn from_config(config: &DetectionConfig) -> Result<Self> {
        Ok(Self::new(
            Normalizer::from_config(config)?,
            config.min_key_length,
            config.amount_tolerance,
        ))
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Symmetric match: same long-enough key, or near-equal amount on the
    /// same day of the month
    pub fn matches(&self, a: &Transaction, b: &Transaction) -> bool {
        let key_a = self.normalizer.key(&a.memo);
        let key_b = self.normalizer.key(&b.memo);
        self.matches_keyed(&key_a, a, &key_b, b)
    }

    fn matches_keyed(&self, key_a: &str, a: &Transaction, key_b: &str, b: &Transaction) -> bool {
        if key_a == key_b && key_a.chars().count() > self.min_key_length {
            return true;
        }
        amounts_close(a.expense_amount, b.expense_amount, self.amount_tolerance)
            && a.date.day() == b.date.day()
    }
}

fn amounts_close(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance * a.max(b)
}

/// Partition transactions into service groups.
///
/// Input is ordered by (date, id) first, so the result doesn't depend on the
/// order of the slice. Each returned group is in ascending date order; its
/// first element is the group's seed.
pub fn group_transactions(
    matcher: &Matcher,
    transactions: &[Transaction],
    strategy: GroupingStrategy,
) -> Vec<Vec<Transaction>> {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

    for tx in &ordered {
        debug_assert!(
            tx.expense_amount.is_finite(),
            "non-finite amount on transaction {}",
            tx.id
        );
    }

    let keys: Vec<String> = ordered
        .iter()
        .map(|tx| matcher.normalizer.key(&tx.memo))
        .collect();

    let index_groups = match strategy {
        GroupingStrategy::Greedy => greedy_groups(matcher, &ordered, &keys),
        GroupingStrategy::Connected => connected_groups(matcher, &ordered, &keys),
    };

    index_groups
        .into_iter()
        .map(|members| members.into_iter().map(|i| ordered[i].clone()).collect())
        .collect()
}

/// Single forward pass: join the earliest group whose seed matches, else seed
/// a new group. O(n²) in the worst case.
fn greedy_groups(matcher: &Matcher, ordered: &[&Transaction], keys: &[String]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for (i, tx) in ordered.iter().enumerate() {
        let target = groups.iter().position(|members| {
            let seed = members[0];
            matcher.matches_keyed(&keys[seed], ordered[seed], &keys[i], tx)
        });

        match target {
            Some(g) => groups[g].push(i),
            None => groups.push(vec![i]),
        }
    }

    groups
}

/// Connected components of the match relation
fn connected_groups(
    matcher: &Matcher,
    ordered: &[&Transaction],
    keys: &[String],
) -> Vec<Vec<usize>> {
    let mut sets = DisjointSet::new(ordered.len());

    for i in 0..ordered.len() {
        for j in (i + 1)..ordered.len() {
            if matcher.matches_keyed(&keys[i], ordered[i], &keys[j], ordered[j]) {
                sets.union(i, j);
            }
        }
    }

    // Components ordered by their earliest member; members stay ascending
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut by_root: HashMap<usize, usize> = HashMap::new();
    for i in 0..ordered.len() {
        let root = sets.find(i);
        match by_root.get(&root) {
            Some(&g) => groups[g].push(i),
            None => {
                by_root.insert(root, groups.len());
                groups.push(vec![i]);
            }
        }
    }

    groups
}

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Keep the smaller index as root so component order is stable
            let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[child] = root;
        }
    }
}

/// Classify billing frequency from the average gap between payment dates.
/// Fewer than two dates is always Irregular.
pub fn classify_frequency(dates: &[NaiveDate], bands: &FrequencyConfig) -> Frequency {
    if dates.len() < 2 {
        return Frequency::Irregular;
    }

    let mut sorted = dates.to_vec();
    sorted.sort();

    let gaps: Vec<f64> = sorted
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days() as f64)
        .collect();
    let avg = gaps.iter().sum::<f64>() / gaps.len() as f64;

    if avg >= bands.monthly_min_days && avg <= bands.monthly_max_days {
        Frequency::Monthly
    } else if avg >= bands.annual_min_days && avg <= bands.annual_max_days {
        Frequency::Annual
    } else {
        Frequency::Irregular
    }
}

/// Next expected payment: one calendar month after the last one, or one
/// calendar year for annual charges. Irregular charges assume monthly.
/// Month ends clamp (Jan 31 -> Feb 28/29).
pub fn project_next_payment(last_payment: NaiveDate, frequency: Frequency) -> NaiveDate {
    let months = match frequency {
        Frequency::Monthly | Frequency::Irregular => 1,
        Frequency::Annual => 12,
    };
    last_payment
        .checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

/// Expense transactions in the lookback window whose category is eligible
pub fn eligible_transactions(
    snapshot: &Snapshot,
    config: &DetectionConfig,
    as_of: NaiveDate,
) -> Vec<Transaction> {
    let window_start = as_of
        .checked_sub_months(Months::new(config.lookback_months))
        .unwrap_or(NaiveDate::MIN);
    let categories = snapshot.category_index();
    let wanted: Vec<String> = config
        .eligible_categories
        .iter()
        .map(|c| c.trim().to_lowercase())
        .collect();

    snapshot
        .transactions
        .iter()
        .filter(|tx| tx.is_expense())
        .filter(|tx| tx.date >= window_start && tx.date <= as_of)
        .filter(|tx| {
            categories
                .get(tx.category_id.as_str())
                .is_some_and(|cat| category_is_eligible(cat, &wanted))
        })
        .cloned()
        .collect()
}

fn category_is_eligible(category: &Category, wanted: &[String]) -> bool {
    if wanted.is_empty() {
        return category.category_type == CategoryType::Expense;
    }
    let name = category.category.trim().to_lowercase();
    let sub = category.subcategory.trim().to_lowercase();
    wanted.iter().any(|w| *w == name || (!sub.is_empty() && *w == sub))
}

/// Headline numbers for a set of detected services
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SubscriptionSummary {
    pub service_count: usize,
    /// Monthly-equivalent spend: last charge of each monthly or irregular
    /// service, plus one twelfth of each annual one
    pub monthly_estimate: f64,
    pub total_paid: f64,
}

impl SubscriptionSummary {
    pub fn from_groups(groups: &[ServiceGroup]) -> Self {
        let monthly_estimate = groups
            .iter()
            .map(|g| match g.frequency {
                Frequency::Annual => g.last_amount() / 12.0,
                Frequency::Monthly | Frequency::Irregular => g.last_amount(),
            })
            .sum();

        Self {
            service_count: groups.len(),
            monthly_estimate,
            total_paid: groups.iter().map(|g| g.total_paid).sum(),
        }
    }
}

/// Recurring-charge detector
pub struct SubscriptionDetector<'a> {
    config: TallyConfig,
    matcher: Matcher,
    keywords: KeywordClassifier,
    classifier: Option<&'a dyn ServiceClassifier>,
}

impl<'a> SubscriptionDetector<'a> {
    /// Detector that names services with the keyword table only
    pub fn new(config: &TallyConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            matcher: Matcher::from_config(&config.detection)?,
            keywords: KeywordClassifier::new(config.naming.fallback_name_len),
            classifier: None,
        })
    }

    /// Detector that asks `classifier` first and falls back to keywords
    pub fn with_classifier(
        config: &TallyConfig,
        classifier: &'a dyn ServiceClassifier,
    ) -> Result<Self> {
        let mut detector = Self::new(config)?;
        detector.classifier = Some(classifier);
        Ok(detector)
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Run the full pipeline over a snapshot
    pub async fn detect(&self, snapshot: &Snapshot, as_of: NaiveDate) -> Vec<ServiceGroup> {
        let (eligible, groups) = self.eligible_groups(snapshot, as_of);
        if groups.is_empty() {
            info!(eligible = eligible.len(), "No recurring charges found");
            return Vec::new();
        }

        let memos = unique_memos(&eligible);
        let classifications = match self.classifier {
            Some(primary) => {
                FallbackClassifier::new(primary, self.keywords.clone())
                    .classify(&memos)
                    .await
            }
            None => self.keywords.classify(&memos),
        };

        self.finish(eligible.len(), groups, &classifications)
    }

    /// Same pipeline without an AI backend (keyword naming only)
    pub fn detect_offline(&self, snapshot: &Snapshot, as_of: NaiveDate) -> Vec<ServiceGroup> {
        let (eligible, groups) = self.eligible_groups(snapshot, as_of);
        let classifications = self.keywords.classify(&unique_memos(&eligible));
        self.finish(eligible.len(), groups, &classifications)
    }

    fn eligible_groups(
        &self,
        snapshot: &Snapshot,
        as_of: NaiveDate,
    ) -> (Vec<Transaction>, Vec<Vec<Transaction>>) {
        let eligible = eligible_transactions(snapshot, &self.config.detection, as_of);
        let groups = group_transactions(&self.matcher, &eligible, self.config.detection.grouping);
        debug!(
            eligible = eligible.len(),
            groups = groups.len(),
            strategy = self.config.detection.grouping.as_str(),
            "Grouped transactions"
        );
        (eligible, groups)
    }

    fn finish(
        &self,
        eligible: usize,
        groups: Vec<Vec<Transaction>>,
        classifications: &[ServiceClassification],
    ) -> Vec<ServiceGroup> {
        let mut by_memo: HashMap<&str, &ServiceClassification> = HashMap::new();
        for c in classifications {
            for comment in &c.original_comments {
                by_memo.entry(comment.trim()).or_insert(c);
            }
        }

        let mut services: Vec<ServiceGroup> = groups
            .into_iter()
            .filter_map(|members| self.build_group(members, &by_memo))
            .collect();

        services.sort_by(|a, b| {
            a.next_payment
                .cmp(&b.next_payment)
                .then_with(|| a.service_name.cmp(&b.service_name))
                .then_with(|| a.transactions[0].id.cmp(&b.transactions[0].id))
        });

        info!(
            eligible,
            services = services.len(),
            "Subscription detection complete"
        );
        services
    }

    /// Turn an ascending group into a `ServiceGroup`; None only for an empty group
    fn build_group(
        &self,
        members: Vec<Transaction>,
        by_memo: &HashMap<&str, &ServiceClassification>,
    ) -> Option<ServiceGroup> {
        let seed = members.first()?;

        // Seed memo decides the name; any member is the next best thing
        let named = by_memo.get(seed.memo.trim()).copied().or_else(|| {
            members
                .iter()
                .find_map(|tx| by_memo.get(tx.memo.trim()).copied())
        });
        let (service_name, description) = match named {
            Some(c) => (c.service_name.clone(), c.description.clone()),
            None => self.keywords.name_for(&seed.memo),
        };

        let dates: Vec<NaiveDate> = members.iter().map(|tx| tx.date).collect();
        let frequency = classify_frequency(&dates, &self.config.frequency);

        let mut transactions = members;
        transactions.reverse();
        let newest = transactions.first()?;
        let last_payment = newest.date;
        let currency = newest.currency.clone();
        let next_payment = project_next_payment(last_payment, frequency);
        let total_paid = transactions.iter().map(|tx| tx.expense_amount).sum();

        debug!(
            service = %service_name,
            payments = transactions.len(),
            frequency = frequency.as_str(),
            next = %next_payment,
            "Built service group"
        );

        Some(ServiceGroup {
            service_name,
            description,
            transactions,
            frequency,
            last_payment,
            next_payment,
            total_paid,
            currency,
        })
    }
}

/// Distinct memos in first-seen order
fn unique_memos(transactions: &[Transaction]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    transactions
        .iter()
        .filter(|tx| seen.insert(tx.memo.trim()))
        .map(|tx| tx.memo.trim().to_string())
        .collect()
}
