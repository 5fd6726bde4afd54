//! Service naming
//!
//! Turns raw bank memos into human-readable service names. Naming is one
//! capability, [`ServiceClassifier`], with two implementations:
//!
//! - an AI backend (see [`crate::ai::AIClient`]) that groups and names a whole
//!   batch of memos in one call
//! - [`KeywordClassifier`], a fixed brand table that always succeeds
//!
//! [`FallbackClassifier`] combines them: the AI result is used when it names
//! every memo exactly once, otherwise the keyword table takes over.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::ServiceClassification;

/// Groups and names a batch of transaction memos
#[async_trait]
pub trait ServiceClassifier: Send + Sync {
    async fn classify_services(&self, memos: &[String]) -> Result<Vec<ServiceClassification>>;
}

/// Ordered substring rules: (needle, service name, description).
/// Needles are lowercase; the first rule found in the memo wins, so
/// specific entries must precede generic ones ("uber eats" before "uber").
/// Needles shorter than [`WHOLE_WORD_BELOW`] must appear as a whole word.
const BRAND_RULES: &[(&str, &str, &str)] = &[
    // Streaming video
    ("netflix", "Netflix", "Video streaming"),
    ("disney", "Disney+", "Video streaming"),
    ("hbomax", "HBO Max", "Video streaming"),
    ("hbo", "HBO Max", "Video streaming"),
    ("prime video", "Prime Video", "Video streaming"),
    ("primevideo", "Prime Video", "Video streaming"),
    ("paramount", "Paramount+", "Video streaming"),
    ("vix", "ViX", "Video streaming"),
    ("crunchyroll", "Crunchyroll", "Video streaming"),
    ("youtube", "YouTube Premium", "Video streaming"),
    // Music
    ("spotify", "Spotify", "Music streaming"),
    ("apple music", "Apple Music", "Music streaming"),
    ("deezer", "Deezer", "Music streaming"),
    ("tidal", "Tidal", "Music streaming"),
    // Cloud, software and platforms
    ("icloud", "iCloud", "Cloud storage"),
    ("google one", "Google One", "Cloud storage"),
    ("dropbox", "Dropbox", "Cloud storage"),
    ("microsoft", "Microsoft 365", "Software subscription"),
    ("adobe", "Adobe", "Software subscription"),
    ("openai", "ChatGPT", "AI assistant"),
    ("chatgpt", "ChatGPT", "AI assistant"),
    ("github", "GitHub", "Developer tools"),
    ("notion", "Notion", "Productivity software"),
    ("canva", "Canva", "Design software"),
    ("amazon prime", "Amazon Prime", "Shopping membership"),
    ("amzn prime", "Amazon Prime", "Shopping membership"),
    ("apple.com", "Apple", "App Store and services"),
    ("apple", "Apple", "App Store and services"),
    ("google", "Google", "Google services"),
    // Gaming
    ("xboxlive", "Xbox Game Pass", "Gaming subscription"),
    ("xbox", "Xbox Game Pass", "Gaming subscription"),
    ("playstation", "PlayStation Plus", "Gaming subscription"),
    ("nintendo", "Nintendo Switch Online", "Gaming subscription"),
    ("steampowered", "Steam", "Gaming"),
    ("steamgames", "Steam", "Gaming"),
    ("steam", "Steam", "Gaming"),
    // Transport and delivery
    ("uber eats", "Uber Eats", "Food delivery"),
    ("ubereats", "Uber Eats", "Food delivery"),
    ("uber", "Uber", "Ride sharing"),
    ("didi", "DiDi", "Ride sharing"),
    ("rappi", "Rappi", "Delivery"),
    // Telecom and utilities
    ("telcel", "Telcel", "Mobile phone"),
    ("at&t", "AT&T", "Mobile phone"),
    ("movistar", "Movistar", "Mobile phone"),
    ("telmex", "Telmex", "Internet and phone"),
    ("totalplay", "Totalplay", "Internet and TV"),
    ("izzi", "izzi", "Internet and TV"),
    ("megacable", "Megacable", "Internet and TV"),
    ("sky", "SKY", "Satellite TV"),
    ("cfe", "CFE", "Electricity"),
    // Fitness
    ("smart fit", "Smart Fit", "Gym membership"),
    ("smartfit", "Smart Fit", "Gym membership"),
    ("sports world", "Sports World", "Gym membership"),
    ("gym", "Gym", "Gym membership"),
];

/// Needles with fewer chars than this only match whole words, so "sky"
/// skips "skype" and "apple" skips "pineapple"
const WHOLE_WORD_BELOW: usize = 6;

/// Name used when a memo has no usable first word
const UNKNOWN_SERVICE: &str = "Unknown";

/// Description attached to memos no brand rule recognizes
const GENERIC_DESCRIPTION: &str = "Recurring charge";

fn rule_matches(memo: &str, needle: &str) -> bool {
    if needle.chars().count() < WHOLE_WORD_BELOW {
        contains_word(memo, needle)
    } else {
        memo.contains(needle)
    }
}

/// `needle` occurs with no letter directly before or after it
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphabetic) && !after.is_some_and(char::is_alphabetic)
    })
}

/// Deterministic brand-table namer
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    max_name_len: usize,
}

impl KeywordClassifier {
    pub fn new(max_name_len: usize) -> Self {
        Self { max_name_len }
    }

    /// Name a single memo: first matching brand rule, else the memo's first
    /// word cut to `max_name_len` characters
    pub fn name_for(&self, memo: &str) -> (String, String) {
        let lower = memo.to_lowercase();
        if let Some((_, name, description)) = BRAND_RULES
            .iter()
            .find(|(needle, _, _)| rule_matches(&lower, needle))
        {
            return (name.to_string(), description.to_string());
        }

        let name = memo
            .split_whitespace()
            .next()
            .map(|token| token.chars().take(self.max_name_len).collect::<String>())
            .filter(|token| !token.is_empty())
            .unwrap_or_else(|| UNKNOWN_SERVICE.to_string());
        (name, GENERIC_DESCRIPTION.to_string())
    }

    /// Name a batch, grouping memos that resolve to the same service.
    /// Groups come out in order of first appearance.
    pub fn classify(&self, memos: &[String]) -> Vec<ServiceClassification> {
        let mut groups: Vec<ServiceClassification> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();

        for memo in memos {
            let (name, description) = self.name_for(memo);
            match by_name.get(&name) {
                Some(&idx) => groups[idx].original_comments.push(memo.clone()),
                None => {
                    by_name.insert(name.clone(), groups.len());
                    groups.push(ServiceClassification {
                        service_name: name,
                        description,
                        original_comments: vec![memo.clone()],
                    });
                }
            }
        }

        groups
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(15)
    }
}

#[async_trait]
impl ServiceClassifier for KeywordClassifier {
    async fn classify_services(&self, memos: &[String]) -> Result<Vec<ServiceClassification>> {
        Ok(self.classify(memos))
    }
}

/// Primary classifier with keyword fallback
///
/// Never fails: errors and unusable results from the primary are logged and
/// replaced by the keyword table's answer.
pub struct FallbackClassifier<'a> {
    primary: &'a dyn ServiceClassifier,
    fallback: KeywordClassifier,
}

impl<'a> FallbackClassifier<'a> {
    pub fn new(primary: &'a dyn ServiceClassifier, fallback: KeywordClassifier) -> Self {
        Self { primary, fallback }
    }

    pub async fn classify(&self, memos: &[String]) -> Vec<ServiceClassification> {
        if memos.is_empty() {
            return Vec::new();
        }

        match self.primary.classify_services(memos).await {
            Ok(result) if covers_exactly_once(memos, &result) => {
                debug!(
                    memos = memos.len(),
                    services = result.len(),
                    "AI service naming accepted"
                );
                result
            }
            Ok(result) => {
                warn!(
                    memos = memos.len(),
                    services = result.len(),
                    "AI service naming did not cover every memo exactly once, using keyword naming"
                );
                self.fallback.classify(memos)
            }
            Err(e) => {
                warn!(error = %e, "AI service naming failed, using keyword naming");
                self.fallback.classify(memos)
            }
        }
    }
}

#[async_trait]
impl ServiceClassifier for FallbackClassifier<'_> {
    async fn classify_services(&self, memos: &[String]) -> Result<Vec<ServiceClassification>> {
        Ok(self.classify(memos).await)
    }
}

/// True when each input memo appears in exactly one group.
/// Comments the classifier invented (not in the input) are ignored.
pub fn covers_exactly_once(memos: &[String], groups: &[ServiceClassification]) -> bool {
    let mut counts: HashMap<&str, usize> = memos.iter().map(|m| (m.trim(), 0)).collect();

    for group in groups {
        for comment in &group.original_comments {
            if let Some(count) = counts.get_mut(comment.trim()) {
                *count += 1;
            }
        }
    }

    counts.values().all(|&c| c == 1)
}
