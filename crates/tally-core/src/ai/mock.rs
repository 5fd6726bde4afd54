//! Mock backend for testing
//!
//! Groups memos with a small brand table so tests get realistic-looking AI
//! output without a running model server.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::ServiceClassification;

use super::AIBackend;

/// Mock AI backend for testing
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    /// Whether classify_services should return an error
    pub fail_requests: bool,
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            fail_requests: false,
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            fail_requests: true,
        }
    }

    /// Healthy, but every classification request fails
    pub fn failing() -> Self {
        Self {
            healthy: true,
            fail_requests: true,
        }
    }

    /// Create a new instance with a different model (no-op for mock)
    pub fn with_model(&self, _model: &str) -> Self {
        self.clone()
    }

    /// Create a new instance with a prompt hint (no-op for mock)
    pub fn with_hint(&self, _hint: &str) -> Self {
        self.clone()
    }

    /// The grouping the mock would return, without the async wrapper
    pub fn classify_memos(memos: &[String]) -> Vec<ServiceClassification> {
        let mut groups: Vec<ServiceClassification> = Vec::new();

        for memo in memos {
            let (name, description) = mock_service(memo);
            match groups.iter_mut().find(|g| g.service_name == name) {
                Some(group) => group.original_comments.push(memo.clone()),
                None => groups.push(ServiceClassification {
                    service_name: name,
                    description: description.to_string(),
                    original_comments: vec![memo.clone()],
                }),
            }
        }

        groups
    }
}

fn mock_service(memo: &str) -> (String, &'static str) {
    let m = memo.to_uppercase();
    let known = match m.as_str() {
        m if m.contains("NETFLIX") => Some(("Netflix", "streaming")),
        m if m.contains("SPOTIFY") => Some(("Spotify", "music")),
        m if m.contains("DISNEY") => Some(("Disney+", "streaming")),
        m if m.contains("HBO") => Some(("HBO Max", "streaming")),
        m if m.contains("ICLOUD") || m.contains("APPLE") => Some(("Apple", "cloud_storage")),
        m if m.contains("AMAZON") || m.contains("AMZN") => Some(("Amazon", "shopping")),
        m if m.contains("UBER") => Some(("Uber", "transport")),
        m if m.contains("TELCEL") => Some(("Telcel", "mobile")),
        _ => None,
    };

    match known {
        Some((name, description)) => (name.to_string(), description),
        None => {
            // Title-case the first word
            let first = memo.split_whitespace().next().unwrap_or("Unknown");
            let mut chars = first.chars();
            let name = match chars.next() {
                Some(c) => c.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => "Unknown".to_string(),
            };
            (name, "other")
        }
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn classify_services(&self, memos: &[String]) -> Result<Vec<ServiceClassification>> {
        if self.fail_requests {
            return Err(Error::Ai("Mock backend configured to fail".into()));
        }
        Ok(Self::classify_memos(memos))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
