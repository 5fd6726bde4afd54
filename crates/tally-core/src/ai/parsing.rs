//! JSON parsing helpers for AI backend responses
//!
//! Models often wrap the JSON payload in prose or Markdown fences, so the
//! payload is cut out of the response before deserializing.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::ServiceClassification;

/// Object form some models prefer over a bare array
#[derive(Debug, Deserialize)]
struct ServicesEnvelope {
    #[serde(alias = "groups", alias = "results")]
    services: Vec<ServiceClassification>,
}

/// Parse service groups from an AI response.
///
/// Accepts a bare JSON array or an object with a `services` / `groups` array.
pub fn parse_service_classifications(response: &str) -> Result<Vec<ServiceClassification>> {
    let response = response.trim();

    let array_start = response.find('[');
    let object_start = response.find('{');

    let services = match (array_start, object_start) {
        // Array appears before any object: `[{...}, ...]`
        (Some(a), o) if o.map_or(true, |o| a < o) => {
            let json_str = slice_between(response, a, ']')?;
            serde_json::from_str::<Vec<ServiceClassification>>(json_str)
                .map_err(|e| invalid_json(e, json_str))?
        }
        (_, Some(o)) => {
            let json_str = slice_between(response, o, '}')?;
            serde_json::from_str::<ServicesEnvelope>(json_str)
                .map_err(|e| invalid_json(e, json_str))?
                .services
        }
        _ => {
            return Err(Error::InvalidData(format!(
                "No JSON found in AI response | Raw: {}",
                truncate_raw(response)
            )))
        }
    };

    if let Some(unnamed) = services.iter().find(|s| s.service_name.trim().is_empty()) {
        return Err(Error::InvalidData(format!(
            "AI returned a group without a service name: {:?}",
            unnamed.original_comments
        )));
    }

    Ok(services)
}

/// `response[start..=last close]`, or an error if the close never appears
fn slice_between(response: &str, start: usize, close: char) -> Result<&str> {
    match response.rfind(close) {
        Some(end) if end > start => Ok(&response[start..=end]),
        _ => Err(Error::InvalidData(format!(
            "Unterminated JSON in AI response | Raw: {}",
            truncate_raw(response)
        ))),
    }
}

fn invalid_json(e: serde_json::Error, raw: &str) -> Error {
    Error::InvalidData(format!("Invalid JSON from AI: {} | Raw: {}", e, truncate_raw(raw)))
}

/// First 200 characters, for error messages
fn truncate_raw(s: &str) -> String {
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s.to_string()
    }
}
