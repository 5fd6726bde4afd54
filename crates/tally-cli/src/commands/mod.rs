//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (open_db, snapshot/config/date loading)
//! - `subscriptions` - Recurring charge detection and memo normalization
//! - `annual` - Annual payment listing and active/inactive flags
//! - `ai` - AI backend checks
//! - `config` - Effective configuration display

pub mod ai;
pub mod annual;
pub mod config;
pub mod core;
pub mod subscriptions;

// Re-export command functions for main.rs
pub use ai::*;
pub use annual::*;
pub use config::*;
pub use core::*;
pub use subscriptions::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
