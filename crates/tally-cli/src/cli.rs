//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Keep track of recurring charges and yearly bills
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Recurring charge detection and annual payment tracking", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (stores annual payment flags)
    #[arg(long, default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TALLY_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect recurring charges in a data snapshot
    Subscriptions {
        /// Snapshot JSON file ({"transactions": [...], "categories": [...]})
        #[arg(short, long)]
        data: PathBuf,

        /// Reference date (YYYY-MM-DD, default: today)
        #[arg(long)]
        as_of: Option<String>,

        /// Name services with the keyword table only
        #[arg(long)]
        no_ai: bool,

        /// Model to ask instead of the backend's default
        #[arg(long)]
        model: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show tracked annual payments, or change their active flag
    Annual {
        /// Snapshot JSON file (required when listing)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Include inactive payments
        #[arg(long)]
        all: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        #[command(subcommand)]
        action: Option<AnnualAction>,
    },

    /// Show how a memo is normalized and named without AI
    Normalize {
        /// Raw transaction memo
        memo: String,
    },

    /// Check the configured AI backend
    Ai {
        #[command(subcommand)]
        action: AiAction,
    },

    /// Show the effective configuration
    Config,
}

#[derive(Subcommand)]
pub enum AnnualAction {
    /// Flip a category between active and inactive
    Toggle {
        /// Category ID
        category_id: String,
    },

    /// Mark a category active
    Activate {
        /// Category ID
        category_id: String,
    },

    /// Mark a category inactive
    Deactivate {
        /// Category ID
        category_id: String,
    },
}

#[derive(Subcommand)]
pub enum AiAction {
    /// Health check plus a sample classification
    Test {
        /// Classify this memo instead of the built-in samples
        #[arg(long)]
        memo: Option<String>,

        /// Model to ask instead of the backend's default
        #[arg(long)]
        model: Option<String>,
    },
}
