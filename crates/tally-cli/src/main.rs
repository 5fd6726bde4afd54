//! Tally CLI - Recurring charge tracker
//!
//! Usage:
//!   tally subscriptions --data snapshot.json   Detect recurring charges
//!   tally annual --data snapshot.json          Show annual payments
//!   tally annual toggle <CATEGORY_ID>          Mark a payment active/inactive
//!   tally ai test                              Check the AI backend

mod cli;
mod commands;


use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Subscriptions {
            data,
            as_of,
            no_ai,
            model,
            json,
        } => {
            commands::cmd_subscriptions(&data, as_of.as_deref(), no_ai, model.as_deref(), json)
                .await
        }
        Commands::Annual {
            data,
            all,
            json,
            action,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => {
                    let data = data.context("--data is required to list annual payments")?;
                    commands::cmd_annual_list(&db, &data, all, json)
                }
                Some(AnnualAction::Toggle { category_id }) => {
                    commands::cmd_annual_toggle(&db, &category_id)
                }
                Some(AnnualAction::Activate { category_id }) => {
                    commands::cmd_annual_set(&db, &category_id, true)
                }
                Some(AnnualAction::Deactivate { category_id }) => {
                    commands::cmd_annual_set(&db, &category_id, false)
                }
            }
        }
        Commands::Normalize { memo } => commands::cmd_normalize(&memo),
        Commands::Ai { action } => match action {
            AiAction::Test { memo, model } => {
                commands::cmd_ai_test(memo.as_deref(), model.as_deref()).await
            }
        },
        Commands::Config => commands::cmd_config(),
    }
}
