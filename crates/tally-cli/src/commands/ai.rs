//! AI backend command implementations

use anyhow::Result;
use tally_core::ai::{AIBackend, AIClient};
use tally_core::config::NamingConfig;
use tally_core::naming::covers_exactly_once;

use super::load_config;

/// Memos used when `--memo` isn't given
const SAMPLE_MEMOS: &[&str] = &[
    "NETFLIX.COM*1234",
    "SPOTIFY*P1A2B3",
    "SPOTIFY*P9Z8Y7",
    "PAYPAL *DISNEYPLUS",
    "UBER TRIP HELP.UBER.COM",
];

/// AI client from the environment, with the `--model` override and the
/// configured prompt hint applied
pub fn configured_client(naming: &NamingConfig, model: Option<&str>) -> Option<AIClient> {
    AIClient::from_env().map(|client| apply_overrides(client, naming, model))
}

pub fn apply_overrides(client: AIClient, naming: &NamingConfig, model: Option<&str>) -> AIClient {
    let client = match model {
        Some(model) => client.with_model(model),
        None => client,
    };
    if naming.prompt_hint.is_empty() {
        client
    } else {
        client.with_hint(&naming.prompt_hint)
    }
}

/// Test the configured AI backend
pub async fn cmd_ai_test(memo: Option<&str>, model: Option<&str>) -> Result<()> {
    println!("🔍 Testing AI backend...\n");

    let config = load_config()?;

    let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| "ollama".to_string());
    println!("  AI_BACKEND: {}", backend);

    let Some(client) = configured_client(&config.naming, model) else {
        println!("\n⚠️  No AI backend configured. Services will be named with keywords.");
        println!("\nTo use Ollama:");
        println!("  1. Install Ollama: https://ollama.ai/download");
        println!("  2. Start the server: ollama serve");
        println!("  3. Pull a model: ollama pull llama3.2");
        println!("  4. Set environment variable: export OLLAMA_HOST=http://localhost:11434");
        println!("\nFor vLLM, LocalAI or llama-server:");
        println!("  export AI_BACKEND=openai_compatible");
        println!("  export OPENAI_COMPATIBLE_HOST=http://localhost:8000");
        return Ok(());
    };

    let memos: Vec<String> = match memo {
        Some(m) => vec![m.to_string()],
        None => SAMPLE_MEMOS.iter().map(|s| s.to_string()).collect(),
    };

    run_ai_test(&client, &memos).await
}

/// Health check plus one classification round against `client`
pub async fn run_ai_test(client: &AIClient, memos: &[String]) -> Result<()> {
    println!("  Host:  {}", client.host());
    println!("  Model: {}\n", client.model());

    print!("Checking availability... ");
    if !client.health_check().await {
        println!("❌ Failed");
        println!("\n⚠️  Could not reach {} backend at {}", client.kind(), client.host());
        return Ok(());
    }
    println!("✅ Connected");

    println!("\n📋 Classifying {} memos...\n", memos.len());

    match client.classify_services(memos).await {
        Ok(groups) => {
            for group in &groups {
                println!("  {} ({})", group.service_name, group.description);
                for comment in &group.original_comments {
                    println!("     ← \"{}\"", comment);
                }
            }
            println!();
            if covers_exactly_once(memos, &groups) {
                println!("✅ Every memo was assigned exactly once");
            } else {
                println!("⚠️  Answer doesn't cover every memo exactly once;");
                println!("   detection would fall back to keyword naming");
            }
        }
        Err(e) => {
            println!("❌ Error: {}", e);
            println!("   Detection would fall back to keyword naming");
        }
    }

    Ok(())
}
