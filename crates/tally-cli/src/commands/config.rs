//! Config command implementation

use anyhow::Result;
use tally_core::config::{default_config_path, override_path};
use tally_core::prompts::default_prompts_dir;

use super::load_config;

/// Print the effective config and where it came from
pub fn cmd_config() -> Result<()> {
    let config = load_config()?;

    match override_path() {
        Some(path) => println!("# Source: {}", path.display()),
        None => {
            println!("# Source: built-in defaults");
            if let Some(path) = default_config_path() {
                println!("# Override by creating: {}", path.display());
            }
        }
    }
    if let Some(dir) = default_prompts_dir() {
        println!("# Prompt overrides: {}", dir.display());
    }
    println!();
    print!("{}", config.to_toml()?);

    Ok(())
}
