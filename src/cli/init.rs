//! Init command - write a default project config

use super::repo_root;
use crate::config::{CONFIG_FILE_NAME, DEFAULT_CONFIG_TOML};
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

pub fn run(path: &Path) -> Result<()> {
    let repo_path = repo_root(path)?;
    let config_path = repo_path.join(CONFIG_FILE_NAME);

    if config_path.exists() {
        println!(
            "{} Already initialized at {}",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
        return Ok(());
    }

    std::fs::write(&config_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("Failed to create {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );
    Ok(())
}
