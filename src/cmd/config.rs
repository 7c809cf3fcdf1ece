//! Effective configuration view: `taskboard config`.

use anyhow::{Context, Result};
use std::path::Path;

use taskboard::config::TaskboardConfig;

pub fn cmd_config(config_path: &Path, config: &TaskboardConfig) -> Result<()> {
    let source = if config_path.exists() {
        config_path.display().to_string()
    } else {
        "(defaults)".to_string()
    };
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;

    println!("# Config file: {}", source);
    println!("{}", rendered);
    Ok(())
}
