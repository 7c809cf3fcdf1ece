//! Project setup command: `taskboard init`.

use anyhow::Result;
use std::path::{Path, PathBuf};

use taskboard::board::server::open_database;
use taskboard::config::TaskboardConfig;

/// Create the database and write a config file if none exists yet.
///
/// The file holds defaults plus `--db-path`; environment and `--verbose`
/// only affect this run.
pub fn cmd_init(
    config_path: &Path,
    config: &TaskboardConfig,
    db_path: Option<PathBuf>,
) -> Result<()> {
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
    } else {
        TaskboardConfig::initial(db_path).save(config_path)?;
        println!("Wrote default config to {}", config_path.display());
    }

    open_database(&config.database.path)?;
    println!(
        "Taskboard database initialized at {}",
        config.database.path.display()
    );
    Ok(())
}
