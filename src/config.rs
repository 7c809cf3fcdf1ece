//! Configuration for the taskboard server.
//!
//! Settings are read from `.taskboard/taskboard.toml` and layered:
//! file, then environment, then command-line flags.
//!
//! ```toml
//! [server]
//! port = 9000
//! cors_origin = "http://localhost:3000"
//! dev_mode = false
//!
//! [database]
//! path = ".taskboard/taskboard.db"
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! directory = ".taskboard/logs"
//! ```
//!
//! Environment overrides: `PORT`, `TASKBOARD_DB_PATH`, `TASKBOARD_CORS_ORIGIN`,
//! `TASKBOARD_LOG`, `TASKBOARD_LOG_DIR`. A `.env` file in the working
//! directory is loaded first.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding the config file and default database.
pub const TASKBOARD_DIR: &str = ".taskboard";

/// Config file name inside [`TASKBOARD_DIR`].
pub const CONFIG_FILE: &str = "taskboard.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskboardConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    /// Bind host; unset means loopback, or all interfaces in dev mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_port() -> u16 {
    9000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: None,
            port: default_port(),
            cors_origin: default_cors_origin(),
            dev_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseSection {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from(TASKBOARD_DIR).join("taskboard.db")
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid log format: {}. Use pretty or json.", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSection {
    /// `EnvFilter` directive, e.g. `info` or `taskboard=debug,tower_http=info`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// When set, logs are also written to a daily rolling file here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            directory: None,
        }
    }
}

/// Command-line values that take precedence over file and environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub db_path: Option<PathBuf>,
    pub dev_mode: bool,
    pub verbose: bool,
}

impl TaskboardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid taskboard.toml")
    }

    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create config directory: {}", parent.display())
                })?;
            }
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize taskboard.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Default config path relative to the working directory.
    pub fn default_path() -> PathBuf {
        PathBuf::from(TASKBOARD_DIR).join(CONFIG_FILE)
    }

    /// Config written by `taskboard init`: defaults, plus the database path
    /// when one was given on the command line.
    pub fn initial(db_path: Option<PathBuf>) -> Self {
        let mut config = Self::default();
        if let Some(path) = db_path {
            config.database.path = path;
        }
        config
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value '{}'", port))?;
        }
        if let Some(path) = lookup("TASKBOARD_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(origin) = lookup("TASKBOARD_CORS_ORIGIN") {
            self.server.cors_origin = origin;
        }
        if let Some(level) = lookup("TASKBOARD_LOG") {
            self.logging.level = level;
        }
        if let Some(dir) = lookup("TASKBOARD_LOG_DIR") {
            self.logging.directory = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    pub fn apply_cli(&mut self, overrides: &CliOverrides) {
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(path) = &overrides.db_path {
            self.database.path = path.clone();
        }
        if overrides.dev_mode {
            self.server.dev_mode = true;
        }
        if overrides.verbose {
            self.logging.level = "debug".to_string();
        }
    }

    /// Resolve the effective configuration: `.env`, file, environment, CLI.
    pub fn resolve(path: &Path, overrides: &CliOverrides) -> Result<Self> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();

        let mut config = Self::load_or_default(path)?;
        config.apply_env()?;
        config.apply_cli(overrides);
        Ok(config)
    }
}
