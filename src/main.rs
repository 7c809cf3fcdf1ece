use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use taskboard::config::{CliOverrides, TaskboardConfig};

mod cmd;

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(version, about = "Project kanban board server")]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to taskboard.toml
    #[arg(
        long,
        global = true,
        env = "TASKBOARD_CONFIG",
        default_value_os_t = TaskboardConfig::default_path()
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the board server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
        /// SQLite database file
        #[arg(long)]
        db_path: Option<PathBuf>,
        /// Permissive CORS and bind on all interfaces
        #[arg(long)]
        dev: bool,
        /// Open the board in a browser once the server is up
        #[arg(long)]
        open: bool,
    },
    /// Create the database and a default config file
    Init {
        /// SQLite database file
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// Print the effective configuration
    Config,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        let mut overrides = CliOverrides {
            verbose: self.verbose,
            ..CliOverrides::default()
        };
        match &self.command {
            Commands::Serve {
                port,
                db_path,
                dev,
                ..
            } => {
                overrides.port = *port;
                overrides.db_path = db_path.clone();
                overrides.dev_mode = *dev;
            }
            Commands::Init { db_path } => overrides.db_path = db_path.clone(),
            Commands::Config => {}
        }
        overrides
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = TaskboardConfig::resolve(&cli.config, &cli.overrides())?;
    let _log_guard = taskboard::logging::init(&config.logging)?;

    match &cli.command {
        Commands::Serve { open, .. } => cmd::cmd_serve(&config, *open).await?,
        Commands::Init { db_path } => cmd::cmd_init(&cli.config, &config, db_path.clone())?,
        Commands::Config => cmd::cmd_config(&cli.config, &config)?,
    }

    Ok(())
}
