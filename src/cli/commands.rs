use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `chatrelay` - Telegram chat relay with per-participant conversation sessions.
#[derive(Parser, Debug)]
#[command(name = "chatrelay")]
#[command(version)]
#[command(about = "A Telegram relay that keeps per-participant conversation sessions.", long_about = None)]
pub struct Cli {
    /// Path to config.toml (default: ~/.chatrelay/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the relay: Telegram gateway, session store, health endpoint (default)
    Run,

    /// Validate the configuration and check the session store
    Check,

    /// Remove expired records from the durable session store
    Purge,
}

impl Cli {
    pub fn resolved_command(&self) -> Commands {
        self.command.unwrap_or(Commands::Run)
    }
}
