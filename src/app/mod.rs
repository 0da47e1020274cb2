mod maintenance;
mod service;
mod store;

pub use maintenance::{check, purge};
pub use store::{StoreHandle, open_store, spawn_sweeper};

use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::observability::init_logging;
use anyhow::Result;

/// Entry point shared by the binary: load config, set up logging and locale,
/// then run the selected command.
pub async fn execute(cli: Cli) -> Result<()> {
    let mut config = match cli.config.as_deref() {
        Some(path) => Config::load_or_init_at(path)?,
        None => Config::load_or_init()?,
    };
    config.apply_env_overrides();
    init_logging(&config.logging);
    let locale = config.apply_locale();
    tracing::debug!(
        config = %config.config_path.display(),
        locale = %locale,
        "configuration loaded"
    );

    match cli.resolved_command() {
        Commands::Run => service::run(config, locale).await,
        Commands::Check => {
            println!("✓ {}", check(&config).await?);
            Ok(())
        }
        Commands::Purge => {
            println!("✓ {}", purge(&config).await?);
            Ok(())
        }
    }
}
