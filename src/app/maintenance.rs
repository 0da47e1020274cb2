use super::store::open_store;
use crate::config::Config;
use anyhow::{Context, Result};

/// `chatrelay check`: validate config and make sure the store answers.
pub async fn check(config: &Config) -> Result<String> {
    config.validate()?;
    let handle = open_store(&config.store)
        .await
        .context("failed to open session store")?;
    handle
        .store
        .ping()
        .await
        .context("session store did not answer")?;
    Ok(t!("cli.check_ok", backend = handle.store.backend_name()).to_string())
}

/// `chatrelay purge`: drop expired durable records.
pub async fn purge(config: &Config) -> Result<String> {
    config.validate_store()?;
    let handle = open_store(&config.store)
        .await
        .context("failed to open session store")?;
    let Some(sqlite) = handle.sqlite else {
        return Ok(t!("cli.purge_memory").to_string());
    };
    let count = sqlite.purge_expired().await?;
    tracing::info!(count, "purged expired sessions");
    Ok(t!("cli.purge_done", count = count).to_string())
}
