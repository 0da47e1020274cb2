use super::store::{open_store, spawn_sweeper};
use crate::channels::TelegramGateway;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::gateway::{self, HealthState};
use crate::providers::create_generator;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Run the relay until Ctrl-C or SIGTERM.
pub async fn run(config: Config, locale: String) -> Result<()> {
    config.validate()?;

    let handle = open_store(&config.store)
        .await
        .context("failed to open session store")?;
    let generator = create_generator(&config.generation)?;
    if let Err(err) = generator.warmup().await {
        tracing::debug!(error = %err, "generator warmup failed");
    }

    let shutdown = CancellationToken::new();
    let dispatcher = Arc::new(
        Dispatcher::new(Arc::clone(&handle.store), generator)
            .with_max_context_chars(config.dispatch.max_context_chars)
            .with_locale(locale)
            .with_shutdown(shutdown.clone()),
    );

    let ready = Arc::new(AtomicBool::new(false));
    let telegram = Arc::new(
        TelegramGateway::new(&config.telegram, dispatcher).with_ready_flag(Arc::clone(&ready)),
    );

    let mut background = Vec::new();
    if config.health.enabled {
        let state = HealthState {
            store: Arc::clone(&handle.store),
            ready,
        };
        let health = config.health.clone();
        let token = shutdown.clone();
        background.push(tokio::spawn(async move {
            if let Err(err) = gateway::serve(&health, state, token).await {
                tracing::error!(error = %err, "health endpoint failed");
            }
        }));
    }
    if let Some(sqlite) = handle.sqlite.clone() {
        background.push(spawn_sweeper(
            sqlite,
            Duration::from_secs(config.store.sweep_interval_secs),
            shutdown.clone(),
        ));
    }

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_signal().await;
            tracing::info!("shutdown requested");
            shutdown.cancel();
        }
    });

    println!("◆ {}", t!("cli.started"));
    println!("   {}", t!("cli.store_backend", backend = handle.store.backend_name()));
    if config.health.enabled {
        println!(
            "   {}",
            t!("cli.health_addr", host = config.health.host, port = config.health.port)
        );
    }
    println!("   {}", t!("cli.stop_hint"));

    let result = telegram.run(shutdown.clone()).await;
    shutdown.cancel();
    for task in background {
        let _ = task.await;
    }

    result.context("telegram gateway failed")
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
