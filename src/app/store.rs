use crate::config::{StoreBackend, StoreConfig};
use crate::error::StoreError;
use crate::session::{MemorySessionStore, SessionStore, SqliteSessionStore, SqliteStoreOptions};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// The configured store, plus the concrete durable handle when there is one
/// (the sweeper and `purge` need it).
pub struct StoreHandle {
    pub store: Arc<dyn SessionStore>,
    pub sqlite: Option<Arc<SqliteSessionStore>>,
}

pub async fn open_store(config: &StoreConfig) -> Result<StoreHandle, StoreError> {
    match config.backend {
        StoreBackend::Memory => Ok(StoreHandle {
            store: Arc::new(MemorySessionStore::new()),
            sqlite: None,
        }),
        StoreBackend::Sqlite => {
            let path = config.resolved_sqlite_path();
            let options = SqliteStoreOptions {
                ttl: Duration::from_secs(config.ttl_secs),
                namespace: config.namespace.clone(),
            };
            let sqlite = Arc::new(SqliteSessionStore::open(&path, options).await?);
            tracing::info!(path = %path.display(), ttl_secs = config.ttl_secs, "opened sqlite session store");
            Ok(StoreHandle {
                store: sqlite.clone(),
                sqlite: Some(sqlite),
            })
        }
    }
}

/// Periodically delete expired durable records until `shutdown` fires.
pub fn spawn_sweeper(
    store: Arc<SqliteSessionStore>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let interval = interval.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "swept expired sessions"),
                Err(err) => tracing::warn!(error = %err, "session sweep failed"),
            }
        }
        tracing::debug!("session sweeper stopped");
    })
}
