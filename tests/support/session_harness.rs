#![allow(dead_code)]

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Barrier;

use chatrelay::error::GenerationError;
use chatrelay::providers::Generator;
use chatrelay::session::{
    MemorySessionStore, SessionStore, SqliteSessionStore, SqliteStoreOptions, Turn,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Sqlite,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Sqlite => f.write_str("sqlite"),
        }
    }
}

pub const ALL_BACKENDS: [Backend; 2] = [Backend::Memory, Backend::Sqlite];

/// A store plus whatever keeps its files alive.
pub struct StoreFixture {
    pub store: Arc<dyn SessionStore>,
    pub sqlite: Option<Arc<SqliteSessionStore>>,
    _dir: Option<TempDir>,
}

pub async fn store_for(backend: Backend) -> StoreFixture {
    store_with_options(backend, SqliteStoreOptions::default()).await
}

pub async fn store_with_options(backend: Backend, options: SqliteStoreOptions) -> StoreFixture {
    match backend {
        Backend::Memory => StoreFixture {
            store: Arc::new(MemorySessionStore::new()),
            sqlite: None,
            _dir: None,
        },
        Backend::Sqlite => {
            let dir = TempDir::new().expect("tempdir");
            let sqlite = Arc::new(
                SqliteSessionStore::open(&dir.path().join("sessions.db"), options)
                    .await
                    .expect("sqlite store should open"),
            );
            StoreFixture {
                store: sqlite.clone(),
                sqlite: Some(sqlite),
                _dir: Some(dir),
            }
        }
    }
}

/// Replies `reply: <last user text>` and counts calls.
#[derive(Default)]
pub struct EchoGenerator {
    pub calls: AtomicUsize,
    pub delay: Option<Duration>,
}

impl EchoGenerator {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Some(delay),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, history: &[Turn]) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let last = history.last().map(|t| t.content.as_str()).unwrap_or_default();
        Ok(format!("reply: {last}"))
    }
}

/// Always replies with the same text.
pub struct FixedGenerator(pub String);

#[async_trait]
impl Generator for FixedGenerator {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn generate(&self, _history: &[Turn]) -> Result<String, GenerationError> {
        Ok(self.0.clone())
    }
}

pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _history: &[Turn]) -> Result<String, GenerationError> {
        Err(GenerationError::Status {
            provider: "failing".into(),
            status: 529,
            body: "overloaded".into(),
        })
    }
}

/// Every call waits at a shared barrier, so `n` calls only finish once
/// `n` of them are in flight at the same time.
pub struct BarrierGenerator {
    barrier: Barrier,
}

impl BarrierGenerator {
    pub fn new(parties: usize) -> Self {
        Self {
            barrier: Barrier::new(parties),
        }
    }
}

#[async_trait]
impl Generator for BarrierGenerator {
    fn name(&self) -> &str {
        "barrier"
    }

    async fn generate(&self, _history: &[Turn]) -> Result<String, GenerationError> {
        self.barrier.wait().await;
        Ok("released".into())
    }
}
