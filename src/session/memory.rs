use super::locks::{KeyedLocks, SessionLock};
use super::store::{SessionStore, StoreFuture};
use super::types::{Session, SessionKey};
use crate::error::{StoreError, StoreResult};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Volatile in-process backend.
///
/// Sessions live in a sharded map, so operations on different keys never
/// serialize on a shared lock. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<SessionKey, Session>,
    locks: KeyedLocks,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Keys currently locked or awaited.
    pub fn locked_keys(&self) -> usize {
        self.locks.active_keys()
    }

    fn replace(&self, session: &mut Session) -> StoreResult<()> {
        match self.sessions.entry(session.key) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().revision != session.revision {
                    return Err(StoreError::Conflict {
                        key: session.key,
                        expected: session.revision,
                    });
                }
                session.touch();
                session.revision += 1;
                occupied.insert(session.clone());
            }
            Entry::Vacant(vacant) => {
                if session.revision != 0 {
                    tracing::debug!(
                        key = %session.key,
                        revision = session.revision,
                        "saving a session whose record was deleted meanwhile"
                    );
                }
                session.touch();
                session.revision += 1;
                vacant.insert(session.clone());
            }
        }
        Ok(())
    }
}

impl SessionStore for MemorySessionStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn lock(&self, key: SessionKey) -> StoreFuture<'_, SessionLock> {
        Box::pin(self.locks.lock(key))
    }

    fn get_or_create(&self, key: SessionKey) -> StoreFuture<'_, StoreResult<Session>> {
        Box::pin(async move {
            Ok(self
                .sessions
                .get(&key)
                .map_or_else(|| Session::new(key), |stored| stored.clone()))
        })
    }

    fn save<'a>(&'a self, session: &'a mut Session) -> StoreFuture<'a, StoreResult<()>> {
        Box::pin(async move { self.replace(session) })
    }

    fn delete(&self, key: SessionKey) -> StoreFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            self.sessions.remove(&key);
            Ok(())
        })
    }

    fn is_active(&self, key: SessionKey) -> StoreFuture<'_, StoreResult<bool>> {
        Box::pin(async move {
            Ok(self
                .sessions
                .get(&key)
                .is_some_and(|stored| stored.is_active()))
        })
    }
}
