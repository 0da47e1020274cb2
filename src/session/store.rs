use super::locks::SessionLock;
use super::types::{Session, SessionKey};
use crate::error::StoreResult;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`SessionStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Async session persistence contract shared by every backend.
///
/// A lookup-miss is never an error: `get_or_create` synthesizes a fresh
/// inactive session instead. Callers that read-modify-write must hold the
/// key's [`SessionLock`] across the whole sequence.
pub trait SessionStore: Send + Sync {
    /// Short backend label for logs and readiness output.
    fn backend_name(&self) -> &'static str;

    /// Acquire the per-key critical section.
    fn lock(&self, key: SessionKey) -> StoreFuture<'_, SessionLock>;

    /// Load the session for `key`, or a default inactive one when absent or expired.
    fn get_or_create(&self, key: SessionKey) -> StoreFuture<'_, StoreResult<Session>>;

    /// Atomically replace the stored record, refreshing `updated_at`.
    fn save<'a>(&'a self, session: &'a mut Session) -> StoreFuture<'a, StoreResult<()>>;

    /// Remove the record. Removing an absent key succeeds.
    fn delete(&self, key: SessionKey) -> StoreFuture<'_, StoreResult<()>>;

    /// Whether a live record exists and is active. Never creates a record.
    fn is_active(&self, key: SessionKey) -> StoreFuture<'_, StoreResult<bool>>;

    /// Cheap reachability check.
    fn ping(&self) -> StoreFuture<'_, StoreResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
