use super::types::SessionKey;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily-populated map of per-key mutexes.
///
/// Slots are held weakly: a slot lives exactly as long as some task holds
/// or awaits its mutex. Whoever drops the last strong reference, a released
/// [`SessionLock`] or an abandoned `lock()` future, removes the entry.
/// Different keys never contend beyond a shard lookup.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    slots: Arc<SlotMap>,
}

type SlotMap = DashMap<SessionKey, Weak<Mutex<()>>>;

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`. Cancel-safe.
    pub async fn lock(&self, key: SessionKey) -> SessionLock {
        let slot = self.slot(key);
        let guard = slot.mutex().lock_owned().await;
        SessionLock {
            _guard: guard,
            slot,
        }
    }

    /// Number of keys currently held or awaited.
    pub fn active_keys(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, key: SessionKey) -> SlotRef {
        let mut entry = self.slots.entry(key).or_default();
        let mutex = entry.upgrade().unwrap_or_else(|| {
            let fresh = Arc::new(Mutex::new(()));
            *entry = Arc::downgrade(&fresh);
            fresh
        });
        drop(entry);
        SlotRef {
            key,
            mutex: Some(mutex),
            slots: Arc::clone(&self.slots),
        }
    }
}

/// One strong reference to a key's mutex. Dropping it prunes the map entry
/// when no other holder or waiter is left.
#[derive(Debug)]
struct SlotRef {
    key: SessionKey,
    mutex: Option<Arc<Mutex<()>>>,
    slots: Arc<SlotMap>,
}

impl SlotRef {
    fn mutex(&self) -> Arc<Mutex<()>> {
        self.mutex.clone().unwrap_or_default()
    }
}

impl Drop for SlotRef {
    fn drop(&mut self) {
        drop(self.mutex.take());
        self.slots
            .remove_if(&self.key, |_, slot| slot.strong_count() == 0);
    }
}

/// Exclusive hold on one session key. Released on drop.
#[derive(Debug)]
#[must_use = "the key is unlocked as soon as the guard is dropped"]
pub struct SessionLock {
    // Field order matters: the guard's reference goes before the slot prunes.
    _guard: OwnedMutexGuard<()>,
    slot: SlotRef,
}

impl SessionLock {
    pub fn key(&self) -> SessionKey {
        self.slot.key
    }
}
