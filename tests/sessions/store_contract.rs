use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chatrelay::error::StoreError;
use chatrelay::session::{SessionKey, SessionStore, TurnRole};

use super::session_harness::{ALL_BACKENDS, store_for};

#[tokio::test]
async fn missing_key_reads_as_fresh_inactive_session() {
    for backend in ALL_BACKENDS {
        let fixture = store_for(backend).await;
        let key = SessionKey::new(1, 1);

        let session = fixture.store.get_or_create(key).await.unwrap();

        assert_eq!(session.key, key, "{backend}");
        assert!(!session.is_active(), "{backend}");
        assert!(session.history().is_empty(), "{backend}");
        assert!(!fixture.store.is_active(key).await.unwrap(), "{backend}");
    }
}

#[tokio::test]
async fn save_round_trips_history() {
    for backend in ALL_BACKENDS {
        let fixture = store_for(backend).await;
        let key = SessionKey::new(-5, 6);

        let mut session = fixture.store.get_or_create(key).await.unwrap();
        session.push_turn(TurnRole::User, "привет");
        session.push_turn(TurnRole::Assistant, "hello 👋");
        let created = session.created_at;
        fixture.store.save(&mut session).await.unwrap();
        assert!(session.updated_at >= created, "{backend}");

        let loaded = fixture.store.get_or_create(key).await.unwrap();
        assert_eq!(loaded.history(), session.history(), "{backend}");
        assert_eq!(loaded.revision(), session.revision(), "{backend}");
        assert_eq!(loaded.context_size(), "привет".chars().count() + 7, "{backend}");
    }
}

#[tokio::test]
async fn stale_copy_cannot_overwrite_newer_write() {
    for backend in ALL_BACKENDS {
        let fixture = store_for(backend).await;
        let key = SessionKey::new(2, 3);

        let mut first = fixture.store.get_or_create(key).await.unwrap();
        let mut stale = first.clone();
        first.push_turn(TurnRole::User, "winner");
        fixture.store.save(&mut first).await.unwrap();

        stale.push_turn(TurnRole::User, "loser");
        let err = fixture.store.save(&mut stale).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }), "{backend}: {err}");

        let loaded = fixture.store.get_or_create(key).await.unwrap();
        assert_eq!(loaded.history()[0].content, "winner", "{backend}");
    }
}

#[tokio::test]
async fn delete_is_idempotent() {
    for backend in ALL_BACKENDS {
        let fixture = store_for(backend).await;
        let key = SessionKey::new(4, 4);

        fixture.store.delete(key).await.unwrap();
        let mut session = fixture.store.get_or_create(key).await.unwrap();
        fixture.store.save(&mut session).await.unwrap();
        fixture.store.delete(key).await.unwrap();
        fixture.store.delete(key).await.unwrap();

        let fresh = fixture.store.get_or_create(key).await.unwrap();
        assert_eq!(fresh.revision(), 0, "{backend}");
    }
}

#[tokio::test]
async fn ping_succeeds_on_healthy_backends() {
    for backend in ALL_BACKENDS {
        let fixture = store_for(backend).await;
        fixture.store.ping().await.unwrap();
        assert_eq!(fixture.store.backend_name(), backend.to_string());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lock_is_exclusive_per_key() {
    for backend in ALL_BACKENDS {
        let fixture = store_for(backend).await;
        let store: Arc<dyn SessionStore> = fixture.store.clone();
        let key = SessionKey::new(7, 7);
        let inside = Arc::new(AtomicUsize::new(0));
        let overlap = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let inside = Arc::clone(&inside);
            let overlap = Arc::clone(&overlap);
            handles.push(tokio::spawn(async move {
                let _lock = store.lock(key).await;
                if inside.fetch_add(1, Ordering::SeqCst) > 0 {
                    overlap.fetch_add(1, Ordering::SeqCst);
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(overlap.load(Ordering::SeqCst), 0, "{backend}");
    }
}
