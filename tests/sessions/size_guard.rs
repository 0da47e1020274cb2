use std::sync::Arc;

use chatrelay::dispatch::{Dispatcher, Origin};
use chatrelay::session::{SessionKey, SessionStore, TurnRole};

use super::session_harness::{ALL_BACKENDS, EchoGenerator, FixedGenerator, store_for};

const CHAT: i64 = 5;
const USER: i64 = 6;

async fn seed_history(store: &dyn SessionStore, key: SessionKey, chars: usize) {
    let _lock = store.lock(key).await;
    let mut session = store.get_or_create(key).await.unwrap();
    session.push_turn(TurnRole::User, "a".repeat(chars));
    store.save(&mut session).await.unwrap();
}

#[tokio::test]
async fn oversized_context_is_cleared_before_generation() {
    for backend in ALL_BACKENDS {
        let fixture = store_for(backend).await;
        let generator = Arc::new(EchoGenerator::default());
        let dispatcher = Dispatcher::new(fixture.store.clone(), generator.clone());
        let origin = Origin::new(CHAT, USER);
        let key = SessionKey::new(CHAT, USER);

        dispatcher.begin_session(&origin).await;
        seed_history(fixture.store.as_ref(), key, 9_900).await;

        let reply = dispatcher.inbound_text(&origin, &"b".repeat(200)).await;

        assert!(reply.text.contains("too large"), "{backend}");
        assert!(!reply.is_failure(), "{backend}");
        assert_eq!(generator.calls(), 0, "{backend}");
        let session = fixture.store.get_or_create(key).await.unwrap();
        assert!(session.is_active(), "{backend}");
        assert!(session.history().is_empty(), "{backend}");
    }
}

#[tokio::test]
async fn context_exactly_at_limit_still_generates() {
    for backend in ALL_BACKENDS {
        let fixture = store_for(backend).await;
        let generator = Arc::new(FixedGenerator("ok".into()));
        let dispatcher = Dispatcher::new(fixture.store.clone(), generator)
            .with_max_context_chars(1_000);
        let origin = Origin::new(CHAT, USER);
        let key = SessionKey::new(CHAT, USER);

        dispatcher.begin_session(&origin).await;
        seed_history(fixture.store.as_ref(), key, 900).await;

        // 900 + 100 == limit; the reply then pushes it over and rotates.
        let reply = dispatcher.inbound_text(&origin, &"c".repeat(100)).await;

        assert!(reply.text.starts_with("ok"), "{backend}");
        assert!(reply.text.contains("reached its limit"), "{backend}");
        let session = fixture.store.get_or_create(key).await.unwrap();
        assert!(session.is_active(), "{backend}");
        assert!(session.history().is_empty(), "{backend}");
    }
}

#[tokio::test]
async fn small_context_is_kept_after_reply() {
    for backend in ALL_BACKENDS {
        let fixture = store_for(backend).await;
        let dispatcher = Dispatcher::new(fixture.store.clone(), Arc::new(EchoGenerator::default()))
            .with_max_context_chars(1_000);
        let origin = Origin::new(CHAT, USER);
        let key = SessionKey::new(CHAT, USER);

        dispatcher.begin_session(&origin).await;
        let reply = dispatcher.inbound_text(&origin, "short").await;

        assert_eq!(reply.text, "reply: short", "{backend}");
        let session = fixture.store.get_or_create(key).await.unwrap();
        assert_eq!(session.history().len(), 2, "{backend}");
        assert!(session.context_size() <= 1_000, "{backend}");
    }
}
