use std::sync::Arc;

use chatrelay::dispatch::{Dispatcher, Origin};
use chatrelay::error::RelayError;
use chatrelay::session::{SessionKey, TurnRole};

use super::session_harness::{ALL_BACKENDS, EchoGenerator, FailingGenerator, store_for};

#[tokio::test]
async fn failed_generation_keeps_user_turn_and_hides_details() {
    for backend in ALL_BACKENDS {
        let fixture = store_for(backend).await;
        let dispatcher = Dispatcher::new(fixture.store.clone(), Arc::new(FailingGenerator));
        let origin = Origin::new(9, 10);
        let key = SessionKey::new(9, 10);

        dispatcher.begin_session(&origin).await;
        let reply = dispatcher.inbound_text(&origin, "are you there?").await;

        assert!(reply.text.contains("Something went wrong"), "{backend}");
        assert!(!reply.text.contains("overloaded"), "{backend}");
        assert!(
            matches!(reply.failure, Some(RelayError::Generation(_))),
            "{backend}"
        );

        let session = fixture.store.get_or_create(key).await.unwrap();
        assert!(session.is_active(), "{backend}");
        assert_eq!(session.history().len(), 1, "{backend}");
        assert_eq!(session.history()[0].role, TurnRole::User, "{backend}");
        assert_eq!(session.history()[0].content, "are you there?", "{backend}");
    }
}

#[tokio::test]
async fn session_recovers_once_generation_works_again() {
    for backend in ALL_BACKENDS {
        let fixture = store_for(backend).await;
        let origin = Origin::new(9, 10);
        let key = SessionKey::new(9, 10);

        let failing = Dispatcher::new(fixture.store.clone(), Arc::new(FailingGenerator));
        failing.begin_session(&origin).await;
        failing.inbound_text(&origin, "one").await;

        let working = Dispatcher::new(fixture.store.clone(), Arc::new(EchoGenerator::default()));
        let reply = working.inbound_text(&origin, "two").await;
        assert_eq!(reply.text, "reply: two", "{backend}");

        let session = fixture.store.get_or_create(key).await.unwrap();
        let contents: Vec<_> = session.history().iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, ["one", "two", "reply: two"], "{backend}");
    }
}
