use std::sync::Arc;

use chatrelay::dispatch::{Dispatcher, Intent, Origin, ParticipantProfile};
use chatrelay::session::{SessionKey, TurnRole};

use super::session_harness::{ALL_BACKENDS, EchoGenerator, store_for};

const CHAT: i64 = -1001;
const USER: i64 = 77;

#[tokio::test]
async fn begin_talk_end_cycle_on_every_backend() {
    for backend in ALL_BACKENDS {
        let fixture = store_for(backend).await;
        let generator = Arc::new(EchoGenerator::default());
        let dispatcher = Dispatcher::new(fixture.store.clone(), generator.clone());
        let origin = Origin::new(CHAT, USER);
        let key = SessionKey::new(CHAT, USER);

        let reply = dispatcher.inbound_text(&origin, "hello?").await;
        assert!(reply.text.contains("/begin_chat"), "{backend}");
        assert_eq!(generator.calls(), 0, "{backend}");

        let reply = dispatcher.begin_session(&origin).await;
        assert!(reply.text.contains("session started"), "{backend}");
        assert!(dispatcher.session_active(key).await, "{backend}");

        let reply = dispatcher.inbound_text(&origin, "first").await;
        assert_eq!(reply.text, "reply: first", "{backend}");
        let reply = dispatcher.inbound_text(&origin, "second").await;
        assert_eq!(reply.text, "reply: second", "{backend}");

        let session = fixture.store.get_or_create(key).await.unwrap();
        let roles: Vec<_> = session.history().iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            [
                TurnRole::User,
                TurnRole::Assistant,
                TurnRole::User,
                TurnRole::Assistant
            ],
            "{backend}"
        );
        assert_eq!(session.history()[2].content, "second", "{backend}");

        let reply = dispatcher.end_session(&origin).await;
        assert!(reply.text.contains("session ended"), "{backend}");
        let session = fixture.store.get_or_create(key).await.unwrap();
        assert!(!session.is_active(), "{backend}");
        assert!(session.history().is_empty(), "{backend}");

        let reply = dispatcher.end_session(&origin).await;
        assert!(reply.text.contains("already inactive"), "{backend}");
        assert!(!reply.is_failure(), "{backend}");
    }
}

#[tokio::test]
async fn restart_forgets_the_session() {
    for backend in ALL_BACKENDS {
        let fixture = store_for(backend).await;
        let dispatcher = Dispatcher::new(fixture.store.clone(), Arc::new(EchoGenerator::default()));
        let origin = Origin::new(CHAT, USER);
        let key = SessionKey::new(CHAT, USER);

        dispatcher.begin_session(&origin).await;
        dispatcher.inbound_text(&origin, "remember me").await;

        let reply = dispatcher.dispatch(Intent::Restart(origin)).await;
        assert!(reply.text.contains("/begin_chat"), "{backend}");
        assert!(!dispatcher.session_active(key).await, "{backend}");
        let session = fixture.store.get_or_create(key).await.unwrap();
        assert_eq!(session.revision(), 0, "{backend}");
    }
}

#[tokio::test]
async fn participants_in_one_conversation_are_isolated() {
    for backend in ALL_BACKENDS {
        let fixture = store_for(backend).await;
        let dispatcher = Dispatcher::new(fixture.store.clone(), Arc::new(EchoGenerator::default()));
        let alice = Origin::new(CHAT, 1);
        let bob = Origin::new(CHAT, 2);

        dispatcher.begin_session(&alice).await;
        dispatcher.inbound_text(&alice, "alice speaking").await;

        let reply = dispatcher.inbound_text(&bob, "bob speaking").await;
        assert!(reply.text.contains("/begin_chat"), "{backend}");

        let alice_session = fixture.store.get_or_create(SessionKey::new(CHAT, 1)).await.unwrap();
        let bob_session = fixture.store.get_or_create(SessionKey::new(CHAT, 2)).await.unwrap();
        assert_eq!(alice_session.history().len(), 2, "{backend}");
        assert!(bob_session.history().is_empty(), "{backend}");
        assert!(!bob_session.is_active(), "{backend}");
    }
}

#[tokio::test]
async fn whoami_reports_status_without_side_effects() {
    for backend in ALL_BACKENDS {
        let fixture = store_for(backend).await;
        let dispatcher = Dispatcher::new(fixture.store.clone(), Arc::new(EchoGenerator::default()));
        let origin = Origin::new(CHAT, USER);
        let profile = ParticipantProfile {
            first_name: "Grace".into(),
            last_name: Some("Hopper".into()),
            username: Some("grace".into()),
        };

        let reply = dispatcher.whoami(&origin, &profile).await;
        assert!(reply.text.contains("Grace Hopper"), "{backend}");
        assert!(reply.text.contains("@grace"), "{backend}");
        assert!(reply.text.contains("inactive"), "{backend}");

        let untouched = fixture.store.get_or_create(SessionKey::new(CHAT, USER)).await.unwrap();
        assert_eq!(untouched.revision(), 0, "{backend}");

        dispatcher.begin_session(&origin).await;
        let reply = dispatcher.whoami(&origin, &profile).await;
        assert!(reply.text.contains("Session: active"), "{backend}");
    }
}

#[tokio::test]
async fn anonymous_origin_is_refused() {
    let fixture = store_for(ALL_BACKENDS[0]).await;
    let generator = Arc::new(EchoGenerator::default());
    let dispatcher = Dispatcher::new(fixture.store.clone(), generator.clone());

    let reply = dispatcher.inbound_text(&Origin::anonymous(CHAT), "hi").await;

    assert!(reply.is_failure());
    assert_eq!(generator.calls(), 0);
}
