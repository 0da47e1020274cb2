use std::sync::Arc;
use std::time::Duration;

use chatrelay::dispatch::{Dispatcher, Origin};
use chatrelay::session::{SessionKey, TurnRole};

use super::session_harness::{ALL_BACKENDS, BarrierGenerator, EchoGenerator, store_for};

const MESSAGES: usize = 24;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_messages_for_one_key_are_all_recorded() {
    for backend in ALL_BACKENDS {
        let fixture = store_for(backend).await;
        let generator = Arc::new(EchoGenerator::with_delay(Duration::from_millis(2)));
        let dispatcher = Arc::new(Dispatcher::new(fixture.store.clone(), generator.clone()));
        let origin = Origin::new(300, 400);
        let key = SessionKey::new(300, 400);

        dispatcher.begin_session(&origin).await;

        let mut handles = Vec::with_capacity(MESSAGES);
        for i in 0..MESSAGES {
            let dispatcher = Arc::clone(&dispatcher);
            handles.push(tokio::spawn(async move {
                dispatcher.inbound_text(&origin, &format!("message {i}")).await
            }));
        }
        for handle in handles {
            let reply = handle.await.unwrap();
            assert!(!reply.is_failure(), "{backend}: {:?}", reply.failure);
        }

        let session = fixture.store.get_or_create(key).await.unwrap();
        let history = session.history();
        assert_eq!(history.len(), MESSAGES * 2, "{backend}");
        assert_eq!(generator.calls(), MESSAGES, "{backend}");

        // Each exchange is contiguous: a user turn immediately followed by its reply.
        for pair in history.chunks(2) {
            assert_eq!(pair[0].role, TurnRole::User, "{backend}");
            assert_eq!(pair[1].role, TurnRole::Assistant, "{backend}");
            assert_eq!(pair[1].content, format!("reply: {}", pair[0].content), "{backend}");
        }

        let mut seen: Vec<_> = history
            .iter()
            .filter(|t| t.role == TurnRole::User)
            .map(|t| t.content.clone())
            .collect();
        seen.sort();
        let mut expected: Vec<_> = (0..MESSAGES).map(|i| format!("message {i}")).collect();
        expected.sort();
        assert_eq!(seen, expected, "{backend}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_keys_generate_in_parallel() {
    for backend in ALL_BACKENDS {
        let fixture = store_for(backend).await;
        // Both calls must be in flight at once for either to return.
        let dispatcher = Arc::new(Dispatcher::new(
            fixture.store.clone(),
            Arc::new(BarrierGenerator::new(2)),
        ));
        let first = Origin::new(1, 1);
        let second = Origin::new(1, 2);
        dispatcher.begin_session(&first).await;
        dispatcher.begin_session(&second).await;

        let a = tokio::spawn({
            let dispatcher = Arc::clone(&dispatcher);
            async move { dispatcher.inbound_text(&first, "left").await }
        });
        let b = tokio::spawn({
            let dispatcher = Arc::clone(&dispatcher);
            async move { dispatcher.inbound_text(&second, "right").await }
        });

        let (a, b) = tokio::time::timeout(Duration::from_secs(10), async {
            (a.await.unwrap(), b.await.unwrap())
        })
        .await
        .unwrap_or_else(|_| panic!("{backend}: keys were serialized"));

        assert_eq!(a.text, "released", "{backend}");
        assert_eq!(b.text, "released", "{backend}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn begin_and_end_race_leaves_a_consistent_session() {
    for backend in ALL_BACKENDS {
        let fixture = store_for(backend).await;
        let dispatcher = Arc::new(Dispatcher::new(
            fixture.store.clone(),
            Arc::new(EchoGenerator::default()),
        ));
        let origin = Origin::new(8, 8);
        let key = SessionKey::new(8, 8);

        let mut handles = Vec::new();
        for i in 0..16 {
            let dispatcher = Arc::clone(&dispatcher);
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    dispatcher.begin_session(&origin).await
                } else {
                    dispatcher.end_session(&origin).await
                }
            }));
        }
        for handle in handles {
            assert!(!handle.await.unwrap().is_failure(), "{backend}");
        }

        let session = fixture.store.get_or_create(key).await.unwrap();
        assert!(session.history().is_empty(), "{backend}");
        assert_eq!(
            session.is_active(),
            dispatcher.session_active(key).await,
            "{backend}"
        );
    }
}
