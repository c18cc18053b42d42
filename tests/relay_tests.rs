//! Integration tests for the quota-limited relay
//!
//! Covers the session against an in-process backend and the webhook client against a
//! local HTTP stub.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use aichat::relay::{
    APOLOGY, ChatBackend, HISTORY_LIMIT, ManualClock, QUOTA_KEY, RelayResult, RelaySession,
    SendOutcome, SendRejection, WebhookBackend, WebhookReply, WebhookRequest, limit_message,
};
use aichat::store::{KeyValueStore, MemoryStore};
use aichat::types::Role;
use async_trait::async_trait;
use time::macros::datetime;

/// Answers every message and counts how often it was called.
#[derive(Default)]
struct CountingBackend {
    calls: AtomicUsize,
}

#[async_trait]
impl ChatBackend for CountingBackend {
    async fn relay(&self, request: &WebhookRequest) -> RelayResult<WebhookReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(WebhookReply::Answer(format!("echo: {}", request.message)))
    }
}

fn ready_session(store: Arc<dyn KeyValueStore>, clock: Arc<ManualClock>) -> RelaySession {
    let mut session = RelaySession::new(store, clock, 50);
    session.begin_loading();
    session.finish_loading().expect("load");
    session
}

fn fresh() -> (RelaySession, Arc<dyn KeyValueStore>, Arc<ManualClock>) {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(datetime!(2026-10-18 10:00 UTC)));
    let session = ready_session(Arc::clone(&store), Arc::clone(&clock));
    (session, store, clock)
}

mod session_tests {
    use super::*;

    #[tokio::test]
    async fn test_fifty_sends_then_blocked_without_network() {
        let (mut session, _store, _clock) = fresh();
        let backend = CountingBackend::default();

        for i in 1..=50u32 {
            let outcome = session
                .send(&backend, &format!("message {i}"))
                .await
                .expect("send");
            assert_eq!(outcome, SendOutcome::Replied { remaining: 50 - i });
        }

        let blocked = session.send(&backend, "one more").await;
        assert!(matches!(blocked, Err(SendRejection::QuotaExceeded)));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 50);
        assert_eq!(
            session.log().last().map(|entry| entry.text.clone()),
            Some(limit_message(50))
        );
        assert_eq!(session.remaining().expect("remaining"), 0);
    }

    #[tokio::test]
    async fn test_history_keeps_last_ten_in_order() {
        let (mut session, _store, _clock) = fresh();
        let backend = CountingBackend::default();

        for i in 0..8 {
            session.send(&backend, &format!("q{i}")).await.expect("send");
        }

        let history: Vec<_> = session.history().iter().cloned().collect();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].content, "q3");
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[9].content, "echo: q7");
        assert_eq!(history[9].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_quota_resets_next_day() {
        let (mut session, store, clock) = fresh();
        store
            .set(QUOTA_KEY, r#"{"count":50,"date":"2026-10-18"}"#)
            .expect("seed");
        let backend = CountingBackend::default();

        assert!(matches!(
            session.send(&backend, "hi").await,
            Err(SendRejection::QuotaExceeded)
        ));

        clock.advance(time::Duration::days(1));
        let outcome = session.send(&backend, "hi again").await.expect("send");
        assert_eq!(outcome, SendOutcome::Replied { remaining: 49 });
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_quota_is_shared_through_the_store() {
        let (mut first, store, clock) = fresh();
        let backend = CountingBackend::default();
        first.send(&backend, "hello").await.expect("send");

        let second = ready_session(store, clock);
        assert_eq!(second.remaining().expect("remaining"), 49);
    }
}

mod webhook_tests {
    use super::*;
    use axum::{
        Json, Router,
        http::StatusCode,
        routing::post,
    };
    use serde_json::{Value, json};

    async fn spawn_stub() -> String {
        let app = Router::new()
            .route(
                "/fail",
                post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            )
            .route(
                "/json",
                post(|| async { Json(json!({ "output": "from json" })) }),
            )
            .route("/text", post(|| async { "plain reply" }))
            .route(
                "/echo",
                post(|Json(body): Json<Value>| async move {
                    let left = body["context"]["messagesLeft"].clone();
                    let turns = body["conversationHistory"]
                        .as_array()
                        .map(Vec::len)
                        .unwrap_or_default();
                    Json(json!({ "response": format!("{left} left, {turns} turns") }))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_server_error_is_rendered_and_not_counted() {
        let base = spawn_stub().await;
        let backend = WebhookBackend::new(format!("{base}/fail"));
        let (mut session, _store, _clock) = fresh();

        let outcome = session.send(&backend, "hello").await.expect("send");
        assert_eq!(outcome, SendOutcome::Rejected);
        assert_eq!(
            session.log().last().map(|entry| entry.text.as_str()),
            Some("Error: 500 - Internal Server Error")
        );
        assert_eq!(session.remaining().expect("remaining"), 50);
    }

    #[tokio::test]
    async fn test_json_and_text_replies() {
        let base = spawn_stub().await;
        let request = WebhookRequest {
            message: "hi".into(),
            conversation_history: Vec::new(),
            context: aichat::relay::RelayContext { messages_left: 49 },
        };

        let json_reply = WebhookBackend::new(format!("{base}/json"))
            .relay(&request)
            .await
            .expect("json");
        assert_eq!(json_reply, WebhookReply::Answer("from json".into()));

        let text_reply = WebhookBackend::new(format!("{base}/text"))
            .relay(&request)
            .await
            .expect("text");
        assert_eq!(text_reply, WebhookReply::Answer("plain reply".into()));
    }

    #[tokio::test]
    async fn test_request_carries_history_and_allowance() {
        let base = spawn_stub().await;
        let backend = WebhookBackend::new(format!("{base}/echo"));
        let (mut session, _store, _clock) = fresh();

        session.send(&backend, "first").await.expect("send");
        assert_eq!(
            session.log().last().map(|entry| entry.text.as_str()),
            Some("49 left, 1 turns")
        );

        session.send(&backend, "second").await.expect("send");
        assert_eq!(
            session.log().last().map(|entry| entry.text.as_str()),
            Some("48 left, 3 turns")
        );
    }

    #[tokio::test]
    async fn test_unreachable_webhook_apologizes() {
        let backend = WebhookBackend::new("http://127.0.0.1:1/webhook");
        let (mut session, _store, _clock) = fresh();

        let outcome = session.send(&backend, "hello").await.expect("send");
        assert_eq!(outcome, SendOutcome::Failed);
        assert_eq!(
            session.log().last().map(|entry| entry.text.as_str()),
            Some(APOLOGY)
        );
        assert!(session.log().iter().all(|entry| !entry.pending));
        assert_eq!(session.remaining().expect("remaining"), 50);
    }
}
