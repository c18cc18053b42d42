//! Integration tests for the `/api/auth` endpoint and the client gate talking to it

use std::sync::Arc;

use aichat::access::{AccessCodes, AccessGate, GateOutcome, HttpVerifier};
use aichat::server::{AUTH_ROUTE, router};
use aichat::store::{KeyValueStore, MemoryStore};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn call(codes: AccessCodes, method: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(AUTH_ROUTE)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");
    let response = router(codes).oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let json = serde_json::from_slice(&bytes).expect("json body");
    (status, json)
}

mod endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn test_lowercase_default_code_succeeds() {
        let (status, body) = call(AccessCodes::default(), "POST", r#"{"code":"aichat2025"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true }));
    }

    #[tokio::test]
    async fn test_wrong_code_is_unauthorized() {
        let (status, body) = call(AccessCodes::default(), "POST", r#"{"code":"WRONG"}"#).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "success": false }));
    }

    #[tokio::test]
    async fn test_other_methods_are_not_allowed() {
        for method in ["GET", "PUT", "DELETE", "PATCH"] {
            let (status, body) =
                call(AccessCodes::default(), method, r#"{"code":"AICHAT2025"}"#).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method}");
            assert_eq!(body, json!({ "error": "Method not allowed" }));
        }

        let (status, _) = call(AccessCodes::default(), "GET", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_missing_or_malformed_body_is_invalid() {
        for body in ["", "{}", "not json", r#"{"code":42}"#] {
            let (status, json) = call(AccessCodes::default(), "POST", body).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{body:?}");
            assert_eq!(json, json!({ "success": false }));
        }
    }

    #[tokio::test]
    async fn test_configured_list_replaces_default() {
        let codes = AccessCodes::from_env_value(Some("ALPHA,BETA"));
        let (status, _) = call(codes.clone(), "POST", r#"{"code":"beta"}"#).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(codes, "POST", r#"{"code":"AICHAT2025"}"#).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

mod gate_tests {
    use super::*;

    async fn spawn_auth_service(codes: AccessCodes) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, router(codes)).await.expect("serve");
        });
        format!("http://{addr}{AUTH_ROUTE}")
    }

    #[tokio::test]
    async fn test_gate_verifies_over_http_and_persists_flag() {
        let endpoint = spawn_auth_service(AccessCodes::default()).await;
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let gate = AccessGate::new(HttpVerifier::new(endpoint), Arc::clone(&store));

        assert_eq!(gate.submit("WRONG").await, GateOutcome::Invalid);
        assert!(!gate.is_verified());

        assert_eq!(gate.submit("aichat2025").await, GateOutcome::Verified);
        assert!(gate.is_verified());
        assert_eq!(
            store.get("aichat-auth").expect("read"),
            Some("verified".to_string())
        );
    }

    #[tokio::test]
    async fn test_unreachable_service_fails() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let gate = AccessGate::new(
            HttpVerifier::new(format!("http://127.0.0.1:1{AUTH_ROUTE}")),
            store,
        );
        assert_eq!(gate.submit("AICHAT2025").await, GateOutcome::Failed);
        assert!(!gate.is_verified());
    }
}
