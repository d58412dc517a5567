//! In-process HTTP tests
//!
//! Drives the full router (middleware stack included) with `oneshot`
//! requests, no socket involved: status codes, error envelopes, and the
//! request-id header contract.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use croupier::api::ApiServer;
use croupier::crash::scripted_source;
use croupier::{CroupierConfig, MemoryStore};

fn router() -> axum::Router {
    let config = CroupierConfig::default();
    let store = Arc::new(MemoryStore::new(config.bank.starting_credits));
    let server = ApiServer::new(config, store);
    let (app, _engine) = server.app(scripted_source(vec![]));
    app
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_reports_ok() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-abc")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.headers()["x-request-id"], "req-abc");
}

#[tokio::test]
async fn bets_without_a_token_are_unauthorized() {
    let response = router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/crash/bet")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"amount": 100}"#))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn tampered_blackjack_state_is_unauthorized() {
    let config = CroupierConfig::default();
    let verifier = croupier::auth::TokenVerifier::new(&config.auth.token_secret);
    let token = verifier.mint("alice");

    let store = Arc::new(MemoryStore::new(config.bank.starting_credits));
    let (app, _engine) = ApiServer::new(config, store).app(scripted_source(vec![]));

    let body = serde_json::json!({
        "action": "stand",
        "state": r#"{"forged": true}"#,
        "state_sig": "deadbeef",
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/blackjack/action")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn crash_state_is_public() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/api/crash/state")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["phase"], "waiting");
}
