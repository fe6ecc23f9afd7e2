//! End-to-end tests through the assembled router

use access_server::{AccessServer, Config};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use gate_rs::{Profile, Role, SqliteProfileSource};
use otp_rs::{ChannelSink, Delivery};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;
use uuid::Uuid;

async fn setup() -> (AccessServer, UnboundedReceiver<Delivery>) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let (sink, rx) = ChannelSink::channel();
    let server = AccessServer::with_pool(Config::default(), pool, Arc::new(sink))
        .await
        .unwrap();
    (server, rx)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut request = Request::builder().uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    request.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (server, _rx) = setup().await;
    let (status, body) = send(&server.router(), get("/api/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["checks"]["database"], "ok");
}

#[tokio::test]
async fn test_otp_round_trip() {
    let (server, mut rx) = setup().await;
    let app = server.router();

    let (status, body) = send(
        &app,
        post_json("/api/otp/send", json!({"phone": "+91 98765 43210", "type": "signup"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let code = rx.recv().await.unwrap().code.as_str().to_string();
    let (status, _) = send(
        &app,
        post_json("/api/otp/verify", json!({"phone": "9876543210", "code": code})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let status = server
        .otp()
        .current_status("9876543210")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status.status, otp_rs::ChallengeStatus::Verified);
}

#[tokio::test]
async fn test_access_flow() {
    let (server, _rx) = setup().await;
    let app = server.router();

    let profiles = SqliteProfileSource::new(server.db().clone());
    let user = Uuid::new_v4();
    let token = server.config().gate.jwt().create_token(user).unwrap();

    // Signed in but no profile yet
    let (_, body) = send(&app, get("/api/access/check", Some(&token))).await;
    assert_eq!(body, json!({"decision": "redirect", "location": "/auth"}));

    profiles
        .upsert(&Profile::new(user, Role::Trader, false))
        .await
        .unwrap();
    let (_, body) = send(&app, get("/api/access/check", Some(&token))).await;
    assert_eq!(
        body,
        json!({"decision": "redirect", "location": "/onboarding/trader"})
    );

    profiles
        .upsert(&Profile::new(user, Role::Trader, true))
        .await
        .unwrap();
    let (_, body) = send(
        &app,
        get("/api/access/check?requiredRole=manufacturer", Some(&token)),
    )
    .await;
    assert_eq!(
        body,
        json!({"decision": "redirect", "location": "/trader/dashboard"})
    );

    let response = app
        .clone()
        .oneshot(get("/api/access/landing", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/trader/dashboard");
}

#[tokio::test]
async fn test_unknown_route() {
    let (server, _rx) = setup().await;
    let (status, _) = send(&server.router(), get("/api/nope", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
