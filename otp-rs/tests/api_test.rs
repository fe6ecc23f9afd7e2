//! HTTP tests for the OTP endpoints

use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use otp_rs::api::{router, OtpApiState};
use otp_rs::{ChannelSink, Delivery, MemoryChallengeStore, OtpConfig, OtpService};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

fn setup(config: OtpConfig) -> (Router, UnboundedReceiver<Delivery>) {
    let (sink, rx) = ChannelSink::channel();
    let service = OtpService::new(
        config,
        Arc::new(MemoryChallengeStore::new()),
        Arc::new(sink),
    );
    let state = Arc::new(OtpApiState {
        service: Arc::new(service),
    });
    (router(state), rx)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Option<String>, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, retry_after, json)
}

#[tokio::test]
async fn test_send_and_verify() {
    let (app, mut rx) = setup(OtpConfig::default());

    let (status, _, body) = post(&app, "/otp/send", json!({"phone": "9876543210"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    #[cfg(not(feature = "insecure-code-echo"))]
    assert!(body.get("code").is_none());

    let code = rx.recv().await.unwrap().code.as_str().to_string();
    let (status, _, body) = post(
        &app,
        "/otp/verify",
        json!({"phone": "+919876543210", "code": code}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _, _) = post(
        &app,
        "/otp/verify",
        json!({"phone": "+919876543210", "code": code}),
    )
    .await;
    assert_eq!(status, StatusCode::GONE);
}

#[tokio::test]
async fn test_send_validation() {
    let (app, _rx) = setup(OtpConfig::default());

    let (status, _, body) = post(&app, "/otp/send", json!({"phone": "123"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid phone"));

    let (status, _, _) = post(
        &app,
        "/otp/send",
        json!({"phone": "9876543210", "type": "reset"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = post(
        &app,
        "/otp/send",
        json!({"phone": "9876543210", "type": "signup"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_verify_errors() {
    let (app, mut rx) = setup(OtpConfig::default());

    let (status, _, _) = post(
        &app,
        "/otp/verify",
        json!({"phone": "9876543210", "code": "123456"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    post(&app, "/otp/send", json!({"phone": "9876543210"})).await;
    let code = rx.recv().await.unwrap().code.as_str().to_string();
    let bad = if code == "123456" { "654321" } else { "123456" };

    let (status, _, body) = post(
        &app,
        "/otp/verify",
        json!({"phone": "9876543210", "code": bad}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("4 attempts remaining"));
}

#[tokio::test]
async fn test_send_rate_limit_sets_retry_after() {
    let (app, _rx) = setup(OtpConfig::default());

    for _ in 0..5 {
        let (status, _, _) = post(&app, "/otp/send", json!({"phone": "9876543210"})).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, retry_after, _) = post(&app, "/otp/send", json!({"phone": "9876543210"})).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    let secs: u64 = retry_after.unwrap().parse().unwrap();
    assert!(secs > 3500 && secs <= 3600);
}

#[tokio::test]
async fn test_client_address_limit() {
    let config = OtpConfig {
        ip_limit: 2,
        ..OtpConfig::default()
    };
    let (app, _rx) = setup(config);
    let app = app.layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 7], 4000))));

    for phone in ["9876543210", "9876543211"] {
        let (status, _, _) = post(&app, "/otp/send", json!({"phone": phone})).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, retry_after, _) = post(&app, "/otp/send", json!({"phone": "9876543212"})).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(retry_after.is_some());
}
