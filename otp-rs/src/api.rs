//! HTTP endpoints for OTP issue and verify

use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::OtpError;
use crate::rate_limit::LimitKey;
use crate::service::OtpService;

/// App state containing the OTP service
pub struct OtpApiState {
    pub service: Arc<OtpService>,
}

/// Response with error details
#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
}

/// Why the client asked for a code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OtpPurpose {
    #[default]
    Login,
    Signup,
}

impl std::str::FromStr for OtpPurpose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "login" => Ok(OtpPurpose::Login),
            "signup" => Ok(OtpPurpose::Signup),
            other => Err(format!("Unknown OTP type '{}'", other)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    #[serde(default)]
    pub phone: String,
    #[serde(rename = "type")]
    pub purpose: Option<String>,
}

impl SendOtpRequest {
    pub fn purpose(&self) -> Result<OtpPurpose, String> {
        self.purpose
            .as_deref()
            .map_or(Ok(OtpPurpose::default()), str::parse)
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct OtpResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Error response carrying an optional `Retry-After`
pub struct OtpApiError {
    status: StatusCode,
    message: String,
    retry_after: Option<u64>,
}

impl OtpApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    fn from_issue(err: OtpError) -> Self {
        match &err {
            OtpError::RateLimited { retry_after } => {
                let mut api = Self::new(StatusCode::TOO_MANY_REQUESTS, err.to_string());
                api.retry_after = Some(retry_after.as_secs().max(1));
                api
            }
            OtpError::InvalidPhone(_) => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            _ => {
                error!("Failed to issue OTP: {}", err);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to send OTP")
            }
        }
    }

    fn from_verify(err: OtpError) -> Self {
        let status = match &err {
            OtpError::InvalidPhone(_) => StatusCode::BAD_REQUEST,
            OtpError::CodeMismatch { .. } => StatusCode::UNAUTHORIZED,
            OtpError::NoActiveChallenge => StatusCode::NOT_FOUND,
            OtpError::ChallengeExpired | OtpError::AlreadyUsed => StatusCode::GONE,
            OtpError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            OtpError::Storage(_) => {
                error!("OTP verification storage failure: {}", err);
                return Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Verification unavailable, retry shortly",
                );
            }
            OtpError::RateLimited { .. } | OtpError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for OtpApiError {
    fn into_response(self) -> Response {
        let mut response = (
            self.status,
            Json(ApiError {
                error: self.message,
            }),
        )
            .into_response();

        if let Some(secs) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Count the request against the client's address, when it is known
async fn check_client(
    state: &OtpApiState,
    client: Option<ConnectInfo<SocketAddr>>,
) -> Result<(), OtpApiError> {
    let Some(ConnectInfo(addr)) = client else {
        return Ok(());
    };

    state
        .service
        .limiter()
        .try_acquire(&LimitKey::Ip(addr.ip()), state.service.now())
        .await
        .map_err(|retry_after| OtpApiError::from_issue(OtpError::RateLimited { retry_after }))
}

/// POST /api/otp/send - Issue a code for a phone
pub async fn send_otp(
    State(state): State<Arc<OtpApiState>>,
    client: Option<ConnectInfo<SocketAddr>>,
    Json(payload): Json<SendOtpRequest>,
) -> Result<Json<OtpResponse>, OtpApiError> {
    check_client(&state, client).await?;
    let purpose = payload
        .purpose()
        .map_err(|e| OtpApiError::new(StatusCode::BAD_REQUEST, e))?;

    let handle = state
        .service
        .issue_challenge(&payload.phone)
        .await
        .map_err(OtpApiError::from_issue)?;

    info!(
        "OTP sent for {:?} to phone {}",
        purpose,
        handle.phone.fingerprint()
    );

    Ok(Json(OtpResponse {
        success: true,
        message: "OTP sent successfully".to_string(),
        code: handle.echoed_code().map(str::to_string),
    }))
}

/// POST /api/otp/verify - Check a submitted code
pub async fn verify_otp(
    State(state): State<Arc<OtpApiState>>,
    client: Option<ConnectInfo<SocketAddr>>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<OtpResponse>, OtpApiError> {
    check_client(&state, client).await?;

    state
        .service
        .verify_challenge(&payload.phone, &payload.code)
        .await
        .map_err(OtpApiError::from_verify)?;

    Ok(Json(OtpResponse {
        success: true,
        message: "Phone verified".to_string(),
        code: None,
    }))
}

/// Routes for the OTP endpoints, relative to the API prefix
pub fn router(state: Arc<OtpApiState>) -> Router {
    Router::new()
        .route("/otp/send", post(send_otp))
        .route("/otp/verify", post(verify_otp))
        .with_state(state)
}
