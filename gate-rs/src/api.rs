//! HTTP endpoints for route checks and post-login landing

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::decision::{decide, resolve_landing_path, Decision};
use crate::error::GateError;
use crate::profile::{resolve_profile, ProfileSource, ProfileState};
use crate::requirement::RouteRequirement;
use crate::role::Role;
use crate::session::{SessionResolver, SessionState};

/// App state for the gate endpoints
pub struct GateApiState {
    pub sessions: SessionResolver,
    pub profiles: Arc<dyn ProfileSource>,
}

impl GateApiState {
    async fn resolve(&self, headers: &HeaderMap) -> (SessionState, ProfileState) {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let session = self.sessions.resolve(authorization);
        let profile = resolve_profile(self.profiles.as_ref(), &session).await;
        (session, profile)
    }
}

/// Response with error details
#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckQuery {
    pub required_role: Option<String>,
    pub require_onboarding: Option<bool>,
}

impl CheckQuery {
    pub fn requirement(&self) -> Result<RouteRequirement, GateError> {
        let required_role = self
            .required_role
            .as_deref()
            .filter(|r| !r.is_empty())
            .map(str::parse::<Role>)
            .transpose()?;

        Ok(RouteRequirement {
            required_role,
            require_onboarding: self
                .require_onboarding
                .unwrap_or(RouteRequirement::default().require_onboarding),
        })
    }
}

fn error_response(status: StatusCode, err: GateError) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: err.to_string(),
        }),
    )
}

/// GET /api/access/check - Decide a route for the current user
pub async fn check_access(
    State(state): State<Arc<GateApiState>>,
    headers: HeaderMap,
    Query(query): Query<CheckQuery>,
) -> Result<Json<Decision>, (StatusCode, Json<ApiError>)> {
    let requirement = query
        .requirement()
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e))?;

    let (session, profile) = state.resolve(&headers).await;

    let decision = decide(&session, &profile, &requirement)
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    Ok(Json(decision))
}

/// GET /api/access/landing - Redirect to the current user's landing page
pub async fn landing(State(state): State<Arc<GateApiState>>, headers: HeaderMap) -> Response {
    let (session, profile) = state.resolve(&headers).await;

    match resolve_landing_path(&session, &profile) {
        Decision::Redirect(path) => Redirect::to(path).into_response(),
        other => (StatusCode::ACCEPTED, Json(other)).into_response(),
    }
}

/// Routes for the gate endpoints, relative to the API prefix
pub fn router(state: Arc<GateApiState>) -> Router {
    Router::new()
        .route("/access/check", get(check_access))
        .route("/access/landing", get(landing))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let query = CheckQuery {
            required_role: None,
            require_onboarding: None,
        };
        assert_eq!(query.requirement().unwrap(), RouteRequirement::any_role());
    }

    #[test]
    fn test_query_role() {
        let query = CheckQuery {
            required_role: Some("manufacturer".to_string()),
            require_onboarding: Some(false),
        };
        assert_eq!(
            query.requirement().unwrap(),
            RouteRequirement::for_role(Role::Manufacturer).without_onboarding()
        );

        let query = CheckQuery {
            required_role: Some("admin".to_string()),
            require_onboarding: None,
        };
        assert!(query.requirement().is_err());
    }
}
