//! Session state and JWT resolution
//!
//! Sessions are issued by the identity provider as HS256 tokens carrying the
//! user id in `sub`. A missing, malformed or expired token resolves to
//! [`SessionState::Unauthenticated`], never to an error.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{GateError, Result};

pub type UserId = Uuid;

/// Session as seen by the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Resolution has not finished yet
    Unknown,
    Authenticated(UserId),
    Unauthenticated,
}

impl SessionState {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            SessionState::Authenticated(id) => Some(*id),
            _ => None,
        }
    }
}

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at (Unix timestamp)
    pub iat: u64,
}

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Shared secret for HS256
    secret: String,
    issuer: String,
    /// Token lifetime for issued tokens
    expiration: Duration,
}

impl JwtConfig {
    pub fn new(secret: String, issuer: String, expiration_secs: u64) -> Self {
        Self {
            secret,
            issuer,
            expiration: Duration::from_secs(expiration_secs),
        }
    }

    /// Create a token for a user
    pub fn create_token(&self, user_id: UserId) -> Result<String> {
        let now = Utc::now().timestamp().max(0) as u64;

        let claims = Claims {
            sub: user_id.to_string(),
            iss: self.issuer.clone(),
            exp: now + self.expiration.as_secs(),
            iat: now,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }

    /// Validate a token and extract claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[self.issuer.as_str()]);

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )?;

        Ok(token_data.claims)
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

/// Maps an `Authorization` header to a [`SessionState`]
#[derive(Debug, Clone)]
pub struct SessionResolver {
    jwt: JwtConfig,
}

impl SessionResolver {
    pub fn new(jwt: JwtConfig) -> Self {
        Self { jwt }
    }

    pub fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }

    /// Resolve the raw `Authorization` header value
    pub fn resolve(&self, authorization: Option<&str>) -> SessionState {
        let Some(header) = authorization else {
            debug!("No authorization header");
            return SessionState::Unauthenticated;
        };

        let Some(token) = header.strip_prefix("Bearer ").map(str::trim) else {
            warn!("Authorization header is not a bearer token");
            return SessionState::Unauthenticated;
        };

        match self.user_from_token(token) {
            Ok(user_id) => SessionState::Authenticated(user_id),
            Err(e) => {
                warn!("Rejected session token: {}", e);
                SessionState::Unauthenticated
            }
        }
    }

    fn user_from_token(&self, token: &str) -> Result<UserId> {
        let claims = self.jwt.validate_token(token)?;
        Uuid::parse_str(&claims.sub).map_err(|_| GateError::InvalidSubject(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig::new("test-secret".to_string(), "msme-auth".to_string(), 3600)
    }

    #[test]
    fn test_create_and_validate_token() {
        let config = config();
        let user = Uuid::new_v4();

        let token = config.create_token(user).unwrap();
        let claims = config.validate_token(&token).unwrap();
        assert_eq!(claims.sub, user.to_string());
        assert_eq!(claims.iss, "msme-auth");
    }

    #[test]
    fn test_resolve_bearer() {
        let resolver = SessionResolver::new(config());
        let user = Uuid::new_v4();
        let header = format!("Bearer {}", resolver.jwt().create_token(user).unwrap());

        assert_eq!(
            resolver.resolve(Some(&header)),
            SessionState::Authenticated(user)
        );
        assert_eq!(resolver.resolve(None), SessionState::Unauthenticated);
        assert_eq!(
            resolver.resolve(Some("Basic dXNlcjpwYXNz")),
            SessionState::Unauthenticated
        );
        assert_eq!(
            resolver.resolve(Some("Bearer invalid-token")),
            SessionState::Unauthenticated
        );
    }

    #[test]
    fn test_foreign_secret_or_issuer_rejected() {
        let resolver = SessionResolver::new(config());
        let user = Uuid::new_v4();

        let other_secret = JwtConfig::new("other".to_string(), "msme-auth".to_string(), 3600);
        let header = format!("Bearer {}", other_secret.create_token(user).unwrap());
        assert_eq!(resolver.resolve(Some(&header)), SessionState::Unauthenticated);

        let other_issuer = JwtConfig::new("test-secret".to_string(), "elsewhere".to_string(), 3600);
        let header = format!("Bearer {}", other_issuer.create_token(user).unwrap());
        assert_eq!(resolver.resolve(Some(&header)), SessionState::Unauthenticated);
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = config();
        let now = Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            iss: "msme-auth".to_string(),
            exp: now - 600,
            iat: now - 4200,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(config.validate_token(&token).is_err());
        let resolver = SessionResolver::new(config);
        assert_eq!(
            resolver.resolve(Some(&format!("Bearer {}", token))),
            SessionState::Unauthenticated
        );
    }
}
