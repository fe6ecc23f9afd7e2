//! Error types for access-server

use thiserror::Error;

/// Result type alias for server startup
pub type Result<T> = std::result::Result<T, ServerError>;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("OTP store error: {0}")]
    Otp(#[from] otp_rs::OtpError),

    #[error("Profile store error: {0}")]
    Gate(#[from] gate_rs::GateError),
}
