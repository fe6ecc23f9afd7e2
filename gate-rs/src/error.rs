//! Error types for gate-rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GateError {
    /// A persisted role outside the known set; never treated as a match
    #[error("Unrecognized role: {0}")]
    UnrecognizedRole(String),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// Token verified but its subject is not a user id
    #[error("Invalid token subject: {0}")]
    InvalidSubject(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for GateError {
    fn from(err: sqlx::Error) -> Self {
        GateError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GateError>;
