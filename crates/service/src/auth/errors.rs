use thiserror::Error;

use crate::errors::StorageError;

/// Business errors for auth workflows
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("Username already exists")]
    AlreadyExists,
    /// Unknown user and wrong password both map here.
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("hashing error: {0}")]
    HashError(String),
    #[error("token error: {0}")]
    TokenError(String),
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl AuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 1001,
            AuthError::AlreadyExists => 1002,
            AuthError::InvalidCredentials => 1004,
            AuthError::HashError(_) => 1101,
            AuthError::TokenError(_) => 1102,
            AuthError::Infrastructure(_) => 1200,
        }
    }

    /// Failures the caller did nothing to cause.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::HashError(_) | AuthError::TokenError(_) | AuthError::Infrastructure(_)
        )
    }
}

impl From<StorageError> for AuthError {
    fn from(e: StorageError) -> Self {
        AuthError::Infrastructure(e.to_string())
    }
}
