//! Authentication errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Fixed login failure body. The same message covers unknown email, wrong
/// password and inactive accounts so responses cannot be used to enumerate
/// accounts.
pub const INVALID_CREDENTIALS_BODY: &str = "Invalid email or password";

/// Authentication errors.
///
/// Token faults (`MalformedToken`, `SignatureInvalid`, `TokenExpired`) are
/// absorbed inside the interceptor and leave the request unauthenticated;
/// only `PrincipalNotFound` and internal failures propagate out of it.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Structurally invalid or unparsable token.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// Signature did not verify against the configured key.
    #[error("invalid token signature")]
    SignatureInvalid,

    /// Expiry claim is not strictly in the future.
    #[error("token expired")]
    TokenExpired,

    /// Token subject does not resolve in the identity directory.
    #[error("principal not found")]
    PrincipalNotFound,

    /// Login failed: unknown email, wrong password or inactive account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No identity attached to the request.
    #[error("authentication required")]
    Unauthenticated,

    /// Identity lacks a required authority.
    #[error("insufficient authority: {0}")]
    InsufficientAuthority(String),

    /// Internal error.
    #[error("internal auth error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct AuthErrorResponse {
    pub error: String,
    pub error_code: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            // Fixed plain-text body; must not reveal which check failed.
            AuthError::InvalidCredentials => {
                return (StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS_BODY).into_response();
            }
            AuthError::MalformedToken(_) => (StatusCode::UNAUTHORIZED, "malformed_token"),
            AuthError::SignatureInvalid => (StatusCode::UNAUTHORIZED, "invalid_signature"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "token_expired"),
            AuthError::PrincipalNotFound => (StatusCode::UNAUTHORIZED, "principal_not_found"),
            AuthError::Unauthenticated => (StatusCode::UNAUTHORIZED, "authentication_required"),
            AuthError::InsufficientAuthority(_) => {
                (StatusCode::FORBIDDEN, "insufficient_authority")
            }
            AuthError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(AuthErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        let err = AuthError::PrincipalNotFound;
        assert_eq!(err.to_string(), "principal not found");

        let err = AuthError::MalformedToken("bad".to_string());
        assert_eq!(err.to_string(), "malformed token: bad");

        let err = AuthError::TokenExpired;
        assert_eq!(err.to_string(), "token expired");
    }

    #[test]
    fn test_invalid_credentials_body_is_fixed() {
        // The constant is part of the login contract; handlers and tests
        // both key on it.
        assert_eq!(INVALID_CREDENTIALS_BODY, "Invalid email or password");
    }
}
