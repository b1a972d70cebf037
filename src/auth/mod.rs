//! Authentication module.
//!
//! Token issuance and verification plus the per-request interceptor:
//! - HS256 token codec with a symmetric key derived once from configuration
//! - axum middleware that attaches the caller's identity to the request

mod claims;
mod codec;
mod config;
mod error;
mod middleware;

pub use claims::Claims;
pub use codec::{JWT_HEADER_SEGMENT, TokenCodec};
pub use config::{AuthConfig, ConfigValidationError};
pub use error::{AuthError, INVALID_CREDENTIALS_BODY};
pub use middleware::{
    AuthState, AuthenticatedUser, PUBLIC_PATHS, RequireAdmin, auth_middleware,
};
