//! Request interception.
//!
//! Runs once per inbound request: decides bypass vs. verification and, on
//! success, attaches the caller's resolved identity to the request
//! extensions. The interceptor never produces the final 401/403 itself;
//! downstream extractors reject requests that arrive without an identity.

use axum::{
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use tracing::debug;

use super::codec::TokenCodec;
use super::error::AuthError;
use crate::user::UserService;

/// Paths served without any token verification.
pub const PUBLIC_PATHS: &[&str] = &["/auth/login", "/health"];

/// Authority every admin-only surface requires.
const ADMIN_AUTHORITY: &str = "ROLE_ADMIN";

/// Extract a Bearer token from an Authorization header value.
///
/// Returns `None` for anything that is not exactly one `Bearer <token>`
/// pair; the interceptor treats that the same as no header at all.
fn bearer_token_from_header(header_value: &str) -> Option<&str> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next()?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = parts.next()?;
    if token.is_empty() || parts.next().is_some() {
        return None;
    }

    Some(token)
}

/// State shared by the interceptor: the token codec plus the identity
/// directory used to re-resolve authorities on every request.
#[derive(Clone)]
pub struct AuthState {
    pub codec: TokenCodec,
    pub users: UserService,
}

impl AuthState {
    pub fn new(codec: TokenCodec, users: UserService) -> Self {
        Self { codec, users }
    }
}

/// Identity attached to a request after successful verification.
///
/// Request-scoped: created at interception time, dropped with the request,
/// never persisted. Authorities are re-resolved from the directory, not
/// taken from token claims.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    /// Numeric principal id.
    pub id: i64,
    /// Subject email.
    pub email: String,
    /// Derived authority strings, e.g. `ROLE_ADMIN`.
    pub authorities: Vec<String>,
}

impl AuthenticatedUser {
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }

    pub fn is_admin(&self) -> bool {
        self.has_authority(ADMIN_AUTHORITY)
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

/// Require the `ROLE_ADMIN` authority.
///
/// Use as an extractor in handlers that require admin access.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)?;

        if !user.is_admin() {
            return Err(AuthError::InsufficientAuthority(format!(
                "{ADMIN_AUTHORITY} required"
            )));
        }

        Ok(RequireAdmin(user))
    }
}

/// Authentication middleware.
///
/// Per-request protocol:
/// 1. Allow-listed paths pass through untouched.
/// 2. A missing or non-Bearer Authorization header passes through
///    unauthenticated; rejection is left to downstream authorization.
/// 3. A token whose subject cannot be extracted (malformed, forged) is
///    absorbed here and the request passes through unauthenticated.
/// 4. An identity attached by an earlier layer wins; attachment is
///    set-once per request.
/// 5. A subject that does not resolve in the directory is surfaced as
///    `PrincipalNotFound`: a directory/token inconsistency, not a forgery.
/// 6. Only a token that fully validates attaches an identity.
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AuthError> {
    if PUBLIC_PATHS.contains(&req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token_from_header)
        .map(str::to_owned);

    let Some(token) = token else {
        return Ok(next.run(req).await);
    };

    let subject = match auth.codec.extract_subject(&token) {
        Ok(subject) => subject,
        Err(err) => {
            debug!(error = %err, "ignoring unverifiable bearer token");
            return Ok(next.run(req).await);
        }
    };

    if req.extensions().get::<AuthenticatedUser>().is_none() {
        let user = auth
            .users
            .lookup(&subject)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .ok_or(AuthError::PrincipalNotFound)?;

        if auth.codec.validate(&token, &subject) {
            let authorities = user.authorities();
            req.extensions_mut().insert(AuthenticatedUser {
                id: user.id,
                email: user.email,
                authorities,
            });
        } else {
            debug!(subject = %subject, "token failed validation, request stays unauthenticated");
        }
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_from_header_valid() {
        assert_eq!(
            bearer_token_from_header("Bearer abc.def.ghi"),
            Some("abc.def.ghi")
        );
        assert_eq!(bearer_token_from_header("bearer token123"), Some("token123"));
        assert_eq!(
            bearer_token_from_header("   Bearer\tmixed-case "),
            Some("mixed-case")
        );
    }

    #[test]
    fn test_bearer_token_from_header_invalid() {
        let cases = [
            "",
            "Bearer",
            "Bearer ",
            "Token something",
            "Bearer token extra",
            "bear token",
        ];

        for case in cases {
            assert!(
                bearer_token_from_header(case).is_none(),
                "{case} should be rejected"
            );
        }
    }

    #[test]
    fn test_public_paths() {
        assert!(PUBLIC_PATHS.contains(&"/auth/login"));
        assert!(PUBLIC_PATHS.contains(&"/health"));
        assert!(!PUBLIC_PATHS.contains(&"/auth/me"));
    }

    #[test]
    fn test_authenticated_user_authorities() {
        let user = AuthenticatedUser {
            id: 1,
            email: "manager@example.com".to_string(),
            authorities: vec!["ROLE_MANAGER".to_string()],
        };

        assert!(user.has_authority("ROLE_MANAGER"));
        assert!(!user.has_authority("ROLE_ADMIN"));
        assert!(!user.is_admin());
    }
}
