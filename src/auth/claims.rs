//! JWT claims carried by issued tokens.

use serde::{Deserialize, Serialize};

/// Claims encoded into every issued token.
///
/// The signature covers all of them; none is trusted until it verifies.
/// Timestamps are Unix seconds, the native claim representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the principal's email.
    pub sub: String,

    /// Numeric principal id.
    pub id: i64,

    /// Role names held at issuance, e.g. `["ADMIN"]`.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Issued-at.
    pub iat: i64,

    /// Expiry. Always `iat` plus the configured duration.
    pub exp: i64,
}
