//! Token issuance and verification.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use super::claims::Claims;
use super::config::{AuthConfig, ConfigValidationError};
use super::error::AuthError;
use crate::user::User;

/// First segment of every issued token: base64url of
/// `{"typ":"JWT","alg":"HS256"}`. The algorithm is fixed.
pub const JWT_HEADER_SEGMENT: &str = "eyJ0eXAiOiJKV1QiLCJhbGciOiJIUzI1NiJ9";

/// Issues and verifies HS256 tokens.
///
/// Key material is derived once from configuration and shared read-only
/// across requests; issuance and verification are pure functions of token,
/// key and clock. Signature and expiry are two independent gates: a forged
/// but unexpired token fails on signature, a correctly signed but old token
/// fails on expiry. Neither check is ever cached.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration: Duration,
}

impl TokenCodec {
    /// Build a codec from validated configuration.
    pub fn from_config(config: &AuthConfig) -> Result<Self, ConfigValidationError> {
        let key = config.decoded_secret()?;

        if config.expiration_ms <= 0 {
            return Err(ConfigValidationError::NonPositiveExpiration);
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(&key),
            decoding_key: DecodingKey::from_secret(&key),
            expiration: Duration::milliseconds(config.expiration_ms),
        })
    }

    /// Issue a signed token for a principal.
    ///
    /// Expiry is always issued-at plus the configured duration; roles are
    /// serialized by name.
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.email.clone(),
            id: user.id,
            roles: user.roles.iter().map(|r| r.to_string()).collect(),
            iat: now.timestamp(),
            exp: (now + self.expiration).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Decode a token and check its signature.
    ///
    /// Expiry is deliberately not checked here so the subject of an expired
    /// token can still be read; `validate` and `is_expired` own that gate.
    fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::SignatureInvalid,
                _ => AuthError::MalformedToken(e.to_string()),
            })
    }

    /// Whether the token parses and its signature verifies. Fails closed.
    pub fn verify(&self, token: &str) -> bool {
        self.decode_claims(token).is_ok()
    }

    /// Subject claim of a correctly signed token, expired or not.
    pub fn extract_subject(&self, token: &str) -> Result<String, AuthError> {
        Ok(self.decode_claims(token)?.sub)
    }

    /// Whether the expiry claim is not strictly after the current time.
    pub fn is_expired(&self, token: &str) -> Result<bool, AuthError> {
        Ok(self.decode_claims(token)?.exp <= Utc::now().timestamp())
    }

    /// Full validity check: signature verifies, subject matches exactly
    /// (case-sensitive) and expiry is strictly in the future.
    pub fn validate(&self, token: &str, expected_email: &str) -> bool {
        match self.decode_claims(token) {
            Ok(claims) => claims.sub == expected_email && claims.exp > Utc::now().timestamp(),
            Err(_) => false,
        }
    }
}
