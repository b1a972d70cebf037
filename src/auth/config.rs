//! Authentication configuration.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

/// Minimum decoded key length for HS256.
const MIN_KEY_BYTES: usize = 32;

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Base64-encoded symmetric signing secret. REQUIRED.
    /// Supports `env:VAR_NAME` indirection.
    pub secret: Option<String>,

    /// Token lifetime in milliseconds. Must be positive.
    pub expiration_ms: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // No default secret - must be explicitly configured
            secret: None,
            expiration_ms: 3_600_000,
        }
    }
}

impl AuthConfig {
    /// Resolve the secret, expanding `env:VAR_NAME` indirection.
    pub fn resolve_secret(&self) -> Result<Option<String>, ConfigValidationError> {
        match &self.secret {
            None => Ok(None),
            Some(value) => {
                if let Some(var_name) = value.strip_prefix("env:") {
                    match std::env::var(var_name) {
                        Ok(secret) if !secret.is_empty() => Ok(Some(secret)),
                        Ok(_) => Err(ConfigValidationError::EnvVarEmpty(var_name.to_string())),
                        Err(_) => Err(ConfigValidationError::EnvVarNotFound(var_name.to_string())),
                    }
                } else {
                    Ok(Some(value.clone()))
                }
            }
        }
    }

    /// Decode the resolved secret into raw HMAC key material.
    ///
    /// The decoded key must be at least 32 bytes so HS256 keeps its full
    /// strength.
    pub fn decoded_secret(&self) -> Result<Vec<u8>, ConfigValidationError> {
        let secret = self
            .resolve_secret()?
            .ok_or(ConfigValidationError::MissingSecret)?;

        let key = BASE64
            .decode(secret.trim().as_bytes())
            .map_err(|e| ConfigValidationError::InvalidSecretEncoding(e.to_string()))?;

        if key.len() < MIN_KEY_BYTES {
            return Err(ConfigValidationError::SecretTooShort);
        }

        Ok(key)
    }

    /// Validate the configuration.
    /// A failure here is fatal: the server must not start without a usable
    /// key and a positive expiration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.decoded_secret()?;

        if self.expiration_ms <= 0 {
            return Err(ConfigValidationError::NonPositiveExpiration);
        }

        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// The signing secret is not configured.
    MissingSecret,
    /// The signing secret is not valid base64.
    InvalidSecretEncoding(String),
    /// The decoded key is shorter than 32 bytes.
    SecretTooShort,
    /// The token expiration is zero or negative.
    NonPositiveExpiration,
    /// Environment variable not found (for `env:VAR_NAME` syntax).
    EnvVarNotFound(String),
    /// Environment variable is empty (for `env:VAR_NAME` syntax).
    EnvVarEmpty(String),
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSecret => {
                write!(
                    f,
                    "Signing secret is required. Set auth.secret in config or the TOLLGATE__AUTH__SECRET environment variable."
                )
            }
            Self::InvalidSecretEncoding(err) => {
                write!(f, "Signing secret is not valid base64: {}", err)
            }
            Self::SecretTooShort => {
                write!(
                    f,
                    "Signing secret must decode to at least 32 bytes for HMAC-SHA256."
                )
            }
            Self::NonPositiveExpiration => {
                write!(f, "Token expiration must be a positive number of milliseconds.")
            }
            Self::EnvVarNotFound(var) => {
                write!(
                    f,
                    "Environment variable '{}' not found (referenced via env:{} in config).",
                    var, var
                )
            }
            Self::EnvVarEmpty(var) => {
                write!(
                    f,
                    "Environment variable '{}' is empty (referenced via env:{} in config).",
                    var, var
                )
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}
