//! Authentication configuration.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::AuthError;

/// Symmetric HMAC key. `Debug` never prints the key material.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SigningSecret {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl From<String> for SigningSecret {
    fn from(s: String) -> Self {
        Self::new(s.into_bytes())
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret(<{} bytes>)", self.0.len())
    }
}

/// Whether authenticated requests consult the session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevocationMode {
    /// Stateless fast path: an access token is honoured until its own
    /// expiry even after logout or rotation.
    #[default]
    Eventual,
    /// The presented access token must also be the stored current one.
    Immediate,
}

/// Longest accepted token lifetime (ten years).
pub const MAX_TOKEN_LIFETIME_SECS: u64 = 10 * 365 * 86_400;

/// Configuration for the authentication service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC key for access tokens.
    pub access_secret: SigningSecret,
    /// HMAC key for refresh tokens. Must differ from `access_secret`.
    pub refresh_secret: SigningSecret,
    /// Access token lifetime in seconds (default: 86_400 = 1 day).
    pub access_token_lifetime_secs: u64,
    /// Refresh token lifetime in seconds (default: 604_800 = 7 days).
    pub refresh_token_lifetime_secs: u64,
    /// Optional pepper prepended to passwords before Argon2id hashing.
    pub pepper: Option<String>,
    /// Minimum password length for registration.
    pub min_password_length: usize,
    /// Upper bound for any single store call.
    pub store_timeout: Duration,
    pub revocation: RevocationMode,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_secret: SigningSecret::new(Vec::new()),
            refresh_secret: SigningSecret::new(Vec::new()),
            access_token_lifetime_secs: 86_400,
            refresh_token_lifetime_secs: 604_800,
            pepper: None,
            min_password_length: 6,
            store_timeout: Duration::from_secs(5),
            revocation: RevocationMode::Eventual,
        }
    }
}

impl AuthConfig {
    /// Reject configurations that would break the token-pair invariants.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.access_secret.is_empty() || self.refresh_secret.is_empty() {
            return Err(AuthError::InvalidConfig("signing secrets must not be empty".into()));
        }
        if self.access_secret == self.refresh_secret {
            return Err(AuthError::InvalidConfig(
                "access and refresh secrets must differ".into(),
            ));
        }
        if self.access_token_lifetime_secs == 0 {
            return Err(AuthError::InvalidConfig(
                "access token lifetime must be positive".into(),
            ));
        }
        if self.refresh_token_lifetime_secs > MAX_TOKEN_LIFETIME_SECS {
            return Err(AuthError::InvalidConfig(format!(
                "token lifetimes must not exceed {MAX_TOKEN_LIFETIME_SECS} seconds"
            )));
        }
        if self.refresh_token_lifetime_secs <= self.access_token_lifetime_secs {
            return Err(AuthError::InvalidConfig(
                "refresh token lifetime must exceed access token lifetime".into(),
            ));
        }
        Ok(())
    }

    pub fn access_ttl(&self) -> chrono::Duration {
        lifetime(self.access_token_lifetime_secs)
    }

    pub fn refresh_ttl(&self) -> chrono::Duration {
        lifetime(self.refresh_token_lifetime_secs)
    }
}

/// Saturates instead of wrapping for values `validate` would reject.
fn lifetime(secs: u64) -> chrono::Duration {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AuthConfig {
        AuthConfig {
            access_secret: "access-secret".into(),
            refresh_secret: "refresh-secret".into(),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn defaults_with_keys_are_valid() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn identical_keys_are_rejected() {
        let config = AuthConfig {
            refresh_secret: "access-secret".into(),
            ..valid()
        };
        assert!(matches!(config.validate(), Err(AuthError::InvalidConfig(_))));
    }

    #[test]
    fn refresh_must_outlive_access() {
        let config = AuthConfig {
            refresh_token_lifetime_secs: 86_400,
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_lifetime_is_rejected() {
        let config = AuthConfig {
            refresh_token_lifetime_secs: u64::MAX,
            ..valid()
        };
        assert!(matches!(config.validate(), Err(AuthError::InvalidConfig(_))));

        let config = AuthConfig {
            access_token_lifetime_secs: MAX_TOKEN_LIFETIME_SECS + 1,
            refresh_token_lifetime_secs: MAX_TOKEN_LIFETIME_SECS + 2,
            ..valid()
        };
        assert!(config.validate().is_err());

        let config = AuthConfig {
            refresh_token_lifetime_secs: MAX_TOKEN_LIFETIME_SECS,
            ..valid()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn ttl_conversion_saturates() {
        let config = AuthConfig {
            access_token_lifetime_secs: u64::MAX,
            refresh_token_lifetime_secs: i64::MAX as u64,
            ..valid()
        };
        assert_eq!(config.access_ttl(), chrono::Duration::MAX);
        assert_eq!(config.refresh_ttl(), chrono::Duration::MAX);
        assert_eq!(valid().access_ttl(), chrono::Duration::seconds(86_400));
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", SigningSecret::from("hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
