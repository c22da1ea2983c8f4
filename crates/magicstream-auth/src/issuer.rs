//! Access/refresh token pair issuance.

use chrono::{DateTime, Duration, Utc};
use magicstream_core::models::user::Identity;
use serde::{Deserialize, Serialize};

use crate::config::{AuthConfig, SigningSecret};
use crate::error::AuthError;
use crate::token;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Mints token pairs from two disjoint keys and two lifetimes.
#[derive(Debug, Clone)]
pub struct CredentialIssuer {
    access_secret: SigningSecret,
    refresh_secret: SigningSecret,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl CredentialIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_secret: config.access_secret.clone(),
            refresh_secret: config.refresh_secret.clone(),
            access_ttl: config.access_ttl(),
            refresh_ttl: config.refresh_ttl(),
        }
    }

    /// Encode the same identity twice: once with the access key and the
    /// short lifetime, once with the refresh key and the long one.
    pub fn issue(&self, identity: &Identity, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        let access_token = token::encode(identity, &self.access_secret, self.access_ttl, now)?;
        let refresh_token = token::encode(identity, &self.refresh_secret, self.refresh_ttl, now)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}
