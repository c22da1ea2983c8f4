//! Signed claim sets (HS256 JWT) for access and refresh tokens.
//!
//! `decode` is the only place a token is trusted: the signature is
//! checked first, then expiry. No other field is validated here.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use magicstream_core::models::role::Role;
use magicstream_core::models::user::Identity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SigningSecret;
use crate::error::AuthError;

/// Fixed `iss` claim.
pub const ISSUER: &str = "MagicStreamMovies";

/// Claims embedded in every token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject: the user ID as a UUID string.
    pub sub: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Role name as issued. Kept as a string so that an unrecognised
    /// value is reported as "not admin" rather than as a broken token.
    pub role: String,
    pub iss: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp), always later than `iat`.
    pub exp: i64,
    /// Random per-token id, so two tokens issued in the same second differ.
    pub jti: String,
}

impl Claims {
    pub fn new(identity: &Identity, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        let iat = issued_at.timestamp();
        Self {
            sub: identity.id.to_string(),
            email: identity.email.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            role: identity.role.as_str().to_string(),
            iss: ISSUER.to_string(),
            iat,
            exp: iat.saturating_add(ttl.num_seconds()),
            jti: Uuid::new_v4().to_string(),
        }
    }

    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::MalformedToken)
    }

    /// The role, if it is exactly one of the known names.
    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }
}

/// Sign the claims for `identity`, expiring `ttl` after `now`.
pub fn encode(
    identity: &Identity,
    key: &SigningSecret,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    if key.is_empty() {
        return Err(AuthError::SigningFailure("signing key is empty".into()));
    }
    if ttl.num_seconds() <= 0 {
        return Err(AuthError::SigningFailure("token lifetime must be positive".into()));
    }

    let claims = Claims::new(identity, now, ttl);
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(key.as_bytes()),
    )
    .map_err(|e| AuthError::SigningFailure(format!("JWT encode: {e}")))
}

/// Verify the signature of `token` with `key`, then its expiry against
/// `now`, and return the embedded claims unchanged.
pub fn decode(token: &str, key: &SigningSecret, now: DateTime<Utc>) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Expiry is checked below against the injected clock, with no leeway.
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp"]);

    let claims = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(key.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::BadSignature,
        _ => AuthError::MalformedToken,
    })?;

    if claims.exp < now.timestamp() {
        return Err(AuthError::Expired);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            role: Role::User,
        }
    }

    fn key(s: &str) -> SigningSecret {
        SigningSecret::from(s)
    }

    #[test]
    fn roundtrip_preserves_identity() {
        let id = identity();
        let now = Utc::now();
        let token = encode(&id, &key("k1"), Duration::hours(1), now).unwrap();
        let claims = decode(&token, &key("k1"), now).unwrap();

        assert_eq!(claims.user_id().unwrap(), id.id);
        assert_eq!(claims.email, id.email);
        assert_eq!(claims.first_name, id.first_name);
        assert_eq!(claims.last_name, id.last_name);
        assert_eq!(claims.role(), Some(Role::User));
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn same_second_tokens_differ_only_by_jti() {
        let id = identity();
        let now = Utc::now();
        let a = encode(&id, &key("k1"), Duration::hours(1), now).unwrap();
        let b = encode(&id, &key("k1"), Duration::hours(1), now).unwrap();
        assert_ne!(a, b);

        let mut ca = decode(&a, &key("k1"), now).unwrap();
        let cb = decode(&b, &key("k1"), now).unwrap();
        assert_ne!(ca.jti, cb.jti);
        ca.jti = cb.jti.clone();
        assert_eq!(ca, cb);
    }

    #[test]
    fn wrong_key_is_bad_signature() {
        let now = Utc::now();
        let token = encode(&identity(), &key("k1"), Duration::hours(1), now).unwrap();
        assert!(matches!(
            decode(&token, &key("k2"), now),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn past_expiry_is_expired() {
        let issued = Utc::now() - Duration::hours(2);
        let token = encode(&identity(), &key("k1"), Duration::hours(1), issued).unwrap();
        assert!(matches!(
            decode(&token, &key("k1"), Utc::now()),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let issued = Utc::now();
        let token = encode(&identity(), &key("k1"), Duration::seconds(60), issued).unwrap();
        let at_expiry = issued + Duration::seconds(60);
        assert!(decode(&token, &key("k1"), at_expiry).is_ok());
        let after = at_expiry + Duration::seconds(1);
        assert!(matches!(
            decode(&token, &key("k1"), after),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn signature_is_checked_before_expiry() {
        let issued = Utc::now() - Duration::hours(2);
        let token = encode(&identity(), &key("k1"), Duration::hours(1), issued).unwrap();
        assert!(matches!(
            decode(&token, &key("other"), Utc::now()),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        for input in ["not-a-token", "", "a.b.c", "...."] {
            assert!(
                matches!(decode(input, &key("k1"), Utc::now()), Err(AuthError::MalformedToken)),
                "input {input:?} should be malformed"
            );
        }
    }

    #[test]
    fn spliced_payload_fails_signature() {
        let now = Utc::now();
        let mine = encode(&identity(), &key("k1"), Duration::hours(1), now).unwrap();
        let theirs = encode(&identity(), &key("k1"), Duration::hours(1), now).unwrap();

        let mine_parts: Vec<&str> = mine.split('.').collect();
        let theirs_parts: Vec<&str> = theirs.split('.').collect();
        let forged = format!("{}.{}.{}", mine_parts[0], theirs_parts[1], mine_parts[2]);

        assert!(matches!(
            decode(&forged, &key("k1"), now),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn empty_key_cannot_sign() {
        let err = encode(&identity(), &key(""), Duration::hours(1), Utc::now()).unwrap_err();
        assert!(matches!(err, AuthError::SigningFailure(_)));
    }

    #[test]
    fn non_positive_ttl_cannot_sign() {
        let err = encode(&identity(), &key("k1"), Duration::zero(), Utc::now()).unwrap_err();
        assert!(matches!(err, AuthError::SigningFailure(_)));
    }

    #[test]
    fn unknown_role_string_is_not_a_role() {
        let mut claims = Claims::new(&identity(), Utc::now(), Duration::hours(1));
        claims.role = "admin".into();
        assert_eq!(claims.role(), None);
    }
}
