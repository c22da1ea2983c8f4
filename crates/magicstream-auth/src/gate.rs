//! Request-time bearer credential verification.
//!
//! The gate is stateless: it checks signature and expiry of the access
//! token and nothing else. A token issued before a logout or a refresh
//! keeps passing here until it expires. Deployments that need
//! immediate revocation add
//! [`SessionLifecycleService::verify_current`](crate::service::SessionLifecycleService::verify_current)
//! after the gate.

use std::sync::Arc;

use magicstream_core::models::role::Role;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::SigningSecret;
use crate::context::OpContext;
use crate::error::AuthError;
use crate::token::{self, Claims};

/// The verified identity of one request. Built only by the gate.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// `None` when the token carries an unrecognised role name.
    pub role: Option<Role>,
}

impl AuthenticatedUser {
    fn from_claims(claims: Claims) -> Result<Self, AuthError> {
        Ok(Self {
            user_id: claims.user_id()?,
            role: claims.role(),
            email: claims.email,
            first_name: claims.first_name,
            last_name: claims.last_name,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    /// `Forbidden` unless the role is exactly `ADMIN`.
    pub fn require_admin(&self) -> Result<(), AuthError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

/// Extract the token from an `Authorization` header value.
///
/// Accepts `Bearer <token>` or a bare `<token>`; surrounding whitespace
/// is ignored. Absent or blank values are `MissingCredential`.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let value = header.unwrap_or_default().trim_start();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    Ok(token)
}

#[derive(Clone)]
pub struct AuthenticationGate {
    access_secret: SigningSecret,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AuthenticationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationGate")
            .field("access_secret", &self.access_secret)
            .finish_non_exhaustive()
    }
}

impl AuthenticationGate {
    pub fn new(access_secret: SigningSecret, clock: Arc<dyn Clock>) -> Self {
        Self {
            access_secret,
            clock,
        }
    }

    /// Verify the bearer credential in `authorization` and return the
    /// identity it carries.
    pub fn authenticate(
        &self,
        ctx: &OpContext,
        authorization: Option<&str>,
    ) -> Result<AuthenticatedUser, AuthError> {
        ctx.ensure_active()?;
        let raw = bearer_token(authorization)?;
        self.verify(raw)
    }

    /// Verify an already extracted token (e.g. from a cookie).
    pub fn verify(&self, raw: &str) -> Result<AuthenticatedUser, AuthError> {
        let claims = token::decode(raw, &self.access_secret, self.clock.now()).map_err(|e| {
            debug!(reason = %e, "Access token rejected");
            e
        })?;
        AuthenticatedUser::from_claims(claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use magicstream_core::models::user::Identity;

    use super::*;
    use crate::clock::{ManualClock, SystemClock};

    fn identity(role: Role) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            role,
        }
    }

    fn gate() -> AuthenticationGate {
        AuthenticationGate::new("access".into(), Arc::new(SystemClock))
    }

    fn token_for(id: &Identity) -> String {
        token::encode(id, &"access".into(), Duration::hours(1), Utc::now()).unwrap()
    }

    #[test]
    fn bearer_prefix_is_optional() {
        assert_eq!(bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert_eq!(bearer_token(Some("abc")).unwrap(), "abc");
        assert_eq!(bearer_token(Some("  Bearer   abc  ")).unwrap(), "abc");
    }

    #[test]
    fn missing_or_blank_header_is_missing_credential() {
        for header in [None, Some(""), Some("   "), Some("Bearer "), Some("Bearer    ")] {
            assert!(matches!(
                bearer_token(header),
                Err(AuthError::MissingCredential)
            ));
        }
    }

    #[test]
    fn valid_token_exposes_identity() {
        let id = identity(Role::User);
        let header = format!("Bearer {}", token_for(&id));
        let user = gate()
            .authenticate(&OpContext::background(), Some(&header))
            .unwrap();

        assert_eq!(user.user_id, id.id);
        assert_eq!(user.email, id.email);
        assert_eq!(user.role, Some(Role::User));
        assert!(!user.is_admin());
        assert!(matches!(user.require_admin(), Err(AuthError::Forbidden)));
    }

    #[test]
    fn admin_role_passes_role_gate() {
        let id = identity(Role::Admin);
        let user = gate()
            .authenticate(&OpContext::background(), Some(&token_for(&id)))
            .unwrap();
        assert!(user.require_admin().is_ok());
    }

    #[test]
    fn lowercase_admin_is_forbidden() {
        let claims_user = AuthenticatedUser::from_claims(Claims {
            role: "admin".into(),
            ..Claims::new(&identity(Role::Admin), Utc::now(), Duration::hours(1))
        })
        .unwrap();
        assert_eq!(claims_user.role, None);
        assert!(matches!(claims_user.require_admin(), Err(AuthError::Forbidden)));
    }

    #[test]
    fn token_from_other_key_is_rejected() {
        let id = identity(Role::User);
        let foreign = token::encode(&id, &"refresh".into(), Duration::hours(1), Utc::now()).unwrap();
        assert!(matches!(
            gate().authenticate(&OpContext::background(), Some(&foreign)),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn expiry_follows_the_clock() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let gate = AuthenticationGate::new("access".into(), clock.clone());
        let token = token::encode(&identity(Role::User), &"access".into(), Duration::hours(1), start)
            .unwrap();

        assert!(gate.verify(&token).is_ok());
        clock.advance(Duration::hours(2));
        assert!(matches!(gate.verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn cancelled_context_is_rejected() {
        let ctx = OpContext::background();
        ctx.cancel();
        let token = token_for(&identity(Role::User));
        assert!(matches!(
            gate().authenticate(&ctx, Some(&token)),
            Err(AuthError::Cancelled)
        ));
    }
}
