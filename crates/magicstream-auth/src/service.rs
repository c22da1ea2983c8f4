//! Session lifecycle: registration, login, logout and refresh
//! orchestration.

use std::future::Future;
use std::sync::Arc;

use magicstream_core::error::MagicStreamResult;
use magicstream_core::models::genre::Genre;
use magicstream_core::models::role::Role;
use magicstream_core::models::session::SessionRecord;
use magicstream_core::models::user::{CreateUser, Identity, User};
use magicstream_core::repository::{SessionStore, UserRepository};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::{AuthConfig, RevocationMode};
use crate::context::OpContext;
use crate::error::AuthError;
use crate::gate::{AuthenticatedUser, AuthenticationGate};
use crate::issuer::{CredentialIssuer, TokenPair};
use crate::password;
use crate::token;

/// Input for the registration flow.
#[derive(Debug)]
pub struct RegisterInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub favourite_genres: Vec<Genre>,
}

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    pub identity: Identity,
    pub favourite_genres: Vec<Genre>,
    pub tokens: TokenPair,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Session lifecycle service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate.
pub struct SessionLifecycleService<U: UserRepository, S: SessionStore> {
    user_repo: U,
    session_store: S,
    issuer: CredentialIssuer,
    config: AuthConfig,
    clock: Arc<dyn Clock>,
    /// Verified against when the email is unknown so that both login
    /// failures cost the same.
    dummy_hash: String,
}

impl<U: UserRepository, S: SessionStore> SessionLifecycleService<U, S> {
    pub fn new(user_repo: U, session_store: S, config: AuthConfig) -> Result<Self, AuthError> {
        config.validate()?;
        let dummy_hash = password::hash_password("magicstream-unknown-user", config.pepper.as_deref())?;
        Ok(Self {
            user_repo,
            session_store,
            issuer: CredentialIssuer::new(&config),
            config,
            clock: Arc::new(SystemClock),
            dummy_hash,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// A gate sharing this service's access key and clock.
    pub fn gate(&self) -> AuthenticationGate {
        AuthenticationGate::new(self.config.access_secret.clone(), Arc::clone(&self.clock))
    }

    async fn store<T>(
        &self,
        ctx: &OpContext,
        fut: impl Future<Output = MagicStreamResult<T>>,
    ) -> Result<MagicStreamResult<T>, AuthError> {
        ctx.run(self.config.store_timeout, fut).await
    }

    /// Create a new account after validating the input and rejecting
    /// duplicate emails.
    pub async fn register(&self, ctx: &OpContext, input: RegisterInput) -> Result<User, AuthError> {
        ctx.ensure_active()?;
        let email = input.email.trim().to_string();
        validate_registration(&input, &email, self.config.min_password_length)?;

        let existing = self
            .store(ctx, self.user_repo.count_by_email(&email))
            .await??;
        if existing > 0 {
            return Err(AuthError::AlreadyRegistered);
        }

        let password_hash = password::hash_password(&input.password, self.config.pepper.as_deref())?;

        let user = self
            .store(
                ctx,
                self.user_repo.create(CreateUser {
                    first_name: input.first_name.trim().to_string(),
                    last_name: input.last_name.trim().to_string(),
                    email,
                    password_hash,
                    role: input.role,
                    favourite_genres: input.favourite_genres,
                }),
            )
            .await??;

        info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    /// Authenticate with email + password and issue a fresh token pair,
    /// replacing whatever pair the user held before.
    ///
    /// An unknown email and a wrong password both yield
    /// `InvalidCredentials` after the same Argon2id work.
    pub async fn login(&self, ctx: &OpContext, input: LoginInput) -> Result<LoginOutput, AuthError> {
        ctx.ensure_active()?;
        let pepper = self.config.pepper.as_deref();

        // 1. Look up user.
        let found = match self
            .store(ctx, self.user_repo.get_by_email(input.email.trim()))
            .await?
        {
            Ok(user) => Some(user),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e.into()),
        };

        // 2. Verify password.
        let user = match found {
            Some(user) => match password::verify_password(&input.password, &user.password_hash, pepper) {
                Ok(true) => user,
                Ok(false) => {
                    warn!(user_id = %user.id, "Login failed: password mismatch");
                    return Err(AuthError::InvalidCredentials);
                }
                Err(e) => {
                    warn!(user_id = %user.id, error = %e, "Login failed: stored password hash is unusable");
                    return Err(AuthError::InvalidCredentials);
                }
            },
            None => {
                let _ = password::verify_password(&input.password, &self.dummy_hash, pepper);
                warn!("Login failed: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        // 3. Issue and persist the pair.
        ctx.ensure_active()?;
        let identity = user.identity();
        let tokens = self.persist_new_pair(ctx, &identity).await?;

        info!(user_id = %user.id, "User logged in");
        Ok(LoginOutput {
            identity,
            favourite_genres: user.favourite_genres,
            tokens,
            expires_in: self.config.access_token_lifetime_secs,
        })
    }

    /// Clear the stored pair. Succeeds whether or not a session existed.
    pub async fn logout(&self, ctx: &OpContext, user_id: Uuid) -> Result<(), AuthError> {
        ctx.ensure_active()?;
        self.store(ctx, self.session_store.clear_tokens(user_id, self.clock.now()))
            .await??;
        info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// Profile fields and role are re-read from the store rather than
    /// copied from the presented token, so a role change takes effect at
    /// the next refresh. Every decode failure is reported as
    /// `InvalidRefreshToken`; nothing is written unless the token
    /// verifies.
    ///
    /// With [`RevocationMode::Immediate`] the presented token must also be
    /// the stored current refresh token of an active session, so a token
    /// cleared by logout or replaced by rotation is refused. Two refreshes
    /// of the same token that both read the record before either writes
    /// both succeed and the last write wins; the losing pair then fails
    /// `verify_current` and its refresh token is refused.
    pub async fn refresh(&self, ctx: &OpContext, presented: &str) -> Result<TokenPair, AuthError> {
        ctx.ensure_active()?;

        let claims = token::decode(presented, &self.config.refresh_secret, self.clock.now())
            .map_err(|e| {
                debug!(reason = %e, "Refresh token rejected");
                AuthError::InvalidRefreshToken
            })?;
        let user_id = claims
            .user_id()
            .map_err(|_| AuthError::InvalidRefreshToken)?;

        let identity = match self
            .store(ctx, self.session_store.fetch_identity(user_id))
            .await?
        {
            Ok(identity) => identity,
            Err(e) if e.is_not_found() => {
                warn!(user_id = %user_id, "Refresh for unknown identity");
                return Err(AuthError::UnknownIdentity);
            }
            Err(e) => return Err(e.into()),
        };

        if self.config.revocation == RevocationMode::Immediate {
            let record = self
                .store(ctx, self.session_store.get_record(user_id))
                .await??;
            match record {
                Some(r) if r.is_active() && constant_time_eq(&r.refresh_token, presented) => {}
                _ => {
                    warn!(user_id = %user_id, "Refresh token is not the current one");
                    return Err(AuthError::InvalidRefreshToken);
                }
            }
        }

        let tokens = self.persist_new_pair(ctx, &identity).await?;
        info!(user_id = %user_id, "Tokens refreshed");
        Ok(tokens)
    }

    /// With [`RevocationMode::Immediate`], require the presented access
    /// token to be the stored current one. A no-op in eventual mode.
    pub async fn verify_current(
        &self,
        ctx: &OpContext,
        user: &AuthenticatedUser,
        presented: &str,
    ) -> Result<(), AuthError> {
        if self.config.revocation == RevocationMode::Eventual {
            return Ok(());
        }

        let record = self
            .store(ctx, self.session_store.get_record(user.user_id))
            .await??;
        match record {
            Some(r) if r.is_active() && constant_time_eq(&r.access_token, presented) => Ok(()),
            _ => {
                debug!(user_id = %user.user_id, "Access token is not the current one");
                Err(AuthError::Revoked)
            }
        }
    }

    /// The stored session record for `user_id`, if any.
    pub async fn session(
        &self,
        ctx: &OpContext,
        user_id: Uuid,
    ) -> Result<Option<SessionRecord>, AuthError> {
        ctx.ensure_active()?;
        Ok(self
            .store(ctx, self.session_store.get_record(user_id))
            .await??)
    }

    /// Change a user's role. Tokens already issued keep the old role
    /// until they are refreshed or expire.
    pub async fn set_role(
        &self,
        ctx: &OpContext,
        user_id: Uuid,
        role: Role,
    ) -> Result<Identity, AuthError> {
        ctx.ensure_active()?;
        match self.store(ctx, self.user_repo.update_role(user_id, role)).await? {
            Ok(user) => {
                info!(user_id = %user_id, role = %role, "Role updated");
                Ok(user.identity())
            }
            Err(e) if e.is_not_found() => Err(AuthError::UnknownIdentity),
            Err(e) => Err(e.into()),
        }
    }

    async fn persist_new_pair(
        &self,
        ctx: &OpContext,
        identity: &Identity,
    ) -> Result<TokenPair, AuthError> {
        let now = self.clock.now();
        let tokens = self.issuer.issue(identity, now)?;
        self.store(
            ctx,
            self.session_store.upsert_tokens(
                identity.id,
                &tokens.access_token,
                &tokens.refresh_token,
                now,
            ),
        )
        .await??;
        Ok(tokens)
    }
}

/// Compare without an early exit on the first differing byte.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}

fn validate_registration(input: &RegisterInput, email: &str, min_password: usize) -> Result<(), AuthError> {
    for (field, value) in [("first_name", &input.first_name), ("last_name", &input.last_name)] {
        let len = value.trim().chars().count();
        if !(2..=100).contains(&len) {
            return Err(AuthError::InvalidInput(format!(
                "{field} must be between 2 and 100 characters"
            )));
        }
    }

    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.contains(char::is_whitespace) => {}
        _ => return Err(AuthError::InvalidInput("email is not a valid address".into())),
    }

    if input.password.chars().count() < min_password {
        return Err(AuthError::InvalidInput(format!(
            "password must be at least {min_password} characters"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(first: &str, email: &str, password: &str) -> RegisterInput {
        RegisterInput {
            first_name: first.into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            password: password.into(),
            role: Role::User,
            favourite_genres: Vec::new(),
        }
    }

    #[test]
    fn accepts_reasonable_registration() {
        let i = input("Ada", "a@x.com", "secret1");
        assert!(validate_registration(&i, &i.email, 6).is_ok());
    }

    #[test]
    fn rejects_short_name() {
        let i = input("A", "a@x.com", "secret1");
        assert!(matches!(
            validate_registration(&i, &i.email, 6),
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_bad_email() {
        for email in ["", "ax.com", "@x.com", "a@x", "a@.com", "a@x.com.", "a b@x.com", "a@b@x.com"] {
            let i = input("Ada", email, "secret1");
            assert!(
                validate_registration(&i, email, 6).is_err(),
                "{email:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_short_password() {
        let i = input("Ada", "a@x.com", "12345");
        assert!(validate_registration(&i, &i.email, 6).is_err());
    }

    #[test]
    fn constant_time_eq_matches_equality() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(constant_time_eq("", ""));
    }
}
