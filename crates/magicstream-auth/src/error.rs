//! Authentication error types.

use magicstream_core::error::MagicStreamError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token is malformed")]
    MalformedToken,

    #[error("token signature does not verify")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("no bearer credential presented")]
    MissingCredential,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("invalid or expired refresh token")]
    InvalidRefreshToken,

    #[error("identity no longer exists")]
    UnknownIdentity,

    #[error("access token has been revoked")]
    Revoked,

    #[error("insufficient role")]
    Forbidden,

    #[error("user already exists")]
    AlreadyRegistered,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("signing failed: {0}")]
    SigningFailure(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("session store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid auth configuration: {0}")]
    InvalidConfig(String),
}

/// The externally visible result classes. Transport layers switch on
/// this, never on the error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unauthorized,
    Forbidden,
    BadRequest,
    Conflict,
    /// Transient; the caller may retry.
    Unavailable,
    Internal,
}

impl AuthError {
    pub fn outcome(&self) -> Outcome {
        match self {
            AuthError::MalformedToken
            | AuthError::BadSignature
            | AuthError::Expired
            | AuthError::MissingCredential
            | AuthError::InvalidCredentials
            | AuthError::InvalidRefreshToken
            | AuthError::UnknownIdentity
            | AuthError::Revoked => Outcome::Unauthorized,
            AuthError::Forbidden => Outcome::Forbidden,
            AuthError::InvalidInput(_) => Outcome::BadRequest,
            AuthError::AlreadyRegistered => Outcome::Conflict,
            AuthError::StoreUnavailable(_) | AuthError::Cancelled => Outcome::Unavailable,
            AuthError::SigningFailure(_)
            | AuthError::PasswordHash(_)
            | AuthError::InvalidConfig(_) => Outcome::Internal,
        }
    }
}

/// Store failures that the caller did not anticipate. `NotFound` is
/// handled at each call site because its meaning depends on the
/// operation; anything reaching this conversion is treated as the store
/// being unavailable rather than as "absent".
impl From<MagicStreamError> for AuthError {
    fn from(err: MagicStreamError) -> Self {
        match err {
            MagicStreamError::Validation { message } => AuthError::InvalidInput(message),
            MagicStreamError::AlreadyExists { .. } => AuthError::AlreadyRegistered,
            other => AuthError::StoreUnavailable(other.to_string()),
        }
    }
}
