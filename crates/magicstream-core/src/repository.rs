//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async and return `Send` futures so
//! they can be driven from any worker of a multi-threaded runtime.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::MagicStreamResult;
use crate::models::{
    role::Role,
    session::SessionRecord,
    user::{CreateUser, Identity, User},
};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = MagicStreamResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = MagicStreamResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = MagicStreamResult<User>> + Send;
    /// Number of users registered under `email` (used to reject duplicates).
    fn count_by_email(&self, email: &str) -> impl Future<Output = MagicStreamResult<u64>> + Send;
    fn update_role(
        &self,
        id: Uuid,
        role: Role,
    ) -> impl Future<Output = MagicStreamResult<User>> + Send;
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Durable per-user record of the currently valid token pair.
///
/// Implementations must make `upsert_tokens` and `clear_tokens` a single
/// atomic write keyed by user id: concurrent writers for the same user
/// are serialized and the last one to complete wins. `at` is recorded
/// as-is and plays no part in conflict resolution.
pub trait SessionStore: Send + Sync {
    fn upsert_tokens(
        &self,
        user_id: Uuid,
        access_token: &str,
        refresh_token: &str,
        at: DateTime<Utc>,
    ) -> impl Future<Output = MagicStreamResult<()>> + Send;

    /// Store the empty sentinels. Succeeds whether or not a record exists.
    fn clear_tokens(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = MagicStreamResult<()>> + Send;

    /// Current profile for `user_id`, or `NotFound`.
    fn fetch_identity(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = MagicStreamResult<Identity>> + Send;

    /// The stored record, or `None` if the user never logged in.
    fn get_record(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = MagicStreamResult<Option<SessionRecord>>> + Send;
}
