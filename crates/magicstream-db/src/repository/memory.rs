//! In-process repository implementations.
//!
//! Used by the service and HTTP tests. Each write takes the map's write
//! lock once, giving the same per-user last-writer-wins behaviour as the
//! SurrealDB `UPSERT`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use magicstream_core::error::{MagicStreamError, MagicStreamResult};
use magicstream_core::models::role::Role;
use magicstream_core::models::session::SessionRecord;
use magicstream_core::models::user::{CreateUser, Identity, User};
use magicstream_core::repository::{SessionStore, UserRepository};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Users kept in a shared map. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserRepository for MemoryUserRepository {
    async fn create(&self, input: CreateUser) -> MagicStreamResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == input.email) {
            return Err(MagicStreamError::AlreadyExists {
                entity: "user".into(),
            });
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            password_hash: input.password_hash,
            role: input.role,
            favourite_genres: input.favourite_genres,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> MagicStreamResult<User> {
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| MagicStreamError::not_found("user", id))
    }

    async fn get_by_email(&self, email: &str) -> MagicStreamResult<User> {
        self.users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| MagicStreamError::not_found("user", format!("email={email}")))
    }

    async fn count_by_email(&self, email: &str) -> MagicStreamResult<u64> {
        let users = self.users.read().await;
        Ok(users.values().filter(|u| u.email == email).count() as u64)
    }

    async fn update_role(&self, id: Uuid, role: Role) -> MagicStreamResult<User> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| MagicStreamError::not_found("user", id))?;
        user.role = role;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

/// Session records kept in a shared map, with identities resolved
/// against a [`MemoryUserRepository`].
#[derive(Debug, Clone)]
pub struct MemorySessionStore {
    users: MemoryUserRepository,
    records: Arc<RwLock<HashMap<Uuid, SessionRecord>>>,
    writes: Arc<AtomicU64>,
}

impl MemorySessionStore {
    pub fn new(users: MemoryUserRepository) -> Self {
        Self {
            users,
            records: Arc::default(),
            writes: Arc::default(),
        }
    }

    /// Number of completed `upsert_tokens` and `clear_tokens` calls.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    async fn put(&self, record: SessionRecord) {
        self.records.write().await.insert(record.user_id, record);
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl SessionStore for MemorySessionStore {
    async fn upsert_tokens(
        &self,
        user_id: Uuid,
        access_token: &str,
        refresh_token: &str,
        at: DateTime<Utc>,
    ) -> MagicStreamResult<()> {
        self.put(SessionRecord {
            user_id,
            access_token: access_token.to_owned(),
            refresh_token: refresh_token.to_owned(),
            updated_at: at,
        })
        .await;
        Ok(())
    }

    async fn clear_tokens(&self, user_id: Uuid, at: DateTime<Utc>) -> MagicStreamResult<()> {
        self.put(SessionRecord {
            user_id,
            access_token: String::new(),
            refresh_token: String::new(),
            updated_at: at,
        })
        .await;
        Ok(())
    }

    async fn fetch_identity(&self, user_id: Uuid) -> MagicStreamResult<Identity> {
        self.users.get_by_id(user_id).await.map(|u| u.identity())
    }

    async fn get_record(&self, user_id: Uuid) -> MagicStreamResult<Option<SessionRecord>> {
        Ok(self.records.read().await.get(&user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> CreateUser {
        CreateUser {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            password_hash: "$argon2id$stub".into(),
            role: Role::User,
            favourite_genres: Vec::new(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let repo = MemoryUserRepository::new();
        repo.create(new_user("a@x.com")).await.unwrap();
        let err = repo.create(new_user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, MagicStreamError::AlreadyExists { .. }));
        assert_eq!(repo.count_by_email("a@x.com").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let repo = MemoryUserRepository::new();
        assert!(repo.get_by_id(Uuid::new_v4()).await.unwrap_err().is_not_found());
        assert!(repo.get_by_email("nobody@x.com").await.unwrap_err().is_not_found());
        assert!(
            repo.update_role(Uuid::new_v4(), Role::Admin)
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn upsert_overwrites_and_clear_blanks() {
        let users = MemoryUserRepository::new();
        let store = MemorySessionStore::new(users.clone());
        let user = users.create(new_user("a@x.com")).await.unwrap();
        let now = Utc::now();

        assert!(store.get_record(user.id).await.unwrap().is_none());

        store.upsert_tokens(user.id, "a1", "r1", now).await.unwrap();
        store.upsert_tokens(user.id, "a2", "r2", now).await.unwrap();
        let record = store.get_record(user.id).await.unwrap().unwrap();
        assert_eq!(record.access_token, "a2");
        assert_eq!(record.refresh_token, "r2");

        store.clear_tokens(user.id, now).await.unwrap();
        let record = store.get_record(user.id).await.unwrap().unwrap();
        assert!(!record.is_active());
        assert_eq!(store.write_count(), 3);
    }

    #[tokio::test]
    async fn identity_reflects_role_change() {
        let users = MemoryUserRepository::new();
        let store = MemorySessionStore::new(users.clone());
        let user = users.create(new_user("a@x.com")).await.unwrap();

        users.update_role(user.id, Role::Admin).await.unwrap();
        let identity = store.fetch_identity(user.id).await.unwrap();
        assert_eq!(identity.role, Role::Admin);
        assert!(store.fetch_identity(Uuid::new_v4()).await.unwrap_err().is_not_found());
    }
}
