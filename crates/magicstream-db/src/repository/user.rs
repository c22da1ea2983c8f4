//! SurrealDB implementation of [`UserRepository`].

use chrono::{DateTime, Utc};
use magicstream_core::error::MagicStreamResult;
use magicstream_core::models::genre::Genre;
use magicstream_core::models::role::Role;
use magicstream_core::models::user::{CreateUser, User};
use magicstream_core::repository::UserRepository;
use serde::Deserialize;
use surrealdb::{Connection, Surreal};
use uuid::Uuid;

use crate::error::DbError;

/// Projection shared by every user read. Datetimes are cast to strings
/// and parsed on our side.
pub(crate) const USER_FIELDS: &str = "meta::id(id) AS record_id, first_name, last_name, \
     email, password_hash, role, favourite_genres, \
     <string> created_at AS created_at, <string> updated_at AS updated_at";

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, Deserialize)]
pub(crate) struct UserRow {
    record_id: String,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    role: String,
    #[serde(default)]
    favourite_genres: Vec<Genre>,
    created_at: String,
    updated_at: String,
}

/// Row struct for count queries.
#[derive(Debug, Deserialize)]
struct CountRow {
    total: u64,
}

pub(crate) fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Corrupt(format!("invalid datetime {raw:?}: {e}")))
}

impl UserRow {
    pub(crate) fn try_into_user(self) -> Result<User, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        let role: Role = self
            .role
            .parse()
            .map_err(|e| DbError::Corrupt(format!("{e}")))?;
        Ok(User {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            password_hash: self.password_hash,
            role,
            favourite_genres: self.favourite_genres,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

/// Fetch one user by id. Shared with the session store, which
/// rehydrates identities from the same table.
pub(crate) async fn select_user<C: Connection>(db: &Surreal<C>, id: Uuid) -> Result<User, DbError> {
    let id_str = id.to_string();

    let mut result = db
        .query(format!(
            "SELECT {USER_FIELDS} FROM type::thing('user', $id)"
        ))
        .bind(("id", id_str.clone()))
        .await?;

    let rows: Vec<UserRow> = result.take(0)?;
    let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
        entity: "user".into(),
        id: id_str,
    })?;

    row.try_into_user()
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> MagicStreamResult<User> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::thing('user', $id) SET \
                 first_name = $first_name, \
                 last_name = $last_name, \
                 email = $email, \
                 password_hash = $password_hash, \
                 role = $role, \
                 favourite_genres = $favourite_genres",
            )
            .bind(("id", id.to_string()))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .bind(("email", input.email))
            .bind(("password_hash", input.password_hash))
            .bind(("role", input.role.as_str()))
            .bind(("favourite_genres", input.favourite_genres))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        select_user(&self.db, id).await.map_err(Into::into)
    }

    async fn get_by_id(&self, id: Uuid) -> MagicStreamResult<User> {
        select_user(&self.db, id).await.map_err(Into::into)
    }

    async fn get_by_email(&self, email: &str) -> MagicStreamResult<User> {
        let email_owned = email.to_string();

        let mut result = self
            .db
            .query(format!("SELECT {USER_FIELDS} FROM user WHERE email = $email"))
            .bind(("email", email_owned.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: format!("email={email_owned}"),
        })?;

        row.try_into_user().map_err(Into::into)
    }

    async fn count_by_email(&self, email: &str) -> MagicStreamResult<u64> {
        let mut result = self
            .db
            .query("SELECT count() AS total FROM user WHERE email = $email GROUP ALL")
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn update_role(&self, id: Uuid, role: Role) -> MagicStreamResult<User> {
        // UPDATE on a missing record is a no-op; the read below reports
        // NotFound in that case.
        self.db
            .query(
                "UPDATE type::thing('user', $id) SET \
                 role = $role, updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("role", role.as_str()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        select_user(&self.db, id).await.map_err(Into::into)
    }
}
