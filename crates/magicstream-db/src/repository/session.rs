//! SurrealDB implementation of [`SessionStore`].
//!
//! One `session` record per user, keyed by the user id. Every write is a
//! single `UPSERT` statement so concurrent writers for the same user
//! never observe a half-written pair.

use chrono::{DateTime, Utc};
use magicstream_core::error::MagicStreamResult;
use magicstream_core::models::session::SessionRecord;
use magicstream_core::models::user::Identity;
use magicstream_core::repository::SessionStore;
use serde::Deserialize;
use surrealdb::{Connection, Surreal};
use uuid::Uuid;

use super::user::{parse_datetime, select_user};
use crate::error::DbError;

const UPSERT_SESSION: &str = "UPSERT type::thing('session', $id) SET \
     user_id = $id, \
     access_token = $access, \
     refresh_token = $refresh, \
     updated_at = <datetime> $at";

#[derive(Debug, Deserialize)]
struct SessionRow {
    user_id: String,
    access_token: String,
    refresh_token: String,
    updated_at: String,
}

impl SessionRow {
    fn try_into_record(self) -> Result<SessionRecord, DbError> {
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| DbError::Corrupt(format!("invalid user UUID: {e}")))?;
        Ok(SessionRecord {
            user_id,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

/// SurrealDB implementation of the session store.
#[derive(Clone)]
pub struct SurrealSessionStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSessionStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn write(
        &self,
        user_id: Uuid,
        access: String,
        refresh: String,
        at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        self.db
            .query(UPSERT_SESSION)
            .bind(("id", user_id.to_string()))
            .bind(("access", access))
            .bind(("refresh", refresh))
            .bind(("at", at.to_rfc3339()))
            .await?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }
}

impl<C: Connection> SessionStore for SurrealSessionStore<C> {
    async fn upsert_tokens(
        &self,
        user_id: Uuid,
        access_token: &str,
        refresh_token: &str,
        at: DateTime<Utc>,
    ) -> MagicStreamResult<()> {
        self.write(user_id, access_token.to_owned(), refresh_token.to_owned(), at)
            .await
            .map_err(Into::into)
    }

    async fn clear_tokens(&self, user_id: Uuid, at: DateTime<Utc>) -> MagicStreamResult<()> {
        self.write(user_id, String::new(), String::new(), at)
            .await
            .map_err(Into::into)
    }

    async fn fetch_identity(&self, user_id: Uuid) -> MagicStreamResult<Identity> {
        let user = select_user(&self.db, user_id).await?;
        Ok(user.identity())
    }

    async fn get_record(&self, user_id: Uuid) -> MagicStreamResult<Option<SessionRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT user_id, access_token, refresh_token, \
                 <string> updated_at AS updated_at \
                 FROM type::thing('session', $id)",
            )
            .bind(("id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_record()?)),
            None => Ok(None),
        }
    }
}
