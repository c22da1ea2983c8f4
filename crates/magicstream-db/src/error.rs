//! Database-specific error types and conversions.

use std::time::Duration;

use magicstream_core::error::MagicStreamError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("SurrealDB {stage} failed: {source}")]
    Connection {
        stage: &'static str,
        #[source]
        source: surrealdb::Error,
    },

    #[error("No SurrealDB connection within {0:?}")]
    ConnectTimeout(Duration),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Stored record is invalid: {0}")]
    Corrupt(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl From<DbError> for MagicStreamError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => MagicStreamError::NotFound { entity, id },
            other => MagicStreamError::Database(other.to_string()),
        }
    }
}
