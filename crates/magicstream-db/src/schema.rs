//! SurrealDB schema and its versioned migrations.
//!
//! Tables are SCHEMAFULL. User ids live in record ids and in
//! `session.user_id` as UUID strings; roles are strings limited to the
//! closed set by an ASSERT.

use serde::Deserialize;
use surrealdb::{Connection, Surreal};
use tracing::{debug, info};

use crate::error::DbError;

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, Deserialize)]
struct AppliedMigration {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD first_name ON TABLE user TYPE string;
DEFINE FIELD last_name ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['ADMIN', 'USER'];
DEFINE FIELD favourite_genres ON TABLE user TYPE array<object> DEFAULT [];
DEFINE FIELD favourite_genres[*].genre_id ON TABLE user TYPE int;
DEFINE FIELD favourite_genres[*].genre_name ON TABLE user TYPE string;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- =======================================================================
-- Sessions (one record per user, keyed by the user id)
-- =======================================================================
DEFINE TABLE session SCHEMAFULL;
DEFINE FIELD user_id ON TABLE session TYPE string;
DEFINE FIELD access_token ON TABLE session TYPE string;
DEFINE FIELD refresh_token ON TABLE session TYPE string;
DEFINE FIELD updated_at ON TABLE session TYPE datetime;
";

/// Bring the database up to the latest schema and return how many
/// migrations were applied.
///
/// Each migration runs in one transaction together with its `_migration`
/// row, so a failed migration leaves neither its DDL nor its record
/// behind. A database that already carries a version this binary does
/// not know is refused rather than written to.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<usize, DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(format!("tracking table: {e}")))?;

    let applied = applied_versions(db).await?;
    if let Some(unknown) = applied
        .iter()
        .find(|v| !MIGRATIONS.iter().any(|m| m.version == **v))
    {
        return Err(DbError::Migration(format!(
            "database is at schema v{unknown}, which this build does not know"
        )));
    }

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .collect();
    if pending.is_empty() {
        debug!(versions = ?applied, "Schema is current");
        return Ok(0);
    }

    for migration in &pending {
        info!(version = migration.version, name = migration.name, "Applying migration");
        let script = format!(
            "BEGIN TRANSACTION;\n{}\n\
             CREATE _migration SET version = $version, name = $name;\n\
             COMMIT TRANSACTION;",
            migration.sql
        );
        db.query(script)
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!("v{} {}: {e}", migration.version, migration.name))
            })?;
    }

    info!(applied = pending.len(), "Schema migrated");
    Ok(pending.len())
}

async fn applied_versions<C: Connection>(db: &Surreal<C>) -> Result<Vec<u32>, DbError> {
    let mut result = db.query("SELECT version FROM _migration").await?;
    let rows: Vec<AppliedMigration> = result.take(0)?;
    Ok(rows.into_iter().map(|r| r.version).collect())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_defines_both_tables() {
        assert!(SCHEMA_V1.contains("DEFINE TABLE user"));
        assert!(SCHEMA_V1.contains("DEFINE TABLE session"));
    }

    #[test]
    fn migration_versions_ascend_from_one() {
        assert_eq!(MIGRATIONS.first().map(|m| m.version), Some(1));
        for pair in MIGRATIONS.windows(2) {
            assert!(pair[0].version < pair[1].version);
        }
    }

    #[test]
    fn migrations_do_not_manage_their_own_transactions() {
        for m in MIGRATIONS {
            assert!(!m.sql.contains("BEGIN"), "v{} opens a transaction", m.version);
            assert!(!m.sql.contains("COMMIT"), "v{} commits", m.version);
        }
    }
}
