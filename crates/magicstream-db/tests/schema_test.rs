//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    magicstream_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: surrealdb::Value = result.take(0).unwrap();
    let info_str = format!("{info:?}");

    assert!(info_str.contains("user"), "missing user table");
    assert!(info_str.contains("session"), "missing session table");
    assert!(info_str.contains("_migration"), "missing _migration table");
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    assert_eq!(magicstream_db::run_migrations(&db).await.unwrap(), 1);
    assert_eq!(magicstream_db::run_migrations(&db).await.unwrap(), 0);

    let mut result = db
        .query("SELECT count() AS total FROM _migration GROUP ALL")
        .await
        .unwrap();
    let total: Option<u64> = result.take("total").unwrap();
    assert_eq!(total, Some(1));
}

#[tokio::test]
async fn role_outside_the_closed_set_is_rejected() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    magicstream_db::run_migrations(&db).await.unwrap();

    let result = db
        .query(
            "CREATE user SET first_name = 'Ada', last_name = 'Lovelace', \
             email = 'a@x.com', password_hash = 'x', role = 'admin'",
        )
        .await
        .unwrap()
        .check();
    assert!(result.is_err(), "lowercase role should violate the ASSERT");
}

#[tokio::test]
async fn unknown_schema_version_is_refused() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    magicstream_db::run_migrations(&db).await.unwrap();

    db.query("CREATE _migration SET version = 99, name = 'from_a_newer_build'")
        .await
        .unwrap()
        .check()
        .unwrap();

    let err = magicstream_db::run_migrations(&db).await.unwrap_err();
    assert!(matches!(err, magicstream_db::DbError::Migration(_)));
    assert!(err.to_string().contains("v99"));
}
