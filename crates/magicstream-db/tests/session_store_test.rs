//! Integration tests for the session store using in-memory SurrealDB.

use chrono::{DurationRound, TimeDelta, Utc};
use magicstream_core::models::role::Role;
use magicstream_core::models::user::CreateUser;
use magicstream_core::repository::{SessionStore, UserRepository};
use magicstream_db::repository::{SurrealSessionStore, SurrealUserRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> (SurrealUserRepository<Db>, SurrealSessionStore<Db>) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    magicstream_db::run_migrations(&db).await.unwrap();
    (
        SurrealUserRepository::new(db.clone()),
        SurrealSessionStore::new(db),
    )
}

async fn create_user(repo: &SurrealUserRepository<Db>) -> Uuid {
    repo.create(CreateUser {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: "a@x.com".into(),
        password_hash: "$argon2id$v=19$stub".into(),
        role: Role::User,
        favourite_genres: Vec::new(),
    })
    .await
    .unwrap()
    .id
}

#[tokio::test]
async fn record_absent_until_first_write() {
    let (users, store) = setup().await;
    let id = create_user(&users).await;

    assert!(store.get_record(id).await.unwrap().is_none());
}

#[tokio::test]
async fn upsert_replaces_previous_pair() {
    let (users, store) = setup().await;
    let id = create_user(&users).await;
    let at = Utc::now().duration_trunc(TimeDelta::seconds(1)).unwrap();

    store.upsert_tokens(id, "access-1", "refresh-1", at).await.unwrap();
    store.upsert_tokens(id, "access-2", "refresh-2", at).await.unwrap();

    let record = store.get_record(id).await.unwrap().unwrap();
    assert_eq!(record.user_id, id);
    assert_eq!(record.access_token, "access-2");
    assert_eq!(record.refresh_token, "refresh-2");
    assert_eq!(record.updated_at, at);
    assert!(record.is_active());
}

#[tokio::test]
async fn clear_stores_empty_sentinels() {
    let (users, store) = setup().await;
    let id = create_user(&users).await;
    let at = Utc::now();

    store.upsert_tokens(id, "access", "refresh", at).await.unwrap();
    store.clear_tokens(id, at).await.unwrap();

    let record = store.get_record(id).await.unwrap().unwrap();
    assert_eq!(record.access_token, "");
    assert_eq!(record.refresh_token, "");
    assert!(!record.is_active());
}

#[tokio::test]
async fn clear_without_session_succeeds() {
    let (users, store) = setup().await;
    let id = create_user(&users).await;

    store.clear_tokens(id, Utc::now()).await.unwrap();
    let record = store.get_record(id).await.unwrap().unwrap();
    assert!(!record.is_active());
}

#[tokio::test]
async fn fetch_identity_reads_current_profile() {
    let (users, store) = setup().await;
    let id = create_user(&users).await;

    users.update_role(id, Role::Admin).await.unwrap();
    let identity = store.fetch_identity(id).await.unwrap();
    assert_eq!(identity.id, id);
    assert_eq!(identity.email, "a@x.com");
    assert_eq!(identity.role, Role::Admin);

    assert!(store.fetch_identity(Uuid::new_v4()).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn concurrent_upserts_leave_one_complete_pair() {
    let (users, store) = setup().await;
    let id = create_user(&users).await;
    let at = Utc::now();

    let (a, b) = tokio::join!(
        store.upsert_tokens(id, "access-a", "refresh-a", at),
        store.upsert_tokens(id, "access-b", "refresh-b", at),
    );
    a.unwrap();
    b.unwrap();

    let record = store.get_record(id).await.unwrap().unwrap();
    let pair = (record.access_token.as_str(), record.refresh_token.as_str());
    assert!(
        pair == ("access-a", "refresh-a") || pair == ("access-b", "refresh-b"),
        "tokens from different writes were mixed: {pair:?}"
    );
}
