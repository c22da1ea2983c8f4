//! SurrealDB client setup for the server binary.

use std::time::Duration;

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::{info, warn};

use crate::error::DbError;

/// Where and how to reach SurrealDB.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket address, e.g. `127.0.0.1:8000`.
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
    /// Bound on the whole handshake: socket, sign-in and ns/db selection.
    pub connect_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "magicstream".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// An authenticated client bound to the configured namespace and
/// database.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Open the socket, sign in as root and select the namespace and
    /// database, all within `config.connect_timeout`.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            timeout_ms = config.connect_timeout.as_millis() as u64,
            "Connecting to SurrealDB"
        );

        let db = tokio::time::timeout(config.connect_timeout, handshake(config))
            .await
            .map_err(|_| {
                warn!(url = %config.url, "SurrealDB handshake timed out");
                DbError::ConnectTimeout(config.connect_timeout)
            })??;

        info!(url = %config.url, "SurrealDB ready");
        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}

async fn handshake(config: &DbConfig) -> Result<Surreal<Client>, DbError> {
    let db = Surreal::new::<Ws>(config.url.as_str())
        .await
        .map_err(|source| DbError::Connection { stage: "connect", source })?;

    db.signin(Root {
        username: &config.username,
        password: &config.password,
    })
    .await
    .map_err(|source| DbError::Connection { stage: "sign in", source })?;

    db.use_ns(config.namespace.as_str())
        .use_db(config.database.as_str())
        .await
        .map_err(|source| DbError::Connection {
            stage: "namespace selection",
            source,
        })?;

    Ok(db)
}
