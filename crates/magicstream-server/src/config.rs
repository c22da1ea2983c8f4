//! Layered server configuration: built-in defaults, an optional config
//! file, `MAGICSTREAM__SECTION__KEY` environment variables, then CLI
//! overrides.

use std::time::Duration;

use axum::http::HeaderValue;
use axum::http::header::InvalidHeaderValue;
use clap::Parser;
use config::{Config, Environment, File};
use magicstream_auth::{AuthConfig, AuthError, RevocationMode};
use magicstream_db::DbConfig;
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "MAGICSTREAM_CONFIG")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthSettings,
    pub database: DatabaseSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed to make credentialed cross-origin requests.
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// Mark session cookies `Secure`. Disable only for plain-HTTP
    /// local development.
    pub secure_cookies: bool,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cors_origins(&self) -> Result<Vec<HeaderValue>, InvalidHeaderValue> {
        self.allowed_origins
            .iter()
            .map(|o| HeaderValue::from_str(o))
            .collect()
    }
}

#[derive(Deserialize, Clone)]
pub struct AuthSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_token_lifetime_secs: u64,
    pub refresh_token_lifetime_secs: u64,
    pub pepper: Option<String>,
    pub min_password_length: usize,
    pub store_timeout_secs: u64,
    pub revocation: RevocationMode,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("access_token_lifetime_secs", &self.access_token_lifetime_secs)
            .field("refresh_token_lifetime_secs", &self.refresh_token_lifetime_secs)
            .field("min_password_length", &self.min_password_length)
            .field("store_timeout_secs", &self.store_timeout_secs)
            .field("revocation", &self.revocation)
            .finish_non_exhaustive()
    }
}

impl AuthSettings {
    /// Convert to the auth crate's config and validate it.
    pub fn to_auth_config(&self) -> Result<AuthConfig, AuthError> {
        let config = AuthConfig {
            access_secret: self.access_secret.clone().into(),
            refresh_secret: self.refresh_secret.clone().into(),
            access_token_lifetime_secs: self.access_token_lifetime_secs,
            refresh_token_lifetime_secs: self.refresh_token_lifetime_secs,
            pepper: self.pepper.clone().filter(|p| !p.is_empty()),
            min_password_length: self.min_password_length,
            store_timeout: Duration::from_secs(self.store_timeout_secs),
            revocation: self.revocation,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
    pub connect_timeout_secs: u64,
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("url", &self.url)
            .field("namespace", &self.namespace)
            .field("database", &self.database)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish_non_exhaustive()
    }
}

impl DatabaseSettings {
    pub fn to_db_config(&self) -> DbConfig {
        DbConfig {
            url: self.url.clone(),
            namespace: self.namespace.clone(),
            database: self.database.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let db = DbConfig::default();
        let auth = AuthConfig::default();

        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.allowed_origins", vec!["http://localhost:5173"])?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("server.secure_cookies", true)?
            .set_default("auth.access_secret", "")?
            .set_default("auth.refresh_secret", "")?
            .set_default("auth.access_token_lifetime_secs", auth.access_token_lifetime_secs)?
            .set_default("auth.refresh_token_lifetime_secs", auth.refresh_token_lifetime_secs)?
            .set_default("auth.min_password_length", auth.min_password_length as u64)?
            .set_default("auth.store_timeout_secs", auth.store_timeout.as_secs())?
            .set_default("auth.revocation", "eventual")?
            .set_default("database.url", db.url)?
            .set_default("database.namespace", db.namespace)?
            .set_default("database.database", db.database)?
            .set_default("database.username", db.username)?
            .set_default("database.password", db.password)?
            .set_default("database.connect_timeout_secs", db.connect_timeout.as_secs())?;

        if let Some(path) = cli.config.as_deref() {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // E.g. MAGICSTREAM__AUTH__ACCESS_SECRET=...
        builder = builder.add_source(
            Environment::with_prefix("MAGICSTREAM")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.allowed_origins")
                .try_parsing(true),
        );

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }

        builder.build()?.try_deserialize()
    }
}
