//! MagicStream Server: HTTP surface for registration, login, token
//! refresh and logout.

pub mod config;
pub mod cookies;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::AppConfig;
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
