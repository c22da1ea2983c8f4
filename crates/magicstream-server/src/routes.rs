//! Router assembly.

use axum::http::{Method, header};
use axum::{
    Router,
    routing::{get, post, put},
};
use magicstream_core::repository::{SessionStore, UserRepository};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the full router. `origins` are the values allowed to make
/// credentialed cross-origin requests.
pub fn router<U, S>(state: AppState<U, S>, origins: Vec<header::HeaderValue>) -> Router
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/register", post(handlers::register::<U, S>))
        .route("/login", post(handlers::login::<U, S>))
        .route("/user/logout", post(handlers::logout::<U, S>))
        .route("/user/refresh-token", post(handlers::refresh::<U, S>))
        .route("/user/me", get(handlers::me))
        .route(
            "/admin/users/{user_id}/session",
            get(handlers::get_session::<U, S>),
        )
        .route("/admin/users/{user_id}/role", put(handlers::set_role::<U, S>))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
