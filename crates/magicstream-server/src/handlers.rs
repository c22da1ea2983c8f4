//! Request handlers. Generic over the repository implementations so
//! tests can run against the in-memory stores.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use magicstream_auth::{AuthError, AuthenticatedUser, LoginInput, RegisterInput, TokenPair};
use magicstream_core::models::genre::Genre;
use magicstream_core::models::role::Role;
use magicstream_core::models::user::User;
use magicstream_core::repository::{SessionStore, UserRepository};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::cookies::REFRESH_COOKIE;
use crate::error::{ApiError, ApiResult};
use crate::extract::{AdminUser, ApiJson, CurrentUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub favourite_genres: Vec<Genre>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub favourite_genres: Vec<Genre>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role: user.role,
            favourite_genres: user.favourite_genres,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub token: String,
    pub refresh_token: String,
    pub favourite_genres: Vec<Genre>,
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub user_id: Uuid,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `POST /register`. Self-service accounts always get the `USER` role.
pub async fn register<U, S>(
    State(state): State<AppState<U, S>>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Value>)>
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    let user = state
        .service()
        .register(
            &state.context(),
            RegisterInput {
                first_name: body.first_name,
                last_name: body.last_name,
                email: body.email,
                password: body.password,
                role: Role::User,
                favourite_genres: body.favourite_genres,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User added successfully",
            "user": UserView::from(user),
        })),
    ))
}

/// `POST /login`. Returns the pair in the body and as cookies.
pub async fn login<U, S>(
    State(state): State<AppState<U, S>>,
    jar: CookieJar,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<(CookieJar, Json<LoginResponse>)>
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    let out = state
        .service()
        .login(
            &state.context(),
            LoginInput {
                email: body.email,
                password: body.password,
            },
        )
        .await?;

    let jar = state.cookies().store(jar, &out.tokens);
    let identity = out.identity;
    Ok((
        jar,
        Json(LoginResponse {
            user_id: identity.id,
            first_name: identity.first_name,
            last_name: identity.last_name,
            email: identity.email,
            role: identity.role,
            token: out.tokens.access_token,
            refresh_token: out.tokens.refresh_token,
            favourite_genres: out.favourite_genres,
            expires_in: out.expires_in,
        }),
    ))
}

/// `POST /user/logout`. Clears the caller's own session.
pub async fn logout<U, S>(
    State(state): State<AppState<U, S>>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<Value>)>
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    state.service().logout(&state.context(), user.user_id).await?;
    Ok((
        state.cookies().clear(jar),
        Json(json!({ "message": "User logged out successfully" })),
    ))
}

/// `POST /user/refresh-token`. The refresh token comes from the cookie or
/// from a `{"refresh_token": ...}` body.
pub async fn refresh<U, S>(
    State(state): State<AppState<U, S>>,
    jar: CookieJar,
    body: Bytes,
) -> ApiResult<(CookieJar, Json<Value>)>
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    let from_body = if body.is_empty() {
        RefreshRequest::default()
    } else {
        serde_json::from_slice::<RefreshRequest>(&body).map_err(|e| ApiError::BadRequest {
            message: format!("invalid request body: {e}"),
        })?
    };

    let presented = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty())
        .or(from_body.refresh_token)
        .ok_or(AuthError::InvalidRefreshToken)?;

    let tokens: TokenPair = state
        .service()
        .refresh(&state.context(), &presented)
        .await?;

    let jar = state.cookies().store(jar, &tokens);
    Ok((
        jar,
        Json(json!({
            "message": "Tokens refreshed",
            "access_token": tokens.access_token,
            "refresh_token": tokens.refresh_token,
        })),
    ))
}

/// `GET /user/me`.
pub async fn me(CurrentUser(user): CurrentUser) -> Json<AuthenticatedUser> {
    Json(user)
}

/// `GET /admin/users/{user_id}/session`.
pub async fn get_session<U, S>(
    State(state): State<AppState<U, S>>,
    AdminUser(_admin): AdminUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<SessionView>>
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    let record = state
        .service()
        .session(&state.context(), user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            message: format!("no session for user {user_id}"),
        })?;

    Ok(Json(SessionView {
        user_id: record.user_id,
        active: record.is_active(),
        updated_at: record.updated_at,
    }))
}

/// `PUT /admin/users/{user_id}/role`.
pub async fn set_role<U, S>(
    State(state): State<AppState<U, S>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
    ApiJson(body): ApiJson<SetRoleRequest>,
) -> ApiResult<Json<Value>>
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    let role: Role = body.role.parse().map_err(|e| ApiError::BadRequest {
        message: format!("{e}"),
    })?;

    let identity = state
        .service()
        .set_role(&state.context(), user_id, role)
        .await
        .map_err(|e| match e {
            AuthError::UnknownIdentity => ApiError::NotFound {
                message: format!("no user {user_id}"),
            },
            other => other.into(),
        })?;

    tracing::info!(admin_id = %admin.user_id, user_id = %user_id, role = %role, "Role changed by admin");
    Ok(Json(json!({
        "user_id": identity.id,
        "role": identity.role,
    })))
}
