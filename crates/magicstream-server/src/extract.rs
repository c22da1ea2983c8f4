//! Request extractors.
//!
//! The bearer token comes from the `Authorization` header (with or
//! without the `Bearer ` prefix), falling back to the `access_token`
//! cookie. JSON bodies go through [`ApiJson`] so that a bad body gets the
//! same error shape as every other failure.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use magicstream_auth::gate::bearer_token;
use magicstream_auth::{AuthError, AuthenticatedUser};
use magicstream_core::repository::{SessionStore, UserRepository};

use crate::cookies::ACCESS_COOKIE;
use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedUser);

/// Admin-only routes take this instead of [`CurrentUser`].
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

/// `Json<T>` whose rejection is an [`ApiError::BadRequest`].
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<T, St> FromRequest<St> for ApiJson<T>
where
    Json<T>: FromRequest<St, Rejection = JsonRejection>,
    St: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &St) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

fn presented_token(parts: &Parts) -> Result<String, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    match bearer_token(header) {
        Ok(token) => Ok(token.to_owned()),
        Err(AuthError::MissingCredential) => CookieJar::from_headers(&parts.headers)
            .get(ACCESS_COOKIE)
            .map(|c| c.value().trim().to_owned())
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::MissingCredential),
        Err(e) => Err(e),
    }
}

impl<U, S> FromRequestParts<AppState<U, S>> for CurrentUser
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<U, S>,
    ) -> Result<Self, Self::Rejection> {
        let ctx = state.context();
        let token = presented_token(parts)?;
        let user = state.gate().authenticate(&ctx, Some(&token))?;
        state.service().verify_current(&ctx, &user, &token).await?;
        Ok(CurrentUser(user))
    }
}

impl<U, S> FromRequestParts<AppState<U, S>> for AdminUser
where
    U: UserRepository + 'static,
    S: SessionStore + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<U, S>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        user.require_admin()?;
        Ok(AdminUser(user))
    }
}
