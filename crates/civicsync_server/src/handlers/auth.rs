//! Account and session handlers.
//!
//! POST /auth/register - create an account
//! POST /auth/login    - check credentials, set the session cookie
//! POST /auth/logout   - clear the session cookie
//! GET  /auth/me       - the account behind the current cookie

use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    http::{header::SET_COOKIE, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use civicsync_core::{
    accounts::AccountService,
    actor::Actor,
    proto::{
        CurrentUserResponse, LoginRequest, MessageResponse, RegisterRequest, RegisterResponse,
        SessionResponse,
    },
};

use crate::error::AppError;
use crate::session::SessionKeys;

pub async fn register(
    Extension(accounts): Extension<Arc<AccountService>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let Json(req) = payload?;
    let user = accounts.register(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".into(),
            user: user.into(),
        }),
    ))
}

pub async fn login(
    Extension(accounts): Extension<Arc<AccountService>>,
    Extension(keys): Extension<Arc<SessionKeys>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let identity = accounts.authenticate(req).await?;
    let token = keys.issue(&identity)?;
    tracing::info!(user_id = %identity.id, "signed in");
    Ok((
        [(SET_COOKIE, keys.session_cookie(token).to_string())],
        Json(SessionResponse { user: identity }),
    ))
}

pub async fn logout(Extension(keys): Extension<Arc<SessionKeys>>) -> impl IntoResponse {
    (
        [(SET_COOKIE, keys.cleared_cookie().to_string())],
        Json(MessageResponse::new("Logged out")),
    )
}

pub async fn me(
    Extension(actor): Extension<Actor>,
    Extension(accounts): Extension<Arc<AccountService>>,
) -> Result<Json<CurrentUserResponse>, AppError> {
    let user = accounts.current_user(&actor).await?;
    Ok(Json(CurrentUserResponse { user: user.into() }))
}
