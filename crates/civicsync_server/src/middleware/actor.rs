//! Resolve the session cookie into an explicit `Actor`.
//!
//! Runs on every request. A missing, malformed or expired token is not an
//! error here: the request simply proceeds as `Actor::Anonymous` and each
//! operation decides what that means.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::header::COOKIE,
    middleware::Next,
    response::Response,
    Extension,
};
use civicsync_core::actor::Actor;

use crate::session::SessionKeys;

pub async fn resolve_actor(
    Extension(keys): Extension<Arc<SessionKeys>>,
    mut req: Request,
    next: Next,
) -> Response {
    let identity = req
        .headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|header| keys.token_from_header(header))
        .and_then(|token| keys.verify(&token));

    if let Some(who) = &identity {
        tracing::trace!(user_id = %who.id, role = %who.role, "session resolved");
    }
    req.extensions_mut().insert(Actor::from(identity));
    next.run(req).await
}
