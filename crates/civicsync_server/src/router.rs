//! Router construction for the CivicSync server.

use std::path::Path;
use std::sync::Arc;

use axum::{
    middleware as axum_mw,
    routing::{get, patch, post},
    Extension, Router,
};
use civicsync_core::{accounts::AccountService, service::IssueService};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::handlers;
use crate::middleware::{
    actor::resolve_actor,
    gate::{page_gate, AccessPolicy},
};
use crate::session::SessionKeys;

/// Everything the handlers reach through `Extension`.
#[derive(Clone)]
pub struct AppServices {
    pub issues: Arc<dyn IssueService>,
    pub accounts: Arc<AccountService>,
}

/// Build the full axum router with all routes and middleware.
pub fn build_router(
    services: AppServices,
    keys: SessionKeys,
    policy: AccessPolicy,
    static_dir: impl AsRef<Path>,
) -> Router {
    // JSON API: authorization happens in the service, errors are `{error}`.
    let api = Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/issues",
            get(handlers::issues::public_feed).post(handlers::issues::submit_issue),
        )
        .route("/issues/:id/upvote", post(handlers::issues::toggle_upvote))
        .route(
            "/issues/:id/comments",
            get(handlers::comments::list_comments).post(handlers::comments::add_comment),
        )
        .route("/admin/issues", get(handlers::admin::admin_feed))
        .route(
            "/admin/issues/:id",
            patch(handlers::admin::change_status).delete(handlers::admin::delete_issue),
        )
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me));

    // Everything else is a page, served from disk behind the role gate.
    let pages = Router::new()
        .fallback_service(ServeDir::new(static_dir.as_ref()))
        .layer(axum_mw::from_fn(page_gate));

    api.merge(pages)
        .layer(axum_mw::from_fn(resolve_actor))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(services.issues))
        .layer(Extension(services.accounts))
        .layer(Extension(Arc::new(keys)))
        .layer(Extension(Arc::new(policy)))
}
