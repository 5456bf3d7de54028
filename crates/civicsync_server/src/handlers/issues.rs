//! Issue handlers.
//!
//! POST /issues             - submit an issue (signed in)
//! GET  /issues             - public feed, optional pin/category/status filters
//! POST /issues/:id/upvote  - toggle the caller's like

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query,
    },
    http::StatusCode,
    Extension, Json,
};
use civicsync_core::{
    actor::Actor,
    projection::IssueView,
    proto::{IssueQuery, SubmitIssueRequest, UpvoteResponse},
    service::IssueService,
};

use crate::error::AppError;

pub async fn submit_issue(
    Extension(actor): Extension<Actor>,
    Extension(service): Extension<Arc<dyn IssueService>>,
    payload: Result<Json<SubmitIssueRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<IssueView>), AppError> {
    // Anonymous callers get 401 even when the body is unreadable.
    actor.require_authenticated()?;
    let Json(req) = payload?;
    let view = service.submit_issue(&actor, req).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn public_feed(
    Extension(service): Extension<Arc<dyn IssueService>>,
    query: Result<Query<IssueQuery>, QueryRejection>,
) -> Result<Json<Vec<IssueView>>, AppError> {
    let Query(query) = query?;
    let issues = service.public_feed(query.into_filter()?).await?;
    Ok(Json(issues))
}

pub async fn toggle_upvote(
    Extension(actor): Extension<Actor>,
    Extension(service): Extension<Arc<dyn IssueService>>,
    Path(id): Path<String>,
) -> Result<Json<UpvoteResponse>, AppError> {
    let resp = service.toggle_upvote(&actor, &id).await?;
    Ok(Json(resp))
}
