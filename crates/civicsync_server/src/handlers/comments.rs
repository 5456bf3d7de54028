//! Comment thread handlers.
//!
//! POST /issues/:id/comments - append a comment, returns the updated issue
//! GET  /issues/:id/comments - the thread in insertion order

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path},
    Extension, Json,
};
use civicsync_core::{
    actor::Actor,
    projection::{CommentView, IssueView},
    proto::AddCommentRequest,
    service::IssueService,
};

use crate::error::AppError;

pub async fn add_comment(
    Extension(actor): Extension<Actor>,
    Extension(service): Extension<Arc<dyn IssueService>>,
    Path(id): Path<String>,
    payload: Result<Json<AddCommentRequest>, JsonRejection>,
) -> Result<Json<IssueView>, AppError> {
    // Policy first, so anonymous callers get 401 even when the body is unreadable.
    service.authorize_comment(&actor)?;
    let Json(req) = payload?;
    let view = service.add_comment(&actor, &id, req).await?;
    Ok(Json(view))
}

pub async fn list_comments(
    Extension(service): Extension<Arc<dyn IssueService>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CommentView>>, AppError> {
    Ok(Json(service.list_comments(&id).await?))
}
