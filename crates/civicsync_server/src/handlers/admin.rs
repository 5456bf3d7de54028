//! Admin handlers. The service enforces the admin role on every call.
//!
//! GET    /admin/issues      - feed with authors and commenters resolved
//! PATCH  /admin/issues/:id  - overwrite the status
//! DELETE /admin/issues/:id  - remove an issue and its thread

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query,
    },
    Extension, Json,
};
use civicsync_core::{
    actor::Actor,
    projection::IssueView,
    proto::{ChangeStatusRequest, IssueQuery, MessageResponse},
    service::IssueService,
};

use crate::error::AppError;

pub async fn admin_feed(
    Extension(actor): Extension<Actor>,
    Extension(service): Extension<Arc<dyn IssueService>>,
    query: Result<Query<IssueQuery>, QueryRejection>,
) -> Result<Json<Vec<IssueView>>, AppError> {
    actor.require_admin()?;
    let Query(query) = query?;
    let issues = service.admin_feed(&actor, query.into_filter()?).await?;
    Ok(Json(issues))
}

pub async fn change_status(
    Extension(actor): Extension<Actor>,
    Extension(service): Extension<Arc<dyn IssueService>>,
    Path(id): Path<String>,
    payload: Result<Json<ChangeStatusRequest>, JsonRejection>,
) -> Result<Json<IssueView>, AppError> {
    actor.require_admin()?;
    let Json(req) = payload?;
    let view = service.change_status(&actor, &id, req).await?;
    Ok(Json(view))
}

pub async fn delete_issue(
    Extension(actor): Extension<Actor>,
    Extension(service): Extension<Arc<dyn IssueService>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    service.delete_issue(&actor, &id).await?;
    Ok(Json(MessageResponse::new("Issue deleted")))
}
