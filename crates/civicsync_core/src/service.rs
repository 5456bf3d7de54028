//! IssueService: the central domain service for CivicSync.
//!
//! Takes port traits via `Arc<dyn PortTrait>` so that the same logic works
//! against Postgres or the in-memory stores. Every operation is
//! authorize, validate, then a single store call; nothing is written when
//! either of the first two steps fails.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    actor::Actor,
    error::CivicError,
    ports::{IssueStore, UserStore},
    projection::{project_comments, CommentView, IssueFilter, IssueProjection, IssueView},
    proto::{AddCommentRequest, ChangeStatusRequest, SubmitIssueRequest, UpvoteResponse},
    types::{AuthorSummary, Comment, Issue, IssuePatch, StatusPolicy},
};

pub type Result<T> = std::result::Result<T, CivicError>;

/// Who may append comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentPolicy {
    #[default]
    RequireActor,
    AllowAnonymous,
}

// ── IssueService trait ────────────────────────────────────────

/// All methods take `&Actor` explicitly: no implicit identity.
#[async_trait]
pub trait IssueService: Send + Sync {
    /// Create an issue attributed to the (authenticated) actor.
    async fn submit_issue(&self, actor: &Actor, req: SubmitIssueRequest) -> Result<IssueView>;

    /// Per-actor like toggle.
    async fn toggle_upvote(&self, actor: &Actor, issue_id: &str) -> Result<UpvoteResponse>;

    /// Whether `actor` may comment at all under the configured policy.
    fn authorize_comment(&self, actor: &Actor) -> Result<()>;

    /// Append a comment; returns the whole issue with the thread's authors resolved.
    async fn add_comment(
        &self,
        actor: &Actor,
        issue_id: &str,
        req: AddCommentRequest,
    ) -> Result<IssueView>;

    /// Comments in insertion order, without author identities.
    async fn list_comments(&self, issue_id: &str) -> Result<Vec<CommentView>>;

    /// Admin only. Unconditional overwrite under `StatusPolicy::FreeOverwrite`.
    async fn change_status(
        &self,
        actor: &Actor,
        issue_id: &str,
        req: ChangeStatusRequest,
    ) -> Result<IssueView>;

    /// Admin only. `NotFound` on a second delete means "already gone".
    async fn delete_issue(&self, actor: &Actor, issue_id: &str) -> Result<()>;

    /// Public feed, newest first, no author identities.
    async fn public_feed(&self, filter: IssueFilter) -> Result<Vec<IssueView>>;

    /// Admin feed, newest first, authors and commenters resolved.
    async fn admin_feed(&self, actor: &Actor, filter: IssueFilter) -> Result<Vec<IssueView>>;
}

// ── IssueServiceImpl ──────────────────────────────────────────

pub struct IssueServiceImpl {
    pub issues: Arc<dyn IssueStore>,
    pub users: Arc<dyn UserStore>,
    pub comment_policy: CommentPolicy,
    pub status_policy: StatusPolicy,
}

impl IssueServiceImpl {
    pub fn new(issues: Arc<dyn IssueStore>, users: Arc<dyn UserStore>) -> Self {
        Self {
            issues,
            users,
            comment_policy: CommentPolicy::default(),
            status_policy: StatusPolicy::default(),
        }
    }

    /// Set the comment policy (builder pattern).
    pub fn with_comment_policy(mut self, policy: CommentPolicy) -> Self {
        self.comment_policy = policy;
        self
    }

    /// Resolve every referenced user in one lookup, then project.
    async fn render(
        &self,
        issues: Vec<Issue>,
        projection: IssueProjection,
    ) -> Result<Vec<IssueView>> {
        let authors = if projection.needs_authors() {
            let mut ids: Vec<Uuid> = issues.iter().flat_map(Issue::referenced_users).collect();
            ids.sort_unstable();
            ids.dedup();
            self.users.summaries(&ids).await?
        } else {
            HashMap::<Uuid, AuthorSummary>::new()
        };
        Ok(issues
            .into_iter()
            .map(|issue| IssueView::project(issue, projection, &authors))
            .collect())
    }

    async fn render_one(&self, issue: Issue, projection: IssueProjection) -> Result<IssueView> {
        let mut views = self.render(vec![issue], projection).await?;
        views
            .pop()
            .ok_or_else(|| CivicError::Store(anyhow::anyhow!("projection dropped an issue")))
    }
}

#[async_trait]
impl IssueService for IssueServiceImpl {
    async fn submit_issue(&self, actor: &Actor, req: SubmitIssueRequest) -> Result<IssueView> {
        let identity = actor.require_authenticated()?;
        let draft = req.into_draft(identity.id)?;
        let issue = self.issues.create(draft).await?;
        tracing::info!(
            issue_id = %issue.id,
            author = %identity.id,
            category = %issue.category,
            "issue submitted"
        );
        self.render_one(issue, IssueProjection::Public).await
    }

    async fn toggle_upvote(&self, actor: &Actor, issue_id: &str) -> Result<UpvoteResponse> {
        let identity = actor.require_authenticated()?;
        let id = parse_issue_id(issue_id)?;
        let outcome = self.issues.toggle_like(id, identity.id).await?;
        tracing::debug!(
            issue_id = %id,
            user = %identity.id,
            liked = outcome.liked,
            upvotes = outcome.issue.upvotes,
            "upvote toggled"
        );
        Ok(UpvoteResponse {
            upvotes: outcome.issue.upvotes,
            liked: outcome.liked,
            liked_by: outcome.issue.liked_by,
        })
    }

    fn authorize_comment(&self, actor: &Actor) -> Result<()> {
        match self.comment_policy {
            CommentPolicy::RequireActor => actor.require_authenticated().map(|_| ()),
            CommentPolicy::AllowAnonymous => Ok(()),
        }
    }

    async fn add_comment(
        &self,
        actor: &Actor,
        issue_id: &str,
        req: AddCommentRequest,
    ) -> Result<IssueView> {
        self.authorize_comment(actor)?;
        let text = req.text()?;
        let id = parse_issue_id(issue_id)?;
        let comment = Comment {
            text,
            author: actor.id(),
            created_at: Utc::now(),
        };
        let issue = self
            .issues
            .update(id, IssuePatch::AppendComment(comment))
            .await?;
        tracing::debug!(issue_id = %id, comments = issue.comments.len(), "comment added");
        self.render_one(issue, IssueProjection::Thread).await
    }

    async fn list_comments(&self, issue_id: &str) -> Result<Vec<CommentView>> {
        let id = parse_issue_id(issue_id)?;
        let issue = self.issues.get(id).await?;
        Ok(project_comments(
            issue.comments,
            IssueProjection::Public,
            &HashMap::new(),
        ))
    }

    async fn change_status(
        &self,
        actor: &Actor,
        issue_id: &str,
        req: ChangeStatusRequest,
    ) -> Result<IssueView> {
        let admin = actor.require_admin()?;
        let target = req.target()?;
        let id = parse_issue_id(issue_id)?;

        let current = self.issues.get(id).await?;
        if !self.status_policy.admits(current.status, target) {
            return Err(CivicError::Validation(format!(
                "status change {} -> {} not allowed",
                current.status, target
            )));
        }

        let issue = self.issues.update(id, IssuePatch::SetStatus(target)).await?;
        tracing::info!(
            issue_id = %id,
            admin = %admin.id,
            from = %current.status,
            to = %target,
            "issue status changed"
        );
        self.render_one(issue, IssueProjection::AdminDetailed).await
    }

    async fn delete_issue(&self, actor: &Actor, issue_id: &str) -> Result<()> {
        let admin = actor.require_admin()?;
        let id = parse_issue_id(issue_id)?;
        self.issues.delete(id).await?;
        tracing::info!(issue_id = %id, admin = %admin.id, "issue deleted");
        Ok(())
    }

    async fn public_feed(&self, filter: IssueFilter) -> Result<Vec<IssueView>> {
        let issues = filter.apply(self.issues.list_all().await?);
        self.render(issues, IssueProjection::Public).await
    }

    async fn admin_feed(&self, actor: &Actor, filter: IssueFilter) -> Result<Vec<IssueView>> {
        actor.require_admin()?;
        let issues = filter.apply(self.issues.list_all().await?);
        self.render(issues, IssueProjection::AdminDetailed).await
    }
}

// ── Helpers ───────────────────────────────────────────────────

/// An id that cannot name an issue is reported the same way as a missing one.
fn parse_issue_id(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s.trim()).map_err(|_| CivicError::issue_not_found(s))
}

// ── Tests ─────────────────────────────────────────────────────
