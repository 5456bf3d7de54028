//! Port traits implemented by storage adapters.
//!
//! `civicsync_postgres` provides the production implementations;
//! `crate::memory` provides in-process ones for tests and database-less runs.

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::CivicError,
    types::{AuthorSummary, Issue, IssueDraft, IssuePatch, LikeOutcome, NewUser, User},
};

pub type Result<T> = std::result::Result<T, CivicError>;

#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Assign id and timestamps, persist, return the stored issue.
    async fn create(&self, draft: IssueDraft) -> Result<Issue>;

    /// `CivicError::NotFound` if the issue does not exist.
    async fn get(&self, id: Uuid) -> Result<Issue>;

    /// Every issue, newest first by creation time.
    async fn list_all(&self) -> Result<Vec<Issue>>;

    /// Atomic single-field update (set status, append comment).
    async fn update(&self, id: Uuid, patch: IssuePatch) -> Result<Issue>;

    /// Remove `user_id` from the like set if present, otherwise add it, in a
    /// single atomic step. `upvotes` is refreshed in the same step.
    async fn toggle_like(&self, id: Uuid, user_id: Uuid) -> Result<LikeOutcome>;

    /// Delete the issue and its comments. `NotFound` if already gone.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// `CivicError::Conflict` if the email is already registered.
    async fn create(&self, user: NewUser) -> Result<User>;

    /// Lookup is case-insensitive on the email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn get(&self, id: Uuid) -> Result<User>;

    /// Name/email summaries for the given ids. Unknown ids are omitted.
    async fn summaries(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, AuthorSummary>>;
}
