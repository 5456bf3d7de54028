//! Postgres implementations of the civicsync_core port traits.
//!
//! Each adapter is a newtype wrapping PgPool. All SQL is runtime-checked
//! (sqlx::query, not sqlx::query!) to avoid compile-time DB requirement.

use std::collections::HashMap;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use civicsync_core::error::CivicError;
use civicsync_core::ports::{IssueStore, Result, UserStore};
use civicsync_core::types::{
    AuthorSummary, Comment, Issue, IssueDraft, IssuePatch, LikeOutcome, NewUser, User,
};

use crate::sqlx_types::{PgCommentRow, PgIssueRow, PgToggledRow, PgUserRow};

const ISSUE_COLUMNS: &str = r#"
    issue_id, title, description, category, pin, lat, lng, status,
    liked_by, media_url, media_filename, media_mimetype, author_id,
    created_at, updated_at
"#;

fn store_err(e: sqlx::Error) -> CivicError {
    CivicError::Store(anyhow!(e))
}

/// Writes that reference a user. A foreign-key miss means the session names an
/// account that no longer exists, which retrying cannot fix.
fn author_write_err(e: sqlx::Error) -> CivicError {
    match e.as_database_error() {
        Some(db) if db.is_foreign_key_violation() => {
            CivicError::Unauthorized("session user no longer exists".into())
        }
        _ => store_err(e),
    }
}

fn row_err(e: String) -> CivicError {
    CivicError::Store(anyhow!(e))
}

// ── PgIssueStore ──────────────────────────────────────────────

/// Postgres-backed issue store. Comments live in a child table with
/// `ON DELETE CASCADE`, so deleting an issue removes its thread.
pub struct PgIssueStore {
    pool: PgPool,
}

impl PgIssueStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_row(&self, id: Uuid) -> Result<PgIssueRow> {
        let query = format!("SELECT {ISSUE_COLUMNS} FROM civicsync.issues WHERE issue_id = $1");
        sqlx::query_as::<_, PgIssueRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .ok_or_else(|| CivicError::issue_not_found(id))
    }

    /// Comments for the given issues, grouped by issue, each group in
    /// insertion order.
    async fn comments_for(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Comment>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, PgCommentRow>(
            r#"
            SELECT issue_id, body, author_id, created_at
            FROM civicsync.issue_comments
            WHERE issue_id = ANY($1)
            ORDER BY issue_id, comment_seq
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let mut grouped: HashMap<Uuid, Vec<Comment>> = HashMap::new();
        for row in rows {
            grouped.entry(row.issue_id).or_default().push(row.into());
        }
        Ok(grouped)
    }

    async fn load(&self, id: Uuid) -> Result<Issue> {
        let row = self.fetch_row(id).await?;
        let comments = self
            .comments_for(&[id])
            .await?
            .remove(&id)
            .unwrap_or_default();
        row.into_issue(comments).map_err(row_err)
    }
}

#[async_trait]
impl IssueStore for PgIssueStore {
    async fn create(&self, draft: IssueDraft) -> Result<Issue> {
        let issue = Issue::from_draft(draft, Utc::now());
        let (media_url, media_filename, media_mimetype) = match &issue.media {
            Some(m) => (
                Some(m.url.as_str()),
                m.filename.as_deref(),
                m.mimetype.as_deref(),
            ),
            None => (None, None, None),
        };

        // Postgres keeps microseconds; hand back what it stored.
        let query = format!(
            r#"
            INSERT INTO civicsync.issues (
                issue_id, title, description, category, pin, lat, lng, status,
                liked_by, media_url, media_filename, media_mimetype, author_id,
                created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8,
                '{{}}', $9, $10, $11, $12,
                $13, $13
            )
            RETURNING {ISSUE_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, PgIssueRow>(&query)
            .bind(issue.id)
            .bind(&issue.title)
            .bind(&issue.description)
            .bind(issue.category.as_str())
            .bind(&issue.pin)
            .bind(issue.lat)
            .bind(issue.lng)
            .bind(issue.status.as_str())
            .bind(media_url)
            .bind(media_filename)
            .bind(media_mimetype)
            .bind(issue.author)
            .bind(issue.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(author_write_err)?;

        row.into_issue(Vec::new()).map_err(row_err)
    }

    async fn get(&self, id: Uuid) -> Result<Issue> {
        self.load(id).await
    }

    async fn list_all(&self) -> Result<Vec<Issue>> {
        let query = format!(
            "SELECT {ISSUE_COLUMNS} FROM civicsync.issues ORDER BY created_at DESC, issue_id"
        );
        let rows = sqlx::query_as::<_, PgIssueRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.issue_id).collect();
        let mut comments = self.comments_for(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let thread = comments.remove(&row.issue_id).unwrap_or_default();
                row.into_issue(thread).map_err(row_err)
            })
            .collect()
    }

    async fn update(&self, id: Uuid, patch: IssuePatch) -> Result<Issue> {
        match patch {
            IssuePatch::SetStatus(status) => {
                let result = sqlx::query(
                    r#"
                    UPDATE civicsync.issues
                    SET status = $2, updated_at = now()
                    WHERE issue_id = $1
                    "#,
                )
                .bind(id)
                .bind(status.as_str())
                .execute(&self.pool)
                .await
                .map_err(store_err)?;
                if result.rows_affected() == 0 {
                    return Err(CivicError::issue_not_found(id));
                }
            }
            IssuePatch::AppendComment(comment) => {
                // Touch the parent first: it takes the row lock and tells us
                // whether the issue still exists.
                let mut tx = self.pool.begin().await.map_err(store_err)?;
                let touched = sqlx::query(
                    "UPDATE civicsync.issues SET updated_at = now() WHERE issue_id = $1",
                )
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(store_err)?;
                if touched.rows_affected() == 0 {
                    return Err(CivicError::issue_not_found(id));
                }
                sqlx::query(
                    r#"
                    INSERT INTO civicsync.issue_comments (issue_id, body, author_id, created_at)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(id)
                .bind(&comment.text)
                .bind(comment.author)
                .bind(comment.created_at)
                .execute(&mut *tx)
                .await
                .map_err(author_write_err)?;
                tx.commit().await.map_err(store_err)?;
            }
        }
        self.load(id).await
    }

    async fn toggle_like(&self, id: Uuid, user_id: Uuid) -> Result<LikeOutcome> {
        // One conditional statement under the row lock: no read-then-write
        // window between membership test and array rewrite, and the returned
        // row is exactly the state this toggle produced.
        let query = format!(
            r#"
            UPDATE civicsync.issues
            SET liked_by = CASE
                    WHEN $2 = ANY(liked_by) THEN array_remove(liked_by, $2)
                    ELSE array_append(liked_by, $2)
                END,
                updated_at = now()
            WHERE issue_id = $1
            RETURNING {ISSUE_COLUMNS}, $2 = ANY(liked_by) AS liked
            "#
        );
        let toggled = sqlx::query_as::<_, PgToggledRow>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .ok_or_else(|| CivicError::issue_not_found(id))?;

        let comments = self
            .comments_for(&[id])
            .await?
            .remove(&id)
            .unwrap_or_default();
        let issue = toggled.issue.into_issue(comments).map_err(row_err)?;
        Ok(LikeOutcome {
            issue,
            liked: toggled.liked,
        })
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM civicsync.issues WHERE issue_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        if result.rows_affected() == 0 {
            return Err(CivicError::issue_not_found(id));
        }
        Ok(())
    }
}

// ── PgUserStore ───────────────────────────────────────────────

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let email = user.email.trim().to_lowercase();
        let row = sqlx::query_as::<_, PgUserRow>(
            r#"
            INSERT INTO civicsync.users (user_id, name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO NOTHING
            RETURNING user_id, name, email, password_hash, role, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or_else(|| CivicError::Conflict(format!("{email} is already registered")))?;

        row.try_into().map_err(row_err)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, PgUserRow>(
            r#"
            SELECT user_id, name, email, password_hash, role, created_at
            FROM civicsync.users
            WHERE email = $1
            "#,
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.map(|r| r.try_into().map_err(row_err)).transpose()
    }

    async fn get(&self, id: Uuid) -> Result<User> {
        let row = sqlx::query_as::<_, PgUserRow>(
            r#"
            SELECT user_id, name, email, password_hash, role, created_at
            FROM civicsync.users
            WHERE user_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or_else(|| CivicError::NotFound(format!("user {id} not found")))?;
        row.try_into().map_err(row_err)
    }

    async fn summaries(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, AuthorSummary>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT user_id, name, email FROM civicsync.users WHERE user_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(rows
            .into_iter()
            .map(|(id, name, email)| {
                (
                    id,
                    AuthorSummary {
                        name,
                        email: Some(email),
                    },
                )
            })
            .collect())
    }
}
