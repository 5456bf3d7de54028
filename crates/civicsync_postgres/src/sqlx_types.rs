//! Row types read straight off the wire, converted into core types.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use civicsync_core::actor::Role;
use civicsync_core::types::{Category, Comment, Issue, IssueStatus, MediaRef, User};

#[derive(Debug, sqlx::FromRow)]
pub struct PgIssueRow {
    pub issue_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub pin: String,
    pub lat: f64,
    pub lng: f64,
    pub status: String,
    pub liked_by: Vec<Uuid>,
    pub media_url: Option<String>,
    pub media_filename: Option<String>,
    pub media_mimetype: Option<String>,
    pub author_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An issue row plus whether the toggling user is now in `liked_by`, both
/// read from the same `RETURNING` clause.
#[derive(Debug, sqlx::FromRow)]
pub struct PgToggledRow {
    #[sqlx(flatten)]
    pub issue: PgIssueRow,
    pub liked: bool,
}

impl PgIssueRow {
    /// Attach the issue's comments (already in insertion order).
    pub fn into_issue(self, comments: Vec<Comment>) -> Result<Issue, String> {
        let category: Category = self
            .category
            .parse()
            .map_err(|_| format!("issue {}: bad category {:?}", self.issue_id, self.category))?;
        let status: IssueStatus = self
            .status
            .parse()
            .map_err(|_| format!("issue {}: bad status {:?}", self.issue_id, self.status))?;
        let media = self.media_url.map(|url| MediaRef {
            url,
            filename: self.media_filename,
            mimetype: self.media_mimetype,
        });
        Ok(Issue {
            id: self.issue_id,
            title: self.title,
            description: self.description,
            category,
            pin: self.pin,
            lat: self.lat,
            lng: self.lng,
            status,
            upvotes: self.liked_by.len() as u32,
            liked_by: self.liked_by,
            comments,
            media,
            author: self.author_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PgCommentRow {
    pub issue_id: Uuid,
    pub body: String,
    pub author_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<PgCommentRow> for Comment {
    fn from(row: PgCommentRow) -> Self {
        Self {
            text: row.body,
            author: row.author_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PgUserRow {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PgUserRow> for User {
    type Error = String;

    fn try_from(row: PgUserRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|_| format!("user {}: bad role {:?}", row.user_id, row.role))?;
        Ok(User {
            id: row.user_id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
        })
    }
}
