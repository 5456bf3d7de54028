//! Core domain types for CivicSync.
//! Pure value types with no database dependencies.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::Role;
use crate::error::CivicError;

// ── Enums ─────────────────────────────────────────────────────

/// Issue category. The set is fixed; anything else is rejected at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Garbage,
    Road,
    Electricity,
    Water,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Self::Garbage,
        Self::Road,
        Self::Electricity,
        Self::Water,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Garbage => "garbage",
            Self::Road => "road",
            Self::Electricity => "electricity",
            Self::Water => "water",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CivicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| CivicError::Validation(format!("unknown category: {}", s.trim())))
    }
}

/// Triage status of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in-progress",
            Self::Resolved => "resolved",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = CivicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "in-progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            other => Err(CivicError::Validation(format!("unknown status: {other}"))),
        }
    }
}

/// How status changes are admitted.
///
/// There is exactly one policy today: any status may replace any other. It is
/// named so that a transition table can replace it without touching callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPolicy {
    #[default]
    FreeOverwrite,
}

impl StatusPolicy {
    pub fn admits(&self, _from: IssueStatus, _to: IssueStatus) -> bool {
        match self {
            Self::FreeOverwrite => true,
        }
    }
}

// ── Issue aggregate ───────────────────────────────────────────

/// Reference to a file already uploaded to an external media host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
}

/// Embedded comment. Append-only: never edited or reordered once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub text: String,
    pub author: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub pin: String,
    pub lat: f64,
    pub lng: f64,
    pub status: IssueStatus,
    /// Always `liked_by.len()`; stores derive it, nobody sets it.
    pub upvotes: u32,
    pub liked_by: Vec<Uuid>,
    pub comments: Vec<Comment>,
    pub media: Option<MediaRef>,
    pub author: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    /// Materialise a freshly submitted draft. Used by stores at insert time.
    pub fn from_draft(draft: IssueDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: draft.title,
            description: draft.description,
            category: draft.category,
            pin: draft.pin,
            lat: draft.lat,
            lng: draft.lng,
            status: IssueStatus::Open,
            upvotes: 0,
            liked_by: Vec::new(),
            comments: Vec::new(),
            media: draft.media,
            author: Some(draft.author),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_liked_by(&self, user_id: Uuid) -> bool {
        self.liked_by.contains(&user_id)
    }

    /// Every user id referenced by the issue or its comments, deduplicated.
    pub fn referenced_users(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self
            .author
            .into_iter()
            .chain(self.comments.iter().filter_map(|c| c.author))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// A validated submission, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueDraft {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub pin: String,
    pub lat: f64,
    pub lng: f64,
    pub media: Option<MediaRef>,
    pub author: Uuid,
}

/// Field-level atomic updates supported by the issue store.
#[derive(Debug, Clone, PartialEq)]
pub enum IssuePatch {
    SetStatus(IssueStatus),
    AppendComment(Comment),
}

/// Result of an atomic like toggle.
#[derive(Debug, Clone, PartialEq)]
pub struct LikeOutcome {
    pub issue: Issue,
    /// Whether the user likes the issue after the toggle.
    pub liked: bool,
}

// ── Users ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Public-facing user summary used for author enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parse_accepts_every_variant() {
        for c in Category::ALL {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
        assert_eq!("ROAD".parse::<Category>().unwrap(), Category::Road);
    }

    #[test]
    fn category_parse_rejects_unknown() {
        let err = "potholes".parse::<Category>().unwrap_err();
        assert!(matches!(err, CivicError::Validation(_)));
    }

    #[test]
    fn status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&IssueStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
        let s: IssueStatus = serde_json::from_str("\"resolved\"").unwrap();
        assert_eq!(s, IssueStatus::Resolved);
    }

    #[test]
    fn status_parse_rejects_unknown() {
        assert!("closed".parse::<IssueStatus>().is_err());
        assert_eq!(
            "in-progress".parse::<IssueStatus>().unwrap(),
            IssueStatus::InProgress
        );
    }

    #[test]
    fn free_overwrite_admits_every_transition() {
        let all = [
            IssueStatus::Open,
            IssueStatus::InProgress,
            IssueStatus::Resolved,
        ];
        for from in all {
            for to in all {
                assert!(StatusPolicy::FreeOverwrite.admits(from, to));
            }
        }
    }

    #[test]
    fn from_draft_starts_open_and_empty() {
        let author = Uuid::new_v4();
        let issue = Issue::from_draft(
            IssueDraft {
                title: "Pothole".into(),
                description: "Deep pothole".into(),
                category: Category::Road,
                pin: "411001".into(),
                lat: 18.52,
                lng: 73.85,
                media: None,
                author,
            },
            Utc::now(),
        );
        assert_eq!(issue.status, IssueStatus::Open);
        assert_eq!(issue.upvotes, 0);
        assert!(issue.liked_by.is_empty());
        assert!(issue.comments.is_empty());
        assert_eq!(issue.author, Some(author));
        assert_eq!(issue.created_at, issue.updated_at);
    }

    #[test]
    fn referenced_users_dedups_author_and_commenters() {
        let author = Uuid::new_v4();
        let other = Uuid::new_v4();
        let now = Utc::now();
        let mut issue = Issue::from_draft(
            IssueDraft {
                title: "t".into(),
                description: "d".into(),
                category: Category::Water,
                pin: "1".into(),
                lat: 0.0,
                lng: 0.0,
                media: None,
                author,
            },
            now,
        );
        for who in [Some(author), Some(other), None, Some(other)] {
            issue.comments.push(Comment {
                text: "c".into(),
                author: who,
                created_at: now,
            });
        }
        let ids = issue.referenced_users();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&author));
        assert!(ids.contains(&other));
    }
}
