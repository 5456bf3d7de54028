//! Read-side shapes of an issue, one per audience.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{AuthorSummary, Category, Comment, Issue, IssueStatus, MediaRef};

/// Which audience an issue is being rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueProjection {
    /// Public feed: no author identity on the issue or its comments.
    Public,
    /// Comment thread after a post: commenter names only, no emails, issue
    /// author hidden.
    Thread,
    /// Admin dashboard: issue author and commenters resolved to name + email.
    AdminDetailed,
}

impl IssueProjection {
    /// Whether rendering needs user lookups at all.
    pub fn needs_authors(&self) -> bool {
        !matches!(self, Self::Public)
    }

    fn issue_author(&self, id: Option<Uuid>, authors: &HashMap<Uuid, AuthorSummary>) -> Option<AuthorSummary> {
        match self {
            Self::AdminDetailed => id.and_then(|id| authors.get(&id).cloned()),
            Self::Public | Self::Thread => None,
        }
    }

    fn comment_author(&self, id: Option<Uuid>, authors: &HashMap<Uuid, AuthorSummary>) -> Option<AuthorSummary> {
        let summary = id.and_then(|id| authors.get(&id))?;
        match self {
            Self::Public => None,
            Self::Thread => Some(AuthorSummary {
                name: summary.name.clone(),
                email: None,
            }),
            Self::AdminDetailed => Some(summary.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorSummary>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub pin: String,
    pub lat: f64,
    pub lng: f64,
    pub status: IssueStatus,
    pub upvotes: u32,
    pub liked_by: Vec<Uuid>,
    pub comments: Vec<CommentView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IssueView {
    pub fn project(
        issue: Issue,
        projection: IssueProjection,
        authors: &HashMap<Uuid, AuthorSummary>,
    ) -> Self {
        let author = projection.issue_author(issue.author, authors);
        Self {
            id: issue.id,
            title: issue.title,
            description: issue.description,
            category: issue.category,
            pin: issue.pin,
            lat: issue.lat,
            lng: issue.lng,
            status: issue.status,
            upvotes: issue.upvotes,
            liked_by: issue.liked_by,
            comments: project_comments(issue.comments, projection, authors),
            media: issue.media,
            author,
            created_at: issue.created_at,
            updated_at: issue.updated_at,
        }
    }
}

pub fn project_comments(
    comments: Vec<Comment>,
    projection: IssueProjection,
    authors: &HashMap<Uuid, AuthorSummary>,
) -> Vec<CommentView> {
    comments
        .into_iter()
        .map(|c| CommentView {
            author: projection.comment_author(c.author, authors),
            text: c.text,
            created_at: c.created_at,
        })
        .collect()
}

/// Feed filter. Pure: applying it never touches a store, so it is equally
/// usable on the server or over an already-fetched list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    /// Substring match on the PIN.
    pub pin: Option<String>,
    pub category: Option<Category>,
    pub status: Option<IssueStatus>,
}

impl IssueFilter {
    pub fn is_empty(&self) -> bool {
        self.pin.is_none() && self.category.is_none() && self.status.is_none()
    }

    pub fn matches(&self, issue: &Issue) -> bool {
        self.pin.as_deref().map_or(true, |p| issue.pin.contains(p))
            && self.category.map_or(true, |c| issue.category == c)
            && self.status.map_or(true, |s| issue.status == s)
    }

    pub fn apply(&self, issues: Vec<Issue>) -> Vec<Issue> {
        if self.is_empty() {
            return issues;
        }
        issues.into_iter().filter(|i| self.matches(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IssueDraft;

    fn issue(pin: &str, category: Category, author: Uuid) -> Issue {
        Issue::from_draft(
            IssueDraft {
                title: "t".into(),
                description: "d".into(),
                category,
                pin: pin.into(),
                lat: 1.0,
                lng: 2.0,
                media: None,
                author,
            },
            Utc::now(),
        )
    }

    fn with_comment(mut issue: Issue, author: Option<Uuid>) -> Issue {
        issue.comments.push(Comment {
            text: "same here".into(),
            author,
            created_at: Utc::now(),
        });
        issue
    }

    fn directory(entries: &[(Uuid, &str, &str)]) -> HashMap<Uuid, AuthorSummary> {
        entries
            .iter()
            .map(|(id, name, email)| {
                (
                    *id,
                    AuthorSummary {
                        name: name.to_string(),
                        email: Some(email.to_string()),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn public_projection_hides_all_identities() {
        let author = Uuid::new_v4();
        let commenter = Uuid::new_v4();
        let authors = directory(&[(author, "Asha", "asha@example.org"), (commenter, "Ravi", "ravi@example.org")]);
        let view = IssueView::project(
            with_comment(issue("411001", Category::Road, author), Some(commenter)),
            IssueProjection::Public,
            &authors,
        );
        assert!(view.author.is_none());
        assert!(view.comments[0].author.is_none());
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("author").is_none());
    }

    #[test]
    fn admin_projection_resolves_name_and_email() {
        let author = Uuid::new_v4();
        let commenter = Uuid::new_v4();
        let authors = directory(&[(author, "Asha", "asha@example.org"), (commenter, "Ravi", "ravi@example.org")]);
        let view = IssueView::project(
            with_comment(issue("411001", Category::Road, author), Some(commenter)),
            IssueProjection::AdminDetailed,
            &authors,
        );
        assert_eq!(view.author.unwrap().email.as_deref(), Some("asha@example.org"));
        let c = view.comments[0].author.clone().unwrap();
        assert_eq!(c.name, "Ravi");
        assert_eq!(c.email.as_deref(), Some("ravi@example.org"));
    }

    #[test]
    fn thread_projection_shows_commenter_names_only() {
        let author = Uuid::new_v4();
        let commenter = Uuid::new_v4();
        let authors = directory(&[(author, "Asha", "asha@example.org"), (commenter, "Ravi", "ravi@example.org")]);
        let view = IssueView::project(
            with_comment(issue("411001", Category::Road, author), Some(commenter)),
            IssueProjection::Thread,
            &authors,
        );
        assert!(view.author.is_none());
        let c = view.comments[0].author.clone().unwrap();
        assert_eq!(c.name, "Ravi");
        assert!(c.email.is_none());
    }

    #[test]
    fn anonymous_comment_has_no_author_in_any_projection() {
        let author = Uuid::new_v4();
        let authors = directory(&[(author, "Asha", "asha@example.org")]);
        let view = IssueView::project(
            with_comment(issue("1", Category::Other, author), None),
            IssueProjection::AdminDetailed,
            &authors,
        );
        assert!(view.comments[0].author.is_none());
    }

    #[test]
    fn view_serializes_camel_case() {
        let view = IssueView::project(
            issue("1", Category::Water, Uuid::new_v4()),
            IssueProjection::Public,
            &HashMap::new(),
        );
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("likedBy").is_some());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["status"], "open");
        assert_eq!(json["category"], "water");
    }

    #[test]
    fn filter_pin_is_substring_match() {
        let f = IssueFilter {
            pin: Some("110".into()),
            ..Default::default()
        };
        assert!(f.matches(&issue("411001", Category::Road, Uuid::new_v4())));
        assert!(!f.matches(&issue("560001", Category::Road, Uuid::new_v4())));
    }

    #[test]
    fn filter_combines_category_and_status() {
        let mut resolved = issue("1", Category::Garbage, Uuid::new_v4());
        resolved.status = IssueStatus::Resolved;
        let open = issue("1", Category::Garbage, Uuid::new_v4());
        let f = IssueFilter {
            pin: None,
            category: Some(Category::Garbage),
            status: Some(IssueStatus::Resolved),
        };
        let kept = f.apply(vec![resolved.clone(), open]);
        assert_eq!(kept, vec![resolved]);
    }

    #[test]
    fn empty_filter_keeps_order() {
        let a = issue("1", Category::Road, Uuid::new_v4());
        let b = issue("2", Category::Water, Uuid::new_v4());
        let kept = IssueFilter::default().apply(vec![a.clone(), b.clone()]);
        assert_eq!(kept, vec![a, b]);
    }
}
