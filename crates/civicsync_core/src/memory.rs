//! In-memory store implementations.
//!
//! Used by the test suites and by the server when no database URL is
//! configured. Every operation takes the lock exactly once, so toggles and
//! appends are atomic just like their SQL counterparts.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::CivicError,
    ports::{IssueStore, Result, UserStore},
    types::{AuthorSummary, Issue, IssueDraft, IssuePatch, LikeOutcome, NewUser, User},
};

/// Issues kept in insertion order.
#[derive(Default, Clone)]
pub struct InMemoryIssueStore {
    issues: Arc<RwLock<Vec<Issue>>>,
}

impl InMemoryIssueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IssueStore for InMemoryIssueStore {
    async fn create(&self, draft: IssueDraft) -> Result<Issue> {
        let issue = Issue::from_draft(draft, Utc::now());
        self.issues.write().await.push(issue.clone());
        Ok(issue)
    }

    async fn get(&self, id: Uuid) -> Result<Issue> {
        self.issues
            .read()
            .await
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| CivicError::issue_not_found(id))
    }

    async fn list_all(&self) -> Result<Vec<Issue>> {
        let mut all: Vec<Issue> = self.issues.read().await.iter().rev().cloned().collect();
        // Stable sort: equal timestamps keep newest-inserted first.
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn update(&self, id: Uuid, patch: IssuePatch) -> Result<Issue> {
        let mut issues = self.issues.write().await;
        let issue = issues
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| CivicError::issue_not_found(id))?;
        match patch {
            IssuePatch::SetStatus(status) => issue.status = status,
            IssuePatch::AppendComment(comment) => issue.comments.push(comment),
        }
        issue.updated_at = Utc::now();
        Ok(issue.clone())
    }

    async fn toggle_like(&self, id: Uuid, user_id: Uuid) -> Result<LikeOutcome> {
        let mut issues = self.issues.write().await;
        let issue = issues
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| CivicError::issue_not_found(id))?;
        let liked = if issue.is_liked_by(user_id) {
            issue.liked_by.retain(|u| *u != user_id);
            false
        } else {
            issue.liked_by.push(user_id);
            true
        };
        issue.upvotes = issue.liked_by.len() as u32;
        issue.updated_at = Utc::now();
        Ok(LikeOutcome {
            issue: issue.clone(),
            liked,
        })
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut issues = self.issues.write().await;
        let before = issues.len();
        issues.retain(|i| i.id != id);
        if issues.len() == before {
            return Err(CivicError::issue_not_found(id));
        }
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let email = user.email.trim().to_lowercase();
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email) {
            return Err(CivicError::Conflict(format!("{email} is already registered")));
        }
        let stored = User {
            id: Uuid::new_v4(),
            name: user.name,
            email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn get(&self, id: Uuid) -> Result<User> {
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| CivicError::NotFound(format!("user {id} not found")))
    }

    async fn summaries(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, AuthorSummary>> {
        let users = self.users.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| {
                users.get(id).map(|u| {
                    (
                        *id,
                        AuthorSummary {
                            name: u.name.clone(),
                            email: Some(u.email.clone()),
                        },
                    )
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Role;
    use crate::types::{Category, Comment, IssueStatus};

    fn draft(title: &str) -> IssueDraft {
        IssueDraft {
            title: title.into(),
            description: "d".into(),
            category: Category::Electricity,
            pin: "400001".into(),
            lat: 19.07,
            lng: 72.87,
            media: None,
            author: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn list_all_is_newest_first() {
        let store = InMemoryIssueStore::new();
        let first = store.create(draft("first")).await.unwrap();
        let second = store.create(draft("second")).await.unwrap();
        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = InMemoryIssueStore::new();
        let err = store.get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, CivicError::NotFound(_)));
    }

    #[tokio::test]
    async fn toggle_like_keeps_upvotes_in_sync() {
        let store = InMemoryIssueStore::new();
        let issue = store.create(draft("lamp")).await.unwrap();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let out = store.toggle_like(issue.id, a).await.unwrap();
        assert!(out.liked);
        let out = store.toggle_like(issue.id, b).await.unwrap();
        assert!(out.liked);
        assert_eq!(out.issue.upvotes, 2);
        let out = store.toggle_like(issue.id, a).await.unwrap();
        assert!(!out.liked);
        assert_eq!(out.issue.liked_by, vec![b]);
        assert_eq!(out.issue.upvotes, out.issue.liked_by.len() as u32);
    }

    #[tokio::test]
    async fn concurrent_toggles_never_duplicate_a_user() {
        let store = InMemoryIssueStore::new();
        let issue = store.create(draft("race")).await.unwrap();
        let user = Uuid::new_v4();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.toggle_like(issue.id, user).await })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }
        let after = store.get(issue.id).await.unwrap();
        // An even number of toggles nets out to "not liked".
        assert!(after.liked_by.is_empty());
        assert_eq!(after.upvotes, 0);
    }

    #[tokio::test]
    async fn update_appends_and_sets_status() {
        let store = InMemoryIssueStore::new();
        let issue = store.create(draft("leak")).await.unwrap();
        let comment = Comment {
            text: "first".into(),
            author: None,
            created_at: Utc::now(),
        };
        let updated = store
            .update(issue.id, IssuePatch::AppendComment(comment.clone()))
            .await
            .unwrap();
        assert_eq!(updated.comments, vec![comment]);
        let updated = store
            .update(issue.id, IssuePatch::SetStatus(IssueStatus::InProgress))
            .await
            .unwrap();
        assert_eq!(updated.status, IssueStatus::InProgress);
        assert_eq!(updated.comments.len(), 1);
        assert!(updated.updated_at >= issue.updated_at);
    }

    #[tokio::test]
    async fn delete_twice_reports_not_found() {
        let store = InMemoryIssueStore::new();
        let issue = store.create(draft("gone")).await.unwrap();
        store.delete(issue.id).await.unwrap();
        let err = store.delete(issue.id).await.unwrap_err();
        assert!(matches!(err, CivicError::NotFound(_)));
    }

    #[tokio::test]
    async fn user_emails_are_unique_case_insensitively() {
        let store = InMemoryUserStore::new();
        let new_user = |email: &str| NewUser {
            name: "Asha".into(),
            email: email.into(),
            password_hash: "hash".into(),
            role: Role::Public,
        };
        let created = store.create(new_user("Asha@Example.org")).await.unwrap();
        assert_eq!(created.email, "asha@example.org");
        let err = store.create(new_user("asha@example.org")).await.unwrap_err();
        assert!(matches!(err, CivicError::Conflict(_)));
        let found = store.find_by_email("ASHA@example.org").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(created.id));
    }

    #[tokio::test]
    async fn summaries_skip_unknown_ids() {
        let store = InMemoryUserStore::new();
        let user = store
            .create(NewUser {
                name: "Ravi".into(),
                email: "ravi@example.org".into(),
                password_hash: "hash".into(),
                role: Role::Admin,
            })
            .await
            .unwrap();
        let map = store.summaries(&[user.id, Uuid::new_v4()]).await.unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map[&user.id].name, "Ravi");
    }
}
