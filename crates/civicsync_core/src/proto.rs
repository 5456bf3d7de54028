//! API request/response types for the CivicSync service boundary.
//!
//! One explicit schema per endpoint. Request fields are optional at the serde
//! level so that a missing field becomes a `CivicError::Validation` with a
//! useful message rather than a framework deserialisation error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    actor::{Identity, Role},
    error::CivicError,
    projection::IssueFilter,
    types::{Category, IssueDraft, IssueStatus, MediaRef, User},
};

pub type Result<T> = std::result::Result<T, CivicError>;

// ── Submit ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitIssueRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub pin: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Full descriptor returned by the media host.
    #[serde(default)]
    pub media: Option<MediaRef>,
    /// Shorthand when only the hosted URL is known.
    #[serde(default)]
    pub media_url: Option<String>,
}

impl SubmitIssueRequest {
    /// Validate every field and produce a draft attributed to `author`.
    pub fn into_draft(self, author: Uuid) -> Result<IssueDraft> {
        let mut missing = Vec::new();
        let title = required_text(self.title, "title", &mut missing);
        let description = required_text(self.description, "description", &mut missing);
        let category = required_text(self.category, "category", &mut missing);
        let pin = required_text(self.pin, "pin", &mut missing);
        if self.lat.is_none() {
            missing.push("lat");
        }
        if self.lng.is_none() {
            missing.push("lng");
        }
        if !missing.is_empty() {
            return Err(CivicError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        let lat = coordinate(self.lat, "lat", 90.0)?;
        let lng = coordinate(self.lng, "lng", 180.0)?;
        let category: Category = category.unwrap_or_default().parse()?;

        let media = match (self.media, self.media_url) {
            (Some(media), _) => Some(media),
            (None, Some(url)) if !url.trim().is_empty() => Some(MediaRef {
                url,
                filename: None,
                mimetype: None,
            }),
            (None, _) => None,
        };
        let media = media.map(validate_media).transpose()?;

        Ok(IssueDraft {
            title: title.unwrap_or_default(),
            description: description.unwrap_or_default(),
            category,
            pin: pin.unwrap_or_default(),
            lat,
            lng,
            media,
            author,
        })
    }
}

fn required_text(
    value: Option<String>,
    field: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            missing.push(field);
            None
        }
    }
}

fn coordinate(value: Option<f64>, field: &str, bound: f64) -> Result<f64> {
    match value {
        Some(v) if v.is_finite() && v.abs() <= bound => Ok(v),
        Some(v) => Err(CivicError::Validation(format!(
            "{field} must be a finite number within ±{bound}, got {v}"
        ))),
        None => Err(CivicError::Validation(format!("{field} is required"))),
    }
}

fn validate_media(media: MediaRef) -> Result<MediaRef> {
    let parsed = url::Url::parse(media.url.trim())
        .map_err(|e| CivicError::Validation(format!("invalid media url: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CivicError::Validation(format!(
            "media url must be http or https, got {}",
            parsed.scheme()
        )));
    }
    Ok(MediaRef {
        url: parsed.to_string(),
        filename: media.filename.filter(|f| !f.trim().is_empty()),
        mimetype: media.mimetype.filter(|m| !m.trim().is_empty()),
    })
}

// ── Upvote ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpvoteResponse {
    pub upvotes: u32,
    pub liked: bool,
    pub liked_by: Vec<Uuid>,
}

// ── Comments ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddCommentRequest {
    pub comment: Option<String>,
}

impl AddCommentRequest {
    pub fn text(&self) -> Result<String> {
        match self.comment.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            _ => Err(CivicError::Validation("comment is required".into())),
        }
    }
}

// ── Admin ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: Option<String>,
}

impl ChangeStatusRequest {
    pub fn target(&self) -> Result<IssueStatus> {
        self.status
            .as_deref()
            .ok_or_else(|| CivicError::Validation("status is required".into()))?
            .parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ── Feed query ────────────────────────────────────────────────

/// Query string accepted by both feeds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueQuery {
    pub pin: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
}

impl IssueQuery {
    pub fn into_filter(self) -> Result<IssueFilter> {
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Ok(IssueFilter {
            pin: non_blank(self.pin).map(|p| p.trim().to_string()),
            category: non_blank(self.category).map(|c| c.parse()).transpose()?,
            status: non_blank(self.status).map(|s| s.parse()).transpose()?,
        })
    }
}

// ── Accounts ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// A user as returned over the API. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: Identity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUserResponse {
    pub user: UserResponse,
}
