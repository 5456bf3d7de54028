use thiserror::Error;

#[derive(Debug, Error)]
pub enum CivicError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("store: {0}")]
    Store(#[from] anyhow::Error),
}

impl CivicError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Store(_) => 500,
        }
    }

    /// Store failures are transient from the caller's point of view; every
    /// other variant will fail the same way on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    pub fn issue_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("issue {id} not found"))
    }
}
