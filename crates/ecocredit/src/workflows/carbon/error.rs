use chrono::NaiveDate;

use super::domain::UserId;
use super::policy::PolicyError;
use super::repository::RepositoryError;

/// Failure surfaced by the credit engine. Each variant maps to a stable [`CreditError::kind`].
#[derive(Debug, thiserror::Error)]
pub enum CreditError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("footprint already submitted for {user} on {date}")]
    DuplicateSubmission { user: UserId, date: NaiveDate },
    #[error("{0} not found")]
    NotFound(String),
    #[error("user identifier must not be empty")]
    InvalidUser,
    #[error(transparent)]
    InvalidScore(#[from] PolicyError),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl CreditError {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::DuplicateSubmission { .. } => "duplicate_submission",
            Self::NotFound(_) => "not_found",
            Self::InvalidUser => "invalid_user",
            Self::InvalidScore(_) => "invalid_score",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::Internal(_) => "internal",
        }
    }

    /// Transient failures the caller may retry with backoff.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

impl From<RepositoryError> for CreditError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => Self::NotFound("record".to_string()),
            RepositoryError::Unavailable(reason) => Self::StorageUnavailable(reason),
            RepositoryError::Conflict => {
                Self::Internal("unexpected unique-key conflict".to_string())
            }
        }
    }
}
