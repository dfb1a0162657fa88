//! Service errors
//!
//! TigerStyle: every failure carries a kind plus a human-readable detail.
//! Infrastructure failures are logged here with full detail and leave the
//! service as an opaque `Backend` error.

use tracing::error;

use crate::pagination::PageError;
use crate::storage::StorageError;

/// Result alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors returned by the domain service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Input failed a business rule.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Unique key already taken.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Offset or limit outside the accepted range.
    #[error("parameter out of range: {0}")]
    ParamOutOfRange(String),

    /// Acting user may not perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Target post does not accept comments.
    #[error("comments are disabled: {0}")]
    CommentsForbidden(String),

    /// Storage infrastructure failed; detail is deliberately opaque.
    #[error("{0}")]
    Backend(String),
}

/// Coarse classification for adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`ServiceError::Validation`].
    Validation,
    /// See [`ServiceError::NotFound`].
    NotFound,
    /// See [`ServiceError::AlreadyExists`].
    AlreadyExists,
    /// See [`ServiceError::ParamOutOfRange`].
    ParamOutOfRange,
    /// See [`ServiceError::Forbidden`].
    Forbidden,
    /// See [`ServiceError::CommentsForbidden`].
    CommentsForbidden,
    /// See [`ServiceError::Backend`].
    Backend,
}

impl ErrorKind {
    /// Stable machine-readable name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::ParamOutOfRange => "param_out_of_range",
            Self::Forbidden => "forbidden",
            Self::CommentsForbidden => "comments_forbidden",
            Self::Backend => "backend",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ServiceError {
    /// Shorthand for `Validation`.
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation(detail.into())
    }

    /// Shorthand for `NotFound`.
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound(detail.into())
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::ParamOutOfRange(_) => ErrorKind::ParamOutOfRange,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::CommentsForbidden(_) => ErrorKind::CommentsForbidden,
            Self::Backend(_) => ErrorKind::Backend,
        }
    }

    /// The human-readable detail without the kind prefix.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::Validation(d)
            | Self::NotFound(d)
            | Self::AlreadyExists(d)
            | Self::ParamOutOfRange(d)
            | Self::Forbidden(d)
            | Self::CommentsForbidden(d)
            | Self::Backend(d) => d,
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, id } => Self::not_found(format!("{entity} {id}")),
            StorageError::AlreadyExists { entity, key } => {
                Self::AlreadyExists(format!("{entity} {key}"))
            }
            other => {
                debug_assert!(other.is_infrastructure());
                error!(error = %other, "storage backend failure");
                Self::Backend("backend error".to_string())
            }
        }
    }
}

impl From<PageError> for ServiceError {
    fn from(err: PageError) -> Self {
        Self::ParamOutOfRange(err.to_string())
    }
}
