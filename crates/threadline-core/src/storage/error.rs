//! Storage errors
//!
//! Backends raise only structural errors (`NotFound`, `AlreadyExists`) or
//! infrastructure failures. Business rules never originate here.

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {key}")]
    AlreadyExists { entity: &'static str, key: String },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("storage is closed")]
    Closed,
}

impl StorageError {
    /// Shorthand for `NotFound`.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Shorthand for `AlreadyExists`.
    pub fn already_exists(entity: &'static str, key: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity,
            key: key.into(),
        }
    }

    /// Shorthand for `Connection`.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Shorthand for `Query`.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Shorthand for `Decode`.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// True for infrastructure failures (anything not structural).
    #[must_use]
    pub fn is_infrastructure(&self) -> bool {
        !matches!(self, Self::NotFound { .. } | Self::AlreadyExists { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(!StorageError::not_found("post", "p1").is_infrastructure());
        assert!(!StorageError::already_exists("user", "alice").is_infrastructure());
        assert!(StorageError::query("boom").is_infrastructure());
        assert!(StorageError::Closed.is_infrastructure());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            StorageError::not_found("comment", "c9").to_string(),
            "comment not found: c9"
        );
        assert_eq!(
            StorageError::already_exists("user", "alice").to_string(),
            "user already exists: alice"
        );
    }
}
