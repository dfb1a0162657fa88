//! Pagination
//!
//! TigerStyle: raw offset/limit pairs are validated once, at the service
//! boundary, and travel to storage as a `Page` that cannot be out of range.

use std::ops::Range;

/// A validated offset/limit window.
///
/// Constructed only through [`Page::new`], so `limit` is always in
/// `1..=limit_max` for the `limit_max` it was checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    offset: usize,
    limit: usize,
}

/// Why a requested window was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    #[error("offset must be non-negative, got {0}")]
    NegativeOffset(i64),

    #[error("limit must be positive, got {0}")]
    NonPositiveLimit(i64),

    #[error("limit {limit} exceeds maximum {max}")]
    LimitTooLarge { limit: i64, max: usize },
}

impl Page {
    /// Validate a requested window against `limit_max`.
    ///
    /// # Errors
    /// Returns `PageError` if `offset < 0`, `limit <= 0` or `limit > limit_max`.
    pub fn new(offset: i64, limit: i64, limit_max: usize) -> Result<Self, PageError> {
        if offset < 0 {
            return Err(PageError::NegativeOffset(offset));
        }
        if limit <= 0 {
            return Err(PageError::NonPositiveLimit(limit));
        }
        let limit_checked = usize::try_from(limit).unwrap_or(usize::MAX);
        if limit_checked > limit_max {
            return Err(PageError::LimitTooLarge {
                limit,
                max: limit_max,
            });
        }
        let offset_checked = usize::try_from(offset).unwrap_or(usize::MAX);

        Ok(Self {
            offset: offset_checked,
            limit: limit_checked,
        })
    }

    /// Number of items to skip.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Maximum number of items to return.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Index range of this page within a sequence of `len` items.
    ///
    /// An offset at or past the end yields an empty range; the end is
    /// clamped to `len`.
    #[must_use]
    pub fn window(&self, len: usize) -> Range<usize> {
        let start = self.offset.min(len);
        let end = start.saturating_add(self.limit).min(len);
        start..end
    }

    /// Offset as a SQL bind value.
    #[must_use]
    pub fn offset_i64(&self) -> i64 {
        i64::try_from(self.offset).unwrap_or(i64::MAX)
    }

    /// Limit as a SQL bind value.
    #[must_use]
    pub fn limit_i64(&self) -> i64 {
        i64::try_from(self.limit).unwrap_or(i64::MAX)
    }
}

// =============================================================================
// Tests
// =============================================================================
