//! Models - Users, Posts and Comments
//!
//! TigerStyle: Explicit types, builder pattern for inputs.
//!
//! Stored records (`User`, `Post`, `Comment`) are what the storage backends
//! persist and return. Inputs (`NewUser`, `NewPost`, `NewComment`,
//! `PostUpdate`) are what callers hand to the service; identifiers and
//! timestamps on inputs are optional and filled in server-side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::COMMENTS_ENABLED_DEFAULT;

// =============================================================================
// Stored Records
// =============================================================================

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier
    pub id: String,
    /// Unique, trimmed username
    pub username: String,
}

/// A post authored by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Unique identifier
    pub id: String,
    /// Title (never empty)
    pub title: String,
    /// Body (never empty)
    pub content: String,
    /// Author's user id, immutable
    pub author_id: String,
    /// Whether new comments are accepted
    pub comments_enabled: bool,
    /// Creation timestamp (UTC)
    pub created_at: DateTime<Utc>,
}

/// A comment on a post, optionally replying to another comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Unique identifier
    pub id: String,
    /// Post this comment belongs to
    pub post_id: String,
    /// Parent comment on the same post; `None` for root comments
    pub parent_id: Option<String>,
    /// Author's user id
    pub author_id: String,
    /// Comment body
    pub text: String,
    /// Creation timestamp (UTC)
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Check if this is a root comment.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Check if this comment replies directly to `parent_id`.
    #[must_use]
    pub fn is_reply_to(&self, parent_id: &str) -> bool {
        self.parent_id.as_deref() == Some(parent_id)
    }
}

// =============================================================================
// Inputs
// =============================================================================

/// Input for creating a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    /// Caller-supplied id; generated when absent or blank
    #[serde(default)]
    pub id: Option<String>,
    /// Requested username
    pub username: String,
}

impl NewUser {
    /// Create an input with the given username.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
        }
    }

    /// Set custom ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Input for creating a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    /// Caller-supplied id; generated when absent or blank
    #[serde(default)]
    pub id: Option<String>,
    /// Title
    pub title: String,
    /// Body
    pub content: String,
    /// Author's user id
    pub author_id: String,
    /// Whether comments are accepted
    #[serde(default = "comments_enabled_default")]
    pub comments_enabled: bool,
    /// Caller-supplied timestamp; the clock is used when absent
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewPost {
    /// Create an input with comments enabled.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        author_id: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            content: content.into(),
            author_id: author_id.into(),
            comments_enabled: COMMENTS_ENABLED_DEFAULT,
            created_at: None,
        }
    }

    /// Set custom ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Enable or disable comments.
    #[must_use]
    pub fn with_comments_enabled(mut self, enabled: bool) -> Self {
        self.comments_enabled = enabled;
        self
    }

    /// Set creation timestamp.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

fn comments_enabled_default() -> bool {
    COMMENTS_ENABLED_DEFAULT
}

/// Input for creating a comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    /// Caller-supplied id; generated when absent or blank
    #[serde(default)]
    pub id: Option<String>,
    /// Target post
    pub post_id: String,
    /// Parent comment, if replying
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Author's user id
    pub author_id: String,
    /// Comment body
    pub text: String,
    /// Caller-supplied timestamp; the clock is used when absent
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewComment {
    /// Create a root comment input.
    #[must_use]
    pub fn new(
        post_id: impl Into<String>,
        author_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            post_id: post_id.into(),
            parent_id: None,
            author_id: author_id.into(),
            text: text.into(),
            created_at: None,
        }
    }

    /// Make this input a reply to `parent_id`.
    #[must_use]
    pub fn reply_to(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Set custom ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set creation timestamp.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// New title and content for an existing post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdate {
    /// Post to update
    pub id: String,
    /// New title
    pub title: String,
    /// New content
    pub content: String,
}

impl PostUpdate {
    /// Create an update.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
