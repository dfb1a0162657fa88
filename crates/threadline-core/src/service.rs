//! ThreadService - Validation and Orchestration
//!
//! TigerStyle: every business rule lives here; storage only persists.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ThreadService                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  trim → validate → reference checks → assign id/time → store │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Arc<dyn StorageBackend>  │  ServiceConfig  │  Arc<dyn Clock> │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Comment creation checks the target post first: a post with comments
//! disabled rejects every comment with `CommentsForbidden`, whatever else is
//! wrong with the input.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{Comment, NewComment, NewPost, NewUser, Post, PostUpdate, User};
use crate::pagination::Page;
use crate::storage::StorageBackend;

/// Domain service over a storage backend.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct ThreadService {
    storage: Arc<dyn StorageBackend>,
    config: ServiceConfig,
    clock: Arc<dyn Clock>,
}

impl ThreadService {
    /// Create a service using the wall clock.
    ///
    /// # Panics
    /// Panics if `config` fails [`ServiceConfig::validate`].
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, config: ServiceConfig) -> Self {
        // Precondition
        assert!(
            config.validate().is_ok(),
            "service config must be valid: {config:?}"
        );

        Self {
            storage,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for creation timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Limits this service enforces.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub(crate) fn storage(&self) -> &dyn StorageBackend {
        self.storage.as_ref()
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Register a user.
    ///
    /// # Errors
    /// `Validation` if the trimmed username is shorter than the configured
    /// minimum; `AlreadyExists` if it is taken.
    pub async fn create_user(&self, input: NewUser) -> ServiceResult<User> {
        let username = input.username.trim();
        if username.is_empty() {
            return Err(ServiceError::validation("username must not be empty"));
        }
        if username.chars().count() < self.config.min_username_len {
            warn!(username, min = self.config.min_username_len, "username too short");
            return Err(ServiceError::validation(format!(
                "username must be at least {} characters",
                self.config.min_username_len
            )));
        }

        let user = User {
            id: resolve_id(input.id),
            username: username.to_string(),
        };
        self.storage.create_user(&user).await?;

        info!(user_id = %user.id, username = %user.username, "user created");
        Ok(user)
    }

    /// Fetch a user.
    ///
    /// # Errors
    /// `Validation` on a blank id; `NotFound` if absent.
    pub async fn get_user(&self, id: &str) -> ServiceResult<User> {
        let id = required(id, "user id")?;
        Ok(self.storage.get_user(id).await?)
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Publish a post.
    ///
    /// # Errors
    /// `Validation` on a blank title, content or author; `NotFound` if the
    /// author does not exist; `AlreadyExists` on a duplicate id.
    pub async fn create_post(&self, input: NewPost) -> ServiceResult<Post> {
        let title = required(&input.title, "title")?;
        let content = required(&input.content, "content")?;
        let author_id = required(&input.author_id, "author id")?;

        self.storage.get_user(author_id).await?;

        let post = Post {
            id: resolve_id(input.id),
            title: title.to_string(),
            content: content.to_string(),
            author_id: author_id.to_string(),
            comments_enabled: input.comments_enabled,
            created_at: input.created_at.unwrap_or_else(|| self.clock.now()),
        };
        self.storage.create_post(&post).await?;

        info!(post_id = %post.id, author_id = %post.author_id, "post created");
        Ok(post)
    }

    /// Fetch a post.
    ///
    /// # Errors
    /// `Validation` on a blank id; `NotFound` if absent.
    pub async fn get_post(&self, id: &str) -> ServiceResult<Post> {
        let id = required(id, "post id")?;
        Ok(self.storage.get_post(id).await?)
    }

    /// List posts, newest first.
    ///
    /// # Errors
    /// `ParamOutOfRange` if `offset < 0`, `limit <= 0` or `limit` exceeds the
    /// configured maximum.
    pub async fn list_posts(&self, offset: i64, limit: i64) -> ServiceResult<Vec<Post>> {
        let page = self.page(offset, limit)?;
        Ok(self.storage.list_posts(page).await?)
    }

    /// Like [`ThreadService::list_posts`], defaulting a missing offset to 0
    /// and a missing limit to the configured page size.
    ///
    /// # Errors
    /// Same as [`ThreadService::list_posts`].
    pub async fn list_posts_page(
        &self,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> ServiceResult<Vec<Post>> {
        let (offset, limit) = self.fill_page(offset, limit);
        self.list_posts(offset, limit).await
    }

    /// Change a post's title and content on behalf of `acting_user_id`.
    ///
    /// Author, id, creation time and the comments flag are untouched.
    ///
    /// # Errors
    /// `Validation` on any blank field; `NotFound` if the post is absent;
    /// `Forbidden` if the acting user is not the author.
    pub async fn update_post(&self, update: PostUpdate, acting_user_id: &str) -> ServiceResult<Post> {
        let id = required(&update.id, "post id")?;
        let acting_user_id = required(acting_user_id, "acting user id")?;
        let title = required(&update.title, "title")?;
        let content = required(&update.content, "content")?;

        let existing = self.storage.get_post(id).await?;
        if existing.author_id != acting_user_id {
            warn!(post_id = id, acting_user_id, "update rejected: not the author");
            return Err(ServiceError::Forbidden(format!(
                "user {acting_user_id} is not the author of post {id}"
            )));
        }

        let updated = Post {
            title: title.to_string(),
            content: content.to_string(),
            ..existing
        };
        self.storage.update_post(&updated).await?;

        info!(post_id = %updated.id, "post updated");
        Ok(updated)
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// Comment on a post, optionally replying to another comment.
    ///
    /// # Errors
    /// `NotFound` if the post or parent is absent; `CommentsForbidden` if
    /// the post has comments disabled; `Validation` on a blank or overlong
    /// text, a blank author, or a parent on another post.
    ///
    /// The author is an opaque identifier and is not looked up.
    pub async fn create_comment(&self, input: NewComment) -> ServiceResult<Comment> {
        let post_id = required(&input.post_id, "post id")?;
        let post = self.storage.get_post(post_id).await?;
        if !post.comments_enabled {
            warn!(post_id, "comment rejected: comments disabled");
            return Err(ServiceError::CommentsForbidden(format!(
                "post {post_id} does not accept comments"
            )));
        }

        let text = required(&input.text, "text")?;
        let text_len = text.chars().count();
        if text_len > self.config.max_comment_len {
            warn!(post_id, text_len, max = self.config.max_comment_len, "comment too long");
            return Err(ServiceError::validation(format!(
                "text is {text_len} characters, maximum is {}",
                self.config.max_comment_len
            )));
        }

        let author_id = required(&input.author_id, "author id")?;

        let parent_id = match input.parent_id.as_deref() {
            None => None,
            Some(raw) => Some(self.check_parent(post_id, raw).await?),
        };

        let comment = Comment {
            id: resolve_id(input.id),
            post_id: post.id,
            parent_id,
            author_id: author_id.to_string(),
            text: text.to_string(),
            created_at: input.created_at.unwrap_or_else(|| self.clock.now()),
        };
        self.storage.create_comment(&comment).await?;

        debug!(
            comment_id = %comment.id,
            post_id = %comment.post_id,
            parent_id = ?comment.parent_id,
            "comment created"
        );
        Ok(comment)
    }

    /// Fetch a comment.
    ///
    /// # Errors
    /// `Validation` on a blank id; `NotFound` if absent.
    pub async fn get_comment(&self, id: &str) -> ServiceResult<Comment> {
        let id = required(id, "comment id")?;
        Ok(self.storage.get_comment(id).await?)
    }

    /// List one level of a post's thread, oldest first.
    ///
    /// `parent_id = None` lists root comments; `Some(id)` lists the direct
    /// replies to that comment.
    ///
    /// # Errors
    /// `ParamOutOfRange` on a bad window; `NotFound` if the post or parent is
    /// absent; `Validation` on a blank id or a parent on another post.
    pub async fn list_comments_by_post(
        &self,
        post_id: &str,
        parent_id: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> ServiceResult<Vec<Comment>> {
        let page = self.page(offset, limit)?;
        let post_id = required(post_id, "post id")?;
        self.storage.get_post(post_id).await?;

        let parent_id = match parent_id {
            None => None,
            Some(raw) => Some(self.check_parent(post_id, raw).await?),
        };

        Ok(self
            .storage
            .list_comments(post_id, parent_id.as_deref(), page)
            .await?)
    }

    /// Like [`ThreadService::list_comments_by_post`], defaulting a missing
    /// offset to 0 and a missing limit to the configured page size.
    ///
    /// # Errors
    /// Same as [`ThreadService::list_comments_by_post`].
    pub async fn list_comments_page(
        &self,
        post_id: &str,
        parent_id: Option<&str>,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> ServiceResult<Vec<Comment>> {
        let (offset, limit) = self.fill_page(offset, limit);
        self.list_comments_by_post(post_id, parent_id, offset, limit)
            .await
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Close the storage backend.
    ///
    /// # Errors
    /// `Backend` if the backend fails to release its resources.
    pub async fn close(&self) -> ServiceResult<()> {
        self.storage.close().await?;
        info!("thread service closed");
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    pub(crate) fn page(&self, offset: i64, limit: i64) -> ServiceResult<Page> {
        Page::new(offset, limit, self.config.max_list_limit).map_err(|e| {
            warn!(offset, limit, error = %e, "page rejected");
            ServiceError::from(e)
        })
    }

    pub(crate) fn fill_page(&self, offset: Option<i64>, limit: Option<i64>) -> (i64, i64) {
        let default_limit = i64::try_from(self.config.default_list_limit).unwrap_or(i64::MAX);
        (offset.unwrap_or(0), limit.unwrap_or(default_limit))
    }

    /// Resolve a parent reference: it must exist and sit on `post_id`.
    async fn check_parent(&self, post_id: &str, raw: &str) -> ServiceResult<String> {
        let parent_id = required(raw, "parent id")?;
        let parent = self.storage.get_comment(parent_id).await?;
        if parent.post_id != post_id {
            warn!(post_id, parent_id, parent_post = %parent.post_id, "parent on another post");
            return Err(ServiceError::validation(format!(
                "parent comment {parent_id} belongs to another post"
            )));
        }
        Ok(parent.id)
    }
}

/// Trim `value`, rejecting it if nothing is left.
fn required<'a>(value: &'a str, field: &str) -> ServiceResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed)
}

fn resolve_id(id: Option<String>) -> String {
    match id {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => Uuid::new_v4().to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
