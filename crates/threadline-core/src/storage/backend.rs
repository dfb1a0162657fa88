//! StorageBackend trait
//!
//! TigerStyle: one trait, exactly the operations the service needs. The
//! service depends on `dyn StorageBackend` only, so variants swap freely.

use async_trait::async_trait;

use crate::models::{Comment, Post, User};
use crate::pagination::Page;

use super::error::StorageResult;

/// Raw persistence for users, posts and comments.
///
/// Implementations perform no business validation. They enforce only
/// identity: `AlreadyExists` for duplicate usernames or ids, `NotFound`
/// for absent keys. Dropping a returned future cancels the call.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store a new user. Fails with `AlreadyExists` if the username is taken.
    async fn create_user(&self, user: &User) -> StorageResult<()>;

    /// Fetch a user by id.
    async fn get_user(&self, id: &str) -> StorageResult<User>;

    /// Store a new post. Fails with `AlreadyExists` if the id is taken.
    async fn create_post(&self, post: &Post) -> StorageResult<()>;

    /// Fetch a post by id.
    async fn get_post(&self, id: &str) -> StorageResult<Post>;

    /// Overwrite the mutable columns of an existing post.
    async fn update_post(&self, post: &Post) -> StorageResult<()>;

    /// List posts, newest first.
    async fn list_posts(&self, page: Page) -> StorageResult<Vec<Post>>;

    /// Store a new comment. Fails with `AlreadyExists` if the id is taken.
    async fn create_comment(&self, comment: &Comment) -> StorageResult<()>;

    /// Fetch a comment by id.
    async fn get_comment(&self, id: &str) -> StorageResult<Comment>;

    /// List one level of a post's thread, oldest first.
    ///
    /// `parent_id = None` selects root comments; `Some(id)` selects the
    /// direct replies to that comment.
    async fn list_comments(
        &self,
        post_id: &str,
        parent_id: Option<&str>,
        page: Page,
    ) -> StorageResult<Vec<Comment>>;

    /// Release resources. Calling it more than once is harmless.
    async fn close(&self) -> StorageResult<()>;
}
