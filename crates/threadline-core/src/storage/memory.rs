//! MemoryBackend - Volatile Storage
//!
//! TigerStyle: one owned struct, one lock.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      MemoryBackend                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RwLock<Tables>                                              │
//! │    users_by_id    HashMap<id, User>                          │
//! │    user_by_name   HashMap<username, id>                      │
//! │    posts          HashMap<id, Post>                          │
//! │    comments       HashMap<id, Comment>                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads share the lock; every write holds it exclusively, so a
//! check-then-insert is a single critical section. Listings sort explicitly
//! (posts newest first, comments oldest first, ties by id) because map
//! iteration order means nothing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{Comment, Post, User};
use crate::pagination::Page;

use super::backend::StorageBackend;
use super::error::{StorageError, StorageResult};

#[derive(Debug, Default)]
struct Tables {
    users_by_id: HashMap<String, User>,
    user_by_name: HashMap<String, String>,
    posts: HashMap<String, Post>,
    comments: HashMap<String, Comment>,
}

/// In-memory storage backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
    closed: AtomicBool,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

fn paginate<T: Clone>(items: &[T], page: Page) -> Vec<T> {
    let window = page.window(items.len());
    let result = items.get(window).map(<[T]>::to_vec).unwrap_or_default();

    // Postcondition
    assert!(
        result.len() <= page.limit(),
        "result count {} exceeds limit {}",
        result.len(),
        page.limit()
    );

    result
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn create_user(&self, user: &User) -> StorageResult<()> {
        self.ensure_open()?;
        let mut tables = self.tables.write().await;

        if tables.user_by_name.contains_key(&user.username) {
            return Err(StorageError::already_exists("user", &user.username));
        }
        if tables.users_by_id.contains_key(&user.id) {
            return Err(StorageError::already_exists("user", &user.id));
        }

        tables
            .user_by_name
            .insert(user.username.clone(), user.id.clone());
        tables.users_by_id.insert(user.id.clone(), user.clone());
        debug!(user_id = %user.id, "user stored");
        Ok(())
    }

    async fn get_user(&self, id: &str) -> StorageResult<User> {
        self.ensure_open()?;
        let tables = self.tables.read().await;
        tables
            .users_by_id
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("user", id))
    }

    async fn create_post(&self, post: &Post) -> StorageResult<()> {
        self.ensure_open()?;
        let mut tables = self.tables.write().await;

        if tables.posts.contains_key(&post.id) {
            return Err(StorageError::already_exists("post", &post.id));
        }

        tables.posts.insert(post.id.clone(), post.clone());
        debug!(post_id = %post.id, "post stored");
        Ok(())
    }

    async fn get_post(&self, id: &str) -> StorageResult<Post> {
        self.ensure_open()?;
        let tables = self.tables.read().await;
        tables
            .posts
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("post", id))
    }

    async fn update_post(&self, post: &Post) -> StorageResult<()> {
        self.ensure_open()?;
        let mut tables = self.tables.write().await;

        let stored = tables
            .posts
            .get_mut(&post.id)
            .ok_or_else(|| StorageError::not_found("post", &post.id))?;
        stored.title.clone_from(&post.title);
        stored.content.clone_from(&post.content);
        stored.comments_enabled = post.comments_enabled;
        debug!(post_id = %post.id, "post updated");
        Ok(())
    }

    async fn list_posts(&self, page: Page) -> StorageResult<Vec<Post>> {
        self.ensure_open()?;
        let tables = self.tables.read().await;

        let mut posts: Vec<&Post> = tables.posts.values().collect();
        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(paginate(&posts, page).into_iter().cloned().collect())
    }

    async fn create_comment(&self, comment: &Comment) -> StorageResult<()> {
        self.ensure_open()?;
        let mut tables = self.tables.write().await;

        if tables.comments.contains_key(&comment.id) {
            return Err(StorageError::already_exists("comment", &comment.id));
        }

        tables.comments.insert(comment.id.clone(), comment.clone());
        debug!(comment_id = %comment.id, post_id = %comment.post_id, "comment stored");
        Ok(())
    }

    async fn get_comment(&self, id: &str) -> StorageResult<Comment> {
        self.ensure_open()?;
        let tables = self.tables.read().await;
        tables
            .comments
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("comment", id))
    }

    async fn list_comments(
        &self,
        post_id: &str,
        parent_id: Option<&str>,
        page: Page,
    ) -> StorageResult<Vec<Comment>> {
        self.ensure_open()?;
        let tables = self.tables.read().await;

        let mut level: Vec<&Comment> = tables
            .comments
            .values()
            .filter(|c| {
                c.post_id == post_id
                    && match parent_id {
                        None => c.is_root(),
                        Some(parent_id) => c.is_reply_to(parent_id),
                    }
            })
            .collect();
        level.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(paginate(&level, page).into_iter().cloned().collect())
    }

    async fn close(&self) -> StorageResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("memory backend closed");
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn page(offset: i64, limit: i64) -> Page {
        Page::new(offset, limit, 100).unwrap()
    }

    fn user(id: &str, name: &str) -> User {
        User {
            id: id.to_string(),
            username: name.to_string(),
        }
    }

    fn post(id: &str, at_secs: i64) -> Post {
        Post {
            id: id.to_string(),
            title: format!("title {id}"),
            content: format!("content {id}"),
            author_id: "u1".to_string(),
            comments_enabled: true,
            created_at: Utc.timestamp_opt(at_secs, 0).unwrap(),
        }
    }

    fn comment(id: &str, post_id: &str, parent: Option<&str>, at_secs: i64) -> Comment {
        Comment {
            id: id.to_string(),
            post_id: post_id.to_string(),
            parent_id: parent.map(str::to_string),
            author_id: "u1".to_string(),
            text: format!("text {id}"),
            created_at: Utc.timestamp_opt(at_secs, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_user_uniqueness() {
        let backend = MemoryBackend::new();
        backend.create_user(&user("u1", "alice")).await.unwrap();

        let err = backend.create_user(&user("u2", "alice")).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { entity: "user", .. }));

        let err = backend.create_user(&user("u1", "bob")).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));

        assert_eq!(backend.get_user("u1").await.unwrap().username, "alice");
        assert!(matches!(backend.get_user("u2").await, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_post_crud() {
        let backend = MemoryBackend::new();
        let mut p = post("p1", 10);
        backend.create_post(&p).await.unwrap();
        assert!(matches!(
            backend.create_post(&p).await,
            Err(StorageError::AlreadyExists { entity: "post", .. })
        ));

        p.title = "new title".to_string();
        backend.update_post(&p).await.unwrap();
        assert_eq!(backend.get_post("p1").await.unwrap().title, "new title");

        let missing = post("nope", 0);
        assert!(matches!(backend.update_post(&missing).await, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_posts_newest_first_and_clamped() {
        let backend = MemoryBackend::new();
        for (id, at) in [("a", 1), ("b", 3), ("c", 2)] {
            backend.create_post(&post(id, at)).await.unwrap();
        }

        let all = backend.list_posts(page(0, 10)).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        let second = backend.list_posts(page(1, 1)).await.unwrap();
        assert_eq!(second[0].id, "c");

        assert_eq!(backend.list_posts(page(2, 50)).await.unwrap().len(), 1);
        assert!(backend.list_posts(page(3, 5)).await.unwrap().is_empty());
        assert!(backend.list_posts(page(99, 5)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_comments_one_level() {
        let backend = MemoryBackend::new();
        backend.create_comment(&comment("r1", "p1", None, 1)).await.unwrap();
        backend.create_comment(&comment("r2", "p1", None, 2)).await.unwrap();
        backend.create_comment(&comment("x1", "p1", Some("r1"), 3)).await.unwrap();
        backend.create_comment(&comment("x2", "p1", Some("x1"), 4)).await.unwrap();
        backend.create_comment(&comment("o1", "p2", None, 0)).await.unwrap();

        let roots = backend.list_comments("p1", None, page(0, 10)).await.unwrap();
        let ids: Vec<&str> = roots.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2"]);

        let replies = backend.list_comments("p1", Some("r1"), page(0, 10)).await.unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].id, "x1");

        let none = backend.list_comments("p1", Some("r2"), page(0, 10)).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let backend = MemoryBackend::new();
        backend.close().await.unwrap();
        backend.close().await.unwrap();
        assert_eq!(backend.get_user("u1").await, Err(StorageError::Closed));
    }
}
