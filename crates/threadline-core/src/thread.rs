//! Thread Assembly
//!
//! TigerStyle: bounded walk. Storage is read one level at a time, one page
//! at a time. Depth, page size and the total number of comments loaded are
//! explicit and checked up front; the walk stops at whichever bound it
//! reaches first.
//!
//! ```text
//!   level 1:  list(post, None)        → roots
//!   level 2:  list(post, Some(root))  → replies to each root
//!   ...       until max_depth, max_comments or no replies remain
//! ```

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::constants::{THREAD_COMMENTS_MAX_DEFAULT, THREAD_DEPTH_MAX_DEFAULT};
use crate::error::{ServiceError, ServiceResult};
use crate::models::Comment;
use crate::service::ThreadService;

/// Bounds for [`ThreadService::load_thread`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadOptions {
    /// Number of levels to load, roots included
    pub max_depth: usize,
    /// Page size used for each storage read; the service's configured
    /// default when `None`
    pub page_size: Option<i64>,
    /// Total comments loaded before the walk stops
    pub max_comments: usize,
}

impl Default for ThreadOptions {
    fn default() -> Self {
        Self {
            max_depth: THREAD_DEPTH_MAX_DEFAULT,
            page_size: None,
            max_comments: THREAD_COMMENTS_MAX_DEFAULT,
        }
    }
}

impl ThreadOptions {
    /// Set the depth bound.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the per-read page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Set the total comment bound.
    #[must_use]
    pub fn with_max_comments(mut self, max_comments: usize) -> Self {
        self.max_comments = max_comments;
        self
    }
}

/// A comment with its loaded replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadNode {
    /// The comment itself
    pub comment: Comment,
    /// Direct replies, oldest first
    pub replies: Vec<ThreadNode>,
}

impl ThreadNode {
    /// Total comments in this subtree, including this one.
    #[must_use]
    pub fn comment_count(&self) -> usize {
        1 + self
            .replies
            .iter()
            .map(ThreadNode::comment_count)
            .sum::<usize>()
    }
}

impl ThreadService {
    /// Load a post's comment forest, breadth first.
    ///
    /// Replies deeper than `options.max_depth` are not loaded. Once
    /// `options.max_comments` comments are loaded the walk stops; earlier
    /// levels are always complete before later ones are read.
    ///
    /// # Errors
    /// `Validation` if `max_depth` is zero or above the supported maximum, or
    /// if `max_comments` is zero or above the supported maximum;
    /// `ParamOutOfRange` on a bad page size; `NotFound` if the post is
    /// absent.
    pub async fn load_thread(
        &self,
        post_id: &str,
        options: ThreadOptions,
    ) -> ServiceResult<Vec<ThreadNode>> {
        if options.max_depth == 0 || options.max_depth > THREAD_DEPTH_MAX_DEFAULT {
            return Err(ServiceError::validation(format!(
                "depth must be in 1..={THREAD_DEPTH_MAX_DEFAULT}, got {}",
                options.max_depth
            )));
        }
        if options.max_comments == 0 || options.max_comments > THREAD_COMMENTS_MAX_DEFAULT {
            return Err(ServiceError::validation(format!(
                "max comments must be in 1..={THREAD_COMMENTS_MAX_DEFAULT}, got {}",
                options.max_comments
            )));
        }
        let (_, page_size) = self.fill_page(None, options.page_size);
        self.page(0, page_size)?;
        let post = self.get_post(post_id).await?;

        let budget = options.max_comments;
        let roots = self.read_level(&post.id, None, page_size, budget).await?;
        let mut children: HashMap<String, Vec<Comment>> = HashMap::new();
        let mut frontier: Vec<String> = roots.iter().map(|c| c.id.clone()).collect();
        let mut loaded = roots.len();

        'levels: for _ in 1..options.max_depth {
            if frontier.is_empty() {
                break;
            }
            let mut next = Vec::new();
            for parent_id in frontier {
                if loaded >= budget {
                    warn!(post_id = %post.id, loaded, "thread truncated at comment bound");
                    break 'levels;
                }
                let replies = self
                    .read_level(&post.id, Some(parent_id.as_str()), page_size, budget - loaded)
                    .await?;
                if replies.is_empty() {
                    continue;
                }
                loaded += replies.len();
                next.extend(replies.iter().map(|c| c.id.clone()));
                children.insert(parent_id, replies);
            }
            frontier = next;
        }

        let forest: Vec<ThreadNode> = roots
            .into_iter()
            .map(|root| attach(root, &mut children))
            .collect();

        // Postconditions
        assert!(loaded <= budget, "loaded {loaded} comments, bound is {budget}");
        debug_assert_eq!(forest.iter().map(ThreadNode::comment_count).sum::<usize>(), loaded);

        debug!(post_id = %post.id, comments = loaded, "thread loaded");
        Ok(forest)
    }

    /// Read one level page by page, stopping at a short page or once
    /// `budget` comments are read.
    async fn read_level(
        &self,
        post_id: &str,
        parent_id: Option<&str>,
        page_size: i64,
        budget: usize,
    ) -> ServiceResult<Vec<Comment>> {
        // Precondition
        assert!(budget > 0, "read_level needs a positive budget");

        let mut level = Vec::new();
        let mut offset = 0_i64;
        loop {
            let remaining = i64::try_from(budget - level.len()).unwrap_or(i64::MAX);
            let page = self.page(offset, page_size.min(remaining))?;
            let batch = self.storage().list_comments(post_id, parent_id, page).await?;
            let full = batch.len() == page.limit();
            level.extend(batch);
            if !full || level.len() >= budget {
                return Ok(level);
            }
            offset = offset.saturating_add(page.limit_i64());
        }
    }
}

fn attach(comment: Comment, children: &mut HashMap<String, Vec<Comment>>) -> ThreadNode {
    let replies = children
        .remove(&comment.id)
        .unwrap_or_default()
        .into_iter()
        .map(|reply| attach(reply, children))
        .collect();
    ThreadNode { comment, replies }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::error::ErrorKind;
    use crate::models::{NewComment, NewPost, NewUser};
    use crate::storage::MemoryBackend;
    use std::sync::Arc;

    async fn seeded() -> (ThreadService, String, String) {
        let service = ThreadService::new(Arc::new(MemoryBackend::new()), ServiceConfig::default());
        let user = service.create_user(NewUser::new("alice")).await.unwrap();
        let post = service
            .create_post(NewPost::new("t", "c", &user.id))
            .await
            .unwrap();
        (service, user.id, post.id)
    }

    #[tokio::test]
    async fn test_load_thread_nests_replies() {
        let (service, user, post) = seeded().await;
        let root = service
            .create_comment(NewComment::new(&post, &user, "root"))
            .await
            .unwrap();
        let reply = service
            .create_comment(NewComment::new(&post, &user, "reply").reply_to(&root.id))
            .await
            .unwrap();
        service
            .create_comment(NewComment::new(&post, &user, "deeper").reply_to(&reply.id))
            .await
            .unwrap();
        service
            .create_comment(NewComment::new(&post, &user, "second root"))
            .await
            .unwrap();

        let forest = service.load_thread(&post, ThreadOptions::default()).await.unwrap();
        assert_eq!(forest.len(), 2);
        assert_eq!(forest.iter().map(ThreadNode::comment_count).sum::<usize>(), 4);

        let first = forest.iter().find(|n| n.comment.id == root.id).unwrap();
        assert_eq!(first.replies.len(), 1);
        assert_eq!(first.replies[0].comment.id, reply.id);
        assert_eq!(first.replies[0].replies[0].comment.text, "deeper");
    }

    #[tokio::test]
    async fn test_load_thread_respects_depth_and_pages() {
        let (service, user, post) = seeded().await;
        let root = service
            .create_comment(NewComment::new(&post, &user, "root"))
            .await
            .unwrap();
        for i in 0..5 {
            service
                .create_comment(NewComment::new(&post, &user, format!("r{i}")).reply_to(&root.id))
                .await
                .unwrap();
        }

        let shallow = service
            .load_thread(&post, ThreadOptions::default().with_max_depth(1))
            .await
            .unwrap();
        assert!(shallow[0].replies.is_empty());

        let paged = service
            .load_thread(&post, ThreadOptions::default().with_page_size(2))
            .await
            .unwrap();
        assert_eq!(paged[0].replies.len(), 5);
    }

    #[tokio::test]
    async fn test_load_thread_default_page_follows_config() {
        let config = ServiceConfig {
            default_list_limit: 10,
            max_list_limit: 10,
            ..ServiceConfig::default()
        };
        let service = ThreadService::new(Arc::new(MemoryBackend::new()), config);
        let user = service.create_user(NewUser::new("alice")).await.unwrap();
        let post = service
            .create_post(NewPost::new("t", "c", &user.id))
            .await
            .unwrap();
        for i in 0..12 {
            service
                .create_comment(NewComment::new(&post.id, &user.id, format!("c{i}")))
                .await
                .unwrap();
        }

        let forest = service.load_thread(&post.id, ThreadOptions::default()).await.unwrap();
        assert_eq!(forest.len(), 12);

        let err = service
            .load_thread(&post.id, ThreadOptions::default().with_page_size(20))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParamOutOfRange);
    }

    #[tokio::test]
    async fn test_load_thread_stops_at_comment_bound() {
        let (service, user, post) = seeded().await;
        let mut roots = Vec::new();
        for i in 0..3 {
            let root = service
                .create_comment(NewComment::new(&post, &user, format!("root{i}")))
                .await
                .unwrap();
            roots.push(root);
        }
        for root in &roots {
            for j in 0..4 {
                service
                    .create_comment(NewComment::new(&post, &user, format!("r{j}")).reply_to(&root.id))
                    .await
                    .unwrap();
            }
        }

        let options = ThreadOptions::default().with_page_size(2).with_max_comments(6);
        let forest = service.load_thread(&post, options).await.unwrap();
        assert_eq!(forest.iter().map(ThreadNode::comment_count).sum::<usize>(), 6);
        assert_eq!(forest.len(), 3);
        assert_eq!(forest[0].replies.len(), 3);
        assert!(forest[1].replies.is_empty());

        let few = ThreadOptions::default().with_max_comments(2);
        let forest = service.load_thread(&post, few).await.unwrap();
        assert_eq!(forest.len(), 2);
        assert!(forest.iter().all(|n| n.replies.is_empty()));
    }

    #[tokio::test]
    async fn test_load_thread_rejects_bad_options() {
        let (service, _, post) = seeded().await;

        let err = service
            .load_thread(&post, ThreadOptions::default().with_max_depth(0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = service
            .load_thread(&post, ThreadOptions::default().with_page_size(0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParamOutOfRange);

        for max_comments in [0, THREAD_COMMENTS_MAX_DEFAULT + 1] {
            let err = service
                .load_thread(&post, ThreadOptions::default().with_max_comments(max_comments))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }

        let err = service
            .load_thread("missing", ThreadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
