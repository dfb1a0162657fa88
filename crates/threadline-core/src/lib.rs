//! Threadline Core - Users, Posts and Threaded Comments
//!
//! TigerStyle storage-agnostic content store: one validating service over
//! interchangeable storage backends.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              ThreadService                   │
//! │  validation │ ownership │ thread integrity   │
//! ├─────────────────────────────────────────────┤
//! │          dyn StorageBackend                  │
//! ├──────────────────────┬──────────────────────┤
//! │  MemoryBackend       │  PostgresBackend     │
//! │  RwLock<Tables>      │  sqlx PgPool         │
//! └──────────────────────┴──────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use threadline_core::{MemoryBackend, NewComment, NewPost, NewUser, ServiceConfig, ThreadService};
//!
//! # tokio_test::block_on(async {
//! let service = ThreadService::new(Arc::new(MemoryBackend::new()), ServiceConfig::default());
//!
//! let alice = service.create_user(NewUser::new("alice")).await?;
//! let post = service.create_post(NewPost::new("Hello", "World", &alice.id)).await?;
//! let root = service.create_comment(NewComment::new(&post.id, &alice.id, "first!")).await?;
//!
//! let roots = service.list_comments_by_post(&post.id, None, 0, 10).await?;
//! assert_eq!(roots, vec![root]);
//! # Ok::<(), threadline_core::ServiceError>(())
//! # }).unwrap();
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod pagination;
pub mod service;
pub mod storage;
pub mod thread;

// Re-export common types
pub use clock::{Clock, SimClock, SystemClock};
pub use config::{ConfigError, DbConfig, ServiceConfig};
pub use constants::*;
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use models::{Comment, NewComment, NewPost, NewUser, Post, PostUpdate, User};
pub use pagination::{Page, PageError};
pub use service::ThreadService;
pub use storage::{MemoryBackend, StorageBackend, StorageError, StorageResult};
pub use thread::{ThreadNode, ThreadOptions};

#[cfg(feature = "postgres")]
pub use storage::PostgresBackend;
