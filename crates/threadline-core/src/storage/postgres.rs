//! PostgresBackend - Persistent Storage
//!
//! TigerStyle: Real database storage behind the same trait as the memory
//! backend.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     PostgresBackend                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Pool: sqlx::PgPool (connection pooling)                     │
//! │  Tables: users, posts, comments                              │
//! │  Deadline: every statement wrapped in tokio::time::timeout   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS users (
//!     id TEXT PRIMARY KEY,
//!     username TEXT NOT NULL UNIQUE
//! );
//! CREATE TABLE IF NOT EXISTS posts (
//!     id TEXT PRIMARY KEY,
//!     title TEXT NOT NULL,
//!     content TEXT NOT NULL,
//!     author_id TEXT NOT NULL,
//!     comments_enabled BOOLEAN NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL
//! );
//! CREATE TABLE IF NOT EXISTS comments (
//!     id TEXT PRIMARY KEY,
//!     post_id TEXT NOT NULL,
//!     parent_id TEXT,
//!     author_id TEXT NOT NULL,
//!     text TEXT NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL
//! );
//! ```
//!
//! References (`author_id`, `post_id`, `parent_id`) carry no foreign keys;
//! the service is the enforcement point.
//!
//! `users.username` carries a UNIQUE constraint. The existence check before
//! insert still produces the common-case error, and a unique violation from
//! a concurrent insert that slipped past the check is reported as
//! `AlreadyExists` as well.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow, PgSslMode};
use sqlx::Row;
use tracing::{debug, info};

use crate::config::DbConfig;
use crate::models::{Comment, Post, User};
use crate::pagination::Page;

use super::backend::StorageBackend;
use super::error::{StorageError, StorageResult};

const SCHEMA: [&str; 5] = [
    r"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS posts (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        author_id TEXT NOT NULL,
        comments_enabled BOOLEAN NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS comments (
        id TEXT PRIMARY KEY,
        post_id TEXT NOT NULL,
        parent_id TEXT,
        author_id TEXT NOT NULL,
        text TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_comments_thread ON comments(post_id, parent_id, created_at)",
];

const POST_COLUMNS: &str = "id, title, content, author_id, comments_enabled, created_at";
const COMMENT_COLUMNS: &str = "id, post_id, parent_id, author_id, text, created_at";

// =============================================================================
// PostgresBackend
// =============================================================================

/// PostgreSQL storage backend.
///
/// TigerStyle: Connection pooling, explicit schema, per-call deadline.
pub struct PostgresBackend {
    pool: PgPool,
    query_timeout: Duration,
}

impl PostgresBackend {
    /// Connect using `config` and initialize the schema.
    ///
    /// # Errors
    /// Returns `StorageError::Connection` if the pool cannot be established,
    /// or a query error if schema creation fails.
    pub async fn connect(config: &DbConfig) -> StorageResult<Self> {
        let ssl_mode = PgSslMode::from_str(&config.ssl_mode).map_err(|e| {
            StorageError::connection(format!("invalid sslmode {}: {e}", config.ssl_mode))
        })?;

        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
            .ssl_mode(ssl_mode);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_open_conns)
            .min_connections(config.max_idle_conns.min(config.max_open_conns))
            .max_lifetime(config.conn_max_lifetime)
            .acquire_timeout(config.query_timeout)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::connection(format!("failed to connect: {e}")))?;

        info!(
            host = %config.host,
            database = %config.database,
            max_open = config.max_open_conns,
            "postgres pool established"
        );

        Self::from_pool(pool, config.query_timeout).await
    }

    /// Create from an existing pool.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub async fn from_pool(pool: PgPool, query_timeout: Duration) -> StorageResult<Self> {
        let backend = Self {
            pool,
            query_timeout,
        };
        backend.init_schema().await?;
        Ok(backend)
    }

    /// Get the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> StorageResult<()> {
        for statement in SCHEMA {
            self.timed("create schema", sqlx::query(statement).execute(&self.pool))
                .await?;
        }
        Ok(())
    }

    /// Run `fut` under the per-call deadline, mapping driver errors.
    async fn timed<T, F>(&self, what: &'static str, fut: F) -> StorageResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(result) => result.map_err(|e| map_sqlx_error(what, e)),
            Err(_) => Err(StorageError::Timeout(format!(
                "{what} exceeded {}ms",
                self.query_timeout.as_millis()
            ))),
        }
    }
}

// =============================================================================
// Error and Row Mapping
// =============================================================================

fn map_sqlx_error(what: &str, error: sqlx::Error) -> StorageError {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
            StorageError::connection(format!("{what}: {error}"))
        }
        sqlx::Error::PoolClosed => StorageError::Closed,
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StorageError::decode(format!("{what}: {error}"))
        }
        other => StorageError::query(format!("{what}: {other}")),
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn row_to_post(row: &PgRow) -> StorageResult<Post> {
    let decode = |e: sqlx::Error| StorageError::decode(e.to_string());
    Ok(Post {
        id: row.try_get("id").map_err(decode)?,
        title: row.try_get("title").map_err(decode)?,
        content: row.try_get("content").map_err(decode)?,
        author_id: row.try_get("author_id").map_err(decode)?,
        comments_enabled: row.try_get("comments_enabled").map_err(decode)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(decode)?,
    })
}

fn row_to_comment(row: &PgRow) -> StorageResult<Comment> {
    let decode = |e: sqlx::Error| StorageError::decode(e.to_string());
    Ok(Comment {
        id: row.try_get("id").map_err(decode)?,
        post_id: row.try_get("post_id").map_err(decode)?,
        parent_id: row.try_get("parent_id").map_err(decode)?,
        author_id: row.try_get("author_id").map_err(decode)?,
        text: row.try_get("text").map_err(decode)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(decode)?,
    })
}

// =============================================================================
// StorageBackend Implementation
// =============================================================================

#[async_trait]
impl StorageBackend for PostgresBackend {
    async fn create_user(&self, user: &User) -> StorageResult<()> {
        let exists: bool = self
            .timed(
                "check user",
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                    .bind(&user.username)
                    .fetch_one(&self.pool),
            )
            .await?;
        if exists {
            return Err(StorageError::already_exists("user", &user.username));
        }

        let insert = sqlx::query("INSERT INTO users (id, username) VALUES ($1, $2)")
            .bind(&user.id)
            .bind(&user.username)
            .execute(&self.pool);
        match tokio::time::timeout(self.query_timeout, insert).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) if is_unique_violation(&e) => {
                return Err(StorageError::already_exists("user", &user.username));
            }
            Ok(Err(e)) => return Err(map_sqlx_error("insert user", e)),
            Err(_) => return Err(StorageError::Timeout("insert user".into())),
        }

        debug!(user_id = %user.id, "user stored");
        Ok(())
    }

    async fn get_user(&self, id: &str) -> StorageResult<User> {
        let row = self
            .timed(
                "get user",
                sqlx::query("SELECT id, username FROM users WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool),
            )
            .await?
            .ok_or_else(|| StorageError::not_found("user", id))?;

        Ok(User {
            id: row.try_get("id").map_err(|e| StorageError::decode(e.to_string()))?,
            username: row
                .try_get("username")
                .map_err(|e| StorageError::decode(e.to_string()))?,
        })
    }

    async fn create_post(&self, post: &Post) -> StorageResult<()> {
        let sql = format!("INSERT INTO posts ({POST_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)");
        let insert = sqlx::query(&sql)
            .bind(&post.id)
            .bind(&post.title)
            .bind(&post.content)
            .bind(&post.author_id)
            .bind(post.comments_enabled)
            .bind(post.created_at)
            .execute(&self.pool);

        match tokio::time::timeout(self.query_timeout, insert).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) if is_unique_violation(&e) => {
                return Err(StorageError::already_exists("post", &post.id));
            }
            Ok(Err(e)) => return Err(map_sqlx_error("insert post", e)),
            Err(_) => return Err(StorageError::Timeout("insert post".into())),
        }

        debug!(post_id = %post.id, "post stored");
        Ok(())
    }

    async fn get_post(&self, id: &str) -> StorageResult<Post> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        let row = self
            .timed(
                "get post",
                sqlx::query(&sql).bind(id).fetch_optional(&self.pool),
            )
            .await?
            .ok_or_else(|| StorageError::not_found("post", id))?;

        row_to_post(&row)
    }

    async fn update_post(&self, post: &Post) -> StorageResult<()> {
        let result = self
            .timed(
                "update post",
                sqlx::query(
                    "UPDATE posts SET title = $1, content = $2, comments_enabled = $3 WHERE id = $4",
                )
                .bind(&post.title)
                .bind(&post.content)
                .bind(post.comments_enabled)
                .bind(&post.id)
                .execute(&self.pool),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("post", &post.id));
        }

        debug!(post_id = %post.id, "post updated");
        Ok(())
    }

    async fn list_posts(&self, page: Page) -> StorageResult<Vec<Post>> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC, id ASC OFFSET $1 LIMIT $2"
        );
        let rows = self
            .timed(
                "list posts",
                sqlx::query(&sql)
                    .bind(page.offset_i64())
                    .bind(page.limit_i64())
                    .fetch_all(&self.pool),
            )
            .await?;

        let posts = rows.iter().map(row_to_post).collect::<StorageResult<Vec<_>>>()?;

        // Postcondition
        assert!(
            posts.len() <= page.limit(),
            "result count {} exceeds limit {}",
            posts.len(),
            page.limit()
        );

        Ok(posts)
    }

    async fn create_comment(&self, comment: &Comment) -> StorageResult<()> {
        let sql =
            format!("INSERT INTO comments ({COMMENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)");
        let insert = sqlx::query(&sql)
            .bind(&comment.id)
            .bind(&comment.post_id)
            .bind(&comment.parent_id)
            .bind(&comment.author_id)
            .bind(&comment.text)
            .bind(comment.created_at)
            .execute(&self.pool);

        match tokio::time::timeout(self.query_timeout, insert).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) if is_unique_violation(&e) => {
                return Err(StorageError::already_exists("comment", &comment.id));
            }
            Ok(Err(e)) => return Err(map_sqlx_error("insert comment", e)),
            Err(_) => return Err(StorageError::Timeout("insert comment".into())),
        }

        debug!(comment_id = %comment.id, post_id = %comment.post_id, "comment stored");
        Ok(())
    }

    async fn get_comment(&self, id: &str) -> StorageResult<Comment> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1");
        let row = self
            .timed(
                "get comment",
                sqlx::query(&sql).bind(id).fetch_optional(&self.pool),
            )
            .await?
            .ok_or_else(|| StorageError::not_found("comment", id))?;

        row_to_comment(&row)
    }

    async fn list_comments(
        &self,
        post_id: &str,
        parent_id: Option<&str>,
        page: Page,
    ) -> StorageResult<Vec<Comment>> {
        let rows = match parent_id {
            None => {
                let sql = format!(
                    "SELECT {COMMENT_COLUMNS} FROM comments \
                     WHERE post_id = $1 AND parent_id IS NULL \
                     ORDER BY created_at ASC, id ASC OFFSET $2 LIMIT $3"
                );
                self.timed(
                    "list root comments",
                    sqlx::query(&sql)
                        .bind(post_id)
                        .bind(page.offset_i64())
                        .bind(page.limit_i64())
                        .fetch_all(&self.pool),
                )
                .await?
            }
            Some(parent) => {
                let sql = format!(
                    "SELECT {COMMENT_COLUMNS} FROM comments \
                     WHERE post_id = $1 AND parent_id = $2 \
                     ORDER BY created_at ASC, id ASC OFFSET $3 LIMIT $4"
                );
                self.timed(
                    "list replies",
                    sqlx::query(&sql)
                        .bind(post_id)
                        .bind(parent)
                        .bind(page.offset_i64())
                        .bind(page.limit_i64())
                        .fetch_all(&self.pool),
                )
                .await?
            }
        };

        rows.iter().map(row_to_comment).collect()
    }

    async fn close(&self) -> StorageResult<()> {
        if !self.pool.is_closed() {
            self.pool.close().await;
            info!("postgres pool closed");
        }
        Ok(())
    }
}

// =============================================================================
// Tests (require running Postgres)
// =============================================================================
