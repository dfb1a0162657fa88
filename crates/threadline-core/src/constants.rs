//! Constants
//!
//! TigerStyle: every limit has a name, a unit, and a single home.

// =============================================================================
// Service Defaults
// =============================================================================

/// Default minimum username length (characters, after trim)
pub const USERNAME_LEN_MIN_DEFAULT: usize = 3;

/// Default page size when a caller does not supply a limit
pub const LIST_LIMIT_DEFAULT: usize = 20;

/// Default upper bound for any page size
pub const LIST_LIMIT_MAX_DEFAULT: usize = 100;

/// Default maximum comment length (characters, after trim)
pub const COMMENT_TEXT_LEN_MAX_DEFAULT: usize = 2000;

/// Whether a new post accepts comments when the caller does not say
pub const COMMENTS_ENABLED_DEFAULT: bool = true;

// =============================================================================
// Database Defaults
// =============================================================================

/// Default maximum number of open pooled connections
pub const DB_MAX_OPEN_CONNS_DEFAULT: u32 = 10;

/// Default number of idle connections kept in the pool
pub const DB_MAX_IDLE_CONNS_DEFAULT: u32 = 10;

/// Default maximum connection lifetime in minutes
pub const DB_CONN_MAX_LIFETIME_MINS_DEFAULT: u64 = 10;

/// Default per-call deadline for database statements in seconds
pub const DB_QUERY_TIMEOUT_SECS_DEFAULT: u64 = 5;

/// Default sslmode passed to Postgres
pub const DB_SSLMODE_DEFAULT: &str = "disable";

// =============================================================================
// Thread Assembly
// =============================================================================

/// Default maximum reply depth walked when assembling a thread
pub const THREAD_DEPTH_MAX_DEFAULT: usize = 16;

/// Default maximum number of comments loaded into one thread view
pub const THREAD_COMMENTS_MAX_DEFAULT: usize = 1000;
