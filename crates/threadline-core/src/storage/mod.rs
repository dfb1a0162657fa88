//! Storage - Backend Trait and Implementations
//!
//! TigerStyle: One trait, interchangeable variants, no business rules.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    StorageBackend Trait                      │
//! └─────────────────────────────────────────────────────────────┘
//!          ↑                              ↑
//!          │                              │
//! ┌────────┴────────┐           ┌────────┴────────┐
//! │  MemoryBackend  │           │ PostgresBackend │
//! │ (dev, testing)  │           │  (production)   │
//! └─────────────────┘           └─────────────────┘
//! ```
//!
//! Both variants agree on every observable behavior except the tie-break
//! order among equal timestamps and timestamp resolution.

mod backend;
mod error;
mod memory;

#[cfg(feature = "postgres")]
mod postgres;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use memory::MemoryBackend;

#[cfg(feature = "postgres")]
pub use postgres::PostgresBackend;
