//! Snapshot storage backends.
//!
//! The remote store is reduced to the two operations snapshot persistence
//! needs: fetch a blob by key, and overwrite it. Two implementations:
//! - [`RedisBackend`]: Redis-backed storage for production
//! - [`MemoryBackend`]: in-process HashMap storage for tests and development

mod memory_backend;
mod redis_backend;

pub use memory_backend::MemoryBackend;
pub use redis_backend::RedisBackend;

use async_trait::async_trait;

use crate::error::PersistenceResult;

/// A key-value store holding opaque snapshot blobs.
///
/// Writes are unconditional last-writer-wins: there is no compare-and-swap,
/// no version check, and no expiry. Implementations surface their own errors
/// unchanged; retry policy belongs to the caller, and the caller here has
/// none.
#[async_trait]
pub trait SnapshotBackend: Send + Sync {
    /// Fetch the blob stored under `key`, or `None` if the key is absent.
    async fn get(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>>;

    /// Overwrite the blob stored under `key`.
    async fn set(&self, key: &str, bytes: &[u8]) -> PersistenceResult<()>;
}
