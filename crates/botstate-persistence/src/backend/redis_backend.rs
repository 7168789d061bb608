//! Redis-backed snapshot storage.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use super::SnapshotBackend;
use crate::error::PersistenceResult;

/// Production backend storing the snapshot blob in Redis.
///
/// Wraps a [`ConnectionManager`], which multiplexes one connection and
/// transparently reconnects after failures. Connection management,
/// networking, and durability are Redis's concern; this type only issues
/// GET and SET, one attempt each, and lets errors propagate.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    /// Connect to the Redis instance at `url`, e.g. `redis://127.0.0.1/`.
    pub async fn connect(url: &str) -> PersistenceResult<Self> {
        info!(url, "connecting to redis");
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }

    /// Wrap an existing connection manager.
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl SnapshotBackend for RedisBackend {
    async fn get(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let bytes: Option<Vec<u8>> = conn.get(key).await?;
        debug!(key, found = bytes.is_some(), "redis get");
        Ok(bytes)
    }

    async fn set(&self, key: &str, bytes: &[u8]) -> PersistenceResult<()> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, bytes).await?;
        debug!(key, len = bytes.len(), "redis set");
        Ok(())
    }
}
