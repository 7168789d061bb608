//! In-memory snapshot backend for tests and development.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use super::SnapshotBackend;
use crate::error::PersistenceResult;

/// In-process backend holding blobs in a `HashMap`.
///
/// Thread-safe and infallible. Read and write counters let tests assert how
/// many operations actually reached the store.
#[derive(Default)]
pub struct MemoryBackend {
    data: RwLock<HashMap<String, Vec<u8>>>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of get operations served since creation.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of set operations performed since creation.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().unwrap().len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.data.read().unwrap().is_empty()
    }

    /// Remove all keys.
    pub fn clear(&self) {
        self.data.write().unwrap().clear();
    }

    /// Insert a blob directly without touching the counters. Lets tests seed
    /// pre-existing store contents.
    pub fn seed(&self, key: &str, bytes: Vec<u8>) {
        self.data.write().unwrap().insert(key.to_string(), bytes);
    }
}

#[async_trait]
impl SnapshotBackend for MemoryBackend {
    async fn get(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.data.read().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, bytes: &[u8]) -> PersistenceResult<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.data
            .write()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

// ── tests ────────────────────────────────────────────────────────────
