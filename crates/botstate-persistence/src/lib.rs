//! # botstate-persistence
//!
//! Snapshot persistence for a conversational bot framework.
//!
//! Keeps four collections in memory (per-user data, per-chat data, global
//! bot data, and conversation-handler states), lazily hydrates them from a
//! remote key-value store on first read, and writes them back as one
//! MessagePack blob under one store key after every effective mutation (or
//! only on an explicit flush, in deferred-flush mode).
//!
//! This is a persistence shim, not a storage engine: no queries, no
//! transactions, no eviction, and no cross-process conflict resolution.
//! Every save overwrites the whole snapshot, last writer wins.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │  StateStore   (in-memory snapshot, mutex)  │
//! ├────────────────────────────────────────────┤
//! │  Snapshot     (rmp-serde, one blob)        │
//! ├────────────────────────────────────────────┤
//! │  SnapshotBackend   (redis / memory)        │
//! └────────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use botstate_persistence::{PersistenceConfig, RedisBackend, StateStore};
//!
//! let backend = Arc::new(RedisBackend::connect("redis://127.0.0.1/").await?);
//! let store = StateStore::with_config(
//!     backend,
//!     PersistenceConfig::new().with_deferred_flush(true),
//! );
//!
//! let users = store.user_data().await?;       // hydrates on first read
//! store.update_bot_data(bot_data).await?;     // memory only (deferred)
//! store.flush().await?;                       // one write for everything
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod snapshot;
pub mod store;

// ── re-exports ───────────────────────────────────────────────────────

pub use backend::{MemoryBackend, RedisBackend, SnapshotBackend};
pub use config::{DEFAULT_SNAPSHOT_KEY, PersistenceConfig};
pub use error::{PersistenceError, PersistenceResult};
pub use snapshot::{AttributeMap, ChatId, ConversationKey, ConversationTable, Snapshot, UserId};
pub use store::StateStore;
