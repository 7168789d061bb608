//! The state store: four in-memory collections synchronized against one
//! remote snapshot entry.
//!
//! [`StateStore`] lazily hydrates its collections from the store on first
//! read, mutates them through the update operations, and writes the whole
//! snapshot back: immediately after every effective update, or only on
//! [`StateStore::flush`] when deferred-flush mode is configured.
//!
//! A single async mutex serializes every read-modify-write cycle, so
//! concurrent in-process callers cannot interleave partial updates. Across
//! processes there is no coordination at all: each save overwrites the whole
//! entry, silently discarding whatever another process wrote in between.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::backend::SnapshotBackend;
use crate::config::PersistenceConfig;
use crate::error::PersistenceResult;
use crate::snapshot::{
    AttributeMap, ChatId, ConversationKey, ConversationTable, Snapshot, UserId,
};

/// Whether the in-memory snapshot reflects the remote entry.
///
/// Keeping this explicit separates "hydrated but empty" from "never
/// fetched", so a legitimately empty snapshot is not reloaded on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    /// Nothing fetched yet. The next read triggers a load.
    Unloaded,
    /// Hydrated, possibly with empty collections. Reads are served from
    /// memory.
    Loaded,
    /// The last load failed and the error went to the caller. The next read
    /// retries, so a transient store outage can recover; a corrupt blob
    /// keeps failing.
    Failed,
}

struct Inner {
    snapshot: Snapshot,
    load_state: LoadState,
}

/// Persists the state of a conversational bot framework as one snapshot
/// blob in a remote key-value store.
///
/// The host framework reads the collections at startup via [`user_data`],
/// [`chat_data`], [`bot_data`], and [`conversations`], and hands back every
/// state change through the `update_*` operations. With deferred-flush mode
/// enabled it calls [`flush`] at shutdown or on a timer to batch the
/// accumulated changes into a single store write.
///
/// [`user_data`]: StateStore::user_data
/// [`chat_data`]: StateStore::chat_data
/// [`bot_data`]: StateStore::bot_data
/// [`conversations`]: StateStore::conversations
/// [`flush`]: StateStore::flush
pub struct StateStore {
    backend: Arc<dyn SnapshotBackend>,
    config: PersistenceConfig,
    inner: Mutex<Inner>,
}

impl StateStore {
    /// Create a store with the default configuration.
    pub fn new(backend: Arc<dyn SnapshotBackend>) -> Self {
        Self::with_config(backend, PersistenceConfig::default())
    }

    /// Create a store with an explicit configuration.
    pub fn with_config(backend: Arc<dyn SnapshotBackend>, config: PersistenceConfig) -> Self {
        Self {
            backend,
            config,
            inner: Mutex::new(Inner {
                snapshot: Snapshot::default(),
                load_state: LoadState::Unloaded,
            }),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    // ── load / save ──────────────────────────────────────────────────

    /// Fetch the snapshot entry and replace all four in-memory collections.
    ///
    /// An absent entry bootstraps empty collections. An undecodable one is
    /// a hard [`Decode`](crate::PersistenceError::Decode) error: nothing is
    /// silently defaulted over a corrupt snapshot.
    #[instrument(skip(self))]
    pub async fn load(&self) -> PersistenceResult<()> {
        let mut inner = self.inner.lock().await;
        self.load_locked(&mut inner).await
    }

    /// Serialize the current in-memory collections into one blob and
    /// overwrite the remote entry.
    ///
    /// Unconditional last-writer-wins. Collections never touched before
    /// this call are written as their empty defaults.
    #[instrument(skip(self))]
    pub async fn save(&self) -> PersistenceResult<()> {
        let inner = self.inner.lock().await;
        self.save_locked(&inner).await
    }

    async fn load_locked(&self, inner: &mut Inner) -> PersistenceResult<()> {
        match self.backend.get(&self.config.snapshot_key).await {
            Ok(Some(bytes)) => match Snapshot::decode(&bytes) {
                Ok(snapshot) => {
                    debug!(
                        users = snapshot.user_data.len(),
                        chats = snapshot.chat_data.len(),
                        handlers = snapshot.conversations.len(),
                        "snapshot loaded"
                    );
                    inner.snapshot = snapshot;
                    inner.load_state = LoadState::Loaded;
                    Ok(())
                }
                Err(err) => {
                    warn!(key = %self.config.snapshot_key, %err, "snapshot blob is not decodable");
                    inner.load_state = LoadState::Failed;
                    Err(err)
                }
            },
            Ok(None) => {
                debug!(key = %self.config.snapshot_key, "no snapshot entry, starting empty");
                inner.snapshot = Snapshot::default();
                inner.load_state = LoadState::Loaded;
                Ok(())
            }
            Err(err) => {
                inner.load_state = LoadState::Failed;
                Err(err)
            }
        }
    }

    async fn save_locked(&self, inner: &Inner) -> PersistenceResult<()> {
        let bytes = inner.snapshot.encode()?;
        self.backend.set(&self.config.snapshot_key, &bytes).await?;
        debug!(len = bytes.len(), "snapshot saved");
        Ok(())
    }

    async fn ensure_loaded(&self, inner: &mut Inner) -> PersistenceResult<()> {
        if inner.load_state != LoadState::Loaded {
            self.load_locked(inner).await?;
        }
        Ok(())
    }

    async fn maybe_save(&self, inner: &Inner) -> PersistenceResult<()> {
        if self.config.deferred_flush {
            return Ok(());
        }
        self.save_locked(inner).await
    }

    // ── reads ────────────────────────────────────────────────────────

    /// All per-user attribute maps, hydrating from the store on first read.
    ///
    /// The returned map is an owned clone; mutating it never touches store
    /// state. Hand changes back via [`StateStore::update_user_data`].
    pub async fn user_data(&self) -> PersistenceResult<HashMap<UserId, AttributeMap>> {
        let mut inner = self.inner.lock().await;
        self.ensure_loaded(&mut inner).await?;
        Ok(inner.snapshot.user_data.clone())
    }

    /// All per-chat attribute maps, hydrating from the store on first read.
    ///
    /// Owned clone, same contract as [`StateStore::user_data`].
    pub async fn chat_data(&self) -> PersistenceResult<HashMap<ChatId, AttributeMap>> {
        let mut inner = self.inner.lock().await;
        self.ensure_loaded(&mut inner).await?;
        Ok(inner.snapshot.chat_data.clone())
    }

    /// The global bot attribute map, hydrating from the store on first read.
    ///
    /// Owned clone, same contract as [`StateStore::user_data`].
    pub async fn bot_data(&self) -> PersistenceResult<AttributeMap> {
        let mut inner = self.inner.lock().await;
        self.ensure_loaded(&mut inner).await?;
        Ok(inner.snapshot.bot_data.clone())
    }

    /// The state table of one named conversation handler, or an empty table
    /// if the handler has never stored anything.
    ///
    /// Owned clone, same contract as [`StateStore::user_data`].
    pub async fn conversations(&self, name: &str) -> PersistenceResult<ConversationTable> {
        let mut inner = self.inner.lock().await;
        self.ensure_loaded(&mut inner).await?;
        Ok(inner
            .snapshot
            .conversations
            .get(name)
            .cloned()
            .unwrap_or_default())
    }

    // ── updates ──────────────────────────────────────────────────────

    /// Record the state of one conversation, then persist unless deferred.
    ///
    /// The handler's table is created on first use. Setting a state equal to
    /// the current one is a no-op and produces no store write. `Value::Null`
    /// is a live terminal state, distinct from the key being absent.
    #[instrument(skip(self, state))]
    pub async fn update_conversation(
        &self,
        name: &str,
        key: ConversationKey,
        state: Value,
    ) -> PersistenceResult<()> {
        let mut inner = self.inner.lock().await;
        inner.load_state = LoadState::Loaded;
        let table = inner
            .snapshot
            .conversations
            .entry(name.to_string())
            .or_default();
        if table.get(&key) == Some(&state) {
            return Ok(());
        }
        debug!(handler = name, ?key, "conversation state updated");
        table.insert(key, state);
        self.maybe_save(&inner).await
    }

    /// Replace the attribute map of one user, then persist unless deferred.
    ///
    /// Replacement is wholesale, never a field-by-field merge. Structurally
    /// equal data is a no-op with no store write.
    #[instrument(skip(self, data))]
    pub async fn update_user_data(
        &self,
        user_id: UserId,
        data: AttributeMap,
    ) -> PersistenceResult<()> {
        let mut inner = self.inner.lock().await;
        inner.load_state = LoadState::Loaded;
        if inner.snapshot.user_data.get(&user_id) == Some(&data) {
            return Ok(());
        }
        debug!(user_id, "user data updated");
        inner.snapshot.user_data.insert(user_id, data);
        self.maybe_save(&inner).await
    }

    /// Replace the attribute map of one chat, then persist unless deferred.
    ///
    /// Same contract as [`StateStore::update_user_data`].
    #[instrument(skip(self, data))]
    pub async fn update_chat_data(
        &self,
        chat_id: ChatId,
        data: AttributeMap,
    ) -> PersistenceResult<()> {
        let mut inner = self.inner.lock().await;
        inner.load_state = LoadState::Loaded;
        if inner.snapshot.chat_data.get(&chat_id) == Some(&data) {
            return Ok(());
        }
        debug!(chat_id, "chat data updated");
        inner.snapshot.chat_data.insert(chat_id, data);
        self.maybe_save(&inner).await
    }

    /// Replace the global bot attribute map, then persist unless deferred.
    ///
    /// Same contract as [`StateStore::update_user_data`].
    #[instrument(skip(self, data))]
    pub async fn update_bot_data(&self, data: AttributeMap) -> PersistenceResult<()> {
        let mut inner = self.inner.lock().await;
        inner.load_state = LoadState::Loaded;
        if inner.snapshot.bot_data == data {
            return Ok(());
        }
        debug!("bot data updated");
        inner.snapshot.bot_data = data;
        self.maybe_save(&inner).await
    }

    /// Persist the current in-memory state unconditionally, regardless of
    /// deferred-flush mode.
    ///
    /// With deferred-flush enabled this is the only way changes reach the
    /// store, batching any number of updates into a single write.
    #[instrument(skip(self))]
    pub async fn flush(&self) -> PersistenceResult<()> {
        let inner = self.inner.lock().await;
        self.save_locked(&inner).await
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use serde_json::json;

    fn store() -> (Arc<MemoryBackend>, StateStore) {
        let backend = Arc::new(MemoryBackend::new());
        let store = StateStore::new(backend.clone());
        (backend, store)
    }

    #[tokio::test]
    async fn unknown_handler_yields_empty_table() {
        let (_, store) = store();
        let table = store.conversations("nope").await.unwrap();
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn update_is_not_clobbered_by_later_read() {
        let (_, store) = store();
        let data = AttributeMap::from([("a".to_string(), json!(1))]);
        store.update_user_data(42, data.clone()).await.unwrap();

        // The update counts as hydration, so this read must not refetch an
        // older snapshot over it.
        let users = store.user_data().await.unwrap();
        assert_eq!(users[&42], data);
    }

    #[tokio::test]
    async fn no_op_conversation_update_skips_save() {
        let (backend, store) = store();
        let key = ConversationKey::from((-1, 2));
        store
            .update_conversation("menu", key.clone(), json!("OPEN"))
            .await
            .unwrap();
        store
            .update_conversation("menu", key, json!("OPEN"))
            .await
            .unwrap();
        assert_eq!(backend.writes(), 1);
    }

    #[tokio::test]
    async fn save_writes_empty_defaults_for_untouched_collections() {
        let (backend, store) = store();
        store.save().await.unwrap();

        let bytes = backend.get("bot:state").await.unwrap().unwrap();
        let snapshot = Snapshot::decode(&bytes).unwrap();
        assert_eq!(snapshot, Snapshot::default());
    }

    #[tokio::test]
    async fn custom_snapshot_key_is_used() {
        let backend = Arc::new(MemoryBackend::new());
        let store = StateStore::with_config(
            backend.clone(),
            PersistenceConfig::new().with_snapshot_key("other:key"),
        );
        store.update_bot_data(AttributeMap::from([("x".to_string(), json!(1))]))
            .await
            .unwrap();
        assert!(backend.get("other:key").await.unwrap().is_some());
    }
}
