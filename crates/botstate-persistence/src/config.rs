//! Persistence configuration.
//!
//! [`PersistenceConfig`] controls where the snapshot blob lives and when it
//! is written. Sensible defaults are provided via the [`Default`]
//! implementation, and a builder-style API allows callers to customise
//! individual fields fluently.

/// Default store key under which the snapshot blob lives.
pub const DEFAULT_SNAPSHOT_KEY: &str = "bot:state";

/// Behavior knobs for [`StateStore`](crate::StateStore).
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Store key for the snapshot blob.
    ///
    /// One key per deployment. The whole snapshot lives under this single
    /// entry, with no partitioning by user or chat.
    ///
    /// Default: [`DEFAULT_SNAPSHOT_KEY`].
    pub snapshot_key: String,

    /// When `true`, update operations mutate memory only; nothing reaches
    /// the store until an explicit [`StateStore::flush`](crate::StateStore::flush).
    ///
    /// Default: **false** (every effective update saves immediately).
    pub deferred_flush: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            snapshot_key: DEFAULT_SNAPSHOT_KEY.to_string(),
            deferred_flush: false,
        }
    }
}

impl PersistenceConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the store key for the snapshot blob.
    pub fn with_snapshot_key(mut self, key: impl Into<String>) -> Self {
        self.snapshot_key = key.into();
        self
    }

    /// Enable or disable deferred-flush mode.
    pub fn with_deferred_flush(mut self, deferred: bool) -> Self {
        self.deferred_flush = deferred;
        self
    }
}

// ── tests ────────────────────────────────────────────────────────────
