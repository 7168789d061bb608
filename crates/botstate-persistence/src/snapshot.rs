//! The snapshot data model and its wire codec.
//!
//! The entire persisted state of the bot lives in one [`Snapshot`]: per-user
//! data, per-chat data, global bot data, and conversation-handler states.
//! The snapshot is an atomic unit. Every save re-encodes the whole thing and
//! overwrites a single store entry; there are no field-level store
//! operations and no partitioning by user or chat.
//!
//! The wire format is MessagePack via `rmp-serde`, encoded struct-as-map.
//! MessagePack is self-describing and allows non-string map keys, which
//! matters here: conversation tables are keyed by ordered integer tuples
//! like `(chat_id, user_id)`, something plain JSON cannot express.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PersistenceError, PersistenceResult};

/// Numeric user identifier assigned by the chat platform.
pub type UserId = i64;

/// Numeric chat identifier assigned by the chat platform.
pub type ChatId = i64;

/// Open-ended attribute payload attached to a user, a chat, or the bot
/// itself.
pub type AttributeMap = HashMap<String, Value>;

/// State table of a single conversation handler: composite key to current
/// state.
///
/// `Value::Null` is a live state (the handler's terminal marker), distinct
/// from the key being absent.
pub type ConversationTable = HashMap<ConversationKey, Value>;

/// An ordered tuple of integers identifying one conversation within a
/// handler, e.g. `(chat_id, user_id)`.
///
/// Encodes as a MessagePack array, so it can key a map on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey(pub Vec<i64>);

impl From<(i64, i64)> for ConversationKey {
    fn from((a, b): (i64, i64)) -> Self {
        Self(vec![a, b])
    }
}

impl From<i64> for ConversationKey {
    fn from(id: i64) -> Self {
        Self(vec![id])
    }
}

impl From<Vec<i64>> for ConversationKey {
    fn from(parts: Vec<i64>) -> Self {
        Self(parts)
    }
}

/// The combined persisted form of all four state collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Conversation-handler state tables, keyed by handler name.
    pub conversations: HashMap<String, ConversationTable>,
    /// Per-user attribute maps.
    pub user_data: HashMap<UserId, AttributeMap>,
    /// Per-chat attribute maps.
    pub chat_data: HashMap<ChatId, AttributeMap>,
    /// Global bot attributes.
    ///
    /// Blobs written before this field existed decode to an empty map.
    /// This default is the only schema-evolution provision in the format.
    #[serde(default)]
    pub bot_data: AttributeMap,
}

impl Snapshot {
    /// Encode into a single MessagePack blob.
    ///
    /// Struct-as-map encoding keeps field names on the wire, which is what
    /// lets [`Snapshot::decode`] default a missing `bot_data`.
    pub fn encode(&self) -> PersistenceResult<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Decode a blob previously produced by [`Snapshot::encode`].
    pub fn decode(bytes: &[u8]) -> PersistenceResult<Self> {
        rmp_serde::from_slice(bytes).map_err(PersistenceError::Decode)
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn populated() -> Snapshot {
        let mut snapshot = Snapshot::default();
        snapshot.user_data.insert(
            42,
            HashMap::from([("lang".to_string(), json!("en"))]),
        );
        snapshot.chat_data.insert(
            -100,
            HashMap::from([("title".to_string(), json!("ops"))]),
        );
        snapshot
            .bot_data
            .insert("started".to_string(), json!(true));
        snapshot.conversations.insert(
            "signup".to_string(),
            HashMap::from([
                (ConversationKey::from((-100, 42)), json!("AWAIT_NAME")),
                (ConversationKey::from(7), Value::Null),
            ]),
        );
        snapshot
    }

    #[test]
    fn round_trip_preserves_tuple_keys_and_nested_values() {
        let original = populated();
        let bytes = original.encode().unwrap();
        let decoded = Snapshot::decode(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn round_trip_preserves_null_state() {
        let original = populated();
        let bytes = original.encode().unwrap();
        let decoded = Snapshot::decode(&bytes).unwrap();
        let table = &decoded.conversations["signup"];
        assert_eq!(table.get(&ConversationKey::from(7)), Some(&Value::Null));
    }

    #[test]
    fn missing_bot_data_decodes_to_empty() {
        // A blob from before the bot_data field existed.
        #[derive(Serialize)]
        struct LegacySnapshot {
            conversations: HashMap<String, ConversationTable>,
            user_data: HashMap<UserId, AttributeMap>,
            chat_data: HashMap<ChatId, AttributeMap>,
        }

        let legacy = LegacySnapshot {
            conversations: HashMap::new(),
            user_data: HashMap::from([(
                1,
                HashMap::from([("k".to_string(), json!(1))]),
            )]),
            chat_data: HashMap::new(),
        };
        let bytes = rmp_serde::to_vec_named(&legacy).unwrap();

        let decoded = Snapshot::decode(&bytes).unwrap();
        assert!(decoded.bot_data.is_empty());
        assert_eq!(decoded.user_data[&1]["k"], json!(1));
    }

    #[test]
    fn corrupt_blob_fails_to_decode() {
        let err = Snapshot::decode(&[0x01, 0x02, 0x03]).unwrap_err();
        assert!(matches!(err, PersistenceError::Decode(_)));
    }

    #[test]
    fn empty_snapshot_round_trips() {
        let bytes = Snapshot::default().encode().unwrap();
        let decoded = Snapshot::decode(&bytes).unwrap();
        assert_eq!(decoded, Snapshot::default());
    }
}
