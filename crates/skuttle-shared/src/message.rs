//! Signed log entries as delivered by the replication layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::Content;
use crate::types::{FeedId, MessageId};

/// Wire shape of a replicated entry (`{key, value, timestamp}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    pub key: MessageId,
    pub value: RawValue,
    /// Local receive time, milliseconds since the epoch.
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rx_seq: Option<i64>,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawValue {
    pub previous: Option<MessageId>,
    pub author: FeedId,
    pub sequence: i64,
    /// Author-asserted time, milliseconds since the epoch.
    pub timestamp: f64,
    #[serde(default)]
    pub hash: String,
    pub content: Value,
    #[serde(default)]
    pub signature: String,
}

/// One immutable entry of a feed with its payload already typed.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub key: MessageId,
    pub author: FeedId,
    pub sequence: i64,
    pub previous: Option<MessageId>,
    pub signature: String,
    /// Author-asserted timestamp (millis). Not trusted for "now" comparisons.
    pub claimed_at: i64,
    /// Local clock at ingestion (millis).
    pub received_at: i64,
    /// Position in the local receive log, when known.
    pub received_seq: Option<i64>,
    /// Whether this entry was delivered decrypted from a private box.
    pub is_private: bool,
    pub content: Content,
}

impl Message {
    pub fn claimed_date(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.claimed_at)
    }

    pub fn received_date(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.received_at)
    }
}

impl From<RawMessage> for Message {
    fn from(raw: RawMessage) -> Self {
        let content = Content::from_json(&raw.value.content);
        Self {
            key: raw.key,
            author: raw.value.author,
            sequence: raw.value.sequence,
            previous: raw.value.previous,
            signature: raw.value.signature,
            claimed_at: raw.value.timestamp as i64,
            received_at: raw.timestamp as i64,
            received_seq: raw.rx_seq,
            is_private: raw.private,
            content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_message_to_typed() {
        let author = FeedId::from_bytes(&[1; 32]);
        let key = MessageId::from_bytes(&[2; 32]);
        let raw = json!({
            "key": key.to_string(),
            "value": {
                "previous": null,
                "author": author.to_string(),
                "sequence": 1,
                "timestamp": 1_600_000_000_000.0,
                "hash": "sha256",
                "content": { "type": "post", "text": "first" },
                "signature": "sig.sig.ed25519"
            },
            "timestamp": 1_600_000_001_000.0,
            "rxSeq": 42
        });

        let raw: RawMessage = serde_json::from_value(raw).unwrap();
        let msg = Message::from(raw);
        assert_eq!(msg.author, author);
        assert_eq!(msg.sequence, 1);
        assert_eq!(msg.claimed_at, 1_600_000_000_000);
        assert_eq!(msg.received_seq, Some(42));
        assert!(!msg.is_private);
        assert!(matches!(msg.content, Content::Post(_)));
        assert!(msg.claimed_date().is_some());
    }
}
