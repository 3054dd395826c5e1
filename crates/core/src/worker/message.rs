//! Control channel between the host page and the worker.
//!
//! Messages are JSON objects with a `type` field; replies travel back over a
//! one-shot reply port supplied with the message.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

/// Where a worker sends its reply.
pub type ReplyPort = oneshot::Sender<ControlReply>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// Activate a waiting worker now.
    SkipWaiting,
    /// Reply with the worker state and static cache name.
    GetCacheStatus,
    /// Delete every cache generation, then acknowledge.
    ClearCache,
    /// Anything else. Logged and ignored.
    Unknown(Option<String>),
}

impl ControlMessage {
    pub const SKIP_WAITING: &'static str = "SKIP_WAITING";
    pub const GET_CACHE_STATUS: &'static str = "GET_CACHE_STATUS";
    pub const CLEAR_CACHE: &'static str = "CLEAR_CACHE";

    /// Decode a wire message. Never fails: unrecognized shapes are `Unknown`.
    pub fn from_value(value: &Value) -> Self {
        match value.get("type").and_then(Value::as_str) {
            Some(Self::SKIP_WAITING) => ControlMessage::SkipWaiting,
            Some(Self::GET_CACHE_STATUS) => ControlMessage::GetCacheStatus,
            Some(Self::CLEAR_CACHE) => ControlMessage::ClearCache,
            other => ControlMessage::Unknown(other.map(str::to_string)),
        }
    }

    /// Parse a message by its type name alone.
    pub fn from_type(name: &str) -> Self {
        Self::from_value(&serde_json::json!({ "type": name }))
    }

    pub fn type_name(&self) -> Option<&str> {
        match self {
            ControlMessage::SkipWaiting => Some(Self::SKIP_WAITING),
            ControlMessage::GetCacheStatus => Some(Self::GET_CACHE_STATUS),
            ControlMessage::ClearCache => Some(Self::CLEAR_CACHE),
            ControlMessage::Unknown(name) => name.as_deref(),
        }
    }

    pub fn expects_reply(&self) -> bool {
        matches!(self, ControlMessage::GetCacheStatus | ControlMessage::ClearCache)
    }

    pub fn to_value(&self) -> Value {
        match self.type_name() {
            Some(name) => serde_json::json!({ "type": name }),
            None => serde_json::json!({}),
        }
    }
}

/// Reply payloads, serialized in the page's wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ControlReply {
    CacheStatus {
        #[serde(rename = "cacheStatus")]
        cache_status: String,
        #[serde(rename = "cacheName")]
        cache_name: String,
    },
    Ack {
        success: bool,
    },
}
