//! OneBot v11 message events.
//!
//! # Hierarchy
//!
//! ```text
//! MessageEvent { time, self_id, message_id, user_id, message, raw_message, sender }
//! ├── PrivateMessageEvent { sub_type }
//! └── GroupMessageEvent   { group_id, sub_type }
//! ```
//!
//! Each child `Deref`s to its parent, so `group_event.user_id` works
//! transparently. Only message events are modelled; notices, requests and
//! meta events carry nothing a reply could be addressed to.

use std::any::Any;
use std::ops::Deref;

use courier_core::{AdapterKind, BoxedEvent, Event};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::message::OneBotMessage;

// ============================================================================
// Shared Types
// ============================================================================

/// Message sender information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sender {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub nickname: Option<String>,
    /// Group card (group messages only).
    #[serde(default)]
    pub card: Option<String>,
    /// "owner", "admin" or "member" (group messages only).
    #[serde(default)]
    pub role: Option<String>,
}

/// Accepts the numeric ids implementations send as well as string ids.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(i64),
        String(String),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Number(id) => id.to_string(),
        Id::String(id) => id,
    })
}

/// Fields shared by every message event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub self_id: i64,
    #[serde(deserialize_with = "id_string")]
    pub message_id: String,
    pub user_id: i64,
    #[serde(default)]
    pub message: OneBotMessage,
    #[serde(default)]
    pub raw_message: String,
    #[serde(default)]
    pub sender: Sender,
}

impl MessageEvent {
    /// Extracts plain text from the message segments.
    pub fn plain_text(&self) -> String {
        self.message.extract_plain_text()
    }
}

macro_rules! message_event {
    ($name:ident, $event_name:literal) => {
        impl Deref for $name {
            type Target = MessageEvent;

            fn deref(&self) -> &MessageEvent {
                &self.parent
            }
        }

        impl Event for $name {
            fn event_name(&self) -> &'static str {
                $event_name
            }

            fn adapter(&self) -> AdapterKind {
                AdapterKind::OneBotV11
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn message_id(&self) -> Option<&str> {
                Some(&self.parent.message_id)
            }

            fn user_id(&self) -> Option<String> {
                Some(self.parent.user_id.to_string())
            }
        }
    };
}

// ============================================================================
// PrivateMessageEvent
// ============================================================================

/// Private message event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrivateMessageEvent {
    #[serde(flatten)]
    pub parent: MessageEvent,
    /// "friend", "group" or "other".
    #[serde(default)]
    pub sub_type: String,
}

message_event!(PrivateMessageEvent, "onebot.message.private");

// ============================================================================
// GroupMessageEvent
// ============================================================================

/// Group message event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupMessageEvent {
    #[serde(flatten)]
    pub parent: MessageEvent,
    pub group_id: i64,
    /// "normal", "anonymous" or "notice".
    #[serde(default)]
    pub sub_type: String,
}

message_event!(GroupMessageEvent, "onebot.message.group");

// ============================================================================
// Parsing
// ============================================================================

/// Any message event the adapter understands.
#[derive(Debug, Clone)]
pub enum OneBotEvent {
    Private(PrivateMessageEvent),
    Group(GroupMessageEvent),
}

impl OneBotEvent {
    /// Parses a raw event pushed by the implementation.
    ///
    /// Returns `Ok(None)` for anything other than a private or group message.
    pub fn parse(value: Value) -> serde_json::Result<Option<Self>> {
        if value.get("post_type").and_then(Value::as_str) != Some("message") {
            return Ok(None);
        }
        let event = match value.get("message_type").and_then(Value::as_str) {
            Some("private") => Self::Private(serde_json::from_value(value)?),
            Some("group") => Self::Group(serde_json::from_value(value)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// Wraps the concrete event for hand-off to the host.
    pub fn into_boxed(self) -> BoxedEvent {
        match self {
            Self::Private(event) => BoxedEvent::new(event),
            Self::Group(event) => BoxedEvent::new(event),
        }
    }
}
