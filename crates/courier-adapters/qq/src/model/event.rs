//! QQ open platform message events.
//!
//! ```text
//! QqEvent
//! ├── MessageCreate           (guild channel, full-message intent)
//! ├── AtMessageCreate         (guild channel, @bot)
//! ├── DirectMessageCreate     (guild direct message)
//! ├── GroupAtMessageCreate    (open-id group chat, @bot)
//! └── C2CMessageCreate        (open-id private chat)
//! ```
//!
//! Gateway dispatches are parsed with [`QqEvent::from_dispatch`] using the
//! dispatch type (`t`) and payload (`d`).

use std::any::Any;
use std::ops::Deref;

use courier_core::{AdapterKind, BoxedEvent, Event};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Authors
// =============================================================================

/// A guild user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub bot: Option<bool>,
}

/// The sender of an open-id group message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupMemberAuthor {
    pub member_openid: String,
}

/// The sender of an open-id private message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FriendAuthor {
    pub user_openid: String,
}

// =============================================================================
// Guild messages
// =============================================================================

/// Payload shared by the guild message events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuildMessage {
    pub id: String,
    pub channel_id: String,
    pub guild_id: String,
    pub author: User,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Guild the direct message was started from.
    #[serde(default)]
    pub src_guild_id: Option<String>,
}

macro_rules! guild_event {
    ($(#[$meta:meta])* $name:ident, $event_name:literal) => {
        guild_event!($(#[$meta])* $name, $event_name, direct = false);
    };
    ($(#[$meta:meta])* $name:ident, $event_name:literal, direct = $direct:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub GuildMessage);

        impl Deref for $name {
            type Target = GuildMessage;

            fn deref(&self) -> &GuildMessage {
                &self.0
            }
        }

        impl Event for $name {
            fn event_name(&self) -> &'static str {
                $event_name
            }

            fn adapter(&self) -> AdapterKind {
                AdapterKind::Qq
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn message_id(&self) -> Option<&str> {
                Some(&self.0.id)
            }

            fn user_id(&self) -> Option<String> {
                Some(self.0.author.id.clone())
            }

            /// A DM's `guild_id` is the DM session itself.
            fn direct_channel(&self) -> Option<&str> {
                $direct.then_some(self.0.guild_id.as_str())
            }
        }
    };
}

guild_event!(
    /// A message in a guild channel (requires the full-message intent).
    MessageCreateEvent,
    "qq.message_create"
);

guild_event!(
    /// A message in a guild channel that mentions the bot.
    AtMessageCreateEvent,
    "qq.at_message_create"
);

guild_event!(
    /// A guild direct message.
    DirectMessageCreateEvent,
    "qq.direct_message_create",
    direct = true
);

// =============================================================================
// Open-id messages
// =============================================================================

/// A message in an open-id group chat that mentions the bot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupAtMessageCreateEvent {
    pub id: String,
    pub group_openid: String,
    pub author: GroupMemberAuthor,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
}

impl Event for GroupAtMessageCreateEvent {
    fn event_name(&self) -> &'static str {
        "qq.group_at_message_create"
    }

    fn adapter(&self) -> AdapterKind {
        AdapterKind::Qq
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn message_id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn user_id(&self) -> Option<String> {
        Some(self.author.member_openid.clone())
    }
}

/// A message in an open-id private chat.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct C2CMessageCreateEvent {
    pub id: String,
    pub author: FriendAuthor,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
}

impl Event for C2CMessageCreateEvent {
    fn event_name(&self) -> &'static str {
        "qq.c2c_message_create"
    }

    fn adapter(&self) -> AdapterKind {
        AdapterKind::Qq
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn message_id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn user_id(&self) -> Option<String> {
        Some(self.author.user_openid.clone())
    }
}

// =============================================================================
// Dispatch parsing
// =============================================================================

/// Any message event the adapter understands.
#[derive(Debug, Clone)]
pub enum QqEvent {
    MessageCreate(MessageCreateEvent),
    AtMessageCreate(AtMessageCreateEvent),
    DirectMessageCreate(DirectMessageCreateEvent),
    GroupAtMessageCreate(GroupAtMessageCreateEvent),
    C2CMessageCreate(C2CMessageCreateEvent),
}

impl QqEvent {
    /// Parses a gateway dispatch.
    ///
    /// Returns `Ok(None)` for dispatch types that carry no message.
    pub fn from_dispatch(event_type: &str, data: Value) -> serde_json::Result<Option<Self>> {
        let event = match event_type {
            "MESSAGE_CREATE" => Self::MessageCreate(serde_json::from_value(data)?),
            "AT_MESSAGE_CREATE" => Self::AtMessageCreate(serde_json::from_value(data)?),
            "DIRECT_MESSAGE_CREATE" => Self::DirectMessageCreate(serde_json::from_value(data)?),
            "GROUP_AT_MESSAGE_CREATE" => Self::GroupAtMessageCreate(serde_json::from_value(data)?),
            "C2C_MESSAGE_CREATE" => Self::C2CMessageCreate(serde_json::from_value(data)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// Wraps the concrete event for hand-off to the host.
    pub fn into_boxed(self) -> BoxedEvent {
        match self {
            Self::MessageCreate(event) => BoxedEvent::new(event),
            Self::AtMessageCreate(event) => BoxedEvent::new(event),
            Self::DirectMessageCreate(event) => BoxedEvent::new(event),
            Self::GroupAtMessageCreate(event) => BoxedEvent::new(event),
            Self::C2CMessageCreate(event) => BoxedEvent::new(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_guild_dispatch() {
        let event = QqEvent::from_dispatch(
            "AT_MESSAGE_CREATE",
            json!({
                "id": "1",
                "channel_id": "6677",
                "guild_id": "5566",
                "author": { "id": "1", "username": "alice" },
                "content": "<@!3344> hi",
                "seq": 12,
            }),
        )
        .unwrap()
        .unwrap();

        let QqEvent::AtMessageCreate(event) = event else {
            panic!("expected an at-message event");
        };
        assert_eq!(event.channel_id, "6677");
        assert_eq!(event.message_id(), Some("1"));
        assert_eq!(event.user_id().as_deref(), Some("1"));
        assert_eq!(event.direct_channel(), None);
    }

    #[test]
    fn test_direct_message_carries_its_channel() {
        let event = QqEvent::from_dispatch(
            "DIRECT_MESSAGE_CREATE",
            json!({
                "id": "2",
                "channel_id": "6677",
                "guild_id": "5566",
                "author": { "id": "1" },
                "src_guild_id": "2222",
            }),
        )
        .unwrap()
        .unwrap()
        .into_boxed();

        assert_eq!(event.event_name(), "qq.direct_message_create");
        assert_eq!(event.direct_channel(), Some("5566"));
    }

    #[test]
    fn test_parse_c2c_dispatch() {
        let event = QqEvent::from_dispatch(
            "C2C_MESSAGE_CREATE",
            json!({
                "id": "1",
                "author": { "user_openid": "3344" },
                "content": "test",
                "timestamp": "12345678",
            }),
        )
        .unwrap()
        .unwrap()
        .into_boxed();

        assert_eq!(event.event_name(), "qq.c2c_message_create");
        let c2c = event.downcast_ref::<C2CMessageCreateEvent>().unwrap();
        assert_eq!(c2c.author.user_openid, "3344");
    }

    #[test]
    fn test_unknown_dispatch_is_ignored() {
        let event = QqEvent::from_dispatch("GUILD_CREATE", json!({ "id": "1" })).unwrap();
        assert!(event.is_none());
    }
}
