//! Destination descriptors.
//!
//! A [`Target`] names one place a message can be delivered to, carrying only
//! the identifiers needed to address it. Targets are plain values: equality
//! and hashing are structural over every field, including the owning
//! `bot_id` of bot-scoped variants, and no session state is ever embedded.
//!
//! Targets serialize with a `platform_type` tag so applications can persist
//! them (subscriptions, scheduled pushes) and restore them later:
//!
//! ```rust,ignore
//! let target = Target::QqGuildChannel { channel_id: 2233 };
//! let json = serde_json::to_string(&target)?;
//! // {"platform_type":"qq_guild_channel","channel_id":2233}
//! ```

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

// ============================================================================
// Adapter Kind
// ============================================================================

/// The closed set of protocol adapters Courier can render for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    /// QQ open platform (guilds, guild DMs, open-id groups and C2C chats).
    Qq,
    /// OneBot v11 implementations.
    #[serde(rename = "onebot.v11")]
    OneBotV11,
    /// Local console session.
    Console,
}

impl AdapterKind {
    /// Returns the adapter's canonical name.
    pub fn as_str(self) -> &'static str {
        match self {
            AdapterKind::Qq => "qq",
            AdapterKind::OneBotV11 => "onebot.v11",
            AdapterKind::Console => "console",
        }
    }
}

impl Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Target
// ============================================================================

/// A protocol-agnostic description of a message destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "platform_type", rename_all = "snake_case")]
pub enum Target {
    /// A QQ guild sub-channel.
    QqGuildChannel { channel_id: u64 },
    /// A QQ guild direct message, addressed through the guild both users share.
    QqGuildDirect {
        recipient_id: u64,
        source_guild_id: u64,
    },
    /// A QQ group chat seen through one bot's open-id namespace.
    #[serde(rename = "qq_group_openid")]
    QqGroupOpenId { group_openid: String, bot_id: String },
    /// A QQ C2C chat seen through one bot's open-id namespace.
    #[serde(rename = "qq_private_openid")]
    QqPrivateOpenId { user_openid: String, bot_id: String },
    /// A QQ group reached through OneBot v11.
    QqGroup { group_id: i64 },
    /// A QQ private chat reached through OneBot v11.
    QqPrivate { user_id: i64 },
    /// The user of a console session.
    Console { user_id: String },
}

impl Target {
    /// The adapter kind able to deliver to this target.
    pub fn adapter(&self) -> AdapterKind {
        match self {
            Target::QqGuildChannel { .. }
            | Target::QqGuildDirect { .. }
            | Target::QqGroupOpenId { .. }
            | Target::QqPrivateOpenId { .. } => AdapterKind::Qq,
            Target::QqGroup { .. } | Target::QqPrivate { .. } => AdapterKind::OneBotV11,
            Target::Console { .. } => AdapterKind::Console,
        }
    }

    /// The owning bot of a bot-scoped target.
    ///
    /// Open-id identifiers are only meaningful to the bot that observed them,
    /// so these targets can only be delivered by that bot.
    pub fn bot_id(&self) -> Option<&str> {
        match self {
            Target::QqGroupOpenId { bot_id, .. } | Target::QqPrivateOpenId { bot_id, .. } => {
                Some(bot_id)
            }
            _ => None,
        }
    }

    /// Returns the `(recipient_id, source_guild_id)` pair of targets that need
    /// a session-scoped direct channel before anything can be sent.
    pub fn direct_channel_key(&self) -> Option<(u64, u64)> {
        match self {
            Target::QqGuildDirect {
                recipient_id,
                source_guild_id,
            } => Some((*recipient_id, *source_guild_id)),
            _ => None,
        }
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::QqGuildChannel { channel_id } => write!(f, "QQ guild channel {channel_id}"),
            Target::QqGuildDirect {
                recipient_id,
                source_guild_id,
            } => write!(f, "QQ guild DM to {recipient_id} via guild {source_guild_id}"),
            Target::QqGroupOpenId {
                group_openid,
                bot_id,
            } => write!(f, "QQ group {group_openid} (bot {bot_id})"),
            Target::QqPrivateOpenId {
                user_openid,
                bot_id,
            } => write!(f, "QQ user {user_openid} (bot {bot_id})"),
            Target::QqGroup { group_id } => write!(f, "QQ group {group_id}"),
            Target::QqPrivate { user_id } => write!(f, "QQ private chat {user_id}"),
            Target::Console { user_id } => write!(f, "console user {user_id}"),
        }
    }
}
