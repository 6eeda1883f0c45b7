//! Bot trait and related types.
//!
//! A [`Bot`] is one live, authenticated session on one adapter. It exposes
//! the platform capabilities the delivery pipeline consumes:
//!
//! - `render` / `send_rendered`: render a message and post it to a target
//! - `delete`: recall a previously sent message
//! - `list_targets`: report the topology this session can reach
//! - `resolve_direct_channel`: open a session-scoped DM channel
//!
//! Capabilities an adapter lacks keep their default implementation, which
//! reports the matching typed error.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{CourierError, CourierResult};
use crate::message::Message;
use crate::render::Rendered;
use crate::target::{AdapterKind, Target};

/// Where a rendered payload goes, plus the per-send context the target
/// itself does not carry.
#[derive(Debug, Clone, Copy)]
pub struct Destination<'a> {
    /// The abstract destination.
    pub target: &'a Target,
    /// The session-scoped channel resolved for targets that need one.
    pub direct_channel: Option<&'a str>,
    /// The inbound message being answered, for platforms that distinguish
    /// passive replies from active pushes.
    pub in_reply_to: Option<&'a str>,
}

impl<'a> Destination<'a> {
    /// An active send to `target`.
    pub fn new(target: &'a Target) -> Self {
        Self {
            target,
            direct_channel: None,
            in_reply_to: None,
        }
    }
}

/// Identifiers of a delivered message, as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SentMessage {
    /// The platform message id.
    pub message_id: String,
    /// The channel the message landed in, when the platform reports one.
    pub channel_id: Option<String>,
    /// The guild the message landed in, when the platform reports one.
    pub guild_id: Option<String>,
}

impl SentMessage {
    /// Creates a record holding only a message id.
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            ..Default::default()
        }
    }
}

/// The core Bot trait.
#[async_trait]
pub trait Bot: Send + Sync + 'static {
    /// Returns the bot's unique identifier.
    fn id(&self) -> &str;

    /// Returns the adapter this bot speaks.
    fn adapter(&self) -> AdapterKind;

    /// Renders a message into this adapter's native payload.
    ///
    /// Pure; must not perform I/O.
    fn render(&self, message: &Message) -> CourierResult<Rendered>;

    /// Posts a payload produced by [`render`](Bot::render).
    async fn send_rendered(
        &self,
        rendered: Rendered,
        destination: Destination<'_>,
    ) -> CourierResult<SentMessage>;

    /// Recalls a message previously sent to `target`.
    async fn delete(&self, _target: &Target, _sent: &SentMessage) -> CourierResult<()> {
        Err(CourierError::RevokeUnsupported {
            adapter: self.adapter(),
        })
    }

    /// Lists every non-bot-scoped target this session can currently reach.
    async fn list_targets(&self) -> CourierResult<Vec<Target>>;

    /// Opens (or looks up) the session-scoped channel for a guild DM.
    async fn resolve_direct_channel(
        &self,
        recipient_id: u64,
        source_guild_id: u64,
    ) -> CourierResult<String> {
        Err(CourierError::TargetMismatch {
            target: Target::QqGuildDirect {
                recipient_id,
                source_guild_id,
            },
            adapter: self.adapter(),
        })
    }

    /// Returns self as an `Arc<dyn Any>` for safe downcasting.
    ///
    /// Implementors should simply return `self`.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A shared Bot trait object.
pub type BoxedBot = Arc<dyn Bot>;

impl fmt::Debug for dyn Bot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("adapter", &self.adapter())
            .field("id", &self.id())
            .finish()
    }
}

/// Attempts to downcast a BoxedBot to a specific concrete type.
///
/// ```rust,ignore
/// if let Some(qq) = downcast_bot::<QqBot>(bot.clone()) {
///     qq.get_channels("1").await?;
/// }
/// ```
pub fn downcast_bot<T: Bot>(bot: BoxedBot) -> Option<Arc<T>> {
    Arc::downcast::<T>(bot.as_any()).ok()
}

/// Returns true if both handles point at the same session.
pub fn same_bot(a: &BoxedBot, b: &BoxedBot) -> bool {
    a.adapter() == b.adapter() && a.id() == b.id()
}
