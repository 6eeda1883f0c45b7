//! The send/receipt pipeline.
//!
//! [`Courier`] ties the other pieces together:
//!
//! 1. pick a bot: the explicit one, or [`BotRegistry::get_bot`]
//! 2. render the message for that bot's adapter
//! 3. resolve a session-scoped channel through the [`IdentifierCache`] when
//!    the target needs one
//! 4. post the payload and wrap the platform's answer in a [`Receipt`]
//!
//! ```rust,ignore
//! let receipt = courier
//!     .send_to(Message::from("hello"), &Target::QqGuildChannel { channel_id: 2233 }, None)
//!     .await?;
//! receipt.revoke().await?;
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::bot::{BoxedBot, Destination, SentMessage};
use crate::cache::IdentifierCache;
use crate::error::{CourierError, CourierResult};
use crate::event::Event;
use crate::extract::TargetExtractors;
use crate::message::{Message, MessageSegment};
use crate::registry::BotRegistry;
use crate::target::Target;

/// Extra decoration applied by [`Courier::send`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Mention the user who triggered the event.
    pub at_sender: bool,
    /// Quote the event's message.
    pub reply: bool,
}

impl SendOptions {
    /// No decoration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `at_sender`.
    pub fn at_sender(mut self, at_sender: bool) -> Self {
        self.at_sender = at_sender;
        self
    }

    /// Sets `reply`.
    pub fn reply(mut self, reply: bool) -> Self {
        self.reply = reply;
        self
    }
}

/// Delivers messages to targets.
pub struct Courier {
    registry: Arc<BotRegistry>,
    cache: Arc<IdentifierCache>,
    extractors: TargetExtractors,
}

impl Courier {
    /// Creates a courier using every linked-in target extractor.
    pub fn new(registry: Arc<BotRegistry>, cache: Arc<IdentifierCache>) -> Self {
        Self {
            registry,
            cache,
            extractors: TargetExtractors::collect_all(),
        }
    }

    /// Replaces the extractor table.
    pub fn with_extractors(mut self, extractors: TargetExtractors) -> Self {
        self.extractors = extractors;
        self
    }

    /// The bot registry used for auto-selection.
    pub fn registry(&self) -> &Arc<BotRegistry> {
        &self.registry
    }

    /// The direct-channel cache.
    pub fn cache(&self) -> &Arc<IdentifierCache> {
        &self.cache
    }

    /// Extracts the reply target of `event`.
    pub fn extract_target(&self, event: &dyn Event, bot: Option<&BoxedBot>) -> CourierResult<Target> {
        self.extractors.extract(event, bot.map(|bot| &**bot))
    }

    /// Sends `message` to `target`.
    ///
    /// An explicit `bot` is used as is; otherwise one is picked by the
    /// registry.
    pub async fn send_to(
        &self,
        message: impl Into<Message>,
        target: &Target,
        bot: Option<&BoxedBot>,
    ) -> CourierResult<Receipt> {
        let bot = self.select(target, bot)?;
        self.deliver(&message.into(), target, bot, None).await
    }

    /// Replies to `event` through the bot that received it.
    ///
    /// The event's message id is passed along as passive-reply context.
    pub async fn send(
        &self,
        message: impl Into<Message>,
        event: &dyn Event,
        bot: &BoxedBot,
        options: SendOptions,
    ) -> CourierResult<Receipt> {
        let target = self.extract_target(event, Some(bot))?;

        if let (Some(key), Some(channel)) = (target.direct_channel_key(), event.direct_channel()) {
            if self.cache.insert(key, channel) {
                debug!(%target, direct_channel = channel, "Direct channel taken from event");
            }
        }

        let mut message = message.into();
        if options.at_sender {
            if let Some(user_id) = event.user_id() {
                message.prepend(MessageSegment::mention(user_id));
            }
        }
        if options.reply {
            if let Some(message_id) = event.message_id() {
                message.prepend(MessageSegment::reply(message_id));
            }
        }

        self.deliver(&message, &target, Arc::clone(bot), event.message_id())
            .await
    }

    /// Sends several messages to one target in order.
    ///
    /// Stops at the first failure; messages already sent stay sent.
    pub async fn send_aggregated<I>(
        &self,
        messages: I,
        target: &Target,
        bot: Option<&BoxedBot>,
    ) -> CourierResult<Vec<Receipt>>
    where
        I: IntoIterator,
        I::Item: Into<Message>,
    {
        let bot = self.select(target, bot)?;
        let mut receipts = Vec::new();
        for message in messages {
            let receipt = self
                .deliver(&message.into(), target, Arc::clone(&bot), None)
                .await?;
            receipts.push(receipt);
        }
        Ok(receipts)
    }

    fn select(&self, target: &Target, bot: Option<&BoxedBot>) -> CourierResult<BoxedBot> {
        match bot {
            Some(bot) => Ok(Arc::clone(bot)),
            None => self.registry.get_bot(target),
        }
    }

    async fn deliver(
        &self,
        message: &Message,
        target: &Target,
        bot: BoxedBot,
        in_reply_to: Option<&str>,
    ) -> CourierResult<Receipt> {
        let owner_mismatch = target.bot_id().is_some_and(|owner| owner != bot.id());
        if bot.adapter() != target.adapter() || owner_mismatch {
            return Err(CourierError::TargetMismatch {
                target: target.clone(),
                adapter: bot.adapter(),
            });
        }

        let rendered = bot.render(message)?;

        let direct_channel = match target.direct_channel_key() {
            Some(key @ (recipient_id, source_guild_id)) => Some(
                self.cache
                    .get_or_resolve(key, || bot.resolve_direct_channel(recipient_id, source_guild_id))
                    .await?,
            ),
            None => None,
        };

        let destination = Destination {
            target,
            direct_channel: direct_channel.as_deref(),
            in_reply_to,
        };
        let sent = bot.send_rendered(rendered, destination).await?;

        debug!(
            bot_id = %bot.id(),
            adapter = %bot.adapter(),
            %target,
            message_id = %sent.message_id,
            "Message delivered"
        );

        Ok(Receipt {
            bot,
            target: target.clone(),
            sent,
        })
    }
}

impl fmt::Debug for Courier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Courier")
            .field("registry", &self.registry)
            .field("extractors", &self.extractors.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Receipt
// =============================================================================

/// Record of a delivered message, sufficient to recall it.
#[derive(Clone)]
pub struct Receipt {
    bot: BoxedBot,
    target: Target,
    sent: SentMessage,
}

impl Receipt {
    /// The platform message id.
    pub fn message_id(&self) -> &str {
        &self.sent.message_id
    }

    /// The identifiers reported by the platform.
    pub fn sent(&self) -> &SentMessage {
        &self.sent
    }

    /// The target the message was delivered to.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// The bot that delivered the message.
    pub fn bot(&self) -> &BoxedBot {
        &self.bot
    }

    /// Recalls the message through the bot that sent it.
    pub async fn revoke(&self) -> CourierResult<()> {
        self.bot.delete(&self.target, &self.sent).await?;
        debug!(
            bot_id = %self.bot.id(),
            target = %self.target,
            message_id = %self.sent.message_id,
            "Message revoked"
        );
        Ok(())
    }
}

impl fmt::Debug for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receipt")
            .field("bot_id", &self.bot.id())
            .field("adapter", &self.bot.adapter())
            .field("target", &self.target)
            .field("sent", &self.sent)
            .finish()
    }
}
