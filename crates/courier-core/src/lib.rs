//! # Courier Core
//!
//! Protocol-agnostic outbound messaging for bots connected to several chat
//! platforms at once.
//!
//! Application code describes *what* to send as a [`Message`] of
//! [`MessageSegment`]s and *where* to send it as a [`Target`]. Courier then:
//!
//! - picks a connected [`Bot`] able to reach the target ([`BotRegistry`])
//! - renders the message into that adapter's native payload ([`Renderer`])
//! - resolves session-scoped identifiers the target alone cannot provide
//!   ([`IdentifierCache`])
//! - posts the payload and returns a revocable [`Receipt`] ([`Courier`])
//!
//! Reply targets are recovered from inbound [`Event`]s by [`extract_target`],
//! whose per-event-kind rules are contributed by adapter crates through the
//! [`TARGET_EXTRACTORS`] distributed slice.
//!
//! ## Flow
//!
//! ```text
//! Message + Target
//!       │
//!       ▼
//! BotRegistry::get_bot ──▶ Bot::render ──▶ IdentifierCache ──▶ Bot::send_rendered ──▶ Receipt
//!                                          (guild DMs only)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use courier_core::prelude::*;
//!
//! let pool = Arc::new(BotPool::new());
//! pool.add(bot);
//! let registry = Arc::new(BotRegistry::new(pool));
//! registry.refresh_bots().await;
//!
//! let courier = Courier::new(registry, Arc::new(IdentifierCache::new()));
//! let receipt = courier
//!     .send_to(Message::from("hello ") + MessageSegment::mention("42"), &target, None)
//!     .await?;
//! receipt.revoke().await?;
//! ```
//!
//! ## Features
//!
//! - `testing`: [`testing::ScriptedCaller`] for adapter test suites

pub mod bot;
pub mod cache;
pub mod courier;
pub mod error;
pub mod event;
pub mod extract;
pub mod message;
pub mod registry;
pub mod render;
pub mod target;
pub mod transport;

#[cfg(feature = "testing")]
pub mod testing;

pub use bot::{Bot, BoxedBot, Destination, SentMessage, downcast_bot, same_bot};
pub use cache::{DirectChannelKey, IdentifierCache};
pub use courier::{Courier, Receipt, SendOptions};
pub use error::{ApiError, ApiResult, CourierError, CourierResult};
pub use event::{BoxedEvent, Event};
pub use extract::{
    ExtractFn, ExtractorEntry, TARGET_EXTRACTORS, TargetExtractors, event_as, extract_target,
    require_bot,
};
pub use message::{ImageSource, Message, MessageSegment};
pub use registry::{BotPool, BotRegistry, BotSource, RefreshSummary, RegistryState};
pub use render::{Rendered, Renderer};
pub use target::{AdapterKind, Target};
pub use transport::{ApiCaller, BoxedApiCaller, CallFn, DisabledApiCaller, FnApiCaller};

// Used by adapters as `#[linkme(crate = courier_core::linkme)]`.
pub use linkme;

/// Prelude for common imports.
pub mod prelude {
    pub use super::{
        AdapterKind, Bot, BotPool, BotRegistry, BoxedBot, BoxedEvent, Courier, CourierError,
        CourierResult, Event, IdentifierCache, ImageSource, Message, MessageSegment, Receipt,
        SendOptions, Target, extract_target,
    };
    pub use std::sync::Arc;
}
