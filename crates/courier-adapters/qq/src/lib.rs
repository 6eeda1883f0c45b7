//! # Courier Adapter for the QQ Open Platform
//!
//! Delivers Courier messages through the QQ open platform bot API.
//!
//! ## Destinations
//!
//! | Target | Send | Revoke |
//! |--------|------|--------|
//! | `QqGuildChannel` | `post_messages` | `delete_message` |
//! | `QqGuildDirect` | `post_dms` (once, cached) then `post_dms_messages` | `delete_dms_message` |
//! | `QqGroupOpenId` | `post_group_files` (images) then `post_group_messages` | `delete_group_message` |
//! | `QqPrivateOpenId` | `post_c2c_files` (images) then `post_c2c_messages` | `delete_c2c_message` |
//!
//! Guild channels are discovered for the bot registry by walking `guilds` and
//! `get_channels`. Open-id chats have no listing API; their targets carry the
//! owning bot id instead.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier_adapter_qq::QqBot;
//! use courier_core::FnApiCaller;
//!
//! let caller = Arc::new(FnApiCaller::new(Arc::new(move |action, params| {
//!     http.call(action, params).boxed()
//! })));
//! pool.add(Arc::new(QqBot::new("3344", caller)));
//! ```
//!
//! ## Rendering
//!
//! Text and mentions are folded into one escaped `content` string; a message
//! carries at most one image and one quoted reply. See [`model::message`].

pub mod bot;
pub mod extractors;
pub mod model;

pub use bot::QqBot;

pub use model::api::{
    Channel, Dms, FileUpload, FileUploadBody, Guild, GuildMessageBody, Media, MessageReference,
    MessageResponse, OpenIdMessageBody, OpenIdMessageResponse,
};
pub use model::event::{
    AtMessageCreateEvent, C2CMessageCreateEvent, DirectMessageCreateEvent, FriendAuthor,
    GroupAtMessageCreateEvent, GroupMemberAuthor, GuildMessage, MessageCreateEvent, QqEvent, User,
};
pub use model::message::{QqImage, QqMessage, QqRenderer, QqSegment, escape, unescape};
