//! # Courier Adapter for OneBot v11
//!
//! Delivers Courier messages to QQ groups and private chats through any
//! OneBot v11 implementation.
//!
//! | Target | Send | Revoke | Topology |
//! |--------|------|--------|----------|
//! | `QqGroup` | `send_group_msg` | `delete_msg` | `get_group_list` |
//! | `QqPrivate` | `send_private_msg` | `delete_msg` | `get_friend_list` |
//!
//! Messages are sent in the array format; see [`model::message`] for the
//! segment mapping.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier_adapter_onebot::{OneBotBot, OneBotEvent};
//!
//! pool.add(Arc::new(OneBotBot::new(self_id, caller)));
//!
//! if let Some(event) = OneBotEvent::parse(raw)? {
//!     courier.send("pong", &*event.into_boxed(), &bot, SendOptions::new().reply(true)).await?;
//! }
//! ```

pub mod bot;
pub mod extractors;
pub mod model;

pub use bot::OneBotBot;

pub use model::api::{FriendInfo, GroupInfo};
pub use model::event::{GroupMessageEvent, MessageEvent, OneBotEvent, PrivateMessageEvent, Sender};
pub use model::message::{OneBotMessage, OneBotRenderer, parse_cq_string};
pub use model::segment::{
    AtData, ImageData, ReplyData, Segment, TextData, escape_cq_text, escape_cq_value,
    unescape_cq_text,
};
