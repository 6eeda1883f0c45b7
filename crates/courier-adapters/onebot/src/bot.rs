//! OneBot v11 Bot implementation.
//!
//! `OneBotBot` wraps a host-supplied [`ApiCaller`](courier_core::ApiCaller)
//! and provides strongly-typed methods for the OneBot v11 APIs Courier uses.
//!
//! # Usage
//!
//! ```rust,ignore
//! use courier_adapter_onebot::{OneBotBot, Segment};
//! use courier_core::downcast_bot;
//!
//! if let Some(onebot) = downcast_bot::<OneBotBot>(bot.clone()) {
//!     onebot.send_private_msg(12345678, vec![Segment::text("Hello!")].into()).await?;
//! }
//! ```

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{
    AdapterKind, ApiError, ApiResult, Bot, BoxedApiCaller, CourierError, CourierResult,
    Destination, Message, Rendered, SentMessage, Target,
};
use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::model::api::{FriendInfo, GroupInfo};
use crate::model::message::{OneBotMessage, render_message};

// =============================================================================
// OneBotBot
// =============================================================================

/// A OneBot v11 bot session.
pub struct OneBotBot {
    /// Bot ID (`self_id` of the session).
    id: String,
    caller: BoxedApiCaller,
}

impl OneBotBot {
    /// Creates a new OneBotBot.
    pub fn new(id: impl Into<String>, caller: BoxedApiCaller) -> Self {
        Self {
            id: id.into(),
            caller,
        }
    }

    /// Makes a raw API call.
    ///
    /// Accepts both the full response envelope (`status`, `retcode`, `data`)
    /// and bare data from callers that already unwrapped it. A non-zero
    /// `retcode` becomes [`ApiError::ApiError`].
    pub async fn call_api(&self, action: &str, params: Value) -> ApiResult<Value> {
        debug!(bot_id = %self.id, action = %action, "Calling OneBot API");
        let response = self.caller.call(action, params).await?;
        trace!(response = %response, "API response");

        let Some(retcode) = response.get("retcode").and_then(Value::as_i64) else {
            return Ok(response);
        };
        if retcode != 0 {
            let message = response
                .get("message")
                .or_else(|| response.get("wording"))
                .and_then(Value::as_str)
                .unwrap_or("Unknown error")
                .to_string();
            return Err(ApiError::ApiError { retcode, message });
        }

        // Return the data field if present, otherwise the whole response
        Ok(response.get("data").cloned().unwrap_or(response))
    }
}

// =========================================================================
// Message APIs
// =========================================================================

macro_rules! impl_api {
    // No return value
    ($(#[$meta:meta])* $name:ident, ($($arg:ident: $typ:ty),*) $(,)?) => {
        $(#[$meta])*
        pub async fn $name(&self, $($arg: $typ),*) -> ApiResult<()> {
            self.call_api(stringify!($name), json!({ $(stringify!($arg): $arg),* })).await?;
            Ok(())
        }
    };
    // Returns a type T deserialized from the data
    ($(#[$meta:meta])* $name:ident, ($($arg:ident: $typ:ty),*) -> $ret:ty $(,)?) => {
        $(#[$meta])*
        pub async fn $name(&self, $($arg: $typ),*) -> ApiResult<$ret> {
            let result = self.call_api(stringify!($name), json!({ $(stringify!($arg): $arg),* })).await?;
            Ok(serde_json::from_value::<$ret>(result)?)
        }
    };
    // Returns a specific field from the data
    ($(#[$meta:meta])* $name:ident, ($($arg:ident: $typ:ty),*) -> $ret:ty, $field:expr $(,)?) => {
        $(#[$meta])*
        pub async fn $name(&self, $($arg: $typ),*) -> ApiResult<$ret> {
            let result = self.call_api(stringify!($name), json!({ $(stringify!($arg): $arg),* })).await?;
            result
                .get($field)
                .cloned()
                .and_then(|v| serde_json::from_value::<$ret>(v).ok())
                .ok_or_else(|| ApiError::SerializationError(format!("Missing {}", $field)))
        }
    };
}

impl OneBotBot {
    impl_api!(
        /// Sends a private message.
        ///
        /// Returns the message ID.
        send_private_msg,
        (user_id: i64, message: OneBotMessage) -> i64,
        "message_id"
    );

    impl_api!(
        /// Sends a group message.
        ///
        /// Returns the message ID.
        send_group_msg,
        (group_id: i64, message: OneBotMessage) -> i64,
        "message_id"
    );

    impl_api!(
        /// Recalls a message.
        delete_msg,
        (message_id: i64)
    );

    impl_api!(
        /// Gets the friend list.
        get_friend_list,
        () -> Vec<FriendInfo>
    );

    impl_api!(
        /// Gets the group list.
        get_group_list,
        () -> Vec<GroupInfo>
    );
}

/// Wraps a transport failure with the target it occurred on.
fn api_error(target: &Target) -> impl FnOnce(ApiError) -> CourierError {
    move |source| CourierError::api(AdapterKind::OneBotV11, target, source)
}

// =============================================================================
// Bot Trait Implementation
// =============================================================================

#[async_trait]
impl Bot for OneBotBot {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter(&self) -> AdapterKind {
        AdapterKind::OneBotV11
    }

    fn render(&self, message: &Message) -> CourierResult<Rendered> {
        Ok(Rendered::new(AdapterKind::OneBotV11, render_message(message)?))
    }

    async fn send_rendered(
        &self,
        rendered: Rendered,
        destination: Destination<'_>,
    ) -> CourierResult<SentMessage> {
        let message: OneBotMessage = rendered.downcast()?;
        let target = destination.target;

        let message_id = match target {
            Target::QqGroup { group_id } => self.send_group_msg(*group_id, message).await,
            Target::QqPrivate { user_id } => self.send_private_msg(*user_id, message).await,
            other => {
                return Err(CourierError::TargetMismatch {
                    target: other.clone(),
                    adapter: AdapterKind::OneBotV11,
                });
            }
        }
        .map_err(api_error(target))?;

        Ok(SentMessage::new(message_id.to_string()))
    }

    async fn delete(&self, target: &Target, sent: &SentMessage) -> CourierResult<()> {
        let message_id = sent.message_id.parse().map_err(|_| {
            CourierError::api(
                AdapterKind::OneBotV11,
                target,
                ApiError::SerializationError(format!(
                    "message id '{}' is not numeric",
                    sent.message_id
                )),
            )
        })?;
        self.delete_msg(message_id).await.map_err(api_error(target))
    }

    async fn list_targets(&self) -> CourierResult<Vec<Target>> {
        let topology_error =
            |source| CourierError::topology(AdapterKind::OneBotV11, &self.id, source);

        let groups = self.get_group_list().await.map_err(topology_error)?;
        let friends = self.get_friend_list().await.map_err(topology_error)?;

        Ok(groups
            .into_iter()
            .map(|group| Target::QqGroup {
                group_id: group.group_id,
            })
            .chain(friends.into_iter().map(|friend| Target::QqPrivate {
                user_id: friend.user_id,
            }))
            .collect())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::event::{GroupMessageEvent, MessageEvent, PrivateMessageEvent};
    use courier_core::testing::ScriptedCaller;
    use courier_core::{
        BotPool, BotRegistry, BoxedBot, Courier, IdentifierCache, MessageSegment, SendOptions,
    };

    fn setup(bot_id: &str) -> (Arc<ScriptedCaller>, BoxedBot, Courier) {
        let caller = ScriptedCaller::new();
        let bot: BoxedBot = Arc::new(OneBotBot::new(bot_id, caller.clone()));
        let pool = Arc::new(BotPool::new());
        pool.add(bot.clone());
        let courier = Courier::new(
            Arc::new(BotRegistry::new(pool)),
            Arc::new(IdentifierCache::new()),
        );
        (caller, bot, courier)
    }

    fn ok(data: Value) -> Value {
        json!({ "status": "ok", "retcode": 0, "data": data })
    }

    fn message_event(message_id: &str, user_id: i64) -> MessageEvent {
        MessageEvent {
            message_id: message_id.into(),
            user_id,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_reply_to_group_then_revoke() {
        let (caller, bot, courier) = setup("10000");
        let event = GroupMessageEvent {
            parent: message_event("42", 10001),
            group_id: 123456,
            ..Default::default()
        };

        caller
            .should_call(
                "send_group_msg",
                json!({
                    "group_id": 123456,
                    "message": [
                        { "type": "reply", "data": { "id": "42" } },
                        { "type": "text", "data": { "text": "pong" } },
                    ],
                }),
                ok(json!({ "message_id": 99 })),
            )
            .should_call("delete_msg", json!({ "message_id": 99 }), ok(json!(null)));

        let receipt = courier
            .send("pong", &event, &bot, SendOptions::new().reply(true))
            .await
            .unwrap();
        assert_eq!(receipt.message_id(), "99");
        receipt.revoke().await.unwrap();

        caller.assert_done();
    }

    #[tokio::test]
    async fn test_private_with_at_sender() {
        let (caller, bot, courier) = setup("10000");
        let event = PrivateMessageEvent {
            parent: message_event("7", 10001),
            sub_type: "friend".into(),
        };

        caller.should_call(
            "send_private_msg",
            json!({
                "user_id": 10001,
                "message": [
                    { "type": "at", "data": { "qq": "10001" } },
                    { "type": "text", "data": { "text": "hi" } },
                ],
            }),
            json!({ "message_id": 8 }),
        );

        let receipt = courier
            .send("hi", &event, &bot, SendOptions::new().at_sender(true))
            .await
            .unwrap();
        assert_eq!(receipt.message_id(), "8");
        caller.assert_done();
    }

    #[tokio::test]
    async fn test_retcode_error_names_target() {
        let (caller, bot, courier) = setup("10000");
        caller.should_call_any(
            "send_group_msg",
            json!({ "status": "failed", "retcode": 100, "wording": "not in group" }),
        );

        let target = Target::QqGroup { group_id: 1 };
        let err = courier.send_to("hi", &target, Some(&bot)).await.unwrap_err();
        match err {
            CourierError::Api {
                adapter,
                target: failed,
                source: ApiError::ApiError { retcode, message },
            } => {
                assert_eq!(adapter, AdapterKind::OneBotV11);
                assert_eq!(failed, target);
                assert_eq!(retcode, 100);
                assert_eq!(message, "not in group");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_topology_feeds_registry() {
        let (caller, bot, courier) = setup("10000");
        caller
            .should_call(
                "get_group_list",
                json!({}),
                ok(json!([{ "group_id": 1, "group_name": "a" }, { "group_id": 2 }])),
            )
            .should_call(
                "get_friend_list",
                json!({}),
                ok(json!([{ "user_id": 10001, "nickname": "alice" }])),
            )
            .should_call(
                "send_private_msg",
                json!({
                    "user_id": 10001,
                    "message": [{ "type": "at", "data": { "qq": "all" } }],
                }),
                ok(json!({ "message_id": 5 })),
            );

        let summary = courier.registry().refresh_bots().await;
        assert_eq!(summary.targets, 3);

        let selected = courier
            .registry()
            .get_bot(&Target::QqGroup { group_id: 2 })
            .unwrap();
        assert!(Arc::ptr_eq(&selected, &bot));

        courier
            .send_to(
                MessageSegment::MentionAll,
                &Target::QqPrivate { user_id: 10001 },
                None,
            )
            .await
            .unwrap();
        caller.assert_done();
    }

    #[tokio::test]
    async fn test_guild_target_is_rejected_before_sending() {
        let (caller, bot, courier) = setup("10000");
        let err = courier
            .send_to("hi", &Target::QqGuildChannel { channel_id: 1 }, Some(&bot))
            .await
            .unwrap_err();
        assert!(matches!(err, CourierError::TargetMismatch { .. }));
        assert_eq!(caller.call_count(), 0);
    }

    #[tokio::test]
    async fn test_revoke_rejects_non_numeric_id() {
        let caller = ScriptedCaller::new();
        let bot = OneBotBot::new("10000", caller.clone());
        let err = bot
            .delete(&Target::QqGroup { group_id: 1 }, &SentMessage::new("abc"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CourierError::Api {
                source: ApiError::SerializationError(_),
                ..
            }
        ));
        assert_eq!(caller.call_count(), 0);
    }
}
