//! QQ open platform Bot implementation.
//!
//! `QqBot` wraps a host-supplied [`ApiCaller`](courier_core::ApiCaller) and exposes strongly-typed
//! methods for the platform APIs Courier uses, plus the [`Bot`] capabilities
//! built on top of them.
//!
//! # Usage
//!
//! ```rust,ignore
//! use courier_adapter_qq::QqBot;
//! use courier_core::downcast_bot;
//!
//! if let Some(qq) = downcast_bot::<QqBot>(bot.clone()) {
//!     for guild in qq.guilds().await? {
//!         println!("{}", guild.name);
//!     }
//! }
//! ```

use std::any::Any;
use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use courier_core::{
    AdapterKind, ApiError, ApiResult, Bot, BoxedApiCaller, CourierError, CourierResult,
    Destination, Message, Rendered, SentMessage, Target,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::model::api::{
    Channel, Dms, FileUpload, FileUploadBody, Guild, GuildMessageBody, Media, MessageReference,
    MessageResponse, OpenIdMessageBody, OpenIdMessageResponse, file_type, msg_type,
};
use crate::model::message::{QqImage, QqMessage, render_message};

// =============================================================================
// QqBot
// =============================================================================

/// A QQ open platform bot session.
pub struct QqBot {
    /// The bot's app id.
    id: String,
    caller: BoxedApiCaller,
}

impl QqBot {
    /// Creates a new QqBot.
    pub fn new(id: impl Into<String>, caller: BoxedApiCaller) -> Self {
        Self {
            id: id.into(),
            caller,
        }
    }

    /// Makes a raw API call.
    pub async fn call_api(&self, action: &str, params: Value) -> ApiResult<Value> {
        self.caller.call(action, params).await
    }

    /// Calls `action` with `body` plus one addressing field.
    async fn call_with<B, R>(&self, action: &str, key: &str, id: &str, body: &B) -> ApiResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let mut params = serde_json::to_value(body)?;
        params[key] = json!(id);
        let result = self.call_api(action, params).await?;
        Ok(serde_json::from_value(result)?)
    }
}

// =========================================================================
// Platform APIs
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
    // Returns a type T deserialized from the response
    ($(#[$meta:meta])* $name:ident, ($($arg:ident: $typ:ty),*) -> $ret:ty $(,)?) => {
        $(#[$meta])*
        pub async fn $name(&self, $($arg: $typ),*) -> ApiResult<$ret> {
            let result = self.call_api(stringify!($name), json!({ $(stringify!($arg): $arg),* })).await?;
            Ok(serde_json::from_value::<$ret>(result)?)
        }
    };
}

impl QqBot {
    impl_api!(
        /// Lists the guilds the bot has joined.
        guilds,
        () -> Vec<Guild>
    );

    impl_api!(
        /// Lists the channels of a guild.
        get_channels,
        (guild_id: &str) -> Vec<Channel>
    );

    impl_api!(
        /// Opens a direct-message session with a guild member.
        ///
        /// # Arguments
        /// * `recipient_id` - The member's user id
        /// * `source_guild_id` - The guild the member was found in
        post_dms,
        (recipient_id: &str, source_guild_id: &str) -> Dms
    );

    impl_api!(
        /// Recalls a guild channel message.
        delete_message,
        (channel_id: &str, message_id: &str, hidetip: bool)
    );

    impl_api!(
        /// Recalls a guild direct message.
        delete_dms_message,
        (guild_id: &str, message_id: &str, hidetip: bool)
    );

    impl_api!(
        /// Recalls an open-id group message.
        delete_group_message,
        (group_openid: &str, message_id: &str)
    );

    impl_api!(
        /// Recalls an open-id private message.
        delete_c2c_message,
        (openid: &str, message_id: &str)
    );

    /// Posts a message to a guild channel.
    pub async fn post_messages(&self, channel_id: &str, body: &GuildMessageBody) -> ApiResult<MessageResponse> {
        self.call_with("post_messages", "channel_id", channel_id, body)
            .await
    }

    /// Posts a message to a direct-message session.
    pub async fn post_dms_messages(&self, guild_id: &str, body: &GuildMessageBody) -> ApiResult<MessageResponse> {
        self.call_with("post_dms_messages", "guild_id", guild_id, body)
            .await
    }

    /// Posts a message to an open-id group.
    pub async fn post_group_messages(
        &self,
        group_openid: &str,
        body: &OpenIdMessageBody,
    ) -> ApiResult<OpenIdMessageResponse> {
        self.call_with("post_group_messages", "group_openid", group_openid, body)
            .await
    }

    /// Posts a message to an open-id private chat.
    pub async fn post_c2c_messages(&self, openid: &str, body: &OpenIdMessageBody) -> ApiResult<OpenIdMessageResponse> {
        self.call_with("post_c2c_messages", "openid", openid, body)
            .await
    }

    /// Uploads rich media for an open-id group.
    pub async fn post_group_files(&self, group_openid: &str, body: &FileUploadBody) -> ApiResult<FileUpload> {
        self.call_with("post_group_files", "group_openid", group_openid, body)
            .await
    }

    /// Uploads rich media for an open-id private chat.
    pub async fn post_c2c_files(&self, openid: &str, body: &FileUploadBody) -> ApiResult<FileUpload> {
        self.call_with("post_c2c_files", "openid", openid, body)
            .await
    }
}

// =============================================================================
// Sending helpers
// =============================================================================

/// Open-id chat kinds, which share one message shape.
#[derive(Clone, Copy)]
enum OpenIdScope<'a> {
    Group(&'a str),
    Private(&'a str),
}

/// An image as it goes on the wire.
enum ImagePayload {
    Url(String),
    /// Base64 of the image bytes.
    Inline(String),
}

/// Prepares an image for sending, reading local files now.
async fn image_payload(image: &QqImage) -> CourierResult<ImagePayload> {
    let data = match image {
        QqImage::Url(url) => return Ok(ImagePayload::Url(url.clone())),
        QqImage::Bytes(data) => Cow::Borrowed(data.as_slice()),
        QqImage::File(path) => Cow::Owned(tokio::fs::read(path).await.map_err(|err| {
            CourierError::Io {
                path: path.display().to_string(),
                reason: err.to_string(),
            }
        })?),
    };
    Ok(ImagePayload::Inline(STANDARD.encode(data)))
}

/// Wraps a transport failure with the target it occurred on.
fn api_error(target: &Target) -> impl FnOnce(ApiError) -> CourierError {
    move |source| CourierError::api(AdapterKind::Qq, target, source)
}

impl QqBot {
    async fn guild_body(&self, message: QqMessage, msg_id: Option<String>) -> CourierResult<GuildMessageBody> {
        let mut body = GuildMessageBody {
            content: message.content(),
            message_reference: message.reference.map(|message_id| MessageReference { message_id }),
            msg_id,
            ..Default::default()
        };
        if let Some(image) = &message.image {
            match image_payload(image).await? {
                ImagePayload::Url(url) => body.image = Some(url),
                ImagePayload::Inline(data) => body.file_image = Some(data),
            }
        }
        Ok(body)
    }

    async fn upload(&self, scope: OpenIdScope<'_>, image: &QqImage, target: &Target) -> CourierResult<Media> {
        let mut body = FileUploadBody {
            file_type: file_type::IMAGE,
            srv_send_msg: false,
            ..Default::default()
        };
        match image_payload(image).await? {
            ImagePayload::Url(url) => body.url = Some(url),
            ImagePayload::Inline(data) => body.file_data = Some(data),
        }

        let uploaded = match scope {
            OpenIdScope::Group(group_openid) => self.post_group_files(group_openid, &body).await,
            OpenIdScope::Private(openid) => self.post_c2c_files(openid, &body).await,
        }
        .map_err(api_error(target))?;

        Ok(Media {
            file_info: uploaded.file_info,
        })
    }

    async fn send_open_id(
        &self,
        scope: OpenIdScope<'_>,
        message: QqMessage,
        msg_id: Option<String>,
        target: &Target,
    ) -> CourierResult<SentMessage> {
        let media = match &message.image {
            Some(image) => Some(self.upload(scope, image, target).await?),
            None => None,
        };
        let body = OpenIdMessageBody {
            msg_type: if media.is_some() {
                msg_type::MEDIA
            } else {
                msg_type::TEXT
            },
            content: message.content(),
            media,
            message_reference: message.reference.map(|message_id| MessageReference { message_id }),
            msg_id,
            event_id: None,
        };

        let response = match scope {
            OpenIdScope::Group(group_openid) => self.post_group_messages(group_openid, &body).await,
            OpenIdScope::Private(openid) => self.post_c2c_messages(openid, &body).await,
        }
        .map_err(api_error(target))?;

        Ok(SentMessage::new(response.id))
    }
}

// =============================================================================
// Bot Trait Implementation
// =============================================================================

#[async_trait]
impl Bot for QqBot {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter(&self) -> AdapterKind {
        AdapterKind::Qq
    }

    fn render(&self, message: &Message) -> CourierResult<Rendered> {
        Ok(Rendered::new(AdapterKind::Qq, render_message(message)?))
    }

    async fn send_rendered(
        &self,
        rendered: Rendered,
        destination: Destination<'_>,
    ) -> CourierResult<SentMessage> {
        let message: QqMessage = rendered.downcast()?;
        let target = destination.target;
        let msg_id = destination.in_reply_to.map(str::to_string);

        match target {
            Target::QqGuildChannel { channel_id } => {
                let channel_id = channel_id.to_string();
                let body = self.guild_body(message, msg_id).await?;
                let response = self
                    .post_messages(&channel_id, &body)
                    .await
                    .map_err(api_error(target))?;
                Ok(SentMessage {
                    message_id: response.id,
                    channel_id: response.channel_id.or(Some(channel_id)),
                    guild_id: response.guild_id,
                })
            }
            Target::QqGuildDirect {
                recipient_id,
                source_guild_id,
            } => {
                let guild_id = match destination.direct_channel {
                    Some(guild_id) => guild_id.to_string(),
                    None => {
                        self.resolve_direct_channel(*recipient_id, *source_guild_id)
                            .await?
                    }
                };
                let body = self.guild_body(message, msg_id).await?;
                let response = self
                    .post_dms_messages(&guild_id, &body)
                    .await
                    .map_err(api_error(target))?;
                Ok(SentMessage {
                    message_id: response.id,
                    channel_id: response.channel_id,
                    guild_id: Some(guild_id),
                })
            }
            Target::QqGroupOpenId { group_openid, .. } => {
                self.send_open_id(OpenIdScope::Group(group_openid), message, msg_id, target)
                    .await
            }
            Target::QqPrivateOpenId { user_openid, .. } => {
                self.send_open_id(OpenIdScope::Private(user_openid), message, msg_id, target)
                    .await
            }
            other => Err(CourierError::TargetMismatch {
                target: other.clone(),
                adapter: AdapterKind::Qq,
            }),
        }
    }

    async fn delete(&self, target: &Target, sent: &SentMessage) -> CourierResult<()> {
        let message_id = sent.message_id.as_str();
        let result = match target {
            Target::QqGuildChannel { channel_id } => {
                self.delete_message(&channel_id.to_string(), message_id, false)
                    .await
            }
            Target::QqGuildDirect { .. } => {
                let guild_id = sent.guild_id.as_deref().ok_or_else(|| {
                    CourierError::api(
                        AdapterKind::Qq,
                        target,
                        ApiError::Other("direct message guild id is unknown".into()),
                    )
                })?;
                self.delete_dms_message(guild_id, message_id, false).await
            }
            Target::QqGroupOpenId { group_openid, .. } => {
                self.delete_group_message(group_openid, message_id).await
            }
            Target::QqPrivateOpenId { user_openid, .. } => {
                self.delete_c2c_message(user_openid, message_id).await
            }
            other => {
                return Err(CourierError::TargetMismatch {
                    target: other.clone(),
                    adapter: AdapterKind::Qq,
                });
            }
        };
        result.map_err(api_error(target))
    }

    async fn list_targets(&self) -> CourierResult<Vec<Target>> {
        let topology_error = |source| CourierError::topology(AdapterKind::Qq, &self.id, source);

        let mut targets = Vec::new();
        for guild in self.guilds().await.map_err(topology_error)? {
            let channels = self.get_channels(&guild.id).await.map_err(topology_error)?;
            for channel in channels {
                match channel.id.parse() {
                    Ok(channel_id) => targets.push(Target::QqGuildChannel { channel_id }),
                    Err(_) => warn!(
                        bot_id = %self.id,
                        guild_id = %guild.id,
                        channel_id = %channel.id,
                        "Skipping channel with non-numeric id"
                    ),
                }
            }
        }
        Ok(targets)
    }

    async fn resolve_direct_channel(
        &self,
        recipient_id: u64,
        source_guild_id: u64,
    ) -> CourierResult<String> {
        let dms = self
            .post_dms(&recipient_id.to_string(), &source_guild_id.to_string())
            .await
            .map_err(|source| {
                CourierError::api(
                    AdapterKind::Qq,
                    &Target::QqGuildDirect {
                        recipient_id,
                        source_guild_id,
                    },
                    source,
                )
            })?;
        debug!(
            bot_id = %self.id,
            recipient_id,
            source_guild_id,
            guild_id = %dms.guild_id,
            "Opened direct message session"
        );
        Ok(dms.guild_id)
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use crate::model::event::{DirectMessageCreateEvent, GuildMessage, MessageCreateEvent, User};
    use courier_core::testing::ScriptedCaller;
    use courier_core::{
        BotPool, BotRegistry, BoxedBot, Courier, IdentifierCache, MessageSegment, SendOptions,
    };
    use serde_json::json;

    fn setup(bot_id: &str) -> (Arc<ScriptedCaller>, BoxedBot, Courier) {
        let caller = ScriptedCaller::new();
        let bot: BoxedBot = Arc::new(QqBot::new(bot_id, caller.clone()));
        let pool = Arc::new(BotPool::new());
        pool.add(bot.clone());
        let courier = Courier::new(
            Arc::new(BotRegistry::new(pool)),
            Arc::new(IdentifierCache::new()),
        );
        (caller, bot, courier)
    }

    fn guild_message(id: &str, channel_id: &str) -> GuildMessage {
        GuildMessage {
            id: id.into(),
            channel_id: channel_id.into(),
            guild_id: "5566".into(),
            author: User {
                id: "1".into(),
                ..Default::default()
            },
            content: Some("321".into()),
            ..Default::default()
        }
    }

    fn mock_message(id: &str, channel_id: &str) -> Value {
        json!({
            "id": id,
            "channel_id": channel_id,
            "guild_id": "1",
            "author": { "id": "1" },
        })
    }

    #[tokio::test]
    async fn test_send_to_event_then_revoke() {
        let (caller, bot, courier) = setup("3344");
        let event = MessageCreateEvent(guild_message("1", "6677"));

        caller
            .should_call(
                "post_messages",
                json!({ "channel_id": "6677", "msg_id": "1", "event_id": null, "content": "123" }),
                mock_message("1234871", "6677"),
            )
            .should_call(
                "delete_message",
                json!({ "channel_id": "6677", "message_id": "1234871", "hidetip": false }),
                json!(null),
            );

        let receipt = courier
            .send("123", &event, &bot, SendOptions::default())
            .await
            .unwrap();
        assert_eq!(receipt.message_id(), "1234871");
        receipt.revoke().await.unwrap();

        caller.assert_done();
    }

    #[tokio::test]
    async fn test_send_to_direct_event() {
        let (caller, bot, courier) = setup("3344");
        let event = DirectMessageCreateEvent(guild_message("2", "6677"));

        caller.should_call(
            "post_dms_messages",
            json!({ "guild_id": "5566", "msg_id": "2", "event_id": null, "content": "123" }),
            mock_message("1234871", "6677"),
        );

        let receipt = courier
            .send("123", &event, &bot, SendOptions::default())
            .await
            .unwrap();
        assert_eq!(receipt.sent().guild_id.as_deref(), Some("5566"));
        assert_eq!(courier.cache().get((1, 5566)).as_deref(), Some("5566"));
        caller.assert_done();
    }

    #[tokio::test]
    async fn test_send_active_channel_and_cached_direct() {
        let (caller, bot, courier) = setup("3344");

        caller.should_call(
            "post_messages",
            json!({ "channel_id": "2233", "msg_id": null, "event_id": null, "content": "123" }),
            mock_message("1234871", "2233"),
        );
        courier
            .send_to("123", &Target::QqGuildChannel { channel_id: 2233 }, Some(&bot))
            .await
            .unwrap();

        let target = Target::QqGuildDirect {
            recipient_id: 1111,
            source_guild_id: 2222,
        };
        caller
            .should_call(
                "post_dms",
                json!({ "recipient_id": "1111", "source_guild_id": "2222" }),
                json!({ "guild_id": "3333" }),
            )
            .should_call(
                "post_dms_messages",
                json!({ "guild_id": "3333", "msg_id": null, "event_id": null, "content": "123" }),
                mock_message("1234871", "12479234"),
            );
        courier.send_to("123", &target, Some(&bot)).await.unwrap();

        // Second send reuses the cached guild id.
        caller.should_call(
            "post_dms_messages",
            json!({ "guild_id": "3333", "msg_id": null, "event_id": null, "content": "1234" }),
            mock_message("1234871", "12355131"),
        );
        courier.send_to("1234", &target, Some(&bot)).await.unwrap();

        caller.assert_done();
        assert_eq!(caller.count_of("post_dms"), 1);
    }

    #[tokio::test]
    async fn test_list_targets_and_get_bot() {
        let (caller, bot, courier) = setup("3344");

        caller
            .should_call("guilds", json!({}), json!([{ "id": "1", "name": "test1" }]))
            .should_call(
                "get_channels",
                json!({ "guild_id": "1" }),
                json!([{ "id": "2233", "guild_id": "0", "name": "test1", "type": 0 }]),
            );
        courier.registry().refresh_bots().await;
        caller.assert_done();

        let selected = courier
            .registry()
            .get_bot(&Target::QqGuildChannel { channel_id: 2233 })
            .unwrap();
        assert!(Arc::ptr_eq(&selected, &bot));
    }

    #[tokio::test]
    async fn test_topology_failure_is_tolerated() {
        let (caller, _bot, courier) = setup("3344");
        caller.should_fail("guilds", json!({}), ApiError::Timeout);

        let summary = courier.registry().refresh_bots().await;
        assert_eq!(summary.failed, 1);
        assert!(courier.registry().is_ready());
    }

    #[tokio::test]
    async fn test_send_images_to_channel() {
        let (caller, bot, courier) = setup("3344");
        let target = Target::QqGuildChannel { channel_id: 2233 };

        caller.should_call(
            "post_messages",
            json!({
                "channel_id": "2233",
                "msg_id": null,
                "event_id": null,
                "image": "https://picsum.photos/200",
            }),
            mock_message("1", "2233"),
        );
        courier
            .send_to(MessageSegment::image_url("https://picsum.photos/200"), &target, Some(&bot))
            .await
            .unwrap();

        let data = b"\x89PNG\r".to_vec();
        let path = std::env::temp_dir().join(format!("courier-qq-{}.png", std::process::id()));
        tokio::fs::write(&path, &data).await.unwrap();

        for image in [MessageSegment::image_bytes(data.clone()), MessageSegment::image_file(&path)] {
            caller.should_call(
                "post_messages",
                json!({
                    "channel_id": "2233",
                    "msg_id": null,
                    "event_id": null,
                    "file_image": STANDARD.encode(&data),
                }),
                mock_message("2", "2233"),
            );
            courier.send_to(image, &target, Some(&bot)).await.unwrap();
        }

        let _ = tokio::fs::remove_file(&path).await;
        caller.assert_done();
    }

    #[tokio::test]
    async fn test_missing_local_file_is_io_error() {
        let (caller, bot, courier) = setup("3344");
        let err = courier
            .send_to(
                MessageSegment::image_file("/nonexistent/courier/image.png"),
                &Target::QqGuildChannel { channel_id: 2233 },
                Some(&bot),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CourierError::Io { .. }));
        assert_eq!(caller.call_count(), 0);
    }

    #[tokio::test]
    async fn test_image_payload_keeps_urls_by_reference() {
        let url = image_payload(&QqImage::Url("https://picsum.photos/200".into())).await.unwrap();
        assert!(matches!(url, ImagePayload::Url(url) if url == "https://picsum.photos/200"));

        let inline = image_payload(&QqImage::Bytes(b"PNG".to_vec())).await.unwrap();
        assert!(matches!(inline, ImagePayload::Inline(data) if data == "UE5H"));
    }

    #[tokio::test]
    async fn test_mention_and_reply_on_channel() {
        let (caller, bot, courier) = setup("3344");
        let message = Message::from(MessageSegment::reply("99"))
            + MessageSegment::mention("314159")
            + " hi";

        caller.should_call(
            "post_messages",
            json!({
                "channel_id": "2233",
                "msg_id": null,
                "event_id": null,
                "content": "<@314159> hi",
                "message_reference": { "message_id": "99" },
            }),
            mock_message("1", "2233"),
        );
        courier
            .send_to(message, &Target::QqGuildChannel { channel_id: 2233 }, Some(&bot))
            .await
            .unwrap();
        caller.assert_done();
    }

    #[tokio::test]
    async fn test_open_id_group_with_image() {
        let (caller, _bot, courier) = setup("test");
        let target = Target::QqGroupOpenId {
            group_openid: "1122".into(),
            bot_id: "test".into(),
        };

        caller
            .should_call("guilds", json!({}), json!([]))
            .should_call(
                "post_group_files",
                json!({
                    "group_openid": "1122",
                    "file_type": 1,
                    "url": "https://picsum.photos/200",
                    "srv_send_msg": false,
                }),
                json!({ "file_uuid": "u", "file_info": "INFO", "ttl": 0 }),
            )
            .should_call(
                "post_group_messages",
                json!({
                    "group_openid": "1122",
                    "msg_type": 7,
                    "content": "look",
                    "media": { "file_info": "INFO" },
                    "msg_id": null,
                    "event_id": null,
                }),
                json!({ "id": "g-1", "timestamp": "0" }),
            )
            .should_call(
                "delete_group_message",
                json!({ "group_openid": "1122", "message_id": "g-1" }),
                json!(null),
            );

        courier.registry().refresh_bots().await;
        let message = Message::from("look") + MessageSegment::image_url("https://picsum.photos/200");
        let receipt = courier.send_to(message, &target, None).await.unwrap();
        receipt.revoke().await.unwrap();
        caller.assert_done();
    }

    #[tokio::test]
    async fn test_c2c_text() {
        let (caller, bot, courier) = setup("test");
        let target = Target::QqPrivateOpenId {
            user_openid: "3344".into(),
            bot_id: "test".into(),
        };

        caller.should_call(
            "post_c2c_messages",
            json!({
                "openid": "3344",
                "msg_type": 0,
                "content": "hello",
                "msg_id": null,
                "event_id": null,
            }),
            json!({ "id": "c-1" }),
        );
        let receipt = courier.send_to("hello", &target, Some(&bot)).await.unwrap();
        assert_eq!(receipt.message_id(), "c-1");
        caller.assert_done();
    }
}
