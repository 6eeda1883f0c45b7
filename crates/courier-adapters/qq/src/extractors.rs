//! Target extractors for QQ events.
//!
//! | Event | Target |
//! |-------|--------|
//! | [`MessageCreateEvent`], [`AtMessageCreateEvent`] | `QqGuildChannel { channel_id }` |
//! | [`DirectMessageCreateEvent`] | `QqGuildDirect { recipient_id: author.id, source_guild_id: guild_id }` |
//! | [`GroupAtMessageCreateEvent`] | `QqGroupOpenId { group_openid, bot_id }` |
//! | [`C2CMessageCreateEvent`] | `QqPrivateOpenId { user_openid, bot_id }` |
//!
//! The open-id targets are scoped to the receiving bot and need it supplied.

use std::any::TypeId;

use courier_core::linkme::distributed_slice;
use courier_core::{
    Bot, CourierError, CourierResult, Event, ExtractorEntry, TARGET_EXTRACTORS, Target, event_as,
    require_bot,
};

use crate::model::event::{
    AtMessageCreateEvent, C2CMessageCreateEvent, DirectMessageCreateEvent, GroupAtMessageCreateEvent,
    GuildMessage, MessageCreateEvent,
};

/// Parses a numeric guild-side identifier.
fn numeric_id(event: &dyn Event, value: &str) -> CourierResult<u64> {
    value.parse().map_err(|_| CourierError::UnresolvedTarget {
        event: event.event_name(),
    })
}

fn guild_channel(event: &dyn Event, message: &GuildMessage) -> CourierResult<Target> {
    Ok(Target::QqGuildChannel {
        channel_id: numeric_id(event, &message.channel_id)?,
    })
}

fn extract_message_create(event: &dyn Event, _bot: Option<&dyn Bot>) -> CourierResult<Target> {
    guild_channel(event, event_as::<MessageCreateEvent>(event)?)
}

fn extract_at_message_create(event: &dyn Event, _bot: Option<&dyn Bot>) -> CourierResult<Target> {
    guild_channel(event, event_as::<AtMessageCreateEvent>(event)?)
}

fn extract_direct_message_create(event: &dyn Event, _bot: Option<&dyn Bot>) -> CourierResult<Target> {
    let message = event_as::<DirectMessageCreateEvent>(event)?;
    Ok(Target::QqGuildDirect {
        recipient_id: numeric_id(event, &message.author.id)?,
        source_guild_id: numeric_id(event, &message.guild_id)?,
    })
}

fn extract_group_at_message_create(event: &dyn Event, bot: Option<&dyn Bot>) -> CourierResult<Target> {
    let message = event_as::<GroupAtMessageCreateEvent>(event)?;
    Ok(Target::QqGroupOpenId {
        group_openid: message.group_openid.clone(),
        bot_id: require_bot(event, bot)?.to_string(),
    })
}

fn extract_c2c_message_create(event: &dyn Event, bot: Option<&dyn Bot>) -> CourierResult<Target> {
    let message = event_as::<C2CMessageCreateEvent>(event)?;
    Ok(Target::QqPrivateOpenId {
        user_openid: message.author.user_openid.clone(),
        bot_id: require_bot(event, bot)?.to_string(),
    })
}

#[distributed_slice(TARGET_EXTRACTORS)]
#[linkme(crate = courier_core::linkme)]
static MESSAGE_CREATE: ExtractorEntry =
    ExtractorEntry::new(TypeId::of::<MessageCreateEvent>, extract_message_create);

#[distributed_slice(TARGET_EXTRACTORS)]
#[linkme(crate = courier_core::linkme)]
static AT_MESSAGE_CREATE: ExtractorEntry =
    ExtractorEntry::new(TypeId::of::<AtMessageCreateEvent>, extract_at_message_create);

#[distributed_slice(TARGET_EXTRACTORS)]
#[linkme(crate = courier_core::linkme)]
static DIRECT_MESSAGE_CREATE: ExtractorEntry =
    ExtractorEntry::new(TypeId::of::<DirectMessageCreateEvent>, extract_direct_message_create);

#[distributed_slice(TARGET_EXTRACTORS)]
#[linkme(crate = courier_core::linkme)]
static GROUP_AT_MESSAGE_CREATE: ExtractorEntry =
    ExtractorEntry::new(TypeId::of::<GroupAtMessageCreateEvent>, extract_group_at_message_create);

#[distributed_slice(TARGET_EXTRACTORS)]
#[linkme(crate = courier_core::linkme)]
static C2C_MESSAGE_CREATE: ExtractorEntry =
    ExtractorEntry::new(TypeId::of::<C2CMessageCreateEvent>, extract_c2c_message_create);
