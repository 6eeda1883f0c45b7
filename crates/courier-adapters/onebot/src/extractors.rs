//! Target extractors for OneBot v11 events.
//!
//! - [`GroupMessageEvent`] → `QqGroup { group_id }`
//! - [`PrivateMessageEvent`] → `QqPrivate { user_id }`

use std::any::TypeId;

use courier_core::linkme::distributed_slice;
use courier_core::{Bot, CourierResult, Event, ExtractorEntry, TARGET_EXTRACTORS, Target, event_as};

use crate::model::event::{GroupMessageEvent, PrivateMessageEvent};

fn extract_group(event: &dyn Event, _bot: Option<&dyn Bot>) -> CourierResult<Target> {
    Ok(Target::QqGroup {
        group_id: event_as::<GroupMessageEvent>(event)?.group_id,
    })
}

fn extract_private(event: &dyn Event, _bot: Option<&dyn Bot>) -> CourierResult<Target> {
    Ok(Target::QqPrivate {
        user_id: event_as::<PrivateMessageEvent>(event)?.user_id,
    })
}

#[distributed_slice(TARGET_EXTRACTORS)]
#[linkme(crate = courier_core::linkme)]
static GROUP_MESSAGE: ExtractorEntry =
    ExtractorEntry::new(TypeId::of::<GroupMessageEvent>, extract_group);

#[distributed_slice(TARGET_EXTRACTORS)]
#[linkme(crate = courier_core::linkme)]
static PRIVATE_MESSAGE: ExtractorEntry =
    ExtractorEntry::new(TypeId::of::<PrivateMessageEvent>, extract_private);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::event::MessageEvent;
    use courier_core::extract_target;

    fn parent(user_id: i64) -> MessageEvent {
        MessageEvent {
            message_id: "1".into(),
            user_id,
            ..Default::default()
        }
    }

    #[test]
    fn test_group_message() {
        let event = GroupMessageEvent {
            parent: parent(10001),
            group_id: 123456,
            ..Default::default()
        };
        assert_eq!(
            extract_target(&event, None).unwrap(),
            Target::QqGroup { group_id: 123456 }
        );
    }

    #[test]
    fn test_private_message() {
        let event = PrivateMessageEvent {
            parent: parent(10001),
            ..Default::default()
        };
        assert_eq!(
            extract_target(&event, None).unwrap(),
            Target::QqPrivate { user_id: 10001 }
        );
    }
}
