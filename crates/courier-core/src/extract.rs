//! Event → [`Target`] extraction.
//!
//! Extraction dispatches on the event's concrete type. Each adapter
//! contributes one [`ExtractorEntry`] per event kind it understands through
//! the [`TARGET_EXTRACTORS`] distributed slice:
//!
//! ```rust,ignore
//! use courier_core::linkme::distributed_slice;
//! use courier_core::{ExtractorEntry, TARGET_EXTRACTORS};
//!
//! #[distributed_slice(TARGET_EXTRACTORS)]
//! #[linkme(crate = courier_core::linkme)]
//! static GUILD_MESSAGE: ExtractorEntry =
//!     ExtractorEntry::new(TypeId::of::<MessageCreateEvent>, extract_guild_message);
//! ```
//!
//! Extractors are pure functions of `(event, bot)`: they read identifiers off
//! the event and, for bot-scoped targets, the receiving bot's id. They never
//! call the network and never invent identifiers the event lacks.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::LazyLock;

use linkme::distributed_slice;
use tracing::warn;

use crate::bot::Bot;
use crate::error::{CourierError, CourierResult};
use crate::event::Event;
use crate::target::Target;

/// Maps one event kind to a target.
pub type ExtractFn = fn(&dyn Event, Option<&dyn Bot>) -> CourierResult<Target>;

/// A registered `(event kind → target)` mapping.
pub struct ExtractorEntry {
    /// Returns the `TypeId` of the event kind handled by `extract`.
    pub event_type: fn() -> TypeId,
    /// The extraction function.
    pub extract: ExtractFn,
}

impl ExtractorEntry {
    /// Creates a new entry.
    pub const fn new(event_type: fn() -> TypeId, extract: ExtractFn) -> Self {
        Self {
            event_type,
            extract,
        }
    }
}

/// Registry of extractors contributed by adapter crates.
#[distributed_slice]
pub static TARGET_EXTRACTORS: [ExtractorEntry];

/// A lookup table from event kind to extractor.
#[derive(Default, Clone)]
pub struct TargetExtractors {
    extractors: HashMap<TypeId, ExtractFn>,
}

impl TargetExtractors {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from every entry linked into [`TARGET_EXTRACTORS`].
    ///
    /// If two entries claim the same event kind a warning is emitted and the
    /// **first** one wins.
    pub fn collect_all() -> Self {
        let mut table = Self::new();
        for entry in TARGET_EXTRACTORS {
            let event_type = (entry.event_type)();
            if table.extractors.contains_key(&event_type) {
                warn!(?event_type, "Multiple target extractors registered, using first");
                continue;
            }
            table.extractors.insert(event_type, entry.extract);
        }
        table
    }

    /// Registers (or replaces) the extractor for event kind `E`.
    pub fn register<E: Event>(&mut self, extract: ExtractFn) -> &mut Self {
        self.extractors.insert(TypeId::of::<E>(), extract);
        self
    }

    /// Returns true if an extractor is registered for `E`.
    pub fn contains<E: Event>(&self) -> bool {
        self.extractors.contains_key(&TypeId::of::<E>())
    }

    /// Returns the number of registered event kinds.
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    /// Extracts the target of `event`.
    pub fn extract(&self, event: &dyn Event, bot: Option<&dyn Bot>) -> CourierResult<Target> {
        let event_type = Any::type_id(event.as_any());
        let extract = self
            .extractors
            .get(&event_type)
            .ok_or(CourierError::UnresolvedTarget {
                event: event.event_name(),
            })?;
        extract(event, bot)
    }
}

static DEFAULT_EXTRACTORS: LazyLock<TargetExtractors> = LazyLock::new(TargetExtractors::collect_all);

/// Extracts the target of `event` using every linked-in adapter extractor.
///
/// Bot-scoped event kinds fail with [`CourierError::MissingBotContext`] when
/// `bot` is `None`.
pub fn extract_target(event: &dyn Event, bot: Option<&dyn Bot>) -> CourierResult<Target> {
    DEFAULT_EXTRACTORS.extract(event, bot)
}

/// Downcasts `event` inside an extractor.
pub fn event_as<E: Event>(event: &dyn Event) -> CourierResult<&E> {
    event
        .as_any()
        .downcast_ref::<E>()
        .ok_or(CourierError::UnresolvedTarget {
            event: event.event_name(),
        })
}

/// Returns the receiving bot's id, or [`CourierError::MissingBotContext`].
pub fn require_bot<'a>(event: &dyn Event, bot: Option<&'a dyn Bot>) -> CourierResult<&'a str> {
    bot.map(|bot| bot.id()).ok_or(CourierError::MissingBotContext {
        event: event.event_name(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::AdapterKind;

    struct PingEvent {
        user: String,
    }

    impl Event for PingEvent {
        fn event_name(&self) -> &'static str {
            "test.ping"
        }

        fn adapter(&self) -> AdapterKind {
            AdapterKind::Console
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct UnknownEvent;

    impl Event for UnknownEvent {
        fn event_name(&self) -> &'static str {
            "test.unknown"
        }

        fn adapter(&self) -> AdapterKind {
            AdapterKind::Console
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn extract_ping(event: &dyn Event, _bot: Option<&dyn Bot>) -> CourierResult<Target> {
        let ping = event_as::<PingEvent>(event)?;
        Ok(Target::Console {
            user_id: ping.user.clone(),
        })
    }

    #[test]
    fn test_registered_kind_extracts() {
        let mut table = TargetExtractors::new();
        table.register::<PingEvent>(extract_ping);
        assert!(table.contains::<PingEvent>());

        let event = PingEvent {
            user: "alice".into(),
        };
        assert_eq!(
            table.extract(&event, None).unwrap(),
            Target::Console {
                user_id: "alice".into()
            }
        );
    }

    #[test]
    fn test_unknown_kind_is_unresolved() {
        let table = TargetExtractors::new();
        let err = table.extract(&UnknownEvent, None).unwrap_err();
        assert!(matches!(
            err,
            CourierError::UnresolvedTarget {
                event: "test.unknown"
            }
        ));
    }

    #[test]
    fn test_require_bot_without_session() {
        let err = require_bot(&UnknownEvent, None).unwrap_err();
        assert!(matches!(err, CourierError::MissingBotContext { .. }));
    }
}
