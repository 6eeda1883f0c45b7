//! Inbound events as seen by the delivery layer.
//!
//! Courier does not dispatch events; the hosting framework does. It only
//! needs enough of an event to work out where a reply should go:
//!
//! - [`Event`] - Base trait implemented by every adapter event
//! - [`BoxedEvent`] - A type-erased, cheaply clonable event handle
//!
//! Concrete event kinds are recovered by downcasting through
//! [`Event::as_any`], which is how the target extractors dispatch.

use std::any::Any;
use std::sync::Arc;

use crate::target::AdapterKind;

// ============================================================================
// Core Event Trait
// ============================================================================

/// The base trait for all inbound events.
pub trait Event: Any + Send + Sync {
    /// Returns the human-readable name of this event kind.
    fn event_name(&self) -> &'static str;

    /// Returns the adapter that produced this event.
    fn adapter(&self) -> AdapterKind;

    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// The platform message id carried by the event, if any.
    ///
    /// Used for passive replies and quoted replies.
    fn message_id(&self) -> Option<&str> {
        None
    }

    /// The id of the user who triggered the event, in the form the adapter's
    /// mention segment expects.
    fn user_id(&self) -> Option<String> {
        None
    }

    /// The session-scoped direct channel the event arrived on, if any.
    ///
    /// Replies to such an event go straight to this channel without a
    /// resolving call.
    fn direct_channel(&self) -> Option<&str> {
        None
    }
}

// ============================================================================
// Boxed Event
// ============================================================================

/// A type-erased container for events that supports runtime downcasting.
///
/// `BoxedEvent` implements `Deref<Target = dyn Event>`, so trait methods can
/// be called directly on it.
#[derive(Clone)]
pub struct BoxedEvent {
    inner: Arc<dyn Event>,
}

impl BoxedEvent {
    /// Creates a new `BoxedEvent` from any type implementing `Event`.
    pub fn new<E: Event>(event: E) -> Self {
        Self {
            inner: Arc::new(event),
        }
    }

    /// Returns the inner `Arc<dyn Event>`.
    pub fn inner(&self) -> &Arc<dyn Event> {
        &self.inner
    }

    /// Attempts to downcast to a concrete event type.
    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.inner.as_any().downcast_ref()
    }
}

impl std::ops::Deref for BoxedEvent {
    type Target = dyn Event;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl std::fmt::Debug for BoxedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxedEvent")
            .field("event_name", &self.event_name())
            .field("adapter", &self.adapter())
            .finish()
    }
}
