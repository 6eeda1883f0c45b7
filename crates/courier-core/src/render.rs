//! The render contract.
//!
//! Rendering translates abstract [`MessageSegment`]s into an adapter's native
//! fragments. Each adapter implements [`Renderer`] with an exhaustive match
//! over the segment variants; a variant the adapter cannot express fails with
//! [`CourierError::UnsupportedSegment`] instead of being dropped.
//!
//! Rendering is pure: no I/O, no network. Local files referenced by image
//! segments are only read when the adapter actually sends.
//!
//! Rendered payloads cross the object-safe [`Bot`](crate::Bot) boundary as a
//! [`Rendered`] value and are downcast back by the adapter that produced them.

use std::any::Any;

use crate::error::{CourierError, CourierResult};
use crate::message::{Message, MessageSegment};
use crate::target::AdapterKind;

/// Per-adapter segment translation.
pub trait Renderer {
    /// The native fragment one segment renders to.
    type Fragment;

    /// The adapter this renderer produces fragments for.
    const ADAPTER: AdapterKind;

    /// Renders a single segment.
    fn render_segment(segment: &MessageSegment) -> CourierResult<Self::Fragment>;

    /// Renders every segment of a message, preserving order.
    ///
    /// Fails on the first unsupported segment.
    fn render_message(message: &Message) -> CourierResult<Vec<Self::Fragment>> {
        message.iter().map(Self::render_segment).collect()
    }
}

/// Shorthand for an [`CourierError::UnsupportedSegment`] naming `R`'s adapter.
pub fn unsupported<R: Renderer, T>(segment: &MessageSegment) -> CourierResult<T> {
    Err(CourierError::unsupported(segment.segment_type(), R::ADAPTER))
}

// ============================================================================
// Rendered
// ============================================================================

/// A type-erased, adapter-native payload.
pub struct Rendered {
    adapter: AdapterKind,
    payload: Box<dyn Any + Send + Sync>,
}

impl Rendered {
    /// Wraps a native payload produced for `adapter`.
    pub fn new<T: Any + Send + Sync>(adapter: AdapterKind, payload: T) -> Self {
        Self {
            adapter,
            payload: Box::new(payload),
        }
    }

    /// The adapter the payload was rendered for.
    pub fn adapter(&self) -> AdapterKind {
        self.adapter
    }

    /// Recovers the native payload.
    pub fn downcast<T: Any>(self) -> CourierResult<T> {
        let adapter = self.adapter;
        self.payload
            .downcast::<T>()
            .map(|payload| *payload)
            .map_err(|_| {
                CourierError::render(
                    adapter,
                    format!("payload is not a {}", std::any::type_name::<T>()),
                )
            })
    }
}

impl std::fmt::Debug for Rendered {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rendered")
            .field("adapter", &self.adapter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UpperRenderer;

    impl Renderer for UpperRenderer {
        type Fragment = String;
        const ADAPTER: AdapterKind = AdapterKind::Console;

        fn render_segment(segment: &MessageSegment) -> CourierResult<String> {
            match segment {
                MessageSegment::Text { content } => Ok(content.to_uppercase()),
                other => unsupported::<Self, _>(other),
            }
        }
    }

    #[test]
    fn test_render_message_in_order() {
        let msg = Message::from("a") + "b" + "c";
        let fragments = UpperRenderer::render_message(&msg).unwrap();
        assert_eq!(fragments, ["A", "B", "C"]);
    }

    #[test]
    fn test_render_stops_at_unsupported() {
        let msg = Message::from("a") + MessageSegment::mention("1");
        let err = UpperRenderer::render_message(&msg).unwrap_err();
        assert!(matches!(
            err,
            CourierError::UnsupportedSegment {
                segment: "mention",
                adapter: AdapterKind::Console
            }
        ));
    }

    #[test]
    fn test_rendered_downcast() {
        let rendered = Rendered::new(AdapterKind::Qq, vec![1u8, 2]);
        assert_eq!(rendered.adapter(), AdapterKind::Qq);
        assert_eq!(rendered.downcast::<Vec<u8>>().unwrap(), vec![1, 2]);

        let wrong = Rendered::new(AdapterKind::Qq, 5u32).downcast::<String>();
        assert!(matches!(wrong, Err(CourierError::Render { .. })));
    }
}
