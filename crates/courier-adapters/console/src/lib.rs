//! # Courier Adapter for the Local Console
//!
//! A single-user session for local development: outbound messages are
//! written to a line sink supplied by the host as `[to <user>] text`.
//!
//! The console has no mention, image, reply or recall capability. Messages
//! containing anything but text fail to render with
//! [`CourierError::UnsupportedSegment`].
//!
//! ```rust,ignore
//! let (tx, mut rx) = tokio::sync::mpsc::channel(64);
//! pool.add(Arc::new(ConsoleBot::new("console", "user", tx)));
//! tokio::spawn(async move {
//!     while let Some(line) = rx.recv().await {
//!         println!("{line}");
//!     }
//! });
//! ```

use std::any::{Any, TypeId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use courier_core::linkme::distributed_slice;
use courier_core::{
    AdapterKind, ApiError, Bot, CourierError, CourierResult, Destination, Event, ExtractorEntry,
    Message, MessageSegment, Rendered, Renderer, SentMessage, TARGET_EXTRACTORS, Target, event_as,
    render::unsupported,
};
use tokio::sync::mpsc;
use tracing::debug;

// =============================================================================
// Rendering
// =============================================================================

/// Renders abstract segments for the console.
pub struct ConsoleRenderer;

impl Renderer for ConsoleRenderer {
    type Fragment = String;
    const ADAPTER: AdapterKind = AdapterKind::Console;

    fn render_segment(segment: &MessageSegment) -> CourierResult<String> {
        match segment {
            MessageSegment::Text { content } => Ok(content.clone()),
            MessageSegment::Image { .. }
            | MessageSegment::Mention { .. }
            | MessageSegment::MentionAll
            | MessageSegment::Reply { .. } => unsupported::<Self, _>(segment),
        }
    }
}

// =============================================================================
// ConsoleBot
// =============================================================================

/// A console session talking to one local user.
pub struct ConsoleBot {
    id: String,
    user_id: String,
    sink: mpsc::Sender<String>,
    next_message_id: AtomicU64,
}

impl ConsoleBot {
    /// Creates a console session for `user_id` writing lines to `sink`.
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, sink: mpsc::Sender<String>) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            sink,
            next_message_id: AtomicU64::new(1),
        }
    }

    /// The console user.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

#[async_trait]
impl Bot for ConsoleBot {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter(&self) -> AdapterKind {
        AdapterKind::Console
    }

    fn render(&self, message: &Message) -> CourierResult<Rendered> {
        let text: String = ConsoleRenderer::render_message(message)?.concat();
        Ok(Rendered::new(AdapterKind::Console, text))
    }

    async fn send_rendered(
        &self,
        rendered: Rendered,
        destination: Destination<'_>,
    ) -> CourierResult<SentMessage> {
        let text: String = rendered.downcast()?;
        let target = destination.target;
        let Target::Console { user_id } = target else {
            return Err(CourierError::TargetMismatch {
                target: target.clone(),
                adapter: AdapterKind::Console,
            });
        };

        self.sink
            .send(format!("[to {user_id}] {text}"))
            .await
            .map_err(|_| CourierError::api(AdapterKind::Console, target, ApiError::NotConnected))?;

        let message_id = self.next_message_id.fetch_add(1, Ordering::Relaxed);
        debug!(bot_id = %self.id, user_id = %user_id, message_id, "Wrote console message");
        Ok(SentMessage::new(message_id.to_string()))
    }

    async fn list_targets(&self) -> CourierResult<Vec<Target>> {
        Ok(vec![Target::Console {
            user_id: self.user_id.clone(),
        }])
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

// =============================================================================
// Events
// =============================================================================

/// A line typed by the console user.
#[derive(Debug, Clone, Default)]
pub struct ConsoleMessageEvent {
    pub message_id: String,
    pub user_id: String,
    pub content: String,
}

impl Event for ConsoleMessageEvent {
    fn event_name(&self) -> &'static str {
        "console.message"
    }

    fn adapter(&self) -> AdapterKind {
        AdapterKind::Console
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn message_id(&self) -> Option<&str> {
        Some(&self.message_id)
    }

    fn user_id(&self) -> Option<String> {
        Some(self.user_id.clone())
    }
}

fn extract_console_message(event: &dyn Event, _bot: Option<&dyn Bot>) -> CourierResult<Target> {
    Ok(Target::Console {
        user_id: event_as::<ConsoleMessageEvent>(event)?.user_id.clone(),
    })
}

#[distributed_slice(TARGET_EXTRACTORS)]
#[linkme(crate = courier_core::linkme)]
static CONSOLE_MESSAGE: ExtractorEntry =
    ExtractorEntry::new(TypeId::of::<ConsoleMessageEvent>, extract_console_message);
