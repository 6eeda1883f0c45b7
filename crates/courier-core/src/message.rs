//! Protocol-agnostic message content.
//!
//! # Architecture
//!
//! - [`MessageSegment`]: one unit of content (text, image, mention, ...).
//!   The variant is fixed at construction; adapters render each variant
//!   into their own native fragment.
//! - [`Message`]: an ordered sequence of segments. Order is significant and
//!   is preserved by every renderer. An empty message is valid.
//!
//! ```rust,ignore
//! use courier_core::{Message, MessageSegment};
//!
//! let msg = Message::from("Hello, ")
//!     + MessageSegment::mention("314159")
//!     + MessageSegment::image_url("https://picsum.photos/200");
//! ```

use std::fmt::{self, Display};
use std::ops::{Add, AddAssign, Deref};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ============================================================================
// Image Source
// ============================================================================

/// Where the bytes of an image come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ImageSource {
    /// A remote URI, passed to the platform as a reference.
    Url(String),
    /// Raw image data, uploaded inline.
    Bytes(Vec<u8>),
    /// A local file, uploaded as an attachment.
    File(PathBuf),
}

// ============================================================================
// Message Segment
// ============================================================================

/// A single unit of abstract message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageSegment {
    /// Plain text.
    Text { content: String },
    /// An image.
    Image { source: ImageSource },
    /// A mention of one user.
    Mention { user_id: String },
    /// A mention of everyone in the destination.
    MentionAll,
    /// A quote of a previously sent message.
    Reply { message_id: String },
}

impl MessageSegment {
    /// Creates a text segment.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    /// Creates an image segment from a remote URI.
    pub fn image_url(url: impl Into<String>) -> Self {
        Self::Image {
            source: ImageSource::Url(url.into()),
        }
    }

    /// Creates an image segment from raw bytes.
    pub fn image_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Image {
            source: ImageSource::Bytes(data.into()),
        }
    }

    /// Creates an image segment from a local file.
    pub fn image_file(path: impl Into<PathBuf>) -> Self {
        Self::Image {
            source: ImageSource::File(path.into()),
        }
    }

    /// Creates a mention segment.
    pub fn mention(user_id: impl Into<String>) -> Self {
        Self::Mention {
            user_id: user_id.into(),
        }
    }

    /// Creates a reply segment.
    pub fn reply(message_id: impl Into<String>) -> Self {
        Self::Reply {
            message_id: message_id.into(),
        }
    }

    /// Returns the variant name (e.g., "text", "image", "mention").
    pub fn segment_type(&self) -> &'static str {
        match self {
            MessageSegment::Text { .. } => "text",
            MessageSegment::Image { .. } => "image",
            MessageSegment::Mention { .. } => "mention",
            MessageSegment::MentionAll => "mention_all",
            MessageSegment::Reply { .. } => "reply",
        }
    }

    /// Returns the text content if this is a text segment.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageSegment::Text { content } => Some(content),
            _ => None,
        }
    }
}

impl Display for MessageSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageSegment::Text { content } => write!(f, "{content}"),
            MessageSegment::Image { source } => match source {
                ImageSource::Url(url) => write!(f, "[Image: {url}]"),
                ImageSource::Bytes(data) => write!(f, "[Image: {} bytes]", data.len()),
                ImageSource::File(path) => write!(f, "[Image: {}]", path.display()),
            },
            MessageSegment::Mention { user_id } => write!(f, "@{user_id}"),
            MessageSegment::MentionAll => write!(f, "@all"),
            MessageSegment::Reply { message_id } => write!(f, "[Reply: {message_id}]"),
        }
    }
}

impl From<&str> for MessageSegment {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for MessageSegment {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

// ============================================================================
// Message
// ============================================================================

/// An ordered sequence of [`MessageSegment`]s.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message {
    segments: Vec<MessageSegment>,
}

impl Message {
    /// Creates a new empty message.
    pub const fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Creates a message from a vector of segments.
    pub fn from_segments(segments: Vec<MessageSegment>) -> Self {
        Self { segments }
    }

    /// Concatenates the content of all text segments.
    pub fn extract_plain_text(&self) -> String {
        self.iter().filter_map(MessageSegment::as_text).collect()
    }

    /// Adds a segment to the end of the message.
    pub fn push(&mut self, segment: impl Into<MessageSegment>) {
        self.segments.push(segment.into());
    }

    /// Consumes the message and adds a segment (builder pattern).
    pub fn with(mut self, segment: impl Into<MessageSegment>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Inserts a segment at the front of the message.
    pub fn prepend(&mut self, segment: MessageSegment) {
        self.segments.insert(0, segment);
    }

    /// Consumes the message and returns the inner segments vector.
    pub fn into_segments(self) -> Vec<MessageSegment> {
        self.segments
    }
}

impl Deref for Message {
    type Target = [MessageSegment];

    fn deref(&self) -> &Self::Target {
        &self.segments
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl From<Vec<MessageSegment>> for Message {
    fn from(segments: Vec<MessageSegment>) -> Self {
        Self { segments }
    }
}

impl From<MessageSegment> for Message {
    fn from(segment: MessageSegment) -> Self {
        Self {
            segments: vec![segment],
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        MessageSegment::text(text).into()
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        MessageSegment::text(text).into()
    }
}

impl FromIterator<MessageSegment> for Message {
    fn from_iter<T: IntoIterator<Item = MessageSegment>>(iter: T) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Message {
    type Item = &'a MessageSegment;
    type IntoIter = std::slice::Iter<'a, MessageSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

impl Add<MessageSegment> for Message {
    type Output = Message;

    fn add(self, rhs: MessageSegment) -> Message {
        self.with(rhs)
    }
}

impl Add<&str> for Message {
    type Output = Message;

    fn add(self, rhs: &str) -> Message {
        self.with(rhs)
    }
}

impl Add<Message> for Message {
    type Output = Message;

    fn add(mut self, rhs: Message) -> Message {
        self.segments.extend(rhs.segments);
        self
    }
}

impl Add<MessageSegment> for MessageSegment {
    type Output = Message;

    fn add(self, rhs: MessageSegment) -> Message {
        Message::from_segments(vec![self, rhs])
    }
}

impl<T: Into<Message>> AddAssign<T> for Message {
    fn add_assign(&mut self, rhs: T) {
        self.segments.extend(rhs.into().segments);
    }
}
