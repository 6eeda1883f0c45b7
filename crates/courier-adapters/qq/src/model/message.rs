//! QQ message rendering.
//!
//! A QQ message is not a segment list on the wire: text and mentions are
//! folded into one `content` string, and images and quoted replies travel in
//! dedicated fields. Rendering therefore happens in two steps:
//!
//! 1. [`QqRenderer`] maps each abstract segment to a [`QqSegment`]
//! 2. [`QqMessage::from_segments`] folds the segments into one payload
//!
//! Content escaping follows the platform's rules: `&`, `<` and `>` are
//! entity-encoded so user text can never form a mention tag.

use std::path::PathBuf;

use courier_core::{AdapterKind, CourierError, CourierResult, ImageSource, MessageSegment, Renderer};

/// Escapes text for a QQ `content` field.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Reverses [`escape`].
pub fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// An image attached to a QQ message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QqImage {
    /// Passed to the platform by reference.
    Url(String),
    /// Uploaded inline.
    Bytes(Vec<u8>),
    /// Read from disk and uploaded inline when the message is sent.
    File(PathBuf),
}

/// One rendered QQ fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QqSegment {
    /// Escaped content text.
    Text(String),
    /// `<@user_id>`
    MentionUser(String),
    /// `@everyone`
    MentionEveryone,
    Image(QqImage),
    Reference(String),
}

impl QqSegment {
    /// Returns this fragment's contribution to `content`, if any.
    fn content(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text.clone()),
            Self::MentionUser(user_id) => Some(format!("<@{user_id}>")),
            Self::MentionEveryone => Some("@everyone".to_string()),
            Self::Image(_) | Self::Reference(_) => None,
        }
    }
}

/// Renders abstract segments for the QQ adapter.
pub struct QqRenderer;

impl Renderer for QqRenderer {
    type Fragment = QqSegment;
    const ADAPTER: AdapterKind = AdapterKind::Qq;

    fn render_segment(segment: &MessageSegment) -> CourierResult<QqSegment> {
        Ok(match segment {
            MessageSegment::Text { content } => QqSegment::Text(escape(content)),
            MessageSegment::Image { source } => QqSegment::Image(match source {
                ImageSource::Url(url) => QqImage::Url(url.clone()),
                ImageSource::Bytes(data) => QqImage::Bytes(data.clone()),
                ImageSource::File(path) => QqImage::File(path.clone()),
            }),
            MessageSegment::Mention { user_id } => QqSegment::MentionUser(user_id.clone()),
            MessageSegment::MentionAll => QqSegment::MentionEveryone,
            MessageSegment::Reply { message_id } => QqSegment::Reference(message_id.clone()),
        })
    }
}

/// A fully rendered QQ message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QqMessage {
    /// Concatenated, escaped content. Empty when the message has no text.
    pub content: String,
    pub image: Option<QqImage>,
    pub reference: Option<String>,
}

impl QqMessage {
    /// Folds rendered fragments into a single payload.
    ///
    /// Fails if more than one image or more than one quoted reply is present,
    /// since a QQ message carries at most one of each.
    pub fn from_segments(segments: Vec<QqSegment>) -> CourierResult<Self> {
        let mut message = Self::default();
        for segment in segments {
            if let Some(text) = segment.content() {
                message.content.push_str(&text);
                continue;
            }
            match segment {
                QqSegment::Image(image) => {
                    if message.image.replace(image).is_some() {
                        return Err(CourierError::render(
                            AdapterKind::Qq,
                            "a message can carry at most one image",
                        ));
                    }
                }
                QqSegment::Reference(message_id) => {
                    if message.reference.replace(message_id).is_some() {
                        return Err(CourierError::render(
                            AdapterKind::Qq,
                            "a message can quote at most one message",
                        ));
                    }
                }
                _ => {}
            }
        }
        Ok(message)
    }

    /// Returns the content, or `None` when empty.
    pub fn content(&self) -> Option<String> {
        (!self.content.is_empty()).then(|| self.content.clone())
    }
}

/// Renders an abstract message into a [`QqMessage`].
pub fn render_message(message: &courier_core::Message) -> CourierResult<QqMessage> {
    QqMessage::from_segments(QqRenderer::render_message(message)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::Message;

    #[test]
    fn test_text_is_escaped() {
        let msg = render_message(&Message::from("a<b>&c")).unwrap();
        assert_eq!(msg.content, "a&lt;b&gt;&amp;c");
        assert_eq!(unescape(&msg.content), "a<b>&c");
    }

    #[test]
    fn test_mentions_fold_into_content() {
        let msg = Message::from("hi ")
            + MessageSegment::mention("314159")
            + MessageSegment::MentionAll;
        let rendered = render_message(&msg).unwrap();
        assert_eq!(rendered.content, "hi <@314159>@everyone");
        assert_eq!(rendered.image, None);
    }

    #[test]
    fn test_image_sources() {
        let url = render_message(&MessageSegment::image_url("https://picsum.photos/200").into()).unwrap();
        assert_eq!(url.image, Some(QqImage::Url("https://picsum.photos/200".into())));
        assert_eq!(url.content(), None);

        let bytes = render_message(&MessageSegment::image_bytes(b"\x89PNG\r".to_vec()).into()).unwrap();
        assert_eq!(bytes.image, Some(QqImage::Bytes(b"\x89PNG\r".to_vec())));

        let file = render_message(&MessageSegment::image_file("/tmp/image.png").into()).unwrap();
        assert_eq!(file.image, Some(QqImage::File("/tmp/image.png".into())));
    }

    #[test]
    fn test_second_image_is_rejected() {
        let msg = Message::from(MessageSegment::image_url("a")) + MessageSegment::image_url("b");
        let err = render_message(&msg).unwrap_err();
        assert!(matches!(
            err,
            CourierError::Render {
                adapter: AdapterKind::Qq,
                ..
            }
        ));
    }

    #[test]
    fn test_reply_becomes_reference() {
        let msg = Message::from(MessageSegment::reply("42")) + "ok";
        let rendered = render_message(&msg).unwrap();
        assert_eq!(rendered.reference.as_deref(), Some("42"));
        assert_eq!(rendered.content, "ok");
    }

    #[test]
    fn test_empty_message() {
        let rendered = render_message(&Message::new()).unwrap();
        assert_eq!(rendered, QqMessage::default());
    }
}
