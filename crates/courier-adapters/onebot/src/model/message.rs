//! OneBot v11 messages and rendering.
//!
//! OneBot v11 accepts two message formats:
//! - **Array format**: a JSON array of [`Segment`]s (what Courier sends)
//! - **String format**: a CQ-coded string (accepted on receive)
//!
//! [`OneBotRenderer`] maps abstract segments one to one:
//!
//! | Segment | OneBot |
//! |---------|--------|
//! | `Text` | `text` |
//! | `Image` (url) | `image`, `file` = url |
//! | `Image` (bytes) | `image`, `file` = `base64://...` |
//! | `Image` (file) | `image`, `file` = `file:///...` |
//! | `Mention` | `at`, `qq` = user id |
//! | `MentionAll` | `at`, `qq` = `all` |
//! | `Reply` | `reply`, `id` = message id |

use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use courier_core::{AdapterKind, CourierError, CourierResult, ImageSource, MessageSegment, Renderer};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::segment::{Segment, unescape_cq_text};

// ============================================================================
// OneBotMessage
// ============================================================================

/// A OneBot v11 message composed of multiple segments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OneBotMessage {
    segments: Vec<Segment>,
}

impl OneBotMessage {
    /// Creates a message from a vector of segments.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Creates a message from a CQ code string.
    pub fn from_cq_string(cq_string: &str) -> Self {
        Self {
            segments: parse_cq_string(cq_string),
        }
    }

    /// Returns the segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns true if the message has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Concatenates the text segments.
    pub fn extract_plain_text(&self) -> String {
        self.segments.iter().filter_map(Segment::as_text).collect()
    }

    /// Converts the message to CQ code string format.
    pub fn to_cq_string(&self) -> String {
        self.segments.iter().map(Segment::to_cq_code).collect()
    }
}

impl From<Vec<Segment>> for OneBotMessage {
    fn from(segments: Vec<Segment>) -> Self {
        Self::from_segments(segments)
    }
}

impl Serialize for OneBotMessage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Always serialize as array format
        self.segments.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for OneBotMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum MessageFormat {
            Array(Vec<Segment>),
            String(String),
        }

        match MessageFormat::deserialize(deserializer)? {
            MessageFormat::Array(segments) => Ok(OneBotMessage { segments }),
            MessageFormat::String(cq_string) => Ok(OneBotMessage::from_cq_string(&cq_string)),
        }
    }
}

// ============================================================================
// CQ String Parsing
// ============================================================================

const CQ_PREFIX: &str = "[CQ:";

/// Parses a CQ code string into segments.
///
/// CQ codes of unknown types are kept verbatim as text.
pub fn parse_cq_string(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        let Some(start) = rest.find(CQ_PREFIX) else {
            push_text(&mut segments, rest);
            break;
        };
        push_text(&mut segments, &rest[..start]);

        let code = &rest[start..];
        let Some(end) = code.find(']') else {
            push_text(&mut segments, code);
            break;
        };
        let raw = &code[..=end];
        segments.push(cq_to_segment(&raw[CQ_PREFIX.len()..end]).unwrap_or_else(|| Segment::text(raw)));
        rest = &code[end + 1..];
    }

    segments
}

fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if !text.is_empty() {
        segments.push(Segment::text(unescape_cq_text(text)));
    }
}

/// Converts the inside of a CQ code (`type,key=value,...`) into a segment.
fn cq_to_segment(body: &str) -> Option<Segment> {
    let mut parts = body.split(',');
    let func = parts.next()?;
    let params: Vec<(&str, String)> = parts
        .filter_map(|param| param.split_once('='))
        .map(|(key, value)| (key, unescape_cq_text(value)))
        .collect();
    let get = |key: &str| {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
    };

    match func {
        "image" => Some(Segment::image(get("file")?)),
        "at" => Some(Segment::at(get("qq")?)),
        "reply" => Some(Segment::reply(get("id")?)),
        _ => None,
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Renders abstract segments for the OneBot v11 adapter.
pub struct OneBotRenderer;

impl Renderer for OneBotRenderer {
    type Fragment = Segment;
    const ADAPTER: AdapterKind = AdapterKind::OneBotV11;

    fn render_segment(segment: &MessageSegment) -> CourierResult<Segment> {
        Ok(match segment {
            MessageSegment::Text { content } => Segment::text(content.clone()),
            MessageSegment::Image { source } => Segment::image(image_file(source)?),
            MessageSegment::Mention { user_id } => Segment::at(user_id.clone()),
            MessageSegment::MentionAll => Segment::at_all(),
            MessageSegment::Reply { message_id } => Segment::reply(message_id.clone()),
        })
    }
}

/// Builds the `file` parameter of an image segment.
fn image_file(source: &ImageSource) -> CourierResult<String> {
    match source {
        ImageSource::Url(url) => Ok(url.clone()),
        ImageSource::Bytes(data) => Ok(format!("base64://{}", STANDARD.encode(data))),
        ImageSource::File(path) => file_uri(path),
    }
}

/// Formats a local path as a `file://` URI without touching the file.
fn file_uri(path: &Path) -> CourierResult<String> {
    let absolute = std::path::absolute(path).map_err(|err| {
        CourierError::render(
            AdapterKind::OneBotV11,
            format!("cannot resolve '{}': {err}", path.display()),
        )
    })?;
    let absolute = absolute.to_string_lossy().replace('\\', "/");
    if absolute.starts_with('/') {
        Ok(format!("file://{absolute}"))
    } else {
        Ok(format!("file:///{absolute}"))
    }
}

/// Renders an abstract message into a [`OneBotMessage`].
pub fn render_message(message: &courier_core::Message) -> CourierResult<OneBotMessage> {
    OneBotRenderer::render_message(message).map(OneBotMessage::from_segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::Message;
    use serde_json::json;

    #[test]
    fn test_render_mapping() {
        let msg = Message::from(MessageSegment::reply("42"))
            + MessageSegment::mention("10001")
            + " hi "
            + MessageSegment::MentionAll;
        let rendered = render_message(&msg).unwrap();
        assert_eq!(
            rendered.segments(),
            [
                Segment::reply("42"),
                Segment::at("10001"),
                Segment::text(" hi "),
                Segment::at_all(),
            ]
        );
    }

    #[test]
    fn test_render_images() {
        let url = render_message(&MessageSegment::image_url("https://picsum.photos/200").into()).unwrap();
        assert_eq!(url.segments(), [Segment::image("https://picsum.photos/200")]);

        let bytes = render_message(&MessageSegment::image_bytes(b"PNG".to_vec()).into()).unwrap();
        assert_eq!(bytes.segments(), [Segment::image("base64://UE5H")]);

        let file = render_message(&MessageSegment::image_file("/tmp/image.png").into()).unwrap();
        let Segment::Image(data) = &file.segments()[0] else {
            panic!("expected an image segment");
        };
        assert!(data.file.starts_with("file:///"));
        assert!(data.file.ends_with("image.png"));
    }

    #[test]
    fn test_message_serialize_array() {
        let msg = OneBotMessage::from(vec![Segment::text("Hello"), Segment::at("123")]);
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!([
                { "type": "text", "data": { "text": "Hello" } },
                { "type": "at", "data": { "qq": "123" } },
            ])
        );
    }

    #[test]
    fn test_message_deserialize_string() {
        let msg: OneBotMessage = serde_json::from_value(json!("[CQ:reply,id=7]hi &#91;x&#93;[CQ:at,qq=all]")).unwrap();
        assert_eq!(
            msg.segments(),
            [Segment::reply("7"), Segment::text("hi [x]"), Segment::at_all()]
        );
        assert_eq!(msg.extract_plain_text(), "hi [x]");
    }

    #[test]
    fn test_unknown_cq_code_kept_as_text() {
        let msg = OneBotMessage::from_cq_string("a[CQ:face,id=1]b");
        assert_eq!(
            msg.segments(),
            [Segment::text("a"), Segment::text("[CQ:face,id=1]"), Segment::text("b")]
        );
    }

    #[test]
    fn test_cq_string_round_trip() {
        let msg = OneBotMessage::from(vec![Segment::reply("7"), Segment::text("a,[b]")]);
        assert_eq!(OneBotMessage::from_cq_string(&msg.to_cq_string()), msg);
    }
}
