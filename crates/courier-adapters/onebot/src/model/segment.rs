//! OneBot v11 message segments.
//!
//! Only the segment types Courier can produce are modelled:
//!
//! | Type    | Data            |
//! |---------|-----------------|
//! | `text`  | `text`          |
//! | `image` | `file`, `url`   |
//! | `at`    | `qq` (or `all`) |
//! | `reply` | `id`            |
//!
//! Segments serialize in the array format, `{"type": ..., "data": {...}}`,
//! and can be converted to the legacy CQ code format with
//! [`Segment::to_cq_code`].

use serde::{Deserialize, Serialize};

/// A OneBot v11 message segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Segment {
    Text(TextData),
    Image(ImageData),
    At(AtData),
    Reply(ReplyData),
}

impl Segment {
    /// Creates a plain text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Segment::Text(TextData { text: text.into() })
    }

    /// Creates an image segment from a URL, `file://` URI or `base64://` payload.
    pub fn image(file: impl Into<String>) -> Self {
        Segment::Image(ImageData {
            file: file.into(),
            url: None,
        })
    }

    /// Creates an @mention segment.
    pub fn at(qq: impl Into<String>) -> Self {
        Segment::At(AtData { qq: qq.into() })
    }

    /// Creates an @all segment.
    pub fn at_all() -> Self {
        Segment::at("all")
    }

    /// Creates a reply segment referencing another message.
    pub fn reply(id: impl Into<String>) -> Self {
        Segment::Reply(ReplyData { id: id.into() })
    }

    /// Returns the segment type name.
    pub fn segment_type(&self) -> &'static str {
        match self {
            Segment::Text(_) => "text",
            Segment::Image(_) => "image",
            Segment::At(_) => "at",
            Segment::Reply(_) => "reply",
        }
    }

    /// Returns the text of a text segment.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Segment::Text(data) => Some(&data.text),
            _ => None,
        }
    }

    /// Converts this segment to a CQ code string.
    pub fn to_cq_code(&self) -> String {
        match self {
            Segment::Text(data) => escape_cq_text(&data.text),
            Segment::Image(data) => format!("[CQ:image,file={}]", escape_cq_value(&data.file)),
            Segment::At(data) => format!("[CQ:at,qq={}]", escape_cq_value(&data.qq)),
            Segment::Reply(data) => format!("[CQ:reply,id={}]", escape_cq_value(&data.id)),
        }
    }
}

// ============================================================================
// Segment Data Types
// ============================================================================

/// Plain text segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    pub text: String,
}

/// Image segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    /// Image URL, `file://` URI, or `base64://` payload.
    pub file: String,
    /// Image URL (receive only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// @mention segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtData {
    /// QQ number or "all" for @everyone.
    pub qq: String,
}

/// Reply segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyData {
    /// Message ID to reply to.
    pub id: String,
}

// ============================================================================
// CQ Code Escaping Utilities
// ============================================================================

/// Escapes special characters in plain text for CQ code format.
///
/// Escapes: `&` → `&amp;`, `[` → `&#91;`, `]` → `&#93;`
pub fn escape_cq_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('[', "&#91;")
        .replace(']', "&#93;")
}

/// Unescapes CQ code special characters back to plain text.
pub fn unescape_cq_text(text: &str) -> String {
    text.replace("&#91;", "[")
        .replace("&#93;", "]")
        .replace("&#44;", ",")
        .replace("&amp;", "&")
}

/// Escapes special characters in CQ code parameter values.
///
/// Also escapes `,` → `&#44;`.
pub fn escape_cq_value(value: &str) -> String {
    escape_cq_text(value).replace(',', "&#44;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_segment_serialize() {
        let seg = Segment::text("Hello");
        assert_eq!(
            serde_json::to_value(&seg).unwrap(),
            json!({ "type": "text", "data": { "text": "Hello" } })
        );

        let seg = Segment::at_all();
        assert_eq!(
            serde_json::to_value(&seg).unwrap(),
            json!({ "type": "at", "data": { "qq": "all" } })
        );
    }

    #[test]
    fn test_segment_deserialize() {
        let seg: Segment = serde_json::from_value(json!({
            "type": "image",
            "data": { "file": "abc.image", "url": "https://example.com/abc.png" }
        }))
        .unwrap();
        assert_eq!(seg.segment_type(), "image");
        let Segment::Image(data) = seg else {
            panic!("expected an image segment");
        };
        assert_eq!(data.url.as_deref(), Some("https://example.com/abc.png"));
    }

    #[test]
    fn test_cq_code_conversion() {
        assert_eq!(Segment::text("a[b]").to_cq_code(), "a&#91;b&#93;");
        assert_eq!(Segment::at("10001").to_cq_code(), "[CQ:at,qq=10001]");
        assert_eq!(
            Segment::image("https://a.b/c?x=1,2").to_cq_code(),
            "[CQ:image,file=https://a.b/c?x=1&#44;2]"
        );
        assert_eq!(Segment::reply("42").to_cq_code(), "[CQ:reply,id=42]");
    }

    #[test]
    fn test_cq_escaping() {
        let text = "a & [b], c";
        assert_eq!(unescape_cq_text(&escape_cq_value(text)), text);
    }
}
