//! API request and response types for the QQ open platform.
//!
//! Only the fields Courier reads are modelled; unknown fields are ignored.

use serde::{Deserialize, Serialize};

// =============================================================================
// Topology
// =============================================================================

/// A guild the bot has joined.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Guild {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub member_count: Option<u32>,
}

/// A sub-channel inside a guild.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub name: String,
    /// Channel type: 0 text, 2 voice, 4 category, ...
    #[serde(default, rename = "type")]
    pub kind: Option<i32>,
}

/// A direct-message session opened by `post_dms`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dms {
    /// The session's own guild id, used to address `post_dms_messages`.
    pub guild_id: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
}

// =============================================================================
// Message bodies
// =============================================================================

/// Quoted message reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReference {
    pub message_id: String,
}

/// Body shared by `post_messages` and `post_dms_messages`.
///
/// `msg_id` and `event_id` are always sent; `null` marks an active push.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GuildMessageBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Remote image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Base64-encoded inline image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_reference: Option<MessageReference>,
    pub msg_id: Option<String>,
    pub event_id: Option<String>,
}

/// `msg_type` values for open-id chats.
pub mod msg_type {
    pub const TEXT: u8 = 0;
    pub const MEDIA: u8 = 7;
}

/// Rich media previously uploaded through a files API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub file_info: String,
}

/// Body shared by `post_group_messages` and `post_c2c_messages`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OpenIdMessageBody {
    pub msg_type: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_reference: Option<MessageReference>,
    pub msg_id: Option<String>,
    pub event_id: Option<String>,
}

/// `file_type` values for the files APIs.
pub mod file_type {
    pub const IMAGE: u8 = 1;
}

/// Body shared by `post_group_files` and `post_c2c_files`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileUploadBody {
    pub file_type: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Base64-encoded file content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_data: Option<String>,
    pub srv_send_msg: bool,
}

// =============================================================================
// Responses
// =============================================================================

/// A guild or DM message as returned by the send APIs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Result of an open-id group or C2C send.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenIdMessageResponse {
    pub id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Result of a files API upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileUpload {
    #[serde(default)]
    pub file_uuid: Option<String>,
    pub file_info: String,
    #[serde(default)]
    pub ttl: Option<u64>,
}
