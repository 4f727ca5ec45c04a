//! Message entity definitions

use serde::{Deserialize, Serialize};

use super::user::UserSummary;

/// Message payload kind; `text` carries a string body, the media kinds carry a URL
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Video => "video",
            MessageKind::Audio => "audio",
        }
    }

    /// Map a declared MIME type onto the media kind it stores as
    pub fn from_mime(mime: &str) -> Self {
        match mime.split('/').next().unwrap_or("") {
            "audio" => MessageKind::Audio,
            "image" => MessageKind::Image,
            _ => MessageKind::Video,
        }
    }
}

impl From<&str> for MessageKind {
    fn from(s: &str) -> Self {
        match s {
            "image" => MessageKind::Image,
            "video" => MessageKind::Video,
            "audio" => MessageKind::Audio,
            _ => MessageKind::Text,
        }
    }
}

impl ToString for MessageKind {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}

/// Append request handed to the message store
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: i64,
    pub kind: MessageKind,
    pub content: Option<String>,
    pub media_url: Option<String>,
}

/// Partial update for an existing message; `None` fields keep the stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub media_url: Option<String>,
    pub kind: Option<MessageKind>,
}

impl MessagePatch {
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.media_url.is_none() && self.kind.is_none()
    }
}

/// Stored message with sender display attributes resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageWithSender {
    #[serde(skip_serializing, default)]
    pub id: i64,
    pub public_id: String,
    #[serde(skip_serializing, default)]
    pub conversation_id: i64,
    pub conversation_public_id: String,
    #[serde(skip_serializing, default)]
    pub sender_id: i64,
    pub sender: UserSummary,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: Option<String>,
    pub media_url: Option<String>,
    pub is_read: bool,
    pub created_at: String,
    pub updated_at: String,
}
