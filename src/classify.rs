//! Message classification by attachment content.
//!
//! Precedence is fixed: any image wins, then any audio-like attachment,
//! otherwise the message is plain text.

use serde::{Deserialize, Serialize};

use crate::message::Attachment;

/// Filename extensions treated as voice recordings when no `audio/` type is declared.
const VOICE_EXTENSIONS: [&str; 4] = ["ogg", "mp3", "wav", "webm"];

/// Closed set of message kinds relayed to destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain text, possibly with generic attachments.
    Text,
    /// At least one image attachment.
    Image,
    /// A voice recording.
    Voice,
    /// Free-text request posted to a YouTube request channel.
    YoutubeRequest,
}

impl MessageKind {
    /// Wire tag used in headers, claims, and payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Voice => "voice",
            Self::YoutubeRequest => "youtube_request",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Whether the attachment declares an `image/*` content type.
pub fn is_image(attachment: &Attachment) -> bool {
    attachment
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("image/"))
}

/// Whether the attachment is audio by declared type or by filename extension.
pub fn is_voice(attachment: &Attachment) -> bool {
    let audio_type = attachment
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("audio/"));

    audio_type || has_voice_extension(&attachment.filename)
}

fn has_voice_extension(filename: &str) -> bool {
    let Some((_, ext)) = filename.rsplit_once('.') else {
        return false;
    };
    let ext = ext.to_ascii_lowercase();
    VOICE_EXTENSIONS.contains(&ext.as_str())
}

/// Classify a message from its full attachment set.
pub fn classify(attachments: &[Attachment]) -> MessageKind {
    if attachments.iter().any(is_image) {
        MessageKind::Image
    } else if attachments.iter().any(is_voice) {
        MessageKind::Voice
    } else {
        MessageKind::Text
    }
}
