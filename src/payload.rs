//! Normalized, destination-ready payloads.
//!
//! [`build_payload`] is pure: the same message and kind always serialize to
//! the same bytes. Field names are camelCase on the wire.

use chrono::SecondsFormat;
use serde::Serialize;

use crate::classify::{is_image, is_voice, MessageKind};
use crate::message::{Attachment, InboundMessage};

/// Payload sent to a destination webhook.
///
/// The invariant fields are always present; exactly one [`PayloadBody`]
/// variant follows, matching `message_type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPayload {
    /// Message text as sent.
    pub content: String,
    /// Author display name.
    pub author: String,
    /// Source channel name.
    pub channel: String,
    /// Source channel identifier.
    pub channel_id: String,
    /// Guild identifier; serialized as `null` for direct messages.
    pub guild_id: Option<String>,
    /// Creation time, RFC 3339 with milliseconds.
    pub time: String,
    /// Platform message identifier.
    pub message_id: String,
    /// Kind tag.
    pub message_type: MessageKind,
    /// Number of attachments on the original message.
    pub attachment_count: usize,
    /// Kind-specific fields.
    #[serde(flatten)]
    pub body: PayloadBody,
}

/// Kind-conditional payload fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PayloadBody {
    /// Fields for [`MessageKind::Image`].
    #[serde(rename_all = "camelCase")]
    Image {
        /// Image attachments in original order.
        images: Vec<ImageDescriptor>,
        /// Length of `images`.
        image_count: usize,
    },
    /// Fields for [`MessageKind::Voice`].
    Voice {
        /// First voice attachment, absent if none qualified.
        #[serde(skip_serializing_if = "Option::is_none")]
        voice: Option<VoiceDescriptor>,
    },
    /// Fields for [`MessageKind::Text`].
    Text {
        /// Attachments not claimed by image or voice; omitted when empty.
        #[serde(skip_serializing_if = "Option::is_none")]
        attachments: Option<Vec<AttachmentDescriptor>>,
    },
    /// Fields for [`MessageKind::YoutubeRequest`].
    Request {
        /// Trimmed message content.
        query: String,
    },
}

/// One image attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDescriptor {
    /// Direct URL.
    pub url: String,
    /// Proxied URL.
    pub proxy_url: String,
    /// Filename.
    pub filename: String,
    /// Size in bytes.
    pub size: u64,
    /// Pixel width.
    pub width: Option<u32>,
    /// Pixel height.
    pub height: Option<u32>,
    /// Declared MIME type.
    pub content_type: Option<String>,
}

/// The voice recording attached to a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceDescriptor {
    /// Direct URL.
    pub url: String,
    /// Proxied URL.
    pub proxy_url: String,
    /// Filename.
    pub filename: String,
    /// Size in bytes.
    pub size: u64,
    /// Declared MIME type.
    pub content_type: Option<String>,
    /// Duration in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Base64 waveform summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waveform: Option<String>,
}

/// A generic attachment on a text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentDescriptor {
    /// Direct URL.
    pub url: String,
    /// Filename.
    pub filename: String,
    /// Size in bytes.
    pub size: u64,
    /// Declared MIME type.
    pub content_type: Option<String>,
}

impl From<&Attachment> for ImageDescriptor {
    fn from(a: &Attachment) -> Self {
        Self {
            url: a.url.clone(),
            proxy_url: a.proxy_url.clone(),
            filename: a.filename.clone(),
            size: a.size,
            width: a.width,
            height: a.height,
            content_type: a.content_type.clone(),
        }
    }
}

impl From<&Attachment> for VoiceDescriptor {
    fn from(a: &Attachment) -> Self {
        Self {
            url: a.url.clone(),
            proxy_url: a.proxy_url.clone(),
            filename: a.filename.clone(),
            size: a.size,
            content_type: a.content_type.clone(),
            duration: a.duration_secs,
            waveform: a.waveform.clone(),
        }
    }
}

impl From<&Attachment> for AttachmentDescriptor {
    fn from(a: &Attachment) -> Self {
        Self {
            url: a.url.clone(),
            filename: a.filename.clone(),
            size: a.size,
            content_type: a.content_type.clone(),
        }
    }
}

/// Build the payload for `message` as the given `kind`.
///
/// The builder re-filters attachments itself rather than trusting the
/// classifier, so a kind with no matching attachments falls back to the
/// invariant fields and an empty body.
pub fn build_payload(message: &InboundMessage, kind: MessageKind) -> NormalizedPayload {
    let body = match kind {
        MessageKind::Image => {
            let images: Vec<ImageDescriptor> = message
                .attachments
                .iter()
                .filter(|a| is_image(a))
                .map(ImageDescriptor::from)
                .collect();
            PayloadBody::Image {
                image_count: images.len(),
                images,
            }
        }
        MessageKind::Voice => PayloadBody::Voice {
            voice: message
                .attachments
                .iter()
                .find(|a| is_voice(a))
                .map(VoiceDescriptor::from),
        },
        MessageKind::Text => {
            let unclaimed: Vec<AttachmentDescriptor> = message
                .attachments
                .iter()
                .filter(|a| !is_image(a) && !is_voice(a))
                .map(AttachmentDescriptor::from)
                .collect();
            PayloadBody::Text {
                attachments: (!unclaimed.is_empty()).then_some(unclaimed),
            }
        }
        MessageKind::YoutubeRequest => PayloadBody::Request {
            query: message.content.trim().to_owned(),
        },
    };

    NormalizedPayload {
        content: message.content.clone(),
        author: message.author.name.clone(),
        channel: message.channel_name.clone(),
        channel_id: message.channel_id.clone(),
        guild_id: message.guild_id.clone(),
        time: message
            .created_at
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        message_id: message.id.clone(),
        message_type: kind,
        attachment_count: message.attachments.len(),
        body,
    }
}
