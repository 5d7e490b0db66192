//! Platform-neutral view of an inbound chat message.
//!
//! The Discord adapter converts gateway events into these types so the
//! classifier, payload builder, and bridge never touch `serenity` directly.

use chrono::{DateTime, Utc};

/// A file attached to an inbound message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attachment {
    /// Direct CDN URL.
    pub url: String,
    /// Proxied CDN URL.
    pub proxy_url: String,
    /// Original filename as uploaded.
    pub filename: String,
    /// Size in bytes.
    pub size: u64,
    /// Declared MIME type, when the platform reports one.
    pub content_type: Option<String>,
    /// Pixel width (images only).
    pub width: Option<u32>,
    /// Pixel height (images only).
    pub height: Option<u32>,
    /// Duration in seconds (voice messages only).
    pub duration_secs: Option<f64>,
    /// Base64 waveform summary (voice messages only).
    pub waveform: Option<String>,
}

/// Author of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Author {
    /// Display (user) name.
    pub name: String,
    /// Whether the account is a bot or other automation.
    pub is_bot: bool,
}

/// An inbound chat message, read-only for the rest of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Platform message identifier.
    pub id: String,
    /// Text content, possibly empty.
    pub content: String,
    /// Who sent it.
    pub author: Author,
    /// Source channel identifier.
    pub channel_id: String,
    /// Source channel name.
    pub channel_name: String,
    /// Originating community (guild); `None` for direct messages.
    pub guild_id: Option<String>,
    /// When the platform created the message.
    pub created_at: DateTime<Utc>,
    /// Attachments in the order the platform delivered them.
    pub attachments: Vec<Attachment>,
}
