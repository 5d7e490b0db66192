//! Static channel → destination routing.
//!
//! The table is built once at startup from validated configuration and is
//! shared read-only (behind an `Arc`) by every dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::classify::{classify, MessageKind};
use crate::message::Attachment;
use crate::relay::EnvelopeSigner;

/// Destination category; decides which payload branch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    /// Classify by attachments.
    #[default]
    General,
    /// Finance workflow; classify by attachments.
    Finance,
    /// YouTube request workflow; message text is the request.
    Youtube,
}

impl ChannelType {
    /// Wire tag sent in `X-Channel-Type` and the `channelType` claim.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Finance => "finance",
            Self::Youtube => "youtube",
        }
    }

    /// Resolve the message kind for a message arriving on this channel type.
    pub fn resolve_kind(self, attachments: &[Attachment]) -> MessageKind {
        match self {
            Self::Youtube => MessageKind::YoutubeRequest,
            Self::General | Self::Finance => classify(attachments),
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// One monitored channel and where its messages go.
#[derive(Debug, Clone)]
pub struct ChannelRoute {
    /// Monitored source channel identifier.
    pub channel_id: String,
    /// Human-readable label used in logs.
    pub label: String,
    /// Destination category.
    pub channel_type: ChannelType,
    /// Destination webhook.
    pub destination: Url,
    /// Token signer for this destination.
    pub signer: Arc<EnvelopeSigner>,
}

/// Immutable lookup from channel id to route.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, ChannelRoute>,
}

impl RouteTable {
    /// Build a table from routes. Later duplicates replace earlier ones;
    /// configuration validation rejects duplicates before this point.
    pub fn new(routes: impl IntoIterator<Item = ChannelRoute>) -> Self {
        Self {
            routes: routes
                .into_iter()
                .map(|route| (route.channel_id.clone(), route))
                .collect(),
        }
    }

    /// Route for a channel, if it is monitored.
    pub fn get(&self, channel_id: &str) -> Option<&ChannelRoute> {
        self.routes.get(channel_id)
    }

    /// Whether messages from `channel_id` are relayed.
    pub fn is_monitored(&self, channel_id: &str) -> bool {
        self.routes.contains_key(channel_id)
    }

    /// Number of monitored channels.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no channel is monitored.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routes sorted by channel id, for stable display.
    pub fn routes(&self) -> Vec<&ChannelRoute> {
        let mut routes: Vec<&ChannelRoute> = self.routes.values().collect();
        routes.sort_by(|a, b| a.channel_id.cmp(&b.channel_id));
        routes
    }
}
