//! Discord adapter: gateway client, message conversion, and typing indicator.
//!
//! Converts `serenity` messages into [`InboundMessage`] and hands them to the
//! [`EventBridge`]. serenity runs each event handler in its own task, so
//! dispatches for different messages proceed independently.

use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serenity::http::Http;
use serenity::model::channel::{Attachment as DiscordAttachment, Message};
use serenity::model::gateway::Ready;
use serenity::model::id::ChannelId;
use serenity::model::Timestamp;
use serenity::prelude::{Client, Context, EventHandler, GatewayIntents};
use tracing::{debug, info, warn};

use crate::bridge::{ActivityIndicator, DispatchOutcome, EventBridge};
use crate::message::{Attachment, Author, InboundMessage};
use crate::relay::Relay;

/// Gateway intents needed to read message content in guilds and DMs.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
}

/// Connect to the Discord gateway and relay messages until the client stops.
///
/// # Errors
///
/// Returns an error if the client cannot be built or the gateway connection fails.
pub async fn run_discord<R: Relay + 'static>(
    token: &str,
    bridge: Arc<EventBridge<R>>,
) -> anyhow::Result<()> {
    let mut client = Client::builder(token, intents())
        .event_handler(BridgeHandler { bridge })
        .await
        .context("failed to build Discord client")?;

    info!("discord gateway client starting");
    client
        .start()
        .await
        .context("Discord gateway client stopped")
}

// ---------------------------------------------------------------------------
// Event handler
// ---------------------------------------------------------------------------

struct BridgeHandler<R> {
    bridge: Arc<EventBridge<R>>,
}

#[async_trait]
impl<R: Relay + 'static> EventHandler for BridgeHandler<R> {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            user = %ready.user.name,
            monitored_channels = self.bridge.routes().len(),
            "logged in to Discord"
        );
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let channel_id = msg.channel_id.to_string();

        // Only resolve the channel name (an API call on cache miss) for
        // messages that will actually be dispatched.
        let channel_name = if !msg.author.bot && self.bridge.routes().is_monitored(&channel_id) {
            match msg.channel_id.name(&ctx).await {
                Ok(name) => name,
                Err(e) => {
                    warn!(error = %e, %channel_id, "failed to resolve channel name");
                    channel_id.clone()
                }
            }
        } else {
            String::new()
        };

        let inbound = to_inbound(&msg, channel_name);
        let indicator = DiscordTyping {
            http: Arc::clone(&ctx.http),
            channel_id: msg.channel_id,
        };

        if let DispatchOutcome::Ignored(reason) = self.bridge.handle(&inbound, indicator).await {
            debug!(?reason, "discord message not relayed");
        }
    }
}

// ---------------------------------------------------------------------------
// Typing indicator
// ---------------------------------------------------------------------------

/// Discord "bot is typing…" indicator for one channel.
#[derive(Clone)]
pub struct DiscordTyping {
    http: Arc<Http>,
    channel_id: ChannelId,
}

#[async_trait]
impl ActivityIndicator for DiscordTyping {
    async fn pulse(&self) -> anyhow::Result<()> {
        self.channel_id
            .broadcast_typing(&self.http)
            .await
            .context("broadcast_typing failed")
    }
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Convert a Discord message into the platform-neutral form.
pub fn to_inbound(msg: &Message, channel_name: String) -> InboundMessage {
    InboundMessage {
        id: msg.id.to_string(),
        content: msg.content.clone(),
        author: Author {
            name: msg.author.name.clone(),
            is_bot: msg.author.bot,
        },
        channel_id: msg.channel_id.to_string(),
        channel_name,
        guild_id: msg.guild_id.map(|id| id.to_string()),
        created_at: to_utc(&msg.timestamp),
        attachments: msg.attachments.iter().map(to_attachment).collect(),
    }
}

fn to_attachment(a: &DiscordAttachment) -> Attachment {
    Attachment {
        url: a.url.clone(),
        proxy_url: a.proxy_url.clone(),
        filename: a.filename.clone(),
        size: u64::from(a.size),
        content_type: a.content_type.clone(),
        width: a.width,
        height: a.height,
        duration_secs: a.duration_secs,
        waveform: a.waveform.as_ref().map(|w| STANDARD.encode(w)),
    }
}

fn to_utc(ts: &Timestamp) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&ts.to_string())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| DateTime::from_timestamp(ts.unix_timestamp(), 0))
        .unwrap_or_else(Utc::now)
}
