//! Event bridge: filters inbound messages and drives one relay per message.
//!
//! Per message: `Idle → Dispatching → Idle`. Automated authors and channels
//! outside the routing table are ignored. A dispatch keeps the typing
//! indicator alive, runs classify → build → relay once, logs the outcome, and
//! stops the indicator however the dispatch ends.
//!
//! Dispatches for different messages run independently; the completion order
//! of their POSTs is not guaranteed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::classify::MessageKind;
use crate::message::InboundMessage;
use crate::payload::build_payload;
use crate::relay::{Relay, RelayError};
use crate::routing::{ChannelRoute, RouteTable};

pub mod typing;

pub use typing::TypingGuard;

/// Default refresh period of the typing indicator.
pub const DEFAULT_TYPING_INTERVAL: Duration = Duration::from_secs(5);

/// A platform-side "processing" signal, such as Discord's typing indicator.
#[async_trait]
pub trait ActivityIndicator: Send + Sync + 'static {
    /// Show (or re-show) the indicator once.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform call fails; callers only log it.
    async fn pulse(&self) -> anyhow::Result<()>;
}

/// Why a message was not relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Author is a bot or other automation.
    AutomatedAuthor,
    /// Source channel is not in the routing table.
    UnmonitoredChannel,
}

/// Result of handling one inbound message.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Filtered out before dispatch; nothing was sent.
    Ignored(IgnoreReason),
    /// Destination accepted the payload.
    Relayed {
        /// Kind that was relayed.
        kind: MessageKind,
        /// Destination HTTP status.
        status: u16,
    },
    /// Relay attempt failed; not retried.
    Failed {
        /// Kind that was attempted.
        kind: MessageKind,
        /// Underlying failure.
        error: RelayError,
    },
}

/// Connects inbound messages to their destinations.
#[derive(Debug)]
pub struct EventBridge<R> {
    routes: Arc<RouteTable>,
    relay: R,
    typing_interval: Duration,
}

impl<R: Relay> EventBridge<R> {
    /// Create a bridge over an immutable routing table.
    pub fn new(routes: Arc<RouteTable>, relay: R, typing_interval: Duration) -> Self {
        Self {
            routes,
            relay,
            typing_interval,
        }
    }

    /// The routing table this bridge dispatches against.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Route for `message`, or the reason it must be ignored.
    ///
    /// # Errors
    ///
    /// Returns the [`IgnoreReason`] when the message is filtered out.
    pub fn screen(&self, message: &InboundMessage) -> Result<&ChannelRoute, IgnoreReason> {
        if message.author.is_bot {
            return Err(IgnoreReason::AutomatedAuthor);
        }
        self.routes
            .get(&message.channel_id)
            .ok_or(IgnoreReason::UnmonitoredChannel)
    }

    /// Handle one inbound message end to end.
    ///
    /// `indicator` is only started when the message is dispatched.
    pub async fn handle<I: ActivityIndicator>(
        &self,
        message: &InboundMessage,
        indicator: I,
    ) -> DispatchOutcome {
        let route = match self.screen(message) {
            Ok(route) => route,
            Err(reason) => {
                debug!(
                    channel_id = %message.channel_id,
                    message_id = %message.id,
                    ?reason,
                    "message ignored"
                );
                return DispatchOutcome::Ignored(reason);
            }
        };

        let span = info_span!(
            "dispatch",
            dispatch_id = %Uuid::new_v4(),
            route = %route.label,
            message_id = %message.id
        );

        self.dispatch(route, message, indicator)
            .instrument(span)
            .await
    }

    async fn dispatch<I: ActivityIndicator>(
        &self,
        route: &ChannelRoute,
        message: &InboundMessage,
        indicator: I,
    ) -> DispatchOutcome {
        let _typing = TypingGuard::start(indicator, self.typing_interval);

        let kind = route.channel_type.resolve_kind(&message.attachments);
        let payload = build_payload(message, kind);
        debug!(%kind, attachments = payload.attachment_count, "payload built");

        match self.relay.relay(route, kind, &payload).await {
            Ok(receipt) => {
                info!(
                    %kind,
                    channel_type = %route.channel_type,
                    status = receipt.status,
                    author = %message.author.name,
                    "message relayed"
                );
                DispatchOutcome::Relayed {
                    kind,
                    status: receipt.status,
                }
            }
            Err(e) => {
                error!(
                    %kind,
                    channel_type = %route.channel_type,
                    error = %e,
                    "relay failed"
                );
                DispatchOutcome::Failed { kind, error: e }
            }
        }
    }
}
