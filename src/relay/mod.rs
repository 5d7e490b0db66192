//! Signed relay of normalized payloads to destination webhooks.
//!
//! Defines the [`Relay`] trait used by the bridge and its errors.
//!
//! - [`envelope::EnvelopeSigner`]: HS256 token envelope with a 5-minute expiry
//! - [`client::HttpRelay`]: single POST per message, no retries

use async_trait::async_trait;
use regex::Regex;

use crate::classify::MessageKind;
use crate::payload::NormalizedPayload;
use crate::routing::ChannelRoute;

pub mod client;
pub mod envelope;

pub use client::HttpRelay;
pub use envelope::{EnvelopeClaims, EnvelopeError, EnvelopeSigner, ENVELOPE_TTL_MINUTES};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by a relay attempt.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The token envelope could not be produced.
    #[error("failed to build relay envelope: {0}")]
    Envelope(#[from] EnvelopeError),
    /// Network-level failure (DNS, connect, reset, timeout).
    #[error("relay request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Destination answered with a non-2xx status.
    #[error("destination returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitized, truncated response body.
        body: String,
    },
}

/// Successful delivery as seen by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayReceipt {
    /// HTTP status returned by the destination.
    pub status: u16,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Delivers one payload to the destination of a route.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Sign and deliver `payload` as `kind` to `route`'s destination.
    ///
    /// Implementations make exactly one attempt.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError`] on signing, transport, or status failure.
    async fn relay(
        &self,
        route: &ChannelRoute,
        kind: MessageKind,
        payload: &NormalizedPayload,
    ) -> Result<RelayReceipt, RelayError>;
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const MAX_ERROR_BODY_CHARS: usize = 256;

/// Collapse whitespace, redact bearer tokens, and truncate a response body
/// so it is safe to log.
pub fn sanitize_error_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sanitized = collapsed;
    for pattern in [
        r"eyJ[A-Za-z0-9_\-]+\.[A-Za-z0-9_\-]+\.[A-Za-z0-9_\-]*",
        r"(?i)bearer\s+[A-Za-z0-9_\-\.=]+",
    ] {
        if let Ok(regex) = Regex::new(pattern) {
            sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
        }
    }

    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}
