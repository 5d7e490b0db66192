//! HTTP relay client.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{sanitize_error_body, Relay, RelayError, RelayReceipt};
use crate::classify::MessageKind;
use crate::payload::NormalizedPayload;
use crate::routing::ChannelRoute;

/// Header carrying the kind tag as a routing hint.
pub const MESSAGE_TYPE_HEADER: &str = "X-Message-Type";

/// Header carrying the destination category.
pub const CHANNEL_TYPE_HEADER: &str = "X-Channel-Type";

/// Posts payloads to destination webhooks with a signed bearer token.
#[derive(Debug, Clone)]
pub struct HttpRelay {
    client: reqwest::Client,
}

impl HttpRelay {
    /// Build a relay whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Transport`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("relay-bridge/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client))
    }

    /// Wrap an existing client, keeping its timeout and headers.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Relay for HttpRelay {
    async fn relay(
        &self,
        route: &ChannelRoute,
        kind: MessageKind,
        payload: &NormalizedPayload,
    ) -> Result<RelayReceipt, RelayError> {
        let token = route.signer.sign(kind, route.channel_type, payload)?;

        let response = self
            .client
            .post(route.destination.clone())
            .bearer_auth(token)
            .header(MESSAGE_TYPE_HEADER, kind.as_str())
            .header(CHANNEL_TYPE_HEADER, route.channel_type.as_str())
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::HttpStatus {
                status: status.as_u16(),
                body: sanitize_error_body(&body),
            });
        }

        debug!(route = %route.label, status = status.as_u16(), "destination accepted payload");
        Ok(RelayReceipt {
            status: status.as_u16(),
        })
    }
}
