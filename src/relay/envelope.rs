//! HS256 token envelope carried in the `Authorization` header.
//!
//! Claims: `iss`, `iat`, `exp` (seconds), `timestamp` (issuance in epoch
//! milliseconds), `messageType`, `channelType`, and the full payload as `data`.
//! Tokens expire [`ENVELOPE_TTL_MINUTES`] after issuance and are verified with
//! zero leeway.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::classify::MessageKind;
use crate::routing::ChannelType;

/// Validity window of a signed envelope.
pub const ENVELOPE_TTL_MINUTES: i64 = 5;

/// Token claims. `T` is the payload type: a borrowed payload when signing,
/// a JSON value when verifying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeClaims<T> {
    /// Issuer tag identifying this bridge.
    pub iss: String,
    /// Issued-at, epoch seconds.
    pub iat: i64,
    /// Expiry, epoch seconds.
    pub exp: i64,
    /// Issued-at, epoch milliseconds.
    pub timestamp: i64,
    /// Kind tag of the payload.
    #[serde(rename = "messageType")]
    pub message_type: MessageKind,
    /// Destination category.
    #[serde(rename = "channelType")]
    pub channel_type: ChannelType,
    /// The relayed payload.
    pub data: T,
}

/// Errors producing or checking an envelope.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// Encoding failed.
    #[error("token encoding failed: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),
    /// Decoding or validation failed (bad signature, wrong issuer, expired).
    #[error("token rejected: {0}")]
    Rejected(#[source] jsonwebtoken::errors::Error),
    /// Issuance time too close to the end of the representable range.
    #[error("envelope expiry out of range")]
    ExpiryOutOfRange,
}

impl EnvelopeError {
    /// Whether the token was rejected only because it expired.
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Rejected(e) if matches!(e.kind(), ErrorKind::ExpiredSignature))
    }
}

/// Signs and verifies envelopes with one symmetric key and issuer tag.
pub struct EnvelopeSigner {
    issuer: String,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for EnvelopeSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeSigner")
            .field("issuer", &self.issuer)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl EnvelopeSigner {
    /// Create a signer from a shared secret and issuer tag.
    pub fn new(secret: &str, issuer: &str) -> Self {
        Self {
            issuer: issuer.to_owned(),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issuer tag placed in `iss`.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Sign `payload` as issued now.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] if encoding fails.
    pub fn sign<T: Serialize>(
        &self,
        kind: MessageKind,
        channel_type: ChannelType,
        payload: &T,
    ) -> Result<String, EnvelopeError> {
        self.sign_at(kind, channel_type, payload, Utc::now())
    }

    /// Sign `payload` as issued at `issued_at`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] if the expiry overflows or encoding fails.
    pub fn sign_at<T: Serialize>(
        &self,
        kind: MessageKind,
        channel_type: ChannelType,
        payload: &T,
        issued_at: DateTime<Utc>,
    ) -> Result<String, EnvelopeError> {
        let expires_at = issued_at
            .checked_add_signed(TimeDelta::minutes(ENVELOPE_TTL_MINUTES))
            .ok_or(EnvelopeError::ExpiryOutOfRange)?;

        let claims = EnvelopeClaims {
            iss: self.issuer.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            timestamp: issued_at.timestamp_millis(),
            message_type: kind,
            channel_type,
            data: payload,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(EnvelopeError::Encode)
    }

    /// Verify a token and return its claims with the payload as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Rejected`] on a bad signature, wrong issuer,
    /// malformed token, or expiry.
    pub fn verify(&self, token: &str) -> Result<EnvelopeClaims<serde_json::Value>, EnvelopeError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        decode::<EnvelopeClaims<serde_json::Value>>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(EnvelopeError::Rejected)
    }
}
