//! Envelope signing, verification, and the 5-minute expiry.

use chrono::{TimeDelta, Utc};

use relay_bridge::classify::MessageKind;
use relay_bridge::payload::build_payload;
use relay_bridge::relay::{EnvelopeError, EnvelopeSigner, ENVELOPE_TTL_MINUTES};
use relay_bridge::routing::ChannelType;

use crate::fixtures::{image, message};

fn signer() -> EnvelopeSigner {
    EnvelopeSigner::new("test-secret-key", "discord-bot")
}

#[test]
fn round_trip_returns_kind_and_payload() {
    let msg = message("pic", vec![image("https://x/1.png", "image/png")]);
    let payload = build_payload(&msg, MessageKind::Image);
    let signer = signer();

    let token = match signer.sign(MessageKind::Image, ChannelType::Finance, &payload) {
        Ok(token) => token,
        Err(err) => panic!("signing should succeed: {err}"),
    };
    let claims = match signer.verify(&token) {
        Ok(claims) => claims,
        Err(err) => panic!("fresh token should verify: {err}"),
    };

    assert_eq!(claims.iss, "discord-bot");
    assert_eq!(claims.message_type, MessageKind::Image);
    assert_eq!(claims.channel_type, ChannelType::Finance);
    let expected = serde_json::to_value(&payload).expect("payload serializes");
    assert_eq!(claims.data, expected);
}

#[test]
fn expiry_is_five_minutes_after_issue() {
    let msg = message("hello", vec![]);
    let payload = build_payload(&msg, MessageKind::Text);
    let signer = signer();

    let token = signer
        .sign(MessageKind::Text, ChannelType::General, &payload)
        .expect("sign");
    let claims = signer.verify(&token).expect("verify");

    assert_eq!(ENVELOPE_TTL_MINUTES, 5);
    assert_eq!(claims.exp.checked_sub(claims.iat), Some(300));
    assert_eq!(claims.timestamp.div_euclid(1000), claims.iat);
}

#[test]
fn token_older_than_five_minutes_is_rejected() {
    let payload = build_payload(&message("late", vec![]), MessageKind::Text);
    let signer = signer();
    let issued_at = Utc::now()
        .checked_sub_signed(TimeDelta::minutes(6))
        .expect("time in range");

    let token = signer
        .sign_at(MessageKind::Text, ChannelType::General, &payload, issued_at)
        .expect("sign");
    let err = match signer.verify(&token) {
        Ok(_) => panic!("expired token must not verify"),
        Err(err) => err,
    };
    assert!(err.is_expired(), "unexpected error: {err}");
}

#[test]
fn token_within_window_still_verifies() {
    let payload = build_payload(&message("soon", vec![]), MessageKind::Text);
    let signer = signer();
    let issued_at = Utc::now()
        .checked_sub_signed(TimeDelta::minutes(4))
        .expect("time in range");

    let token = signer
        .sign_at(MessageKind::Text, ChannelType::General, &payload, issued_at)
        .expect("sign");
    assert!(signer.verify(&token).is_ok());
}

#[test]
fn wrong_secret_is_rejected() {
    let payload = build_payload(&message("x", vec![]), MessageKind::Text);
    let token = signer()
        .sign(MessageKind::Text, ChannelType::General, &payload)
        .expect("sign");

    let other = EnvelopeSigner::new("different-secret", "discord-bot");
    let result = other.verify(&token);
    assert!(matches!(result, Err(EnvelopeError::Rejected(_))));
    if let Err(err) = result {
        assert!(!err.is_expired());
    }
}

#[test]
fn wrong_issuer_is_rejected() {
    let payload = build_payload(&message("x", vec![]), MessageKind::Text);
    let token = EnvelopeSigner::new("test-secret-key", "someone-else")
        .sign(MessageKind::Text, ChannelType::General, &payload)
        .expect("sign");

    assert!(matches!(
        signer().verify(&token),
        Err(EnvelopeError::Rejected(_))
    ));
}

#[test]
fn garbage_token_is_rejected() {
    assert!(matches!(
        signer().verify("not-a-token"),
        Err(EnvelopeError::Rejected(_))
    ));
}

#[test]
fn signer_debug_hides_key() {
    let rendered = format!("{:?}", EnvelopeSigner::new("super-secret-value", "discord-bot"));
    assert!(!rendered.contains("super-secret-value"));
    assert!(rendered.contains("discord-bot"));
}
