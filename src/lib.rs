//! relay-bridge: forwards Discord messages to automation webhooks.
//!
//! Each message from a monitored channel is classified by its attachments,
//! normalized into a JSON payload, and POSTed once to the channel's
//! destination with a short-lived HS256 bearer token.
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classify;
pub mod config;
pub mod logging;
pub mod message;
pub mod payload;

pub mod relay;
pub mod routing;

pub mod bridge;
pub mod discord;
pub mod health;
