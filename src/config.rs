//! Configuration loading and validation.
//!
//! Loads `./relay-bridge.toml` (or `$RELAY_BRIDGE_CONFIG`), then applies
//! environment overrides (`DISCORD_TOKEN`, `N8N_WEBHOOK`,
//! `TARGET_CHANNEL_ID`, ...).
//!
//! Precedence: env vars > config file > defaults.
//!
//! Everything a dispatch depends on is checked by [`Config::validate`] before
//! the gateway connects, so a bad webhook URL or empty secret fails at
//! startup instead of on the first message.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

use crate::relay::EnvelopeSigner;
use crate::routing::{ChannelRoute, ChannelType, RouteTable};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "RELAY_BRIDGE_CONFIG";

/// Config file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "relay-bridge.toml";

/// Env var pairs that each define one route: (channel ids, webhook, type, label).
const ENV_ROUTES: [(&str, &str, ChannelType, &str); 3] = [
    ("TARGET_CHANNEL_ID", "N8N_WEBHOOK", ChannelType::General, "n8n"),
    (
        "FINANCE_CHANNEL_ID",
        "N8N_FINANCE_WEBHOOK",
        ChannelType::Finance,
        "finance",
    ),
    (
        "YOUTUBE_CHANNEL_ID",
        "N8N_YOUTUBE_WEBHOOK",
        ChannelType::Youtube,
        "youtube",
    ),
];

// ── Errors ──────────────────────────────────────────────────────

/// Configuration problems detected at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No Discord bot token.
    #[error("missing Discord bot token (set DISCORD_TOKEN or [discord].token)")]
    MissingToken,
    /// No monitored channel.
    #[error("no routes configured (set TARGET_CHANNEL_ID and N8N_WEBHOOK or add [[routes]])")]
    NoRoutes,
    /// A route has an empty channel id.
    #[error("route {index} has an empty channel_id")]
    EmptyChannelId {
        /// Position in the route list.
        index: usize,
    },
    /// Two routes monitor the same channel.
    #[error("channel {0} is routed more than once")]
    DuplicateChannel(String),
    /// Webhook URL does not parse or is not http(s).
    #[error("invalid webhook URL for channel {channel_id}: {reason}")]
    InvalidWebhook {
        /// Channel the route belongs to.
        channel_id: String,
        /// What is wrong with it.
        reason: String,
    },
    /// Neither the route nor `[relay]` provides a signing secret.
    #[error("no signing secret for channel {0} (set JWT_SECRET or [relay].secret)")]
    MissingSecret(String),
    /// Issuer tag is blank.
    #[error("relay issuer must not be empty")]
    EmptyIssuer,
    /// A duration setting is zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

// ── Top-level config ────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Discord gateway settings.
    pub discord: DiscordConfig,
    /// Envelope signing and outbound HTTP.
    pub relay: RelayConfig,
    /// Dispatch behaviour.
    pub bridge: BridgeConfig,
    /// Liveness server.
    pub server: ServerConfig,
    /// Log output.
    pub logging: LoggingConfig,
    /// Monitored channels.
    pub routes: Vec<RouteConfig>,
    /// File the config was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
    /// Problems found while loading that did not stop it.
    ///
    /// Loading runs before logging is installed, so these are reported
    /// later through [`Config::log_load_report`].
    #[serde(skip)]
    pub warnings: Vec<String>,
}

impl Config {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// A missing config file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load using a custom env resolver (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = env(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let mut config = Self::from_toml(&contents)
                    .with_context(|| format!("failed to parse config at {}", path.display()))?;
                config.source = Some(path);
                config
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "failed to read config at {}: {e}",
                    path.display()
                ))
            }
        };
        config.apply_overrides(env);
        Ok(config)
    }

    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).context("failed to parse config TOML")
    }

    /// Apply environment variable overrides.
    ///
    /// Takes a resolver function so tests need not touch the process env.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("DISCORD_TOKEN") {
            self.discord.token = Some(v);
        }
        if let Some(v) = env("JWT_SECRET") {
            self.relay.secret = Some(v);
        }
        if let Some(v) = env("JWT_ISSUER") {
            self.relay.issuer = v;
        }
        if let Some(v) = env("LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env("LOG_DIR") {
            self.logging.dir = Some(PathBuf::from(v));
        }

        let warnings = &mut self.warnings;
        override_number(
            &env,
            "RELAY_TIMEOUT_SECS",
            &mut self.relay.timeout_seconds,
            warnings,
        );
        override_number(
            &env,
            "TYPING_INTERVAL_SECS",
            &mut self.bridge.typing_interval_seconds,
            warnings,
        );
        override_number(&env, "PORT", &mut self.server.port, warnings);

        for (ids_var, url_var, channel_type, label) in ENV_ROUTES {
            match (env(ids_var), env(url_var)) {
                (Some(ids), Some(webhook_url)) => {
                    for channel_id in ids.split(',').map(str::trim).filter(|id| !id.is_empty()) {
                        self.upsert_route(RouteConfig {
                            channel_id: channel_id.to_owned(),
                            webhook_url: webhook_url.clone(),
                            label: Some(label.to_owned()),
                            channel_type,
                            secret: None,
                        });
                    }
                }
                (Some(_), None) | (None, Some(_)) => self.warnings.push(format!(
                    "ignoring half-configured env route: {ids_var} and {url_var} are both required"
                )),
                (None, None) => {}
            }
        }
    }

    /// Log where the config came from and any load warnings.
    ///
    /// Call once logging is installed.
    pub fn log_load_report(&self) {
        match &self.source {
            Some(path) => tracing::info!(path = %path.display(), "loaded config from file"),
            None => tracing::debug!("no config file found, using defaults"),
        }
        for warning in &self.warnings {
            tracing::warn!("{warning}");
        }
    }

    fn upsert_route(&mut self, route: RouteConfig) {
        match self
            .routes
            .iter_mut()
            .find(|r| r.channel_id == route.channel_id)
        {
            Some(existing) => *existing = route,
            None => self.routes.push(route),
        }
    }

    /// Check every setting a dispatch relies on.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.discord_token()?;
        self.route_table().map(|_| ())
    }

    /// The Discord bot token.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingToken`] if absent or blank.
    pub fn discord_token(&self) -> Result<&str, ConfigError> {
        self.discord
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)
    }

    /// Build the immutable routing table, validating every route.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for the first invalid route or setting.
    pub fn route_table(&self) -> Result<RouteTable, ConfigError> {
        if self.relay.issuer.trim().is_empty() {
            return Err(ConfigError::EmptyIssuer);
        }
        if self.relay.timeout_seconds == 0 {
            return Err(ConfigError::ZeroDuration("relay.timeout_seconds"));
        }
        if self.bridge.typing_interval_seconds == 0 {
            return Err(ConfigError::ZeroDuration("bridge.typing_interval_seconds"));
        }
        if self.routes.is_empty() {
            return Err(ConfigError::NoRoutes);
        }

        let mut seen = HashSet::new();
        let mut routes = Vec::with_capacity(self.routes.len());
        for (index, route) in self.routes.iter().enumerate() {
            let channel_id = route.channel_id.trim();
            if channel_id.is_empty() {
                return Err(ConfigError::EmptyChannelId { index });
            }
            if !seen.insert(channel_id.to_owned()) {
                return Err(ConfigError::DuplicateChannel(channel_id.to_owned()));
            }

            let destination = parse_webhook(channel_id, &route.webhook_url)?;

            let secret = route
                .secret
                .as_deref()
                .or(self.relay.secret.as_deref())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ConfigError::MissingSecret(channel_id.to_owned()))?;

            routes.push(ChannelRoute {
                channel_id: channel_id.to_owned(),
                label: route
                    .label
                    .clone()
                    .unwrap_or_else(|| route.channel_type.as_str().to_owned()),
                channel_type: route.channel_type,
                destination,
                signer: Arc::new(EnvelopeSigner::new(secret, &self.relay.issuer)),
            });
        }

        Ok(RouteTable::new(routes))
    }

    /// Per-request timeout for outbound POSTs.
    pub fn relay_timeout(&self) -> Duration {
        Duration::from_secs(self.relay.timeout_seconds)
    }

    /// Typing indicator refresh period.
    pub fn typing_interval(&self) -> Duration {
        Duration::from_secs(self.bridge.typing_interval_seconds)
    }
}

fn override_number<T: std::str::FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    target: &mut T,
    warnings: &mut Vec<String>,
) {
    if let Some(v) = env(var) {
        match v.trim().parse() {
            Ok(n) => *target = n,
            Err(_) => warnings.push(format!("ignoring invalid env override {var}={v:?}")),
        }
    }
}

fn parse_webhook(channel_id: &str, raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidWebhook {
        channel_id: channel_id.to_owned(),
        reason,
    };
    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme {other:?}"))),
    }
}

// ── Sections ────────────────────────────────────────────────────

/// Discord gateway settings (`[discord]`).
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token.
    pub token: Option<String>,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Envelope signing and outbound HTTP (`[relay]`).
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Issuer tag placed in every token.
    pub issuer: String,
    /// Shared signing secret; routes may override it.
    pub secret: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            issuer: "discord-bot".to_owned(),
            secret: None,
            timeout_seconds: 30,
        }
    }
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("issuer", &self.issuer)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Dispatch behaviour (`[bridge]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Typing indicator refresh period in seconds.
    pub typing_interval_seconds: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            typing_interval_seconds: 5,
        }
    }
}

/// Liveness server (`[server]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Listen port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 3000,
        }
    }
}

/// Log output (`[logging]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for JSON log files; console only when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            dir: None,
        }
    }
}

/// One monitored channel (`[[routes]]`).
#[derive(Clone, Deserialize)]
pub struct RouteConfig {
    /// Source channel identifier.
    pub channel_id: String,
    /// Destination webhook URL.
    pub webhook_url: String,
    /// Log label; defaults to the channel type.
    #[serde(default)]
    pub label: Option<String>,
    /// Destination category.
    #[serde(default)]
    pub channel_type: ChannelType,
    /// Signing secret overriding `[relay].secret`.
    #[serde(default)]
    pub secret: Option<String>,
}

impl std::fmt::Debug for RouteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteConfig")
            .field("channel_id", &self.channel_id)
            .field("webhook_url", &self.webhook_url)
            .field("label", &self.label)
            .field("channel_type", &self.channel_type)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
