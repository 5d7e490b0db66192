//! relay-bridge CLI entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use relay_bridge::bridge::EventBridge;
use relay_bridge::config::Config;
use relay_bridge::discord::run_discord;
use relay_bridge::relay::HttpRelay;
use relay_bridge::{health, logging};

/// Discord-to-webhook relay bridge.
#[derive(Debug, Parser)]
#[command(name = "relay-bridge", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect to Discord and relay messages (default).
    Start,
    /// Validate configuration and print the routing table.
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(e) if e.not_found() => {}
        Err(e) => return Err(e).context("failed to load .env"),
    }

    let config = Config::load().context("failed to load configuration")?;

    match cli.command.unwrap_or(Command::Start) {
        Command::Start => start(config).await,
        Command::Check => check(&config),
    }
}

async fn start(config: Config) -> Result<()> {
    let _logging = logging::init_service(&config.logging.level, config.logging.dir.as_deref())?;
    config.log_load_report();

    let token = config.discord_token()?.to_owned();
    let routes = Arc::new(config.route_table()?);
    for route in routes.routes() {
        info!(
            channel_id = %route.channel_id,
            label = %route.label,
            channel_type = %route.channel_type,
            destination_host = route.destination.host_str().unwrap_or("-"),
            "monitoring channel"
        );
    }

    let relay = HttpRelay::new(config.relay_timeout()).context("failed to build HTTP client")?;
    let bridge = Arc::new(EventBridge::new(routes, relay, config.typing_interval()));

    let host = config.server.host.clone();
    let port = config.server.port;
    let liveness = tokio::spawn(async move { health::serve(&host, port).await });

    info!(version = env!("CARGO_PKG_VERSION"), "relay-bridge starting");

    let result = tokio::select! {
        res = run_discord(&token, bridge) => res,
        res = liveness => match res {
            Ok(inner) => inner.and(Err(anyhow::anyhow!("liveness server exited"))),
            Err(e) => Err(anyhow::anyhow!("liveness server task failed: {e}")),
        },
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
            Ok(())
        }
    };

    if let Err(ref e) = result {
        error!(error = %e, "relay-bridge stopped with error");
    }
    result
}

fn check(config: &Config) -> Result<()> {
    logging::init_cli(&config.logging.level);
    config.log_load_report();

    config.discord_token()?;
    let table = config.route_table()?;

    println!("configuration OK: {} route(s)", table.len());
    for route in table.routes() {
        println!(
            "  {:<20} {:<8} {:<12} -> {}",
            route.channel_id,
            route.channel_type,
            route.label,
            route.destination.host_str().unwrap_or("-"),
        );
    }
    Ok(())
}
