//! Standalone server binary.
//!
//! Usage:
//!   cargo run -p shooter_server -- [--host 127.0.0.1] [--port 5000] [--config config.json]
//!
//! The server binds one UDP socket, runs a fixed 60 Hz simulation and
//! broadcasts room state to connected clients.

use std::{env, sync::Arc};

use anyhow::Context;
use shooter_server::GameServer;
use shooter_shared::config::GameConfig;
use tracing::info;

struct Args {
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<String>,
}

fn parse_args() -> Args {
    let mut parsed = Args {
        host: None,
        port: None,
        config_path: None,
    };
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--host" if i + 1 < args.len() => {
                parsed.host = Some(args[i + 1].clone());
                i += 2;
            }
            "--port" if i + 1 < args.len() => {
                parsed.port = args[i + 1].parse().ok();
                i += 2;
            }
            "--config" if i + 1 < args.len() => {
                parsed.config_path = Some(args[i + 1].clone());
                i += 2;
            }
            _ => i += 1,
        }
    }
    parsed
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = parse_args();
    let mut config = match &args.config_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("read config {path}"))?;
            GameConfig::from_json_str(&raw).with_context(|| format!("parse config {path}"))?
        }
        None => GameConfig::default(),
    };
    if let Some(host) = args.host {
        config.network.default_host = host;
    }
    if let Some(port) = args.port {
        config.network.default_port = port;
    }

    info!(
        host = %config.network.default_host,
        port = config.network.default_port,
        max_players = config.network.max_players,
        "Starting server"
    );

    let mut server = GameServer::bind(Arc::new(config))
        .await
        .context("create server")?;
    let local = server.local_addr()?;
    info!(%local, "Server listening");

    server.run().await
}
