//! Stream socket line-echo server.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────┐
//!                   │                 ECHO SERVER                   │
//!                   │                                               │
//!   Client          │  ┌──────────┐      ┌───────────────────────┐ │
//!   ──connect──────▶│  │ server   │─────▶│ net::Stream (listening)│ │
//!                   │  │ builders │      └───────────┬───────────┘ │
//!                   │  └──────────┘                  │ accept      │
//!                   │                                ▼             │
//!                   │                    ┌───────────────────────┐ │
//!   ◀──echo line───│                    │ net::Stream (per peer) │ │
//!                   │                    │ + net::LineFramer      │ │
//!                   │                    └───────────────────────┘ │
//!                   │                                               │
//!                   │  ┌─────────────────────────────────────────┐ │
//!                   │  │         Cross-Cutting Concerns           │ │
//!                   │  │   config (TOML + CLI)   tracing logs     │ │
//!                   │  └─────────────────────────────────────────┘ │
//!                   └──────────────────────────────────────────────┘
//! ```
//!
//! The listener speaks plain `tcp` by default; pointing `--cert` (or the
//! `[tls]` config table) at a PEM bundle switches it to `ssl`. Each accepted
//! connection is served on its own thread until the peer disconnects.

// Core subsystems
pub mod config;
pub mod net;
pub mod server;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{AppConfig, TlsConfig};
use crate::net::error::SocketError;
use crate::net::framing::LineFramer;
use crate::net::stream::Stream;
use crate::server::{SecureServer, Server};

#[derive(Parser, Debug)]
#[command(name = "stream-socket", version, about = "Line-echo server over TCP or TLS")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the configuration file.
    #[arg(long)]
    address: Option<String>,

    /// Listen port, overriding the configuration file.
    #[arg(long)]
    port: Option<u16>,

    /// PEM certificate bundle; presence switches the listener to TLS.
    #[arg(long)]
    cert: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(address) = cli.address {
        config.listener.address = address;
    }
    if let Some(port) = cli.port {
        config.listener.port = port;
    }
    if let Some(cert) = cli.cert {
        config.tls = Some(TlsConfig {
            cert_path: cert.display().to_string(),
            passphrase: String::new(),
        });
    }

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.observability.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("stream-socket v0.1.0 starting");

    let mut listener = match &config.tls {
        Some(tls) => SecureServer::new(
            &config.listener.address,
            config.listener.port,
            &tls.cert_path,
        )
        .with_backlog(config.listener.backlog)
        .with_accept_timeout(config.listener.accept_timeout_secs)
        .with_passphrase(tls.passphrase.clone())
        .start()?,
        None => Server::new(&config.listener.address, config.listener.port)
            .with_backlog(config.listener.backlog)
            .with_accept_timeout(config.listener.accept_timeout_secs)
            .start()?,
    };

    loop {
        match listener.accept() {
            Ok(Some(conn)) => {
                std::thread::spawn(move || handle_connection(conn));
            }
            Ok(None) => continue,
            Err(SocketError::Closed) => break,
            Err(e) => {
                tracing::error!(error = %e, "Accept failed");
            }
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Echo newline-terminated lines back until the peer disconnects.
fn handle_connection(mut conn: Stream) {
    let peer = conn
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".into());
    tracing::debug!(peer = %peer, "Connection opened");

    let mut framer = LineFramer::new();
    loop {
        match framer.read_line(&mut conn) {
            Ok(Some(line)) => {
                if let Err(e) = framer.send_line(&mut conn, &line) {
                    tracing::debug!(peer = %peer, error = %e, "Echo write failed");
                    break;
                }
            }
            Ok(None) => continue,
            Err(e) => {
                // orderly EOF from the peer also lands here
                tracing::debug!(peer = %peer, error = %e, "Connection ended");
                break;
            }
        }
    }

    conn.close();
    tracing::debug!(peer = %peer, "Connection closed");
}
