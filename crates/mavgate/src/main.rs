// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! mavgate CLI.
//!
//! # Usage
//!
//! ```bash
//! # Bridge a flight controller UART to a ground station on UDP
//! mavgate -e serial:/dev/ttyUSB0:57600 -e udpin:0.0.0.0:14550
//!
//! # Fan one vehicle out to two ground stations
//! mavgate -e udpin:0.0.0.0:14550 -e udpout:10.0.0.2:14550 -e tcpout:10.0.0.3:5760
//!
//! # Using a configuration file
//! mavgate --config mavgate.toml
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mavgate::{ConfigError, Router, RouterConfig, SubscriptionStore};

/// MAVLink v1/v2 message router
#[derive(Parser, Debug)]
#[command(name = "mavgate")]
#[command(about = "MAVLink v1/v2 message router for companion computers and ground stations")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Endpoint connection strings (udpin:/udpout:/tcpout:/serial:, can repeat)
    #[arg(short, long = "endpoint", conflicts_with = "config")]
    endpoints: Vec<String>,

    /// MAVLink system id of the router itself
    #[arg(long, default_value = "254")]
    system_id: u8,

    /// MAVLink component id of the router itself
    #[arg(long, default_value = "191")]
    component_id: u8,

    /// Dialect to load
    #[arg(long, default_value = "common")]
    dialect: String,

    /// Statistics reporting interval (seconds, 0 to disable)
    #[arg(long, default_value = "10")]
    stats_interval: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a configuration file without starting the router
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Some(Commands::Validate { config }) = args.command {
        return cmd_validate(config);
    }

    let config = build_config(&args)?;
    let store = SubscriptionStore::spawn();
    let handle = Router::spawn(config, store).await?;

    if args.stats_interval > 0 {
        let stats_handle = handle.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(args.stats_interval));
            interval.tick().await; // the first tick fires immediately
            loop {
                interval.tick().await;
                let m = stats_handle.metrics().snapshot();
                info!(
                    received = m.frames_received,
                    forwarded = m.frames_forwarded,
                    dropped = m.frames_dropped,
                    crc_errors = m.checksum_errors,
                    unknown = m.unknown_messages,
                    sent = m.messages_sent,
                    "router stats"
                );
            }
        });
    }

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    handle.shutdown().await;
    Ok(())
}

fn build_config(args: &Args) -> Result<RouterConfig, ConfigError> {
    if let Some(ref path) = args.config {
        return RouterConfig::from_file(path);
    }

    let connections = args
        .endpoints
        .iter()
        .map(|s| s.parse())
        .collect::<Result<Vec<_>, _>>()?;

    let config = RouterConfig {
        system_id: args.system_id,
        component_id: args.component_id,
        dialect: Some(args.dialect.clone()),
        connections,
        stats_interval_secs: args.stats_interval,
        log_level: args.log_level.clone(),
    };
    config.validate()?;
    Ok(config)
}

fn cmd_validate(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    match RouterConfig::from_file(&path) {
        Ok(config) => {
            println!("Configuration valid!");
            println!();
            println!("System id:  {}/{}", config.system_id, config.component_id);
            println!("Dialect:    {}", config.dialect.as_deref().unwrap_or("-"));
            println!("Endpoints:  {}", config.connections.len());
            for (i, connection) in config.connections.iter().enumerate() {
                println!("  [{i}] {connection}");
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {e}");
            std::process::exit(1);
        }
    }
}
