// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Router configuration.
//!
//! Supports both programmatic and file-based (TOML) configuration.
//! Endpoints are given as connection strings (`udpin:<ip>:<port>`,
//! `udpout:<ip>:<port>`, `tcpout:<ip>:<port>`, `serial:<device>:<baud>`);
//! validation failures abort startup with a named error.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dialect::{self, Dialect};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid connection string `{string}`: {reason}")]
    InvalidConnectionString { string: String, reason: String },

    #[error("no dialect configured")]
    NoDialectSet,

    #[error("unknown dialect `{0}`")]
    UnknownDialect(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// One configured transport endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ConnectionSpec {
    /// `udpin:<ip>:<port>`: bind locally, learn peers on first receive.
    UdpIn { bind: SocketAddr },
    /// `udpout:<ip>:<port>`: ephemeral local socket, fixed remote target.
    UdpOut { target: SocketAddr },
    /// `tcpout:<ip>:<port>`: client connection, reconnecting every second.
    TcpOut { target: SocketAddr },
    /// `serial:<device>:<baud>`.
    Serial { path: String, baud: u32 },
}

impl FromStr for ConnectionSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason: &str| ConfigError::InvalidConnectionString {
            string: s.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = s.split_once(':').ok_or_else(|| err("missing `:`"))?;
        match scheme {
            "udpin" | "udpout" | "tcpout" => {
                let (ip, port) = rest
                    .rsplit_once(':')
                    .ok_or_else(|| err("expected <ip>:<port>"))?;
                let ip: Ipv4Addr = ip.parse().map_err(|_| err("IP must be dotted-quad"))?;
                let port: u16 = port.parse().map_err(|_| err("port must be an integer"))?;
                if port < 1024 {
                    return Err(err("port must be 1024-65535"));
                }
                let addr = SocketAddr::from((ip, port));
                Ok(match scheme {
                    "udpin" => Self::UdpIn { bind: addr },
                    "udpout" => Self::UdpOut { target: addr },
                    _ => Self::TcpOut { target: addr },
                })
            }
            "serial" => {
                let (path, baud) = rest
                    .rsplit_once(':')
                    .ok_or_else(|| err("expected <device>:<baud>"))?;
                if path.is_empty() {
                    return Err(err("device path is empty"));
                }
                let baud: u32 = baud
                    .parse()
                    .map_err(|_| err("baud must be a positive integer"))?;
                if baud == 0 {
                    return Err(err("baud must be a positive integer"));
                }
                Ok(Self::Serial { path: path.to_string(), baud })
            }
            other => Err(err(&format!("unknown scheme `{other}`"))),
        }
    }
}

impl TryFrom<String> for ConnectionSpec {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for ConnectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UdpIn { bind } => write!(f, "udpin:{}:{}", bind.ip(), bind.port()),
            Self::UdpOut { target } => write!(f, "udpout:{}:{}", target.ip(), target.port()),
            Self::TcpOut { target } => write!(f, "tcpout:{}:{}", target.ip(), target.port()),
            Self::Serial { path, baud } => write!(f, "serial:{path}:{baud}"),
        }
    }
}

impl From<ConnectionSpec> for String {
    fn from(spec: ConnectionSpec) -> Self {
        spec.to_string()
    }
}

/// Router configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Source system id stamped on locally originated frames.
    #[serde(default = "default_system_id")]
    pub system_id: u8,

    /// Source component id stamped on locally originated frames.
    #[serde(default = "default_component_id")]
    pub component_id: u8,

    /// Dialect to load; startup fails without one.
    #[serde(default)]
    pub dialect: Option<String>,

    /// Transport endpoints, as connection strings in TOML.
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,

    /// Statistics reporting interval (seconds, 0 to disable).
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,

    /// Log filter directive.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_system_id() -> u8 {
    254
}

fn default_component_id() -> u8 {
    191
}

fn default_stats_interval() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            system_id: default_system_id(),
            component_id: default_component_id(),
            dialect: None,
            connections: Vec::new(),
            stats_interval_secs: default_stats_interval(),
            log_level: default_log_level(),
        }
    }
}

impl RouterConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dialect()?;
        if self.system_id == 0 {
            return Err(ConfigError::Invalid("system_id must be 1-255".into()));
        }
        if self.component_id == 0 {
            return Err(ConfigError::Invalid("component_id must be 1-255".into()));
        }
        if self.connections.is_empty() {
            return Err(ConfigError::Invalid("no endpoints configured".into()));
        }
        Ok(())
    }

    /// Resolve the configured dialect.
    pub fn dialect(&self) -> Result<&'static Dialect, ConfigError> {
        let name = self.dialect.as_deref().ok_or(ConfigError::NoDialectSet)?;
        dialect::by_name(name).ok_or_else(|| ConfigError::UnknownDialect(name.to_string()))
    }
}
