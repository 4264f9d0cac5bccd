//! Configuration schema definitions.
//!
//! This module defines the configuration structure for the socket server
//! binary. All types derive Serde traits for deserialization from config
//! files, and every field has a default so minimal configs work.

use serde::{Deserialize, Serialize};

use crate::net::endpoint::{DEFAULT_ADDRESS, DEFAULT_BACKLOG, DEFAULT_PORT};
use crate::net::stream::DEFAULT_ACCEPT_TIMEOUT_SECS;

/// Root configuration for the socket server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, port, backlog).
    pub listener: ListenerConfig,

    /// Optional TLS configuration; present means the `ssl` scheme.
    pub tls: Option<TlsConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address.
    pub address: String,

    /// Bind port; `0` lets the OS assign one.
    pub port: u16,

    /// Maximum queued pending connections.
    pub backlog: i32,

    /// Accept timeout in seconds; values `<= 0` leave accept unbounded.
    pub accept_timeout_secs: i64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
            accept_timeout_secs: DEFAULT_ACCEPT_TIMEOUT_SECS,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to a PEM file holding the certificate chain and private key.
    pub cert_path: String,

    /// Private key passphrase; empty means none.
    #[serde(default)]
    pub passphrase: String,
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "stream_socket=info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.listener.address, "127.0.0.1");
        assert_eq!(config.listener.port, 0);
        assert_eq!(config.listener.backlog, 100);
        assert_eq!(config.listener.accept_timeout_secs, -1);
        assert!(config.tls.is_none());
        assert_eq!(config.observability.log_level, "stream_socket=info");
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.address, "127.0.0.1");
        assert_eq!(config.listener.backlog, 100);
    }

    #[test]
    fn test_toml_overrides() {
        let config: AppConfig = toml::from_str(
            r#"
            [listener]
            address = "0.0.0.0"
            port = 8443
            backlog = 32
            accept_timeout_secs = 10

            [tls]
            cert_path = "/etc/certs/server.pem"
            "#,
        )
        .unwrap();
        assert_eq!(config.listener.address, "0.0.0.0");
        assert_eq!(config.listener.port, 8443);
        assert_eq!(config.listener.backlog, 32);
        assert_eq!(config.listener.accept_timeout_secs, 10);
        let tls = config.tls.expect("tls table should parse");
        assert_eq!(tls.cert_path, "/etc/certs/server.pem");
        assert!(tls.passphrase.is_empty());
    }
}
