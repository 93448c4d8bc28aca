// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

/// Configuration for the spoolrelay server.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "spoolrelay", version, about = "Relays print jobs to connected print agents")]
pub struct RelayConfig {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "SPOOLRELAY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 9700, env = "SPOOLRELAY_PORT")]
    pub port: u16,

    /// WebSocket subprotocol agents must request.
    #[arg(long, default_value = "echo-protocol", env = "SPOOLRELAY_SUBPROTOCOL")]
    pub subprotocol: String,

    /// Job store URL.
    #[arg(long, default_value = "sqlite://spoolrelay.db", env = "SPOOLRELAY_DATABASE")]
    pub database: String,

    /// Maximum store connections.
    #[arg(long, default_value_t = 5, env = "SPOOLRELAY_DATABASE_MAX_CONNECTIONS")]
    pub database_max_connections: u32,

    /// Pending job poll interval in milliseconds.
    #[arg(long, default_value_t = 2000, env = "SPOOLRELAY_POLL_MS")]
    pub poll_ms: u64,

    /// Upper bound for the poll backoff after store failures, in milliseconds.
    #[arg(long, default_value_t = 30000, env = "SPOOLRELAY_STORE_BACKOFF_MAX_MS")]
    pub store_backoff_max_ms: u64,

    /// Comma-separated allowed origins. Empty allows every origin.
    #[arg(long, value_delimiter = ',', env = "SPOOLRELAY_ALLOWED_ORIGINS")]
    pub allowed_origins: Vec<String>,

    /// Frames buffered per session before the poller waits on the socket.
    #[arg(long, default_value_t = 64, env = "SPOOLRELAY_OUTBOUND_CAPACITY")]
    pub outbound_capacity: usize,

    /// Log filter (tracing `EnvFilter` syntax).
    #[arg(long, default_value = "info", env = "SPOOLRELAY_LOG_LEVEL")]
    pub log_level: String,

    /// Log format: `text` or `json`.
    #[arg(long, default_value = "text", env = "SPOOLRELAY_LOG_FORMAT")]
    pub log_format: String,
}

impl RelayConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms.max(1))
    }

    pub fn store_backoff_max(&self) -> Duration {
        Duration::from_millis(self.store_backoff_max_ms.max(self.poll_ms).max(1))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 9700,
            subprotocol: "echo-protocol".to_owned(),
            database: "sqlite://spoolrelay.db".to_owned(),
            database_max_connections: 5,
            poll_ms: 2000,
            store_backoff_max_ms: 30000,
            allowed_origins: Vec::new(),
            outbound_capacity: 64,
            log_level: "info".to_owned(),
            log_format: "text".to_owned(),
        }
    }
}
