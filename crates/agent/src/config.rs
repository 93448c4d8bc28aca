// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the print agent.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "spoolagent", version, about = "Prints jobs relayed by a spoolrelay server")]
pub struct AgentConfig {
    /// Relay WebSocket URL.
    #[arg(long, default_value = "ws://127.0.0.1:9700/ws", env = "SPOOLAGENT_SERVER_URL")]
    pub server_url: String,

    /// WebSocket subprotocol to request.
    #[arg(long, default_value = "echo-protocol", env = "SPOOLAGENT_SUBPROTOCOL")]
    pub subprotocol: String,

    /// Identifier to register with instead of the hardware address.
    #[arg(long, env = "SPOOLAGENT_IDENTIFIER")]
    pub identifier: Option<String>,

    /// Delay between reconnect attempts in milliseconds.
    #[arg(long, default_value_t = 3000, env = "SPOOLAGENT_RETRY_MS")]
    pub retry_ms: u64,

    /// Reconnect attempts before giving up.
    #[arg(long, default_value_t = 9_999_999_999_999, env = "SPOOLAGENT_MAX_RETRIES")]
    pub max_retries: u64,

    /// Concurrent print commands.
    #[arg(long, default_value_t = 2, env = "SPOOLAGENT_WORKERS")]
    pub workers: usize,

    /// Jobs waiting for a worker before new ones are rejected.
    #[arg(long, default_value_t = 32, env = "SPOOLAGENT_QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Reports buffered while disconnected.
    #[arg(long, default_value_t = 64, env = "SPOOLAGENT_REPORT_CAPACITY")]
    pub report_capacity: usize,

    /// Print submission program, invoked as `<program> -d <destination> <file>`.
    #[arg(long, default_value = "lp", env = "SPOOLAGENT_PRINT_PROGRAM")]
    pub print_program: String,

    /// Directory for spooled job files (default: system temp dir).
    #[arg(long, env = "SPOOLAGENT_SPOOL_DIR")]
    pub spool_dir: Option<PathBuf>,

    /// Log filter (tracing `EnvFilter` syntax).
    #[arg(long, default_value = "info", env = "SPOOLAGENT_LOG_LEVEL")]
    pub log_level: String,

    /// Log format: `text` or `json`.
    #[arg(long, default_value = "text", env = "SPOOLAGENT_LOG_FORMAT")]
    pub log_format: String,
}

impl AgentConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_ms)
    }

    pub fn spool_dir(&self) -> PathBuf {
        self.spool_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:9700/ws".to_owned(),
            subprotocol: "echo-protocol".to_owned(),
            identifier: None,
            retry_ms: 3000,
            max_retries: 9_999_999_999_999,
            workers: 2,
            queue_capacity: 32,
            report_capacity: 64,
            print_program: "lp".to_owned(),
            spool_dir: None,
            log_level: "info".to_owned(),
            log_format: "text".to_owned(),
        }
    }
}
