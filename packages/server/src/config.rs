//! Server configuration (command line flags and environment variables).

use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::{domain::UserId, ui::TransportSettings};

#[derive(Parser, Debug, Clone)]
#[command(name = "quill-server")]
#[command(about = "Real-time collaboration server: project rooms, presence, cursors and comments", long_about = None)]
pub struct ServerConfig {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "QUILL_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "QUILL_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Capacity of each connection's outbound queue
    #[arg(long, env = "QUILL_OUTBOUND_BUFFER", default_value_t = 256, value_parser = clap::value_parser!(u32).range(1..))]
    pub outbound_buffer: u32,

    /// Upper bound for a single comment store call, in milliseconds
    #[arg(long, env = "QUILL_COMMENT_STORE_TIMEOUT_MS", default_value_t = 3000)]
    pub comment_store_timeout_ms: u64,

    /// Interval between server pings, in seconds
    #[arg(long, env = "QUILL_HEARTBEAT_INTERVAL_SECS", default_value_t = 15, value_parser = clap::value_parser!(u64).range(1..))]
    pub heartbeat_interval_secs: u64,

    /// Reap connections that send nothing for this many seconds
    #[arg(long, env = "QUILL_IDLE_TIMEOUT_SECS", default_value_t = 45, value_parser = clap::value_parser!(u64).range(1..))]
    pub idle_timeout_secs: u64,

    /// JSON file mapping access tokens to users
    #[arg(long, env = "QUILL_TOKENS_FILE")]
    pub tokens_file: Option<PathBuf>,

    /// Base URL of the REST comment store (in-memory store when omitted)
    #[arg(long, env = "QUILL_COMMENT_STORE_URL")]
    pub comment_store_url: Option<String>,

    /// Comma-separated user ids allowed to delete or resolve any comment
    #[arg(long, env = "QUILL_ADMIN_USERS", value_delimiter = ',')]
    pub admin_users: Vec<String>,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "debug")]
    pub log_level: String,
}

impl ServerConfig {
    pub fn transport(&self) -> TransportSettings {
        TransportSettings {
            outbound_buffer: self.outbound_buffer as usize,
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
        }
    }

    pub fn comment_store_timeout(&self) -> Duration {
        Duration::from_millis(self.comment_store_timeout_ms)
    }

    /// Admin user ids, skipping blank entries
    pub fn admins(&self) -> Vec<UserId> {
        self.admin_users
            .iter()
            .filter_map(|id| UserId::new(id.trim().to_string()).ok())
            .collect()
    }
}
