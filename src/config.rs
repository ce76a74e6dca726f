//! Server Configuration
//!
//! Every setting can be given on the command line or through an environment
//! variable; the command line wins.
//!
//! ```bash
//! jsonstore --port 9000 --max-connections 512 --body-timeout-ms 5000
//! JSONSTORE_PORT=9000 JSONSTORE_CODEC_WORKERS=4 jsonstore
//! ```

use crate::codec::DEFAULT_QUEUE_CAPACITY;
use crate::protocol::framer::{DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_HEADER_SIZE};
use crate::protocol::FrameLimits;
use clap::Parser;
use std::time::Duration;

/// Default listen backlog
pub const DEFAULT_BACKLOG: u32 = 10_000;

/// Default number of simultaneously processed connections
pub const DEFAULT_MAX_CONNECTIONS: usize = 15_000;

/// Default per-phase read timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// One codec worker per available core.
pub fn default_codec_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "jsonstore")]
#[command(about = "Minimal HTTP/1.1 JSON record store")]
#[command(version)]
pub struct ServerConfig {
    /// Host to bind to
    #[arg(long, default_value = crate::DEFAULT_HOST, env = "JSONSTORE_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = crate::DEFAULT_PORT, env = "JSONSTORE_PORT")]
    pub port: u16,

    /// Pending-connection queue length passed to listen()
    #[arg(long, default_value_t = DEFAULT_BACKLOG, env = "JSONSTORE_BACKLOG")]
    pub backlog: u32,

    /// Connections processed at once; further connections wait for a slot
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS, env = "JSONSTORE_MAX_CONNECTIONS")]
    pub max_connections: usize,

    /// Threads dedicated to JSON encoding and decoding
    #[arg(long, default_value_t = default_codec_workers(), env = "JSONSTORE_CODEC_WORKERS")]
    pub codec_workers: usize,

    /// Pending codec jobs before submitters wait
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY, env = "JSONSTORE_CODEC_QUEUE")]
    pub codec_queue: usize,

    /// Time allowed for the whole header block, in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS, env = "JSONSTORE_HEADER_TIMEOUT_MS")]
    pub header_timeout_ms: u64,

    /// Time allowed for the whole body, in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS, env = "JSONSTORE_BODY_TIMEOUT_MS")]
    pub body_timeout_ms: u64,

    /// Largest accepted Content-Length in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_SIZE, env = "JSONSTORE_MAX_BODY_SIZE")]
    pub max_body_size: usize,

    /// Largest accepted header block in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_HEADER_SIZE, env = "JSONSTORE_MAX_HEADER_SIZE")]
    pub max_header_size: usize,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info", env = "JSONSTORE_LOG_LEVEL")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            codec_workers: default_codec_workers(),
            codec_queue: DEFAULT_QUEUE_CAPACITY,
            header_timeout_ms: DEFAULT_TIMEOUT_MS,
            body_timeout_ms: DEFAULT_TIMEOUT_MS,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Parses the process arguments and environment.
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Framing limits for each connection.
    pub fn frame_limits(&self) -> FrameLimits {
        FrameLimits {
            max_header_size: self.max_header_size,
            max_body_size: self.max_body_size,
            header_timeout: Duration::from_millis(self.header_timeout_ms),
            body_timeout: Duration::from_millis(self.body_timeout_ms),
        }
    }
}
