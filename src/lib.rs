//! # jsonstore - A Minimal HTTP/1.1 JSON Record Store
//!
//! jsonstore is a small HTTP/1.1 server written directly on top of TCP. It
//! frames requests itself, keeps JSON records in memory, and offloads every
//! JSON encode and decode to a dedicated thread pool so the I/O workers never
//! stall on CPU-bound work.
//!
//! ## Features
//!
//! - **Admission control**: a bounded permit pool caps in-flight connections
//! - **Incremental framing**: a sans-I/O state machine with per-phase timeouts
//!   and size caps
//! - **Codec offload**: JSON work runs on its own fixed pool of threads
//! - **In-memory store**: records with server-assigned, never reused IDs
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              jsonstore                                  │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Request    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │         │                  │                  │                         │
//! │         ▼                  ▼                  ▼                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ Connection  │    │  Request    │    │  DataStore  │                  │
//! │  │  Limiter    │    │  Framer     │    │  (RwLock)   │                  │
//! │  └─────────────┘    └─────────────┘    └─────────────┘                  │
//! │                                                                         │
//! │                     ┌─────────────────────────────────────────────────┐ │
//! │                     │   CodecPool (codec-worker-0 .. codec-worker-N)  │ │
//! │                     │   JSON decode of bodies, encode of responses    │ │
//! │                     └─────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use jsonstore::config::ServerConfig;
//! use jsonstore::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = Server::bind(&ServerConfig::default()).await?;
//!     server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Endpoints
//!
//! - `GET /` - welcome page
//! - `GET /echo?message=<text>` - echoes the message as plain text
//! - `GET /data` - every record, ascending by ID
//! - `GET /data/<id>` - one record
//! - `POST /data` - stores a JSON body and returns its ID
//! - `DELETE /data/<id>` - removes a record
//!
//! ## Module Overview
//!
//! - [`protocol`]: request framing, request/response types, serialization
//! - [`codec`]: the JSON offload pool
//! - [`routes`]: route table and request handlers
//! - [`storage`]: the in-memory record store
//! - [`connection`]: admission control and per-connection processing
//! - [`server`]: listener and accept loop
//! - [`config`]: command-line and environment configuration

pub mod codec;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod routes;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use codec::{CodecError, CodecPool};
pub use config::ServerConfig;
pub use connection::{handle_connection, ConnectionLimiter, ConnectionStats};
pub use protocol::{FrameError, FrameLimits, Request, RequestFramer, Response, StatusCode};
pub use routes::RequestHandler;
pub use server::{Server, ServerError, ServerState};
pub use storage::DataStore;

/// The default port jsonstore listens on
pub const DEFAULT_PORT: u16 = 8080;

/// The default host jsonstore binds to
pub const DEFAULT_HOST: &str = "localhost";

/// Version of jsonstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
