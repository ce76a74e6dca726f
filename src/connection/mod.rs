//! Connection Handler Module
//!
//! This module manages individual client connections. Each accepted socket
//! is handled by its own async task, gated by the connection limiter.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (server.rs)                              │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept() + spawn task
//!                        ▼
//!           ┌────────────────────────┐
//!           │  ConnectionLimiter     │  (limiter.rs, waits when full)
//!           └────────────┬───────────┘
//!                        │ permit
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌──────────────┐    ┌──────────────┐    ┌─────────────┐    │
//! │  │ RequestReader│───>│ Route/handle │───>│ Build resp  │    │
//! │  │ (reader.rs)  │    │  (routes)    │    │ (codec pool)│    │
//! │  └──────────────┘    └──────────────┘    └──────┬──────┘    │
//! │                                                 ▼           │
//! │                                          ┌─────────────┐    │
//! │                                          │ Send + close│    │
//! │                                          └─────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use jsonstore::config::ServerConfig;
//! use jsonstore::connection::handle_connection;
//! use jsonstore::server::ServerState;
//!
//! let state = ServerState::new(&ServerConfig::default())?;
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, state.clone()));
//! ```

pub mod handler;
pub mod limiter;
pub mod reader;

// Re-export commonly used types
pub use handler::{
    frame_error_status, handle_connection, ConnectionError, ConnectionHandler, ConnectionStats,
};
pub use limiter::{ConnectionLimiter, ConnectionPermit, LimiterError};
pub use reader::RequestReader;
