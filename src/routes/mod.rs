//! Routing Module
//!
//! This module receives framed requests, picks a handler, and returns the
//! logical response for the connection to serialize.
//!
//! ## Architecture
//!
//! ```text
//! Framed Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  Route table    │  (table.rs, pure)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐      ┌─────────────┐
//! │ RequestHandler  │ ───> │  CodecPool  │  decode POST bodies
//! └────────┬────────┘      └─────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │   DataStore     │  (storage module)
//! └─────────────────┘
//! ```

pub mod handler;
pub mod table;

// Re-export the main request handler
pub use handler::{ClientError, HandlerError, RequestHandler};
pub use table::{resolve, Route};
