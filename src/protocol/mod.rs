//! HTTP/1.1 Wire Protocol
//!
//! This module frames requests from raw bytes and serializes responses back
//! to bytes. It handles exactly one request per connection: no chunked
//! transfer-encoding, no pipelining, no compression.
//!
//! ## Modules
//!
//! - `types`: `Request`, `Response`, `Content` and `StatusCode`
//! - `framer`: incremental request framing state machine
//! - `query`: request-target splitting and query decoding
//! - `response`: response serialization
//!
//! ## Example
//!
//! ```ignore
//! use jsonstore::protocol::{response, FrameLimits, RequestFramer, Response, StatusCode};
//! use bytes::BytesMut;
//!
//! let mut framer = RequestFramer::new(FrameLimits::default());
//! let mut buffer = BytesMut::from(&b"GET /echo?message=hi HTTP/1.1\r\n\r\n"[..]);
//! let request = framer.advance(&mut buffer)?.unwrap();
//!
//! let reply = Response::text(StatusCode::Ok, request.query["message"].as_str());
//! let bytes = response::build(reply, &codec).await?;
//! ```

pub mod framer;
pub mod query;
pub mod response;
pub mod types;

// Re-export commonly used types for convenience
pub use framer::{FrameError, FrameLimits, FramePhase, FramerState, RequestFramer};
pub use types::{content_type, Content, Request, Response, StatusCode};
