//! JSON Codec Offload
//!
//! Every JSON decode of a request body and every JSON encode of a response
//! body runs on [`CodecPool`], a fixed set of worker threads kept apart from
//! the Tokio workers that drive socket I/O.

pub mod pool;

pub use pool::{CodecError, CodecPool, DEFAULT_QUEUE_CAPACITY};
