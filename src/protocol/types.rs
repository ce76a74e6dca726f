//! HTTP Message Types
//!
//! This module defines the request and response values that flow through the
//! connection pipeline.
//!
//! ## Request
//!
//! A [`Request`] is produced once per connection by the framer and consumed
//! once by a single handler invocation:
//!
//! ```text
//! POST /data?debug=1 HTTP/1.1\r\n      method = "POST", path = "/data"
//! Content-Length: 7\r\n                query  = {"debug": "1"}
//! \r\n                                 headers = {"content-length": "7"}
//! {"a":1}                              body   = "{\"a\":1}"
//! ```
//!
//! ## Response
//!
//! A [`Response`] carries its payload as an explicit [`Content`] variant. The
//! response builder consumes every variant exhaustively; only
//! [`Content::Json`] needs the codec pool.

use crate::protocol::query::split_target;
use bytes::Bytes;
use serde_json::{json, Value};
use std::collections::HashMap;

/// The blank line separating the header block from the body
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Content types emitted by the server.
///
/// The response builder appends `; charset=utf-8` to each of these.
pub mod content_type {
    pub const HTML: &str = "text/html";
    pub const TEXT: &str = "text/plain";
    pub const JSON: &str = "application/json";
}

/// A fully framed HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Method token exactly as sent (`GET`, `POST`, ...)
    pub method: String,

    /// Request path with the query string removed
    pub path: String,

    /// Percent-decoded query parameters (last value wins)
    pub query: HashMap<String, String>,

    /// Header fields keyed by lowercased name (last value wins)
    pub headers: HashMap<String, String>,

    /// Body decoded as UTF-8 with invalid sequences replaced
    pub body: String,
}

impl Request {
    /// Builds a request from its request-target, splitting off and decoding
    /// the query string.
    pub fn from_parts(
        method: impl Into<String>,
        target: &str,
        headers: HashMap<String, String>,
        body: impl Into<String>,
    ) -> Self {
        let (path, query) = split_target(target);
        Self {
            method: method.into(),
            path,
            query,
            headers,
            body: body.into(),
        }
    }

    /// Looks up a header by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// HTTP status codes the server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok = 200,
    Created = 201,
    BadRequest = 400,
    NotFound = 404,
    RequestTimeout = 408,
    PayloadTooLarge = 413,
    InternalServerError = 500,
}

impl StatusCode {
    /// Returns the numeric status code.
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Returns the standard reason phrase.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::RequestTimeout => "Request Timeout",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

/// The payload of a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Raw bytes, written unchanged
    Bytes(Bytes),

    /// Text, written as UTF-8
    Text(String),

    /// A structured value that must be JSON-encoded by the codec pool.
    /// Always emitted as `application/json`.
    Json(Value),
}

/// Pre-encoded body for unexpected failures.
///
/// Kept as raw bytes so the 500 path never depends on the codec pool.
pub const INTERNAL_ERROR_BODY: &[u8] = br#"{"error":"Internal server error"}"#;

/// A logical response, serialized to wire bytes by the response builder.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub content: Content,
    pub content_type: &'static str,
}

impl Response {
    pub fn new(status: StatusCode, content: Content, content_type: &'static str) -> Self {
        Self {
            status,
            content,
            content_type,
        }
    }

    /// An HTML response.
    pub fn html(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status, Content::Text(body.into()), content_type::HTML)
    }

    /// A plain text response.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status, Content::Text(body.into()), content_type::TEXT)
    }

    /// A JSON response. The value is encoded later, off the I/O scheduler.
    pub fn json(status: StatusCode, value: Value) -> Self {
        Self::new(status, Content::Json(value), content_type::JSON)
    }

    /// A structured error: `{"error": <message>}`.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::json(status, json!({ "error": message.into() }))
    }

    /// The 500 response used when something unanticipated fails.
    pub fn internal_error() -> Self {
        Self::new(
            StatusCode::InternalServerError,
            Content::Bytes(Bytes::from_static(INTERNAL_ERROR_BODY)),
            content_type::JSON,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(StatusCode::Ok.to_string(), "200 OK");
        assert_eq!(StatusCode::Created.to_string(), "201 Created");
        assert_eq!(StatusCode::PayloadTooLarge.to_string(), "413 Payload Too Large");
    }

    #[test]
    fn test_request_from_parts_splits_query() {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());

        let request = Request::from_parts("GET", "/echo?message=hi%21", headers, "");

        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/echo");
        assert_eq!(request.query.get("message").map(String::as_str), Some("hi!"));
        assert_eq!(request.header("Content-Type"), Some("text/plain"));
        assert_eq!(request.header("accept"), None);
    }

    #[test]
    fn test_error_response_shape() {
        let response = Response::error(StatusCode::NotFound, "Item not found");
        assert_eq!(response.status, StatusCode::NotFound);
        assert_eq!(response.content_type, content_type::JSON);
        assert_eq!(
            response.content,
            Content::Json(json!({ "error": "Item not found" }))
        );
    }

    #[test]
    fn test_internal_error_body_is_valid_json() {
        let value: Value = serde_json::from_slice(INTERNAL_ERROR_BODY).unwrap();
        assert_eq!(value, json!({ "error": "Internal server error" }));
    }
}
