//! Response Builder
//!
//! Serializes a logical [`Response`] into wire bytes:
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Date: Fri, 16 Oct 2026 09:30:00 GMT\r\n
//! Content-Type: application/json; charset=utf-8\r\n
//! Content-Length: 28\r\n
//! Connection: keep-alive\r\n
//! \r\n
//! {"status":"success","id":1}
//! ```
//!
//! `Connection: keep-alive` is always advertised even though the server
//! closes every connection after one exchange.

use crate::codec::{CodecError, CodecPool};
use crate::protocol::types::{content_type, Content, Response, StatusCode, INTERNAL_ERROR_BODY};
use bytes::{Bytes, BytesMut};
use std::time::SystemTime;

/// Builds the wire bytes for a response.
///
/// JSON content is encoded on the codec pool and always emitted as
/// `application/json`, whatever content type the response declared.
/// The `Date` header is taken from the clock at build time.
pub async fn build(response: Response, codec: &CodecPool) -> Result<Bytes, CodecError> {
    let (body, content_type) = match response.content {
        Content::Bytes(bytes) => (bytes, response.content_type),
        Content::Text(text) => (Bytes::from(text), response.content_type),
        Content::Json(value) => (Bytes::from(codec.encode(value).await?), content_type::JSON),
    };

    Ok(encode(response.status, content_type, &body, SystemTime::now()))
}

/// The 500 response, built without touching the codec pool.
pub fn internal_error() -> Bytes {
    encode(
        StatusCode::InternalServerError,
        content_type::JSON,
        INTERNAL_ERROR_BODY,
        SystemTime::now(),
    )
}

/// Writes the status line, headers and body.
pub fn encode(status: StatusCode, content_type: &str, body: &[u8], date: SystemTime) -> Bytes {
    let head = format!(
        "HTTP/1.1 {status}\r\n\
         Date: {date}\r\n\
         Content-Type: {content_type}; charset=utf-8\r\n\
         Content-Length: {length}\r\n\
         Connection: keep-alive\r\n\
         \r\n",
        date = httpdate::fmt_http_date(date),
        length = body.len(),
    );

    let mut out = BytesMut::with_capacity(head.len() + body.len());
    out.extend_from_slice(head.as_bytes());
    out.extend_from_slice(body);
    out.freeze()
}
