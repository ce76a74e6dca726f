//! Incremental HTTP Request Framer
//!
//! This module turns a raw byte stream into a single [`Request`]. It is a
//! sans-I/O state machine: the caller appends socket data to a `BytesMut` and
//! calls [`RequestFramer::advance`] until it yields a request or fails.
//!
//! ## States
//!
//! ```text
//!                 CRLFCRLF seen,            Content-Length
//!                 head parsed               bytes buffered
//! ReadingHeaders ───────────────> ReadingBody ───────────────> Complete
//!       │                              │
//!       │ bad request line,            │ timeout / EOF
//!       │ bad Content-Length,          │ (reported by the reader)
//!       │ body or header too large     │
//!       ▼                              ▼
//!  Failed(kind) <──────────────────────┘
//! ```
//!
//! `Failed` is absorbing: every later call returns the same error.
//!
//! The framer checks `Content-Length` against the body cap as soon as the
//! header block is parsed, so an oversized payload is rejected before any of
//! its bytes are requested from the socket.
//!
//! While waiting for the header block, the framer remembers how far it has
//! already searched for CRLFCRLF, so each call only scans newly arrived bytes.
//!
//! Timeouts are not measured here. The connection reader owns the clock and
//! reports a timeout through [`RequestFramer::fail`].

use crate::protocol::types::{Request, HEADER_TERMINATOR};
use bytes::BytesMut;
use std::collections::HashMap;
use std::num::IntErrorKind;
use std::time::Duration;
use thiserror::Error;

/// Default cap on the header block (64 KB)
pub const DEFAULT_MAX_HEADER_SIZE: usize = 64 * 1024;

/// Default cap on the request body (2 MB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Default per-phase read timeout
pub const DEFAULT_PHASE_TIMEOUT: Duration = Duration::from_secs(60);

/// The phase a framer is waiting in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Headers,
    Body,
}

impl std::fmt::Display for FramePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FramePhase::Headers => write!(f, "header"),
            FramePhase::Body => write!(f, "body"),
        }
    }
}

/// Reasons a request could not be framed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Bad request line or header value
    #[error("malformed request: {0}")]
    Malformed(String),

    /// A read phase did not finish in time
    #[error("{0} read timed out")]
    Timeout(FramePhase),

    /// The declared body or the header block exceeds its cap
    #[error("request too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },

    /// The peer closed the stream mid-request
    #[error("incomplete request")]
    Incomplete,
}

/// Size and time limits applied while framing one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    pub max_header_size: usize,
    pub max_body_size: usize,
    pub header_timeout: Duration,
    pub body_timeout: Duration,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            header_timeout: DEFAULT_PHASE_TIMEOUT,
            body_timeout: DEFAULT_PHASE_TIMEOUT,
        }
    }
}

/// The parsed request line and header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub target: String,
    pub headers: HashMap<String, String>,
}

impl RequestHead {
    /// Reads `Content-Length`. Absent means zero.
    fn content_length(&self) -> Result<usize, FrameError> {
        let Some(value) = self.headers.get("content-length") else {
            return Ok(0);
        };

        match value.parse::<usize>() {
            Ok(length) => Ok(length),
            // All digits, just too big to represent: saturate so the body cap rejects it
            Err(e) if *e.kind() == IntErrorKind::PosOverflow => Ok(usize::MAX),
            Err(_) => Err(FrameError::Malformed(format!(
                "invalid Content-Length: {value:?}"
            ))),
        }
    }

    fn into_request(self, body: &[u8]) -> Request {
        let body = String::from_utf8_lossy(body).into_owned();
        Request::from_parts(self.method, &self.target, self.headers, body)
    }
}

/// Current state of a [`RequestFramer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramerState {
    /// `scanned` bytes at the front of the buffer hold no CRLFCRLF
    ReadingHeaders { scanned: usize },
    ReadingBody {
        head: RequestHead,
        content_length: usize,
    },
    Complete,
    Failed(FrameError),
}

/// Frames exactly one request from a growing buffer.
///
/// # Example
///
/// ```
/// use jsonstore::protocol::{FrameLimits, RequestFramer};
/// use bytes::BytesMut;
///
/// let mut framer = RequestFramer::new(FrameLimits::default());
/// let mut buffer = BytesMut::from(&b"GET /echo?msg=hi HTTP/1.1\r\n"[..]);
///
/// assert!(framer.advance(&mut buffer).unwrap().is_none());
///
/// buffer.extend_from_slice(b"Host: localhost\r\n\r\n");
/// let request = framer.advance(&mut buffer).unwrap().unwrap();
/// assert_eq!(request.path, "/echo");
/// ```
#[derive(Debug)]
pub struct RequestFramer {
    state: FramerState,
    limits: FrameLimits,
}

impl RequestFramer {
    pub fn new(limits: FrameLimits) -> Self {
        Self {
            state: FramerState::ReadingHeaders { scanned: 0 },
            limits,
        }
    }

    pub fn state(&self) -> &FramerState {
        &self.state
    }

    pub fn limits(&self) -> &FrameLimits {
        &self.limits
    }

    /// The phase still waiting for bytes, or `None` once finished.
    pub fn phase(&self) -> Option<FramePhase> {
        match self.state {
            FramerState::ReadingHeaders { .. } => Some(FramePhase::Headers),
            FramerState::ReadingBody { .. } => Some(FramePhase::Body),
            FramerState::Complete | FramerState::Failed(_) => None,
        }
    }

    /// Moves the framer into the absorbing `Failed` state.
    pub fn fail(&mut self, error: FrameError) -> FrameError {
        self.state = FramerState::Failed(error.clone());
        error
    }

    /// Consumes as much of `buf` as the current state allows.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(request))` - the request is complete
    /// - `Ok(None)` - more bytes are needed (or the request was already taken)
    /// - `Err(e)` - framing failed; the framer is now `Failed`
    pub fn advance(&mut self, buf: &mut BytesMut) -> Result<Option<Request>, FrameError> {
        loop {
            match std::mem::replace(&mut self.state, FramerState::Complete) {
                FramerState::ReadingHeaders { scanned } => match self.read_head(buf, scanned) {
                    Ok(next @ FramerState::ReadingHeaders { .. }) => {
                        self.state = next;
                        return Ok(None);
                    }
                    Ok(next) => self.state = next,
                    Err(e) => return Err(self.fail(e)),
                },
                FramerState::ReadingBody {
                    head,
                    content_length,
                } => {
                    if buf.len() < content_length {
                        self.state = FramerState::ReadingBody {
                            head,
                            content_length,
                        };
                        return Ok(None);
                    }

                    let body = buf.split_to(content_length);
                    return Ok(Some(head.into_request(&body)));
                }
                FramerState::Complete => return Ok(None),
                FramerState::Failed(e) => return Err(self.fail(e)),
            }
        }
    }

    /// Looks for the end of the header block and parses it.
    ///
    /// Returns `ReadingHeaders` with the new scan offset while the block is
    /// still incomplete.
    fn read_head(&self, buf: &mut BytesMut, scanned: usize) -> Result<FramerState, FrameError> {
        let end = find_header_end(buf, scanned);
        let header_size = end.unwrap_or(buf.len());
        if header_size > self.limits.max_header_size {
            return Err(FrameError::TooLarge {
                size: header_size,
                max: self.limits.max_header_size,
            });
        }
        let Some(end) = end else {
            return Ok(FramerState::ReadingHeaders { scanned: buf.len() });
        };

        let block = buf.split_to(end + HEADER_TERMINATOR.len());
        let head = parse_head(&block[..end])?;
        let content_length = head.content_length()?;

        if content_length > self.limits.max_body_size {
            return Err(FrameError::TooLarge {
                size: content_length,
                max: self.limits.max_body_size,
            });
        }

        Ok(FramerState::ReadingBody {
            head,
            content_length,
        })
    }
}

/// Parses the request line and header fields of a header block.
///
/// `block` excludes the terminating CRLFCRLF.
fn parse_head(block: &[u8]) -> Result<RequestHead, FrameError> {
    let text = String::from_utf8_lossy(block);
    let mut lines = text.split("\r\n");

    let request_line = lines.next().unwrap_or_default();
    let mut tokens = request_line.split_whitespace();
    let (Some(method), Some(target)) = (tokens.next(), tokens.next()) else {
        return Err(FrameError::Malformed(format!(
            "invalid request line: {request_line:?}"
        )));
    };

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        // Lines without a colon carry no field and are skipped
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    Ok(RequestHead {
        method: method.to_string(),
        target: target.to_string(),
        headers,
    })
}

/// Finds the start of the CRLFCRLF that ends the header block.
///
/// The first `scanned` bytes are known not to contain it; the search backs up
/// a few bytes so a terminator split across reads is still found.
#[inline]
fn find_header_end(buf: &[u8], scanned: usize) -> Option<usize> {
    let start = scanned
        .min(buf.len())
        .saturating_sub(HEADER_TERMINATOR.len() - 1);

    buf[start..]
        .windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
        .map(|offset| start + offset)
}
