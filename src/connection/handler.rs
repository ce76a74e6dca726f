//! Connection Handler Module
//!
//! This module handles individual client connections. Each accepted socket
//! gets its own task, which holds a limiter permit for its whole lifetime
//! and carries exactly one request/response exchange.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. Wait for a limiter permit
//!        │
//!        ▼
//! 3. ┌──────────────────────────────────────┐
//!    │  Read head (header timeout)          │──┐
//!    │              │                       │  │ framing failure
//!    │              ▼                       │  │ (400 / 408 / 413)
//!    │  Read body (body timeout)            │──┤
//!    │              │                       │  │
//!    │              ▼                       │  │
//!    │  Route + handle (isolated task)      │  │
//!    │              │                       │  │
//!    │              ▼                       │  │
//!    │  Build + write response  ◄───────────┼──┘
//!    └──────────────────────────────────────┘
//!        │
//!        ▼
//! 4. Shut down the socket, release the permit
//! ```
//!
//! There is no second read on the same socket, even though responses carry
//! `Connection: keep-alive`.

use crate::codec::CodecPool;
use crate::connection::limiter::ConnectionPermit;
use crate::connection::reader::RequestReader;
use crate::protocol::{response, FrameError, Request, Response, StatusCode};
use crate::routes::RequestHandler;
use crate::server::ServerState;
use bytes::{Bytes, BytesMut};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, error, info, trace, warn};

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections admitted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Requests that were routed and answered
    pub requests_completed: AtomicU64,
    /// Connections rejected during framing
    pub frame_failures: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn request_completed(&self) {
        self.requests_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_failed(&self) {
        self.frame_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Maps a framing failure to the status sent back to the client.
pub fn frame_error_status(error: &FrameError) -> StatusCode {
    match error {
        FrameError::Malformed(_) | FrameError::Incomplete => StatusCode::BadRequest,
        FrameError::Timeout(_) => StatusCode::RequestTimeout,
        FrameError::TooLarge { .. } => StatusCode::PayloadTooLarge,
    }
}

/// Handles a single client connection.
///
/// Owns the socket, the read buffer, and the limiter permit. Dropping the
/// handler closes the socket and returns the permit.
pub struct ConnectionHandler {
    /// The TCP stream for this connection
    stream: BufWriter<TcpStream>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// Timed reader driving the framer
    reader: RequestReader,

    /// Routes and executes requests (shared across connections)
    request_handler: RequestHandler,

    /// Encodes JSON response bodies
    codec: CodecPool,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,

    _permit: ConnectionPermit,
}

impl ConnectionHandler {
    /// Creates a new connection handler for an admitted connection.
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        state: &ServerState,
        permit: ConnectionPermit,
    ) -> Self {
        state.stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            reader: RequestReader::new(state.limits),
            request_handler: RequestHandler::new(Arc::clone(&state.store), state.codec.clone()),
            codec: state.codec.clone(),
            stats: Arc::clone(&state.stats),
            _permit: permit,
        }
    }

    /// Serves the single exchange, then closes the connection.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        trace!(client = %self.addr, "Client connected");

        let result = self.serve().await;

        match &result {
            Ok(()) => {}
            Err(e) if e.is_disconnect() => {
                debug!(client = %self.addr, error = %e, "Client disconnected")
            }
            Err(ConnectionError::Frame(_)) => {}
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        if let Err(e) = self.stream.shutdown().await {
            trace!(client = %self.addr, error = %e, "Socket shutdown failed");
        }
        self.stats.connection_closed();
        result
    }

    /// Reads one request, answers it.
    async fn serve(&mut self) -> Result<(), ConnectionError> {
        let started = Instant::now();
        let read = self.reader.read(self.stream.get_mut(), &mut self.buffer).await;
        self.stats.bytes_read(self.reader.bytes_read());

        let request = match read {
            Ok(request) => request,
            Err(ConnectionError::Frame(e)) => {
                self.stats.frame_failed();
                let status = frame_error_status(&e);
                warn!(client = %self.addr, error = %e, status = status.as_u16(), "Framing failed");

                let bytes = self.render(Response::error(status, e.to_string())).await;
                self.send(&bytes).await?;
                return Err(ConnectionError::Frame(e));
            }
            Err(e) => return Err(e),
        };

        let method = request.method.clone();
        let path = request.path.clone();

        let response = self.dispatch(request).await;
        let status = response.status;
        let bytes = self.render(response).await;
        self.send(&bytes).await?;
        self.stats.request_completed();

        info!(
            client = %self.addr,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "{} {} => {}",
            method,
            path,
            status.as_u16()
        );
        Ok(())
    }

    /// Runs the request handler in its own task so a panic becomes a 500
    /// instead of tearing down the connection task.
    async fn dispatch(&self, request: Request) -> Response {
        let handler = self.request_handler.clone();

        match tokio::spawn(async move { handler.handle(request).await }).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!(client = %self.addr, error = %e, "Handler failed");
                Response::internal_error()
            }
            Err(e) => {
                error!(client = %self.addr, error = %e, "Handler panicked");
                Response::internal_error()
            }
        }
    }

    /// Serializes a response, falling back to the pre-encoded 500.
    async fn render(&self, reply: Response) -> Bytes {
        match response::build(reply, &self.codec).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(client = %self.addr, error = %e, "Response encoding failed");
                response::internal_error()
            }
        }
    }

    /// Sends response bytes to the client.
    async fn send(&mut self, bytes: &[u8]) -> Result<(), ConnectionError> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(client = %self.addr, bytes = bytes.len(), "Sent response");
        Ok(())
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The request could not be framed
    #[error("Framing error: {0}")]
    Frame(#[from] FrameError),

    /// Client closed the connection before sending anything
    #[error("Client disconnected")]
    ClientDisconnected,
}

impl ConnectionError {
    /// Whether the peer went away (close, reset, abort, broken pipe).
    pub fn is_disconnect(&self) -> bool {
        match self {
            ConnectionError::ClientDisconnected => true,
            ConnectionError::IoError(e) => matches!(
                e.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

/// Handles a client connection.
///
/// Waits for a limiter permit before reading any bytes, then runs a
/// [`ConnectionHandler`] to completion. If the limiter is closed the socket
/// is dropped unanswered.
pub async fn handle_connection(stream: TcpStream, addr: SocketAddr, state: ServerState) {
    let permit = match state.limiter.acquire().await {
        Ok(permit) => permit,
        Err(e) => {
            debug!(client = %addr, error = %e, "Connection refused");
            return;
        }
    };

    let handler = ConnectionHandler::new(stream, addr, &state, permit);
    if let Err(e) = handler.run().await {
        trace!(client = %addr, error = %e, "Connection ended with error");
    }
}
