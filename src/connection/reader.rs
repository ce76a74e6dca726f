//! Timed Request Reader
//!
//! Drives a [`RequestFramer`] from any `AsyncRead`, applying the per-phase
//! timeouts:
//!
//! - the header deadline starts when reading begins
//! - the body deadline starts when the header block has been parsed
//!
//! Each deadline covers its whole phase, however many reads that takes, and
//! is never extended.

use crate::connection::handler::ConnectionError;
use crate::protocol::{FrameError, FrameLimits, FramePhase, Request, RequestFramer};
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{timeout_at, Instant};
use tracing::trace;

/// Reads bytes until one request is framed.
#[derive(Debug)]
pub struct RequestReader {
    framer: RequestFramer,
    header_deadline: Option<Instant>,
    body_deadline: Option<Instant>,
    bytes_read: usize,
}

impl RequestReader {
    pub fn new(limits: FrameLimits) -> Self {
        Self {
            framer: RequestFramer::new(limits),
            header_deadline: None,
            body_deadline: None,
            bytes_read: 0,
        }
    }

    /// Total bytes pulled from the stream so far.
    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    /// Reads from `stream` into `buffer` until a request is complete.
    ///
    /// # Errors
    ///
    /// - [`ConnectionError::Frame`] - framing failed or a phase timed out
    /// - [`ConnectionError::ClientDisconnected`] - the peer closed before
    ///   sending a single byte
    /// - [`ConnectionError::IoError`] - the socket failed
    pub async fn read<R>(
        &mut self,
        stream: &mut R,
        buffer: &mut BytesMut,
    ) -> Result<Request, ConnectionError>
    where
        R: AsyncRead + Unpin,
    {
        let limits = *self.framer.limits();
        let header_deadline = *self
            .header_deadline
            .get_or_insert_with(|| Instant::now() + limits.header_timeout);

        loop {
            if let Some(request) = self.framer.advance(buffer)? {
                return Ok(request);
            }

            let Some(phase) = self.framer.phase() else {
                // advance() only returns Ok(None) without a phase after completion
                return Err(ConnectionError::Frame(FrameError::Incomplete));
            };

            let deadline = match phase {
                FramePhase::Headers => header_deadline,
                FramePhase::Body => *self
                    .body_deadline
                    .get_or_insert_with(|| Instant::now() + limits.body_timeout),
            };

            let n = match timeout_at(deadline, stream.read_buf(buffer)).await {
                Ok(result) => result?,
                Err(_) => return Err(self.framer.fail(FrameError::Timeout(phase)).into()),
            };

            if n == 0 {
                if phase == FramePhase::Headers && buffer.is_empty() && self.bytes_read == 0 {
                    return Err(ConnectionError::ClientDisconnected);
                }
                return Err(self.framer.fail(FrameError::Incomplete).into());
            }

            self.bytes_read += n;
            trace!(bytes = n, buffered = buffer.len(), ?phase, "Read data");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::io::Builder;

    fn limits(header_ms: u64, body_ms: u64) -> FrameLimits {
        FrameLimits {
            header_timeout: Duration::from_millis(header_ms),
            body_timeout: Duration::from_millis(body_ms),
            ..FrameLimits::default()
        }
    }

    async fn read_with(
        mut stream: impl AsyncRead + Unpin,
        limits: FrameLimits,
    ) -> Result<Request, ConnectionError> {
        let mut buffer = BytesMut::new();
        RequestReader::new(limits).read(&mut stream, &mut buffer).await
    }

    #[tokio::test]
    async fn test_read_across_chunks() {
        let stream = Builder::new()
            .read(b"POST /data HT")
            .read(b"TP/1.1\r\nContent-Length: 7\r\n\r\n")
            .read(b"{\"a\"")
            .read(b":1}")
            .build();

        let request = read_with(stream, FrameLimits::default()).await.unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.body, "{\"a\":1}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_header_timeout() {
        let stream = Builder::new()
            .read(b"GET / HTTP/1.1\r\n")
            .wait(Duration::from_secs(10))
            .build();

        let result = read_with(stream, limits(1_000, 1_000)).await;
        assert!(matches!(
            result,
            Err(ConnectionError::Frame(FrameError::Timeout(FramePhase::Headers)))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_header_timeout_is_not_renewed_by_progress() {
        // Each chunk arrives well within the timeout, but the phase as a whole does not
        let stream = Builder::new()
            .read(b"GET / HTTP/1.1\r\n")
            .wait(Duration::from_millis(600))
            .read(b"Host: a\r\n")
            .wait(Duration::from_millis(600))
            .build();

        let result = read_with(stream, limits(1_000, 1_000)).await;
        assert!(matches!(
            result,
            Err(ConnectionError::Frame(FrameError::Timeout(FramePhase::Headers)))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_body_timeout() {
        let stream = Builder::new()
            .read(b"POST /data HTTP/1.1\r\nContent-Length: 10\r\n\r\n{\"a\"")
            .wait(Duration::from_secs(10))
            .build();

        let result = read_with(stream, limits(1_000, 1_000)).await;
        assert!(matches!(
            result,
            Err(ConnectionError::Frame(FrameError::Timeout(FramePhase::Body)))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_body_phase_gets_its_own_deadline() {
        // Headers take 900ms of a 1s budget; the body still gets a fresh 1s
        let stream = Builder::new()
            .wait(Duration::from_millis(900))
            .read(b"POST /data HTTP/1.1\r\nContent-Length: 2\r\n\r\n")
            .wait(Duration::from_millis(900))
            .read(b"{}")
            .build();

        let request = read_with(stream, limits(1_000, 1_000)).await.unwrap();
        assert_eq!(request.body, "{}");
    }

    #[tokio::test]
    async fn test_premature_close_in_body() {
        let stream = Builder::new()
            .read(b"POST /data HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc")
            .build();

        let result = read_with(stream, FrameLimits::default()).await;
        assert!(matches!(
            result,
            Err(ConnectionError::Frame(FrameError::Incomplete))
        ));
    }

    #[tokio::test]
    async fn test_premature_close_in_headers() {
        let stream = Builder::new().read(b"GET / HTTP/1.1\r\n").build();

        let result = read_with(stream, FrameLimits::default()).await;
        assert!(matches!(
            result,
            Err(ConnectionError::Frame(FrameError::Incomplete))
        ));
    }

    #[tokio::test]
    async fn test_close_before_any_bytes() {
        let stream = Builder::new().build();

        let result = read_with(stream, FrameLimits::default()).await;
        assert!(matches!(result, Err(ConnectionError::ClientDisconnected)));
    }

    #[tokio::test]
    async fn test_oversized_body_rejected_without_reading_it() {
        // The mock panics on drop if any scripted read is left unconsumed, so
        // the reader must stop right after the header block.
        let stream = Builder::new()
            .read(b"POST /data HTTP/1.1\r\nContent-Length: 4096\r\n\r\n")
            .build();

        let limits = FrameLimits {
            max_body_size: 1024,
            ..FrameLimits::default()
        };
        let result = read_with(stream, limits).await;
        assert!(matches!(
            result,
            Err(ConnectionError::Frame(FrameError::TooLarge { size: 4096, max: 1024 }))
        ));
    }

    #[tokio::test]
    async fn test_io_error_propagates() {
        let stream = Builder::new()
            .read(b"GET / HT")
            .read_error(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"))
            .build();

        let result = read_with(stream, FrameLimits::default()).await;
        match result {
            Err(e) => assert!(e.is_disconnect()),
            Ok(_) => panic!("expected an error"),
        }
    }
}
