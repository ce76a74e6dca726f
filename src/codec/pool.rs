//! Bounded JSON Worker Pool
//!
//! JSON parsing and serialization are CPU-bound. Running them on the Tokio
//! workers would stall every other connection's socket I/O for the duration
//! of a large encode, so they run on a fixed set of dedicated OS threads.
//!
//! ## Design
//!
//! ```text
//!  connection task                     codec-worker-0..N
//!  ───────────────                     ─────────────────
//!  decode(body) ──┐   bounded mpsc    ┌──> serde_json::from_str
//!                 ├──> [ job queue ] ──┤
//!  encode(value) ─┘                    └──> serde_json::to_vec
//!        ▲                                      │
//!        └──────────── oneshot reply ───────────┘
//! ```
//!
//! - Submitting a job suspends the calling task while the queue is full.
//! - The caller suspends again until its reply arrives; replies are not
//!   ordered across callers.
//! - A malformed payload comes back as [`CodecError::Decode`]. A panic inside
//!   a job is caught on the worker and comes back as
//!   [`CodecError::WorkerPanicked`]; the worker keeps serving.
//! - Workers exit once every [`CodecPool`] handle is dropped.

use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, trace};

/// Default depth of the job queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Errors returned by the codec pool.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The input was not valid JSON
    #[error("JSON decode error: {0}")]
    Decode(#[source] serde_json::Error),

    /// The value could not be serialized
    #[error("JSON encode error: {0}")]
    Encode(#[source] serde_json::Error),

    /// The job panicked on a worker thread
    #[error("codec worker panicked")]
    WorkerPanicked,

    /// All workers are gone
    #[error("codec pool is closed")]
    PoolClosed,

    /// A worker thread could not be started
    #[error("failed to spawn codec worker: {0}")]
    Spawn(#[source] std::io::Error),
}

type Reply<T> = oneshot::Sender<Result<T, CodecError>>;

/// A unit of work for a codec worker.
enum Job {
    Decode { input: String, reply: Reply<Value> },
    Encode { value: Value, reply: Reply<Vec<u8>> },
}

impl Job {
    fn run(self) {
        match self {
            Job::Decode { input, reply } => {
                let result = guarded(|| serde_json::from_str(&input).map_err(CodecError::Decode));
                // The caller may have gone away (client disconnected)
                let _ = reply.send(result);
            }
            Job::Encode { value, reply } => {
                let result = guarded(|| serde_json::to_vec(&value).map_err(CodecError::Encode));
                let _ = reply.send(result);
            }
        }
    }
}

/// Runs a job, turning a panic into [`CodecError::WorkerPanicked`].
fn guarded<T>(job: impl FnOnce() -> Result<T, CodecError>) -> Result<T, CodecError> {
    catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|_| {
        error!("Codec job panicked");
        Err(CodecError::WorkerPanicked)
    })
}

/// Handle to a pool of JSON codec worker threads.
///
/// Cloning is cheap; every clone submits to the same queue.
///
/// # Example
///
/// ```
/// use jsonstore::codec::CodecPool;
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = CodecPool::new(2, 64)?;
///
/// let value = pool.decode(r#"{"a":1}"#.to_string()).await?;
/// assert_eq!(value, json!({"a": 1}));
///
/// let bytes = pool.encode(value).await?;
/// assert_eq!(bytes, br#"{"a":1}"#);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CodecPool {
    sender: mpsc::Sender<Job>,
    workers: usize,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Job::Decode { input, .. } => f.debug_struct("Decode").field("len", &input.len()).finish(),
            Job::Encode { .. } => f.debug_struct("Encode").finish(),
        }
    }
}

impl CodecPool {
    /// Starts `workers` codec threads fed by a queue of `queue_capacity` jobs.
    ///
    /// Both values are raised to at least 1.
    pub fn new(workers: usize, queue_capacity: usize) -> Result<Self, CodecError> {
        let workers = workers.max(1);
        let (sender, receiver) = mpsc::channel::<Job>(queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        for id in 0..workers {
            let receiver = Arc::clone(&receiver);
            thread::Builder::new()
                .name(format!("codec-worker-{id}"))
                .spawn(move || worker_loop(id, receiver))
                .map_err(CodecError::Spawn)?;
        }

        debug!(workers, queue_capacity, "Codec pool started");

        Ok(Self { sender, workers })
    }

    /// A pool whose workers are already gone; every job fails with
    /// [`CodecError::PoolClosed`].
    #[cfg(test)]
    pub(crate) fn closed() -> Self {
        let (sender, _) = mpsc::channel::<Job>(1);
        Self { sender, workers: 0 }
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Parses a JSON document on a worker thread.
    pub async fn decode(&self, input: String) -> Result<Value, CodecError> {
        let (reply, response) = oneshot::channel();
        self.submit(Job::Decode { input, reply }).await?;
        response.await.map_err(|_| CodecError::PoolClosed)?
    }

    /// Serializes a JSON value on a worker thread.
    pub async fn encode(&self, value: Value) -> Result<Vec<u8>, CodecError> {
        let (reply, response) = oneshot::channel();
        self.submit(Job::Encode { value, reply }).await?;
        response.await.map_err(|_| CodecError::PoolClosed)?
    }

    async fn submit(&self, job: Job) -> Result<(), CodecError> {
        trace!(?job, "Submitting codec job");
        self.sender
            .send(job)
            .await
            .map_err(|_| CodecError::PoolClosed)
    }
}

/// Pulls jobs until every sender is dropped.
fn worker_loop(id: usize, receiver: Arc<Mutex<mpsc::Receiver<Job>>>) {
    loop {
        // The lock is released before the job runs so other workers can dequeue
        let job = {
            let mut receiver = receiver.lock().unwrap_or_else(PoisonError::into_inner);
            receiver.blocking_recv()
        };

        match job {
            Some(job) => job.run(),
            None => break,
        }
    }

    trace!(worker = id, "Codec worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_decode_object() {
        let pool = CodecPool::new(2, 8).unwrap();
        let value = pool.decode(r#"{"name":"Ariz","n":[1,2]}"#.to_string()).await.unwrap();
        assert_eq!(value, json!({"name": "Ariz", "n": [1, 2]}));
    }

    #[tokio::test]
    async fn test_decode_error_is_typed() {
        let pool = CodecPool::new(1, 8).unwrap();
        let result = pool.decode("not-json".to_string()).await;
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[tokio::test]
    async fn test_pool_survives_bad_input() {
        let pool = CodecPool::new(1, 8).unwrap();

        for _ in 0..3 {
            assert!(pool.decode("{".to_string()).await.is_err());
        }

        let value = pool.decode("[true]".to_string()).await.unwrap();
        assert_eq!(value, json!([true]));
    }

    #[tokio::test]
    async fn test_encode_preserves_field_order() {
        let pool = CodecPool::new(1, 8).unwrap();
        let value = pool.decode(r#"{"z":1,"a":2}"#.to_string()).await.unwrap();
        let bytes = pool.encode(value).await.unwrap();
        assert_eq!(bytes, br#"{"z":1,"a":2}"#);
    }

    #[tokio::test]
    async fn test_many_concurrent_jobs_on_small_pool() {
        let pool = CodecPool::new(2, 4).unwrap();
        let mut handles = Vec::new();

        for i in 0..64 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                let value = pool.decode(format!(r#"{{"i":{i}}}"#)).await.unwrap();
                let bytes = pool.encode(value).await.unwrap();
                (i, bytes)
            }));
        }

        for handle in handles {
            let (i, bytes) = handle.await.unwrap();
            assert_eq!(bytes, format!(r#"{{"i":{i}}}"#).into_bytes());
        }
    }

    #[test]
    fn test_guarded_catches_panics() {
        let result: Result<(), CodecError> = guarded(|| panic!("boom"));
        assert!(matches!(result, Err(CodecError::WorkerPanicked)));
    }

    #[test]
    fn test_worker_count_is_at_least_one() {
        let pool = CodecPool::new(0, 0).unwrap();
        assert_eq!(pool.workers(), 1);
    }
}
