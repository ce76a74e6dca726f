//! Connection Admission Control
//!
//! A counting permit pool that bounds how many connections are processed at
//! once. A connection acquires one permit before any of its bytes are read
//! and holds it until the connection task ends.
//!
//! The permit is released by `Drop`, so every exit path returns it: a normal
//! response, a framing failure, a client reset, an early `?` return, or a
//! panic that unwinds the task.
//!
//! Waiters are woken in FIFO order (Tokio's semaphore is fair).

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::debug;

/// Errors returned when acquiring a permit.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LimiterError {
    /// The limiter was closed (server shutting down)
    #[error("connection limiter is closed")]
    Closed,
}

/// Bounded admission gate for in-flight connections.
#[derive(Debug, Clone)]
pub struct ConnectionLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ConnectionLimiter {
    /// Creates a limiter with `capacity` permits (at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits for a permit.
    pub async fn acquire(&self) -> Result<ConnectionPermit, LimiterError> {
        let permit = match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => permit,
            Err(TryAcquireError::Closed) => return Err(LimiterError::Closed),
            Err(TryAcquireError::NoPermits) => {
                debug!(capacity = self.capacity, "Connection limit reached, waiting for a permit");
                Arc::clone(&self.semaphore)
                    .acquire_owned()
                    .await
                    .map_err(|_| LimiterError::Closed)?
            }
        };

        Ok(ConnectionPermit { _permit: permit })
    }

    /// Configured number of permits.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Number of permits currently held.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.available()
    }

    /// Closes the limiter. Pending and future acquisitions fail.
    pub fn close(&self) {
        self.semaphore.close();
    }
}

/// A held connection slot, returned to the limiter on drop.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_acquire_and_release() {
        let limiter = ConnectionLimiter::new(2);

        let first = limiter.acquire().await.unwrap();
        let _second = limiter.acquire().await.unwrap();
        assert_eq!(limiter.available(), 0);
        assert_eq!(limiter.in_flight(), 2);

        drop(first);
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test]
    async fn test_saturated_limiter_blocks_until_release() {
        let limiter = ConnectionLimiter::new(1);
        let held = limiter.acquire().await.unwrap();

        let waiter = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(held);

        let permit = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be admitted after release")
            .unwrap();
        assert!(permit.is_ok());
    }

    #[tokio::test]
    async fn test_permit_released_when_task_panics() {
        let limiter = ConnectionLimiter::new(1);

        let task = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                let _permit = limiter.acquire().await.unwrap();
                panic!("connection task failed");
            })
        };
        assert!(task.await.unwrap_err().is_panic());

        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test]
    async fn test_closed_limiter() {
        let limiter = ConnectionLimiter::new(1);
        let _held = limiter.acquire().await.unwrap();

        let waiter = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire().await })
        };
        tokio::task::yield_now().await;

        limiter.close();
        assert_eq!(waiter.await.unwrap().unwrap_err(), LimiterError::Closed);
        assert_eq!(limiter.acquire().await.unwrap_err(), LimiterError::Closed);
    }

    #[test]
    fn test_capacity_is_at_least_one() {
        assert_eq!(ConnectionLimiter::new(0).capacity(), 1);
    }
}
