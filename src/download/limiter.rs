//! Counting admission gate for file-body downloads.
//!
//! Only file bodies pass through the limiter. Listing fetches stay on the
//! recursion path so tree discovery never queues behind large transfers.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;

use super::constants::{MAX_CONCURRENCY, MIN_CONCURRENCY};
use super::engine::EngineError;

/// Bounds the number of simultaneous file downloads for a whole run.
///
/// Backed by a tokio [`Semaphore`], which hands out permits in FIFO order,
/// so no waiter starves. Clones share the same permit pool.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

/// One admission slot. Dropping it releases the slot.
#[derive(Debug)]
pub struct Permit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    /// Creates a limiter admitting at most `limit` holders at once.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] when `limit` is outside
    /// `1..=100`.
    pub fn new(limit: usize) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&limit) {
            return Err(EngineError::InvalidConcurrency { value: limit });
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        })
    }

    /// Waits for a free slot.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::LimiterClosed`] if the semaphore was closed.
    pub async fn acquire(&self) -> Result<Permit, EngineError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| EngineError::LimiterClosed)?;
        trace!(available = self.available(), "permit acquired");
        Ok(Permit { _permit: permit })
    }

    /// Releases a permit explicitly. Equivalent to dropping it.
    pub fn release(&self, permit: Permit) {
        drop(permit);
        trace!(available = self.available(), "permit released");
    }

    /// Returns the configured limit.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the number of free slots right now.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
