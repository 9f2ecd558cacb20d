//! Concurrency gates
//!
//! A gate admits zero-argument async units of work and bounds how many of
//! them run at the same time. Gates are independent semaphores; callers that
//! need two limits nest one `run` inside the other.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Default capacity of the registry info gate
pub const INFO_REQUEST_LIMIT: usize = 40;

/// Default capacity of the publish gate
pub const PUBLISH_LIMIT: usize = 10;

/// Bounded-concurrency admission gate
///
/// Clones share the same slots. Admission order is FIFO because tokio's
/// semaphore is fair.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `capacity` units at once (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Maximum number of concurrently admitted units
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of free slots right now
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a slot, run `work`, and hand back its output untouched.
    ///
    /// The slot is released when the permit drops, whether the work returned
    /// an error, panicked or was dropped mid-flight.
    pub async fn run<F, Fut, T>(&self, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        // The semaphore is never closed, so acquisition cannot fail.
        let _permit = self.semaphore.acquire().await.ok();
        work().await
    }
}

/// The three gates a publish run shares
#[derive(Debug, Clone)]
pub struct PublishGates {
    /// Registry info queries, and the outer admission of every publish
    pub info: ConcurrencyGate,
    /// Publish operations
    pub publish: ConcurrencyGate,
    /// OTP prompts; always a single slot
    pub otp: ConcurrencyGate,
}

impl PublishGates {
    pub fn new(info_requests: usize, publishes: usize) -> Self {
        Self {
            info: ConcurrencyGate::new(info_requests),
            publish: ConcurrencyGate::new(publishes),
            otp: ConcurrencyGate::new(1),
        }
    }
}

impl Default for PublishGates {
    fn default() -> Self {
        Self::new(INFO_REQUEST_LIMIT, PUBLISH_LIMIT)
    }
}
