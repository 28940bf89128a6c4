use std::sync::Arc;

use recce_common::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Process-wide cap on in-flight port probes.
///
/// Clones share the same pool, so one limiter must be created per run and
/// handed to every scan. A slot is returned when its permit is dropped.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ConcurrencyLimiter {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, Error> {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| Error::LimiterClosed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_one_pool() {
        let limiter = ConcurrencyLimiter::new(2);
        let other = limiter.clone();

        let first = limiter.acquire().await.unwrap();
        let _second = other.acquire().await.unwrap();
        assert_eq!(limiter.available(), 0);

        drop(first);
        assert_eq!(other.available(), 1);
        assert_eq!(other.capacity(), 2);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        assert_eq!(ConcurrencyLimiter::new(0).capacity(), 1);
    }
}
