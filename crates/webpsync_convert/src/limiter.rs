//! Counting permit pool shared across the whole tree.

use std::sync::Arc;

use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// A fixed-capacity permit pool.
///
/// Clones share the same pool, so one limiter handed to every unit of work
/// bounds them all regardless of where in the tree they run.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A held permit. Dropping it returns the permit to the pool.
#[derive(Debug)]
pub struct Permit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    /// Creates a pool with `capacity` permits (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits until a permit is free and takes it.
    pub async fn acquire(&self) -> Result<Permit, AcquireError> {
        let permit = self.semaphore.clone().acquire_owned().await?;
        Ok(Permit { _permit: permit })
    }

    /// Total number of permits.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of permits not currently held.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn zero_capacity_is_clamped() {
        let limiter = ConcurrencyLimiter::new(0);
        assert_eq!(limiter.capacity(), 1);
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test]
    async fn permit_released_on_drop() {
        let limiter = ConcurrencyLimiter::new(2);
        let a = limiter.acquire().await.unwrap();
        let _b = limiter.acquire().await.unwrap();
        assert_eq!(limiter.available(), 0);
        drop(a);
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test]
    async fn clones_share_the_pool() {
        let limiter = ConcurrencyLimiter::new(1);
        let clone = limiter.clone();
        let _held = limiter.acquire().await.unwrap();
        assert_eq!(clone.available(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_capacity() {
        let limiter = ConcurrencyLimiter::new(3);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..24 {
            let limiter = limiter.clone();
            let active = active.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _permit = limiter.acquire().await.unwrap();
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(limiter.available(), 3);
    }
}
