use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

pub const MAX_LOAD_CONCURRENCY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadConcurrencySnapshot {
    pub limit: usize,
    pub in_flight: usize,
    pub waiters: usize,
}

pub fn default_load_concurrency() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus * 2).clamp(4, 16)
}

pub fn parse_load_concurrency(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .clamp(1, MAX_LOAD_CONCURRENCY)
}

#[derive(Debug, Default)]
struct Counters {
    in_flight: AtomicUsize,
    waiters: AtomicUsize,
}

/// Caps how many directory walks and file loads run at once.
///
/// Cloning shares the same permits, so one limiter bounds every request that
/// holds a clone.
#[derive(Debug, Clone)]
pub struct LoadLimiter {
    semaphore: Arc<Semaphore>,
    counters: Arc<Counters>,
    limit: usize,
}

impl LoadLimiter {
    pub fn new(limit: usize) -> Self {
        let limit = limit.clamp(1, MAX_LOAD_CONCURRENCY);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            counters: Arc::new(Counters::default()),
            limit,
        }
    }

    pub fn snapshot(&self) -> LoadConcurrencySnapshot {
        LoadConcurrencySnapshot {
            limit: self.limit,
            in_flight: self.counters.in_flight.load(Ordering::Relaxed),
            waiters: self.counters.waiters.load(Ordering::Relaxed),
        }
    }

    pub async fn acquire(&self) -> Result<LoadPermit, AcquireError> {
        self.counters.waiters.fetch_add(1, Ordering::Relaxed);
        let waiter = WaiterGuard(self.counters.clone());
        let permit = self.semaphore.clone().acquire_owned().await?;
        drop(waiter);
        self.counters.in_flight.fetch_add(1, Ordering::Relaxed);
        Ok(LoadPermit {
            _permit: permit,
            counters: self.counters.clone(),
        })
    }
}

impl Default for LoadLimiter {
    fn default() -> Self {
        Self::new(default_load_concurrency())
    }
}

pub struct LoadPermit {
    _permit: OwnedSemaphorePermit,
    counters: Arc<Counters>,
}

impl Drop for LoadPermit {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

struct WaiterGuard(Arc<Counters>);

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        self.0.waiters.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_load_concurrency_defaults_and_clamps() {
        let default_value = 8;
        assert_eq!(parse_load_concurrency(None, default_value), default_value);
        assert_eq!(parse_load_concurrency(Some(""), default_value), default_value);
        assert_eq!(parse_load_concurrency(Some("   "), default_value), default_value);
        assert_eq!(parse_load_concurrency(Some("2"), default_value), 2);
        assert_eq!(parse_load_concurrency(Some("0"), default_value), 1);
        assert_eq!(
            parse_load_concurrency(Some("999"), default_value),
            MAX_LOAD_CONCURRENCY
        );
        assert_eq!(parse_load_concurrency(Some("abc"), default_value), default_value);
        assert_eq!(parse_load_concurrency(Some(" 5 "), default_value), 5);
    }

    #[tokio::test]
    async fn permits_are_tracked_and_released() {
        let limiter = LoadLimiter::new(2);
        let first = limiter.acquire().await.unwrap();
        let second = limiter.acquire().await.unwrap();
        assert_eq!(limiter.snapshot().in_flight, 2);

        let waiting = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire().await.map(|_| ()) })
        };
        drop(first);
        waiting.await.unwrap().unwrap();
        drop(second);

        let snapshot = limiter.snapshot();
        assert_eq!(snapshot.in_flight, 0);
        assert_eq!(snapshot.waiters, 0);
        assert_eq!(snapshot.limit, 2);
    }
}
