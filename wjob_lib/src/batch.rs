use std::{collections::VecDeque, time::Duration};

use tokio::{
    sync::Mutex,
    time::{sleep, Instant},
};
use tracing::debug;

pub const RATE_WINDOW: Duration = Duration::from_secs(60);

/// split `ids` into consecutive batches of at most `max_size` ids, keeping order
/// a `max_size` of 0 is treated as 1
pub fn partition<T>(ids: &[T], max_size: usize) -> Vec<&[T]> {
    ids.chunks(max_size.max(1)).collect()
}

/// "at most `max_per_window` lookups started per rolling window"
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimit {
    pub max_per_window: usize,
    pub window: Duration,
    /// granularity of the wait for a slot to free up
    pub poll_interval: Duration,
}

impl RateLimit {
    pub fn per_minute(max_per_window: usize, poll_interval: Duration) -> Self {
        Self {
            max_per_window,
            window: RATE_WINDOW,
            poll_interval,
        }
    }

    /// a fresh window with no requests recorded
    pub fn start_window(&self) -> RateWindow {
        RateWindow {
            limit: self.clone(),
            started: Mutex::new(VecDeque::with_capacity(self.max_per_window.max(1))),
        }
    }
}

/// Rolling log of request start times.
///
/// Every attempt, retries included, takes a slot. Once `max_per_window` slots
/// were taken within the last window, `acquire` waits until the oldest one is a
/// full window old.
pub struct RateWindow {
    limit: RateLimit,
    started: Mutex<VecDeque<Instant>>,
}

impl RateWindow {
    /// wait for a free slot and record a request starting now
    pub async fn acquire(&self) {
        let max = self.limit.max_per_window.max(1);
        let mut started = self.started.lock().await;
        if started.len() >= max {
            if let Some(&oldest) = started.front() {
                if oldest.elapsed() < self.limit.window {
                    debug!(
                        "rate limit reached, waiting {:?}",
                        self.limit.window.saturating_sub(oldest.elapsed())
                    );
                }
                while oldest.elapsed() < self.limit.window {
                    sleep(self.limit.poll_interval).await;
                }
            }
            started.pop_front();
        }
        started.push_back(Instant::now());
    }

    /// number of requests started within the current window
    pub async fn in_flight(&self) -> usize {
        let started = self.started.lock().await;
        started
            .iter()
            .filter(|at| at.elapsed() < self.limit.window)
            .count()
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;

    #[test]
    fn test_partition_example() {
        let ids = [1, 2, 3];
        let batches = partition(&ids, 2);
        assert_eq!(vec![&[1, 2][..], &[3][..]], batches);
    }

    #[test]
    fn test_partition_counts_and_order() {
        for len in 0..25usize {
            for size in 1..8usize {
                let ids: Vec<usize> = (0..len).collect();
                let batches = partition(&ids, size);
                assert_eq!((len + size - 1) / size, batches.len());
                for (i, batch) in batches.iter().enumerate() {
                    if i + 1 < batches.len() {
                        assert_eq!(size, batch.len());
                    } else if len % size != 0 {
                        assert_eq!(len % size, batch.len());
                    }
                }
                let flat: Vec<usize> = batches.concat();
                assert_eq!(ids, flat);
            }
        }
    }

    #[test]
    fn test_partition_zero_size() {
        let ids = [1, 2];
        assert_eq!(2, partition(&ids, 0).len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_oldest_slot() {
        let limit = RateLimit::per_minute(2, Duration::from_secs(1));
        let window = limit.start_window();
        let start = Instant::now();
        window.acquire().await;
        window.acquire().await;
        assert_eq!(start, Instant::now());
        assert_eq!(2, window.in_flight().await);

        window.acquire().await;
        let waited = Instant::now() - start;
        assert!(waited >= RATE_WINDOW);
        assert!(waited < RATE_WINDOW + Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_is_free_after_window() {
        let limit = RateLimit::per_minute(1, Duration::from_secs(1));
        let window = limit.start_window();
        window.acquire().await;
        tokio::time::advance(Duration::from_secs(61)).await;
        let before = Instant::now();
        window.acquire().await;
        assert_eq!(before, Instant::now());
        assert_eq!(1, window.in_flight().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_window_holds_more_than_limit() {
        let limit = RateLimit::per_minute(3, Duration::from_secs(1));
        let window = limit.start_window();
        let mut starts = Vec::new();
        for step in 0..10u64 {
            window.acquire().await;
            starts.push(Instant::now());
            tokio::time::advance(Duration::from_secs(step % 4 * 7)).await;
        }
        for (i, first) in starts.iter().enumerate() {
            let in_window = starts[i..]
                .iter()
                .filter(|at| **at - *first < RATE_WINDOW)
                .count();
            assert!(in_window <= 3, "{} requests in one window", in_window);
        }
    }
}
