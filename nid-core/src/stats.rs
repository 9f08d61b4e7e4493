use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};

/// Counters shared between in-flight downloads and the progress reporter.
#[derive(Debug)]
pub struct Stats {
    start_time: Instant,
    successful_downloads: AtomicU64,
    failed_downloads: AtomicU64,
}

/// Point in time copy of [`Stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub elapsed_ms: u64,
    pub successful_downloads: u64,
    pub failed_downloads: u64,
}

impl Stats {
    pub fn new(start_time: Instant) -> Self {
        Stats {
            start_time,
            successful_downloads: AtomicU64::new(0),
            failed_downloads: AtomicU64::new(0),
        }
    }

    pub fn record_success(&self) {
        self.successful_downloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_downloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            elapsed_ms: self.start_time.elapsed().as_millis() as u64,
            successful_downloads: self.successful_downloads.load(Ordering::Relaxed),
            failed_downloads: self.failed_downloads.load(Ordering::Relaxed),
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Stats::new(Instant::now())
    }
}

impl StatsSnapshot {
    /// Number of attempts that have settled.
    pub fn total(&self) -> u64 {
        self.successful_downloads + self.failed_downloads
    }

    /// Successful downloads per second since the start of the run.
    pub fn downloads_per_second(&self) -> f64 {
        if self.elapsed_ms == 0 {
            return 0f64;
        }
        self.successful_downloads as f64 / (self.elapsed_ms as f64 / 1000f64)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let stats = Stats::default();
        stats.record_success();
        stats.record_success();
        stats.record_failure();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.successful_downloads, 2);
        assert_eq!(snapshot.failed_downloads, 1);
        assert_eq!(snapshot.total(), 3);
    }

    #[test]
    fn test_elapsed_time_from_start() {
        let stats = Stats::new(Instant::now() - Duration::from_secs(2));
        assert!(stats.snapshot().elapsed_ms >= 2000);
    }

    #[test]
    fn test_downloads_per_second() {
        let snapshot = StatsSnapshot {
            elapsed_ms: 2000,
            successful_downloads: 50,
            failed_downloads: 10,
        };
        assert_eq!(snapshot.downloads_per_second(), 25f64);

        let snapshot = StatsSnapshot {
            elapsed_ms: 0,
            successful_downloads: 50,
            failed_downloads: 0,
        };
        assert_eq!(snapshot.downloads_per_second(), 0f64);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let stats = Arc::new(Stats::default());
        let mut join_handles = Vec::new();

        for i in 0..1000 {
            let s = stats.clone();
            join_handles.push(tokio::spawn(async move {
                tokio::task::yield_now().await;
                if i % 3 == 0 {
                    s.record_failure();
                } else {
                    s.record_success();
                }
            }));
        }
        for h in join_handles {
            h.await.unwrap();
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total(), 1000);
        assert_eq!(snapshot.failed_downloads, 334);
        assert_eq!(snapshot.successful_downloads, 666);
    }
}
