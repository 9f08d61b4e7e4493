//! Batch download driver.
//!
//! Downloads are dispatched in waves of at most [`MAX_WAVE_SIZE`] concurrent
//! requests. A wave is awaited in full before the next one starts, with a
//! short pause in between so closed connections can be reclaimed.

use std::{future::Future, time::Duration};

use futures::future::join_all;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::time::sleep;
use tracing::debug;

use crate::{
    config::{Config, MAX_WAVE_SIZE},
    errors::NidError,
    registry::Endpoints,
    stats::Stats,
};

pub const DEFAULT_WAVE_PAUSE: Duration = Duration::from_millis(100);

/// Sizes of the consecutive waves needed to attempt `total` downloads.
/// The last wave holds the remainder.
pub fn plan_waves(total: u64, wave_size: usize) -> impl Iterator<Item = u64> {
    let wave_size = wave_size.clamp(1, MAX_WAVE_SIZE) as u64;
    let wave_count = total.div_ceil(wave_size);
    (0..wave_count).map(move |i| wave_size.min(total - i * wave_size))
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub total: u64,
    pub wave_size: usize,
    /// Delay between two waves. Not applied after the last one.
    pub wave_pause: Duration,
}

impl BatchOptions {
    pub fn from_config(config: &Config) -> Self {
        BatchOptions {
            total: config.num_downloads,
            wave_size: config.wave_size(),
            wave_pause: DEFAULT_WAVE_PAUSE,
        }
    }
}

/// Fetches one package tarball per call.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    url: String,
    timeout: Option<Duration>,
}

impl Downloader {
    pub fn new(
        client: Client,
        endpoints: &Endpoints,
        package_name: &str,
        version: &str,
        timeout: Option<Duration>,
    ) -> Self {
        Downloader {
            client,
            url: endpoints.tarball_url(package_name, version),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Streams the tarball to nowhere. The body is never kept or inspected.
    pub async fn download_once(&self) -> Result<(), NidError> {
        let mut req = self.client.get(&self.url);
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        let response = req
            .send()
            .await
            .map_err(|e| NidError::DownloadFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NidError::DownloadFailed(
                response
                    .status()
                    .canonical_reason()
                    .unwrap_or("Error fetching file from server")
                    .to_string(),
            ));
        }

        let mut bytes_stream = response.bytes_stream();
        while let Some(data) = bytes_stream.next().await {
            if let Err(e) = data {
                return Err(NidError::DownloadFailed(e.to_string()));
            }
        }
        Ok(())
    }
}

/// Attempts `options.total` tarball downloads, tallying each outcome into `stats`.
pub async fn run_batch(downloader: &Downloader, options: &BatchOptions, stats: &Stats) {
    run_waves(options, stats, move || downloader.download_once()).await
}

/// Wave engine behind [`run_batch`]. `attempt` is called once per unit and
/// its future decides whether that unit counts as a success or a failure.
pub async fn run_waves<F, Fut>(options: &BatchOptions, stats: &Stats, mut attempt: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), NidError>>,
{
    let mut waves = plan_waves(options.total, options.wave_size).peekable();
    let mut wave = 0;

    while let Some(size) = waves.next() {
        wave += 1;
        debug!(wave, size, "starting wave");

        let downloads = (0..size).map(|_| {
            let download = attempt();
            async move {
                match download.await {
                    Ok(()) => stats.record_success(),
                    Err(e) => {
                        debug!(error = %e, "download failed");
                        stats.record_failure();
                    }
                }
            }
        });
        join_all(downloads).await;

        if waves.peek().is_some() && !options.wave_pause.is_zero() {
            sleep(options.wave_pause).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use tokio::time::Instant;

    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    fn options(total: u64, wave_size: usize) -> BatchOptions {
        BatchOptions {
            total,
            wave_size,
            wave_pause: Duration::ZERO,
        }
    }

    #[test]
    fn test_plan_waves_1() {
        assert_eq!(plan_waves(120, 50).collect::<Vec<_>>(), vec![50, 50, 20]);
    }

    #[test]
    fn test_plan_waves_2() {
        assert_eq!(plan_waves(120, 300).collect::<Vec<_>>(), vec![50, 50, 20]);
        assert_eq!(plan_waves(100, 50).collect::<Vec<_>>(), vec![50, 50]);
        assert_eq!(plan_waves(3, 0).collect::<Vec<_>>(), vec![1, 1, 1]);
        assert_eq!(plan_waves(0, 10).count(), 0);
    }

    #[test]
    fn test_plan_waves_does_not_materialise() {
        let mut waves = plan_waves(u64::MAX, 50);
        assert_eq!(waves.next(), Some(50));
        assert_eq!(waves.size_hint().0 as u64, u64::MAX / 50);
    }

    #[tokio::test]
    async fn test_run_waves_caps_outstanding_downloads() {
        let stats = Stats::default();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        run_waves(&options(120, 300), &stats, || {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.successful_downloads, 120);
        assert_eq!(snapshot.failed_downloads, 0);
        assert!(peak.load(Ordering::SeqCst) <= 50);
        assert!(peak.load(Ordering::SeqCst) > 1);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_waves_all_failures_still_completes() {
        let stats = Stats::default();

        run_waves(&options(75, 20), &stats, || async {
            Err(NidError::DownloadFailed("connection refused".to_string()))
        })
        .await;

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.successful_downloads, 0);
        assert_eq!(snapshot.failed_downloads, 75);
    }

    #[tokio::test]
    async fn test_run_waves_mixed_outcomes() {
        let stats = Stats::default();
        let calls = AtomicUsize::new(0);

        run_waves(&options(10, 4), &stats, || {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call % 2 == 0 {
                    Ok(())
                } else {
                    Err(NidError::DownloadFailed("timed out".to_string()))
                }
            }
        })
        .await;

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.successful_downloads, 5);
        assert_eq!(snapshot.failed_downloads, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_waves_pauses_between_waves_only() {
        let stats = Stats::default();
        let mut batch = options(120, 50);
        batch.wave_pause = Duration::from_millis(100);

        let started = Instant::now();
        run_waves(&batch, &stats, || async { Ok(()) }).await;

        // Three waves, two pauses.
        assert_eq!(started.elapsed().as_millis(), 200);
        assert_eq!(stats.snapshot().total(), 120);
    }

    #[tokio::test]
    async fn test_run_batch_downloads_tarball() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/left-pad/-/left-pad-1.3.0.tgz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]))
            .expect(7)
            .mount(&server)
            .await;

        let endpoints = Endpoints::single(server.uri());
        let downloader = Downloader::new(
            Client::new(),
            &endpoints,
            "left-pad",
            "1.3.0",
            Some(Duration::from_secs(5)),
        );
        let stats = Stats::default();
        run_batch(&downloader, &options(7, 3), &stats).await;

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.successful_downloads, 7);
        assert_eq!(snapshot.failed_downloads, 0);
    }

    #[tokio::test]
    async fn test_download_once_scoped_package() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/@babel/core/-/core-7.24.0.tgz"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let endpoints = Endpoints::single(server.uri());
        let downloader = Downloader::new(Client::new(), &endpoints, "@babel/core", "7.24.0", None);

        assert!(downloader.download_once().await.is_ok());
    }

    #[tokio::test]
    async fn test_download_once_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let endpoints = Endpoints::single(server.uri());
        let downloader = Downloader::new(Client::new(), &endpoints, "left-pad", "1.3.0", None);

        assert!(matches!(
            downloader.download_once().await,
            Err(NidError::DownloadFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_download_once_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let endpoints = Endpoints::single(server.uri());
        let downloader = Downloader::new(
            Client::new(),
            &endpoints,
            "left-pad",
            "1.3.0",
            Some(Duration::from_millis(50)),
        );

        assert!(matches!(
            downloader.download_once().await,
            Err(NidError::DownloadFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_run_batch_unreachable_host_counts_failures() {
        let endpoints = Endpoints::single("http://127.0.0.1:1");
        let downloader = Downloader::new(
            Client::new(),
            &endpoints,
            "left-pad",
            "1.3.0",
            Some(Duration::from_millis(500)),
        );
        let stats = Stats::default();
        run_batch(&downloader, &options(12, 5), &stats).await;

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.successful_downloads, 0);
        assert_eq!(snapshot.failed_downloads, 12);
    }
}
