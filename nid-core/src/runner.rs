use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use reqwest::Client;
use tokio::{
    sync::oneshot,
    task::{self, JoinHandle},
};
use tracing::{info, warn};

use crate::{
    config::Config,
    downloader::{run_batch, BatchOptions, Downloader, DEFAULT_WAVE_PAUSE},
    errors::NidResult,
    reporter::{Reporter, RunPhase, VersionOrigin},
    registry::Endpoints,
    resolver::{ResolvedVersion, VersionResolver},
    stats::{Stats, StatsSnapshot},
};

pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Resolves the version, then drives the batch while reporting progress.
pub struct Runner<R: Reporter> {
    client: Client,
    endpoints: Endpoints,
    reporter: Arc<R>,
    report_interval: Duration,
    wave_pause: Duration,
}

impl<R: Reporter> Runner<R> {
    pub fn new(endpoints: Endpoints, reporter: Arc<R>) -> NidResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("nid/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Runner::with_client(client, endpoints, reporter))
    }

    pub fn with_client(client: Client, endpoints: Endpoints, reporter: Arc<R>) -> Self {
        Runner {
            client,
            endpoints,
            reporter,
            report_interval: DEFAULT_REPORT_INTERVAL,
            wave_pause: DEFAULT_WAVE_PAUSE,
        }
    }

    /// Zero is raised to 1ms, the interval timer rejects an empty period.
    pub fn with_report_interval(mut self, report_interval: Duration) -> Self {
        self.report_interval = report_interval.max(Duration::from_millis(1));
        self
    }

    pub fn with_wave_pause(mut self, wave_pause: Duration) -> Self {
        self.wave_pause = wave_pause;
        self
    }

    /// Runs to completion. Fatal errors are handed to the reporter and returned,
    /// failed downloads only show up in the final counts.
    pub async fn run(&self, config: &Config) -> NidResult<StatsSnapshot> {
        match self.try_run(config).await {
            Ok(snapshot) => {
                info!(
                    successful = snapshot.successful_downloads,
                    failed = snapshot.failed_downloads,
                    elapsed_ms = snapshot.elapsed_ms,
                    "run completed"
                );
                self.reporter.on_phase(&RunPhase::Completed);
                self.reporter.on_complete(&snapshot);
                Ok(snapshot)
            }
            Err(e) => {
                info!(error = %e, "run failed");
                self.reporter.on_phase(&RunPhase::Failed);
                self.reporter.on_error(&e);
                Err(e)
            }
        }
    }

    async fn try_run(&self, config: &Config) -> NidResult<StatsSnapshot> {
        let version = self.resolve_version(config).await?;

        self.reporter.on_phase(&RunPhase::Running {
            version: version.version.clone(),
            total: config.num_downloads,
        });

        let downloader = Downloader::new(
            self.client.clone(),
            &self.endpoints,
            &config.package_name,
            version.as_str(),
            config.download_timeout(),
        );
        let mut options = BatchOptions::from_config(config);
        options.wave_pause = self.wave_pause;
        info!(
            url = downloader.url(),
            total = options.total,
            wave_size = options.wave_size,
            "starting downloads"
        );

        let stats = Arc::new(Stats::new(Instant::now()));
        let (stop_tx, stop_rx) = oneshot::channel();
        let progress = spawn_progress_loop(
            stats.clone(),
            self.reporter.clone(),
            self.report_interval,
            stop_rx,
        );

        run_batch(&downloader, &options, &stats).await;

        let _ = stop_tx.send(());
        if let Err(e) = progress.await {
            warn!(error = %e, "progress reporter ended abnormally");
        }

        Ok(stats.snapshot())
    }

    async fn resolve_version(&self, config: &Config) -> NidResult<ResolvedVersion> {
        self.reporter.on_phase(&match config.package_version {
            Some(ref version) => RunPhase::VerifyingVersion(version.clone()),
            None => RunPhase::ResolvingVersion,
        });

        let resolved = VersionResolver::new(&self.client, &self.endpoints)
            .resolve(config)
            .await?;

        self.reporter.on_phase(&match resolved.origin {
            VersionOrigin::Supplied => RunPhase::VersionVerified(resolved.version.clone()),
            origin => RunPhase::VersionDiscovered {
                version: resolved.version.clone(),
                origin,
            },
        });
        Ok(resolved)
    }
}

/// Samples `stats` every `period` until `stop` fires or its sender is dropped.
fn spawn_progress_loop<R: Reporter>(
    stats: Arc<Stats>,
    reporter: Arc<R>,
    period: Duration,
    mut stop: oneshot::Receiver<()>,
) -> JoinHandle<()> {
    task::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = &mut stop => break,
                _ = interval.tick() => reporter.on_progress(&stats.snapshot()),
            }
        }
    })
}
