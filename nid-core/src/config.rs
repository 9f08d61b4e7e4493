//! Run configuration handed to the core by the command line layer.

use std::time::Duration;

use tracing::warn;

use crate::errors::{NidError, NidResult};

/// Hard ceiling on simultaneously outstanding downloads, whatever the user asks for.
pub const MAX_WAVE_SIZE: usize = 50;

pub const DEFAULT_NUM_DOWNLOADS: u64 = 1000;
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 300;
pub const DEFAULT_DOWNLOAD_TIMEOUT_MS: u64 = 3000;

/// Settings for a single run. Read-only once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Package to download, optionally scoped (`@org/name`).
    pub package_name: String,
    /// Exact version to download. Discovered when absent.
    pub package_version: Option<String>,
    /// Total number of downloads to attempt.
    pub num_downloads: u64,
    /// Requested concurrency. See [`Config::wave_size`] for the value actually used.
    pub max_concurrent_downloads: usize,
    /// Per request timeout in milliseconds, 0 disables it.
    pub download_timeout_ms: u64,
}

impl Config {
    pub fn new(
        package_name: impl Into<String>,
        package_version: Option<String>,
        num_downloads: u64,
        max_concurrent_downloads: usize,
        download_timeout_ms: u64,
    ) -> NidResult<Self> {
        let package_name = package_name.into().trim().to_string();
        if package_name.is_empty() {
            return Err(NidError::InvalidConfig(
                "package name must not be empty".to_string(),
            ));
        }
        if package_name.starts_with('@') && !package_name.contains('/') {
            return Err(NidError::InvalidConfig(format!(
                "scoped package name {} is missing the package part",
                package_name
            )));
        }

        let package_version = package_version
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Ok(Config {
            package_name,
            package_version,
            num_downloads,
            max_concurrent_downloads,
            download_timeout_ms,
        })
    }

    /// Number of downloads dispatched together, clamped to `1..=MAX_WAVE_SIZE`.
    pub fn wave_size(&self) -> usize {
        if self.max_concurrent_downloads == 0 {
            warn!("max concurrent downloads is 0, using 1");
        }
        self.max_concurrent_downloads.clamp(1, MAX_WAVE_SIZE)
    }

    pub fn download_timeout(&self) -> Option<Duration> {
        match self.download_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}
