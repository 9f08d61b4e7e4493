use std::sync::Arc;

use clap::Args;
use tracing::debug;
use nid_core::{
    config::{DEFAULT_DOWNLOAD_TIMEOUT_MS, DEFAULT_MAX_CONCURRENT_DOWNLOADS, DEFAULT_NUM_DOWNLOADS},
    registry::{DEFAULT_QUALITY_INDEX_URL, DEFAULT_REGISTRY_URL, DEFAULT_TARBALL_URL},
    Config, Endpoints, Runner,
};

use crate::reporter::SpinnerReporter;

#[derive(Args)]
pub struct RunArgs {
    /// NPM package to increase the downloads of
    #[clap(short = 'p', long, value_parser, env = "NID_PACKAGE_NAME")]
    pub package_name: String,
    /// Version to increase the downloads of (latest when omitted)
    #[clap(short = 'v', long, value_parser, env = "NID_PACKAGE_VERSION")]
    pub package_version: Option<String>,
    /// Number of times to download the package
    #[clap(short = 'n', long, value_parser, env = "NID_NUM_DOWNLOADS", default_value_t = DEFAULT_NUM_DOWNLOADS)]
    pub num_downloads: u64,
    /// Amount of downloads to run in parallel at once (at most 50 are used)
    #[clap(short = 'm', long, value_parser, env = "NID_MAX_CONCURRENT_DOWNLOADS", default_value_t = DEFAULT_MAX_CONCURRENT_DOWNLOADS)]
    pub max_concurrent_downloads: usize,
    /// Max time (in ms) to wait for a download to complete, 0 waits forever
    #[clap(short = 't', long, value_parser, env = "NID_DOWNLOAD_TIMEOUT", default_value_t = DEFAULT_DOWNLOAD_TIMEOUT_MS)]
    pub download_timeout: u64,
    /// Package quality index used to find the latest version
    #[clap(long, value_parser, env = "NID_QUALITY_INDEX_URL", default_value = DEFAULT_QUALITY_INDEX_URL)]
    pub quality_index_url: String,
    /// Registry used to verify versions and as fallback for the latest version
    #[clap(long, value_parser, env = "NID_REGISTRY_URL", default_value = DEFAULT_REGISTRY_URL)]
    pub registry_url: String,
    /// Host the tarballs are downloaded from
    #[clap(long, value_parser, env = "NID_TARBALL_URL", default_value = DEFAULT_TARBALL_URL)]
    pub tarball_url: String,
}

impl RunArgs {
    fn endpoints(&self) -> Endpoints {
        Endpoints {
            quality_index: self.quality_index_url.clone(),
            registry: self.registry_url.clone(),
            tarball_cdn: self.tarball_url.clone(),
        }
    }
}

pub async fn handle_run(args: RunArgs) -> Result<(), ()> {
    let endpoints = args.endpoints();
    debug!(?endpoints, "using endpoints");

    let config = match Config::new(
        args.package_name,
        args.package_version,
        args.num_downloads,
        args.max_concurrent_downloads,
        args.download_timeout,
    ) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return Err(());
        }
    };

    let reporter = Arc::new(SpinnerReporter::new(&config.package_name));
    let runner = match Runner::new(endpoints, reporter) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("{}", e);
            return Err(());
        }
    };

    // Fatal errors have already been shown by the reporter.
    runner.run(&config).await.map(|_| ()).map_err(|_| ())
}
