#[macro_use]
extern crate prettytable;
use clap::Parser;
use commands::{handle_run, RunArgs};
use dotenv::dotenv;
use std::process;
use tracing_subscriber::EnvFilter;

pub mod commands;
pub mod reporter;

const DEFAULT_LOG_FILTER: &str = "nid=warn,nid_core=warn";

#[derive(Parser)]
#[clap(
    name = "nid",
    version,
    about = "Increase the download count of an npm package",
    after_help = "Examples:\n  $ nid -p my-package -n 1000 -m 300 -t 3000\n  $ nid -p my-package -v 1.0.0 -n 1000 -m 300 -t 3000"
)]
struct Nid {
    #[clap(flatten)]
    run: RunArgs,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let nid = Nid::parse();

    if handle_run(nid.run).await.is_err() {
        process::exit(1);
    }
}
