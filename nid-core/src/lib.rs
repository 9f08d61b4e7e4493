pub mod config;
pub mod downloader;
pub mod errors;
pub mod models;
pub mod registry;
pub mod reporter;
pub mod resolver;
pub mod runner;
pub mod stats;
pub mod utils;

pub use config::Config;
pub use errors::{NidError, NidResult};
pub use registry::Endpoints;
pub use reporter::{Reporter, RunPhase, VersionOrigin};
pub use runner::Runner;
pub use stats::{Stats, StatsSnapshot};
