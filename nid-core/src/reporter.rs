use crate::{errors::NidError, stats::StatsSnapshot};

/// Where the version being downloaded came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOrigin {
    Supplied,
    QualityIndex,
    Registry,
}

/// Stages a run moves through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPhase {
    ResolvingVersion,
    VerifyingVersion(String),
    VersionVerified(String),
    VersionDiscovered {
        version: String,
        origin: VersionOrigin,
    },
    Running {
        version: String,
        total: u64,
    },
    Completed,
    Failed,
}

/// Receives everything a run has to tell the outside world.
/// Implementations must not block, they are called from the async runtime.
pub trait Reporter: Send + Sync + 'static {
    fn on_phase(&self, _phase: &RunPhase) {}

    /// Called about once per second while downloads are running.
    fn on_progress(&self, snapshot: &StatsSnapshot);

    /// Called once with the final totals.
    fn on_complete(&self, snapshot: &StatsSnapshot);

    fn on_error(&self, error: &NidError);
}
