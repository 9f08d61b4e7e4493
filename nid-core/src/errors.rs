use thiserror::Error;

#[derive(Debug, Error)]
pub enum NidError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Package version {version} does not exist on npm registry ({package})")]
    VersionNotFound { package: String, version: String },

    /// Both version sources failed; each field holds that source's failure.
    #[error("Failed to get package version: {quality_index}, {registry}")]
    VersionResolutionFailed {
        quality_index: String,
        registry: String,
    },

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type NidResult<T> = Result<T, NidError>;
