//! Picks the version a run downloads.
//!
//! A supplied version is only checked for existence. Otherwise the latest
//! version is taken from the quality index, falling back to the registry's
//! `latest` tag when the index cannot answer.

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::{
    config::Config,
    errors::{NidError, NidResult},
    reporter::VersionOrigin,
    models::{QualityIndexPackage, RegistryManifest},
    registry::Endpoints,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub version: String,
    pub origin: VersionOrigin,
}

impl ResolvedVersion {
    pub fn as_str(&self) -> &str {
        &self.version
    }
}

pub struct VersionResolver<'a> {
    client: &'a Client,
    endpoints: &'a Endpoints,
}

impl<'a> VersionResolver<'a> {
    pub fn new(client: &'a Client, endpoints: &'a Endpoints) -> Self {
        VersionResolver { client, endpoints }
    }

    pub async fn resolve(&self, config: &Config) -> NidResult<ResolvedVersion> {
        match config.package_version {
            Some(ref version) => self.verify(&config.package_name, version).await,
            None => self.discover(&config.package_name).await,
        }
    }

    /// Returns the supplied version unchanged if the registry knows it.
    pub async fn verify(&self, package_name: &str, version: &str) -> NidResult<ResolvedVersion> {
        if !self.version_exists(package_name, version).await {
            return Err(NidError::VersionNotFound {
                package: package_name.to_string(),
                version: version.to_string(),
            });
        }
        info!(package = package_name, version, "version verified");
        Ok(ResolvedVersion {
            version: version.to_string(),
            origin: VersionOrigin::Supplied,
        })
    }

    pub async fn discover(&self, package_name: &str) -> NidResult<ResolvedVersion> {
        let quality_index_error = match self.latest_from_quality_index(package_name).await {
            Ok(version) => {
                info!(package = package_name, %version, "version found on quality index");
                return Ok(ResolvedVersion {
                    version,
                    origin: VersionOrigin::QualityIndex,
                });
            }
            Err(e) => e,
        };
        info!(
            package = package_name,
            error = %quality_index_error,
            "package not found on quality index, trying registry"
        );

        match self.latest_from_registry(package_name).await {
            Ok(version) => {
                info!(package = package_name, %version, "version found on registry");
                Ok(ResolvedVersion {
                    version,
                    origin: VersionOrigin::Registry,
                })
            }
            Err(registry_error) => Err(NidError::VersionResolutionFailed {
                quality_index: quality_index_error,
                registry: registry_error,
            }),
        }
    }

    /// Any failure, including transient network errors, reads as "does not exist".
    pub async fn version_exists(&self, package_name: &str, version: &str) -> bool {
        let url = self.endpoints.version_url(package_name, version);
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!(%url, status = %response.status(), "version lookup rejected");
                false
            }
            Err(e) => {
                debug!(%url, error = %e, "version lookup failed");
                false
            }
        }
    }

    pub async fn latest_from_quality_index(&self, package_name: &str) -> Result<String, String> {
        let url = self.endpoints.quality_index_url(package_name);
        let package: QualityIndexPackage = fetch_json(self.client, &url).await?;
        non_empty(package.collected.metadata.version, &url)
    }

    pub async fn latest_from_registry(&self, package_name: &str) -> Result<String, String> {
        let url = self.endpoints.latest_url(package_name);
        let manifest: RegistryManifest = fetch_json(self.client, &url).await?;
        non_empty(manifest.version, &url)
    }
}

async fn fetch_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T, String> {
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| format!("failed to fetch {}: {}", url, e))?;

    response
        .json::<T>()
        .await
        .map_err(|e| format!("failed to fetch {}: {}", url, e))
}

fn non_empty(version: String, url: &str) -> Result<String, String> {
    let version = version.trim().to_string();
    if version.is_empty() {
        return Err(format!("failed to fetch {}: response has an empty version", url));
    }
    Ok(version)
}
