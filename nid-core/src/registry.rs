//! Remote endpoints and the URLs built against them.

use crate::utils::{encode_package_name, strip_organisation};

pub const DEFAULT_QUALITY_INDEX_URL: &str = "https://api.npms.io";
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";
pub const DEFAULT_TARBALL_URL: &str = "https://registry.yarnpkg.com";

/// Base URLs of the three services a run talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Package quality index, first source for the latest version.
    pub quality_index: String,
    /// Canonical registry, used for existence checks and as the fallback source.
    pub registry: String,
    /// Host serving the tarballs that get downloaded.
    pub tarball_cdn: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            quality_index: DEFAULT_QUALITY_INDEX_URL.to_string(),
            registry: DEFAULT_REGISTRY_URL.to_string(),
            tarball_cdn: DEFAULT_TARBALL_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Points all three services at the same base URL.
    #[cfg(test)]
    pub fn single(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Endpoints {
            quality_index: base_url.clone(),
            registry: base_url.clone(),
            tarball_cdn: base_url,
        }
    }

    pub fn quality_index_url(&self, package_name: &str) -> String {
        format!(
            "{base}/v2/package/{name}",
            base = trim_base(&self.quality_index),
            name = encode_package_name(package_name)
        )
    }

    pub fn latest_url(&self, package_name: &str) -> String {
        format!(
            "{base}/{name}/latest",
            base = trim_base(&self.registry),
            name = encode_package_name(package_name)
        )
    }

    pub fn version_url(&self, package_name: &str, version: &str) -> String {
        format!(
            "{base}/{name}/{version}",
            base = trim_base(&self.registry),
            name = encode_package_name(package_name),
            version = urlencoding::encode(version)
        )
    }

    /// Tarball location, `/<name>/-/<unscoped name>-<version>.tgz`.
    pub fn tarball_url(&self, package_name: &str, version: &str) -> String {
        format!(
            "{base}/{name}/-/{unscoped}-{version}.tgz",
            base = trim_base(&self.tarball_cdn),
            name = package_name,
            unscoped = strip_organisation(package_name),
            version = version
        )
    }
}

fn trim_base(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}
