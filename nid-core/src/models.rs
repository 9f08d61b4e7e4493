use serde::Deserialize;

/// Subset of the quality index package document.
#[derive(Debug, Deserialize)]
pub struct QualityIndexPackage {
    pub collected: Collected,
}

#[derive(Debug, Deserialize)]
pub struct Collected {
    pub metadata: PackageMetadata,
}

#[derive(Debug, Deserialize)]
pub struct PackageMetadata {
    pub version: String,
}

/// Registry manifest of a single version, as returned by `/<name>/latest`.
#[derive(Debug, Deserialize)]
pub struct RegistryManifest {
    pub version: String,
}
