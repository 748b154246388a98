use std::path::PathBuf;

use thiserror::Error;

/// Failures of the geographic subsystem. None of these are fatal to the
/// application; the tabular views keep working without geometry.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("failed to load {what}")]
    Load {
        what: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("region {region_id} is malformed: {reason}")]
    MalformedRegion { region_id: u64, reason: String },
    #[error("region {region_id} has no usable `{key}` property")]
    MissingProperty { region_id: u64, key: String },
    #[error("no department name property found in boundary data")]
    NoRegionKeyFound,
    #[error("cache pair incomplete: {missing:?} is missing")]
    CacheInconsistent { missing: PathBuf },
    #[error("cache document {path:?} could not be used")]
    Cache {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl GeoError {
    /// Short message for the dashboard's error banner.
    pub fn banner(&self) -> &'static str {
        match self {
            GeoError::NoRegionKeyFound => "No hay etiqueta de departamento disponible",
            _ => "Error al procesar datos geográficos",
        }
    }
}
