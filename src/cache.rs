//! On-disk memo of the joined boundaries and the point set.
//!
//! Two GeoJSON documents sit at well-known paths. By default the pair being
//! present is the only hit signal, so a changed CSV or boundary file is not
//! noticed until someone deletes the cache. With a fingerprint attached, a
//! third manifest document records a BLAKE3 hash of the inputs and any
//! mismatch counts as a miss.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use enrollment::EducationRecord;
use geojson::{FeatureCollection, GeoJson};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::GeoError;
use crate::records;
use crate::region::{self, Region};

pub const POLYGONS_FILE: &str = "colombia_educacion.geojson";
pub const POINTS_FILE: &str = "colombia_educacion_puntos.geojson";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheValidation {
    /// Hit whenever both documents exist.
    #[default]
    Presence,
    /// Hit only when the manifest matches the current inputs.
    Fingerprint,
}

impl FromStr for CacheValidation {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "presence" => Ok(CacheValidation::Presence),
            "fingerprint" => Ok(CacheValidation::Fingerprint),
            other => anyhow::bail!("unknown cache validation {other:?}"),
        }
    }
}

impl fmt::Display for CacheValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheValidation::Presence => f.write_str("presence"),
            CacheValidation::Fingerprint => f.write_str("fingerprint"),
        }
    }
}

/// Hex BLAKE3 digest over length-prefixed parts.
pub fn fingerprint(parts: &[Vec<u8>]) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hasher.finalize().to_hex().to_string()
}

#[derive(Clone, Debug, PartialEq)]
pub struct CachedGeoArtifact {
    pub regions: Vec<Region>,
    pub points: Vec<EducationRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    fingerprint: String,
}

#[derive(Clone, Debug)]
pub struct GeoCache {
    polygons_path: PathBuf,
    points_path: PathBuf,
    fingerprint: Option<String>,
}

impl GeoCache {
    pub fn new(polygons_path: impl Into<PathBuf>, points_path: impl Into<PathBuf>) -> Self {
        Self {
            polygons_path: polygons_path.into(),
            points_path: points_path.into(),
            fingerprint: None,
        }
    }

    /// Ties cache hits to this input fingerprint.
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    pub fn polygons_path(&self) -> &Path {
        &self.polygons_path
    }

    pub fn points_path(&self) -> &Path {
        &self.points_path
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.polygons_path.with_extension("manifest.json")
    }

    /// Reads the pair. `Ok(None)` is a clean miss; an incomplete or
    /// unreadable pair is an error the caller should treat as a miss.
    pub fn lookup(&self) -> Result<Option<CachedGeoArtifact>, GeoError> {
        match (self.polygons_path.exists(), self.points_path.exists()) {
            (false, false) => return Ok(None),
            (true, false) => {
                return Err(GeoError::CacheInconsistent {
                    missing: self.points_path.clone(),
                })
            }
            (false, true) => {
                return Err(GeoError::CacheInconsistent {
                    missing: self.polygons_path.clone(),
                })
            }
            (true, true) => {}
        }

        if let Some(expected) = &self.fingerprint {
            match self.read_manifest() {
                Some(manifest) if &manifest.fingerprint == expected => {}
                _ => {
                    info!("cached geo documents do not match current inputs");
                    return Ok(None);
                }
            }
        }

        let polygons = read_collection(&self.polygons_path)?;
        let regions = polygons
            .features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| Region::from_cached_feature(index, feature))
            .collect::<Result<Vec<_>, _>>()?;

        let points = read_collection(&self.points_path)?;
        let points = records::from_collection(&points).map_err(|source| GeoError::Cache {
            path: self.points_path.clone(),
            source,
        })?;

        Ok(Some(CachedGeoArtifact { regions, points }))
    }

    /// Like [`GeoCache::lookup`], folding every failure into a miss.
    pub fn load(&self) -> Option<CachedGeoArtifact> {
        match self.lookup() {
            Ok(Some(artifact)) => {
                info!(
                    polygons = %self.polygons_path.display(),
                    points = %self.points_path.display(),
                    "geo cache hit"
                );
                Some(artifact)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "ignoring geo cache");
                None
            }
        }
    }

    /// Writes polygons, then points, then the manifest if fingerprinted.
    pub fn store(&self, artifact: &CachedGeoArtifact) -> Result<(), GeoError> {
        let polygons = region::to_collection(&artifact.regions);
        write_collection(&self.polygons_path, polygons)?;

        let points = records::to_collection(&artifact.points).map_err(|source| GeoError::Cache {
            path: self.points_path.clone(),
            source,
        })?;
        write_collection(&self.points_path, points)?;

        if let Some(fingerprint) = &self.fingerprint {
            let path = self.manifest_path();
            let manifest = Manifest {
                fingerprint: fingerprint.clone(),
            };
            serde_json::to_vec(&manifest)
                .map_err(anyhow::Error::from)
                .and_then(|bytes| Ok(std::fs::write(&path, bytes)?))
                .map_err(|source| GeoError::Cache { path, source })?;
        }
        info!(
            regions = artifact.regions.len(),
            points = artifact.points.len(),
            "stored geo cache"
        );
        Ok(())
    }

    fn read_manifest(&self) -> Option<Manifest> {
        let data = std::fs::read(self.manifest_path()).ok()?;
        serde_json::from_slice(&data).ok()
    }
}

fn read_collection(path: &Path) -> Result<FeatureCollection, GeoError> {
    std::fs::read_to_string(path)
        .context("reading cache document")
        .and_then(|text| text.parse::<FeatureCollection>().context("parsing cache document"))
        .map_err(|source| GeoError::Cache {
            path: path.to_path_buf(),
            source,
        })
}

fn write_collection(path: &Path, collection: FeatureCollection) -> Result<(), GeoError> {
    let write = || -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, GeoJson::from(collection).to_string())?;
        Ok(())
    };
    write().map_err(|source| GeoError::Cache {
        path: path.to_path_buf(),
        source,
    })
}
