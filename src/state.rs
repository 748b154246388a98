//! Everything computed once at startup, plus the read-only queries the
//! dashboard runs against it.

use anyhow::Context;
use enrollment::{EducationRecord, LevelAggregate};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::cache::{CacheValidation, CachedGeoArtifact, GeoCache};
use crate::colombia::Colombia;
use crate::config::Config;
use crate::error::GeoError;
use crate::filter;
use crate::getter::Getter;
use crate::join::{GeoJoinEngine, JoinReport, MatchMode};
use crate::map::{self, MapPayload, MapSource, MapView, Metric};
use crate::records;
use crate::region::Region;
use crate::region_key::RegionKeyResolver;
use crate::summary::Summary;

/// Joined boundaries ready for the map.
#[derive(Clone, Debug)]
pub struct GeoLayer {
    pub artifact: CachedGeoArtifact,
    pub region_key: String,
    pub cache_hit: bool,
    // Absent only when a cached layer could not be rejoined
    pub report: Option<JoinReport>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Status {
    pub geo_loaded: bool,
    pub message: Option<String>,
    pub detail: Option<String>,
    pub cache_hit: bool,
    pub region_key: Option<String>,
    pub unmatched_regions: Vec<String>,
}

pub struct AppState {
    records: Vec<EducationRecord>,
    summary: Summary,
    departments: Vec<String>,
    geo: Result<GeoLayer, GeoError>,
    view: MapView,
}

impl AppState {
    pub async fn load(config: &Config) -> anyhow::Result<Self> {
        let colombia = Colombia::new(config.boundaries.clone(), config.records.clone());
        Self::load_from(&colombia, config).await
    }

    /// Loads the records, failing hard, then the geo layer, failing soft.
    pub async fn load_from<G>(getter: &G, config: &Config) -> anyhow::Result<Self>
    where
        G: Getter + Sync + ?Sized,
    {
        let df = getter
            .records()
            .await
            .context("loading education records")?;
        let records = records::from_dataframe(&df).context("reading education records")?;
        info!(records = records.len(), "loaded education records");

        let geo = load_geo(getter, &records, config).await;
        if let Err(err) = &geo {
            error!(error = %err, "geographic data unavailable, map disabled");
        }
        Ok(Self::new(records, geo, config.view.clone()))
    }

    pub fn new(
        records: Vec<EducationRecord>,
        geo: Result<GeoLayer, GeoError>,
        view: MapView,
    ) -> Self {
        Self {
            summary: Summary::from_records(&records),
            departments: filter::departments(&records),
            records,
            geo,
            view,
        }
    }

    pub fn build_map(&self, metric: Metric, show_points: bool) -> MapPayload {
        match &self.geo {
            Ok(layer) => {
                let source = MapSource {
                    artifact: &layer.artifact,
                    region_key: &layer.region_key,
                };
                map::build_map(metric, show_points, Some(source), &self.view)
            }
            Err(GeoError::NoRegionKeyFound) => {
                MapPayload::error(GeoError::NoRegionKeyFound.banner(), &self.view)
            }
            Err(_) => map::build_map(metric, show_points, None, &self.view),
        }
    }

    pub fn filter_by_department(&self, department: &str) -> Vec<LevelAggregate> {
        filter::filter_by_department(department, &self.records)
    }

    pub fn status(&self) -> Status {
        match &self.geo {
            Ok(layer) => Status {
                geo_loaded: true,
                message: None,
                detail: None,
                cache_hit: layer.cache_hit,
                region_key: Some(layer.region_key.clone()),
                unmatched_regions: layer
                    .report
                    .as_ref()
                    .map(|report| report.unmatched_regions.clone())
                    .unwrap_or_default(),
            },
            Err(err) => Status {
                geo_loaded: false,
                message: Some(err.banner().to_string()),
                detail: Some(error_chain(err)),
                cache_hit: false,
                region_key: None,
                unmatched_regions: Vec::new(),
            },
        }
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn departments(&self) -> &[String] {
        &self.departments
    }

    pub fn records(&self) -> &[EducationRecord] {
        &self.records
    }

    pub fn geo(&self) -> Result<&GeoLayer, &GeoError> {
        self.geo.as_ref()
    }
}

fn error_chain(err: &GeoError) -> String {
    let mut text = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

/// Serves the cached join when present, otherwise joins and stores it.
pub async fn load_geo<G>(
    getter: &G,
    records: &[EducationRecord],
    config: &Config,
) -> Result<GeoLayer, GeoError>
where
    G: Getter + Sync + ?Sized,
{
    let mut cache = GeoCache::new(&config.polygons_cache, &config.points_cache);
    if config.cache_validation == CacheValidation::Fingerprint {
        let fingerprint = getter
            .fingerprint()
            .await
            .map_err(|source| GeoError::Load {
                what: "input fingerprint",
                source,
            })?;
        // Match mode changes the join output.
        cache = cache.with_fingerprint(crate::cache::fingerprint(&[
            fingerprint.into_bytes(),
            config.match_mode.to_string().into_bytes(),
        ]));
    }
    load_geo_with(getter, records, &cache, config.match_mode).await
}

pub async fn load_geo_with<G>(
    getter: &G,
    records: &[EducationRecord],
    cache: &GeoCache,
    mode: MatchMode,
) -> Result<GeoLayer, GeoError>
where
    G: Getter + Sync + ?Sized,
{
    let resolver = RegionKeyResolver::default();
    let engine = GeoJoinEngine::new(mode);
    if let Some(artifact) = cache.load() {
        let region_key = resolver.resolve(&artifact.regions)?;
        // The join is idempotent, so rerunning it only recovers the report.
        let report = match engine.join(&artifact.regions, &artifact.points, &region_key) {
            Ok(outcome) => Some(outcome.report),
            Err(err) => {
                warn!(error = %err, "could not rebuild join report from cache");
                None
            }
        };
        return Ok(GeoLayer {
            artifact,
            region_key,
            cache_hit: true,
            report,
        });
    }

    let collection = getter.geojson().await.map_err(|source| GeoError::Load {
        what: "department boundaries",
        source,
    })?;
    let regions = Region::from_collection(collection)?;
    let region_key = resolver.resolve(&regions)?;
    info!(regions = regions.len(), key = %region_key, "loaded department boundaries");

    let outcome = engine.join(&regions, records, &region_key)?;
    let artifact = CachedGeoArtifact {
        regions: outcome.regions,
        points: records.to_vec(),
    };
    if let Err(err) = cache.store(&artifact) {
        error!(error = %err, "could not write geo cache, next start will rejoin");
    }

    Ok(GeoLayer {
        artifact,
        region_key,
        cache_hit: false,
        report: Some(outcome.report),
    })
}
