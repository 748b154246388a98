use async_trait::async_trait;
use geojson::FeatureCollection;
use polars::prelude::DataFrame;

/// Gets enrollment and boundary data for a given country.
#[async_trait]
pub trait Getter {
    /// Gets the tabular education records.
    async fn records(&self) -> anyhow::Result<DataFrame>;
    /// Gets the department boundaries as GeoJSON.
    async fn geojson(&self) -> anyhow::Result<FeatureCollection>;
    /// Content hash of both inputs, used to detect a stale cache.
    async fn fingerprint(&self) -> anyhow::Result<String>;
}
