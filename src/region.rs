//! Department polygons as loaded from the boundary file.

use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject, JsonValue};

use crate::error::GeoError;

/// Total enrollment, written by the join.
pub const ENROLLMENT_PROPERTY: &str = "Estudiantes";
/// Institution count, written by the join.
pub const INSTITUTIONS_PROPERTY: &str = "NumInstituciones";

#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub region_id: u64,
    pub geometry: Geometry,
    pub properties: JsonObject,
}

impl Region {
    /// Validates one boundary feature. Only polygonal geometries are accepted.
    pub fn from_feature(region_id: u64, feature: Feature) -> Result<Self, GeoError> {
        let malformed = |reason: String| GeoError::MalformedRegion { region_id, reason };

        let geometry = feature
            .geometry
            .ok_or_else(|| malformed("feature has no geometry".to_string()))?;
        let shape = geo::Geometry::<f64>::try_from(geometry.value.clone())
            .map_err(|err| malformed(err.to_string()))?;
        match shape {
            geo::Geometry::Polygon(_) | geo::Geometry::MultiPolygon(_) => {}
            _ => return Err(malformed("geometry is not a polygon".to_string())),
        }
        let properties = feature
            .properties
            .ok_or_else(|| malformed("feature has no properties".to_string()))?;

        Ok(Self {
            region_id,
            geometry,
            properties,
        })
    }

    /// Loads every feature; the first malformed one aborts the load.
    pub fn from_collection(collection: FeatureCollection) -> Result<Vec<Self>, GeoError> {
        collection
            .features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| Region::from_feature(index as u64, feature))
            .collect()
    }

    /// Reads a cached feature, trusting its id as the region id.
    pub fn from_cached_feature(index: usize, feature: Feature) -> Result<Self, GeoError> {
        let region_id = match &feature.id {
            Some(Id::Number(number)) => number.as_u64().unwrap_or(index as u64),
            Some(Id::String(text)) => text.parse().unwrap_or(index as u64),
            None => index as u64,
        };
        Region::from_feature(region_id, feature)
    }

    pub fn to_feature(&self) -> Feature {
        Feature {
            bbox: None,
            geometry: Some(self.geometry.clone()),
            id: Some(Id::Number(self.region_id.into())),
            properties: Some(self.properties.clone()),
            foreign_members: None,
        }
    }

    pub fn property(&self, key: &str) -> Option<&JsonValue> {
        self.properties.get(key)
    }

    /// Department name stored under `key`, if it is a string.
    pub fn name(&self, key: &str) -> Option<&str> {
        self.property(key).and_then(JsonValue::as_str)
    }
}

pub fn to_collection(regions: &[Region]) -> FeatureCollection {
    regions.iter().map(Region::to_feature).collect()
}
