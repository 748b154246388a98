use std::fmt;
use std::str::FromStr;

use enrollment::EducationRecord;
use geojson::{FeatureCollection, JsonValue};
use serde::{Deserialize, Serialize};

use crate::cache::CachedGeoArtifact;
use crate::region::{self, ENROLLMENT_PROPERTY, INSTITUTIONS_PROPERTY};

const ERROR_MESSAGE: &str = "No se pudieron cargar los datos geográficos";
const ERROR_TITLE: &str = "Error al cargar datos geográficos";

/// Value used to color the departments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    #[default]
    Estudiantes,
    NumInstituciones,
}

impl Metric {
    pub fn property(self) -> &'static str {
        match self {
            Metric::Estudiantes => ENROLLMENT_PROPERTY,
            Metric::NumInstituciones => INSTITUTIONS_PROPERTY,
        }
    }

    pub fn color_scale(self) -> &'static str {
        match self {
            Metric::Estudiantes => "Blues",
            Metric::NumInstituciones => "Greens",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Metric::Estudiantes => "Estudiantes por Departamento",
            Metric::NumInstituciones => "Número de Instituciones por Departamento",
        }
    }
}

impl FromStr for Metric {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Estudiantes" => Ok(Metric::Estudiantes),
            "NumInstituciones" => Ok(Metric::NumInstituciones),
            other => anyhow::bail!("unknown metric {other:?}"),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.property())
    }
}

/// Base map placement.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MapView {
    pub style: String,
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: f64,
    pub height: u32,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            style: "carto-positron".to_string(),
            center_lat: 4.5709,
            center_lon: -74.2973,
            zoom: 5.0,
            height: 700,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChoroplethLayer {
    pub geojson: FeatureCollection,
    pub feature_id_key: String,
    pub locations: Vec<String>,
    pub values: Vec<JsonValue>,
    pub color_scale: String,
    pub colorbar_title: String,
    pub opacity: f64,
    pub line_width: f64,
    pub hover_template: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MarkerLayer {
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub text: Vec<String>,
    pub hover: Vec<String>,
    pub color: String,
    pub size: u32,
    pub opacity: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MapPayload {
    pub title: String,
    pub error: Option<String>,
    pub choropleth: Option<ChoroplethLayer>,
    pub markers: Option<MarkerLayer>,
    pub view: MapView,
}

impl MapPayload {
    /// Empty map carrying a readable message.
    pub fn error(message: &str, view: &MapView) -> Self {
        Self {
            title: ERROR_TITLE.to_string(),
            error: Some(message.to_string()),
            choropleth: None,
            markers: None,
            view: MapView {
                height: 500,
                ..view.clone()
            },
        }
    }
}

/// Joined geometry plus the property naming each department.
#[derive(Clone, Copy, Debug)]
pub struct MapSource<'a> {
    pub artifact: &'a CachedGeoArtifact,
    pub region_key: &'a str,
}

/// Builds the choropleth and the optional institution markers. Values follow
/// the artifact's region order. Never fails: missing data yields an error
/// payload.
pub fn build_map(
    metric: Metric,
    show_points: bool,
    source: Option<MapSource<'_>>,
    view: &MapView,
) -> MapPayload {
    let Some(MapSource {
        artifact,
        region_key,
    }) = source
    else {
        return MapPayload::error(ERROR_MESSAGE, view);
    };

    let property = metric.property();
    let mut locations = Vec::new();
    let mut values = Vec::new();
    for region in &artifact.regions {
        if let (Some(value), Some(location)) =
            (region.property(property), region.property(region_key))
        {
            values.push(value.clone());
            locations.push(match location {
                JsonValue::String(name) => name.clone(),
                other => other.to_string(),
            });
        }
    }

    let choropleth = ChoroplethLayer {
        geojson: region::to_collection(&artifact.regions),
        feature_id_key: format!("properties.{region_key}"),
        locations,
        values,
        color_scale: metric.color_scale().to_string(),
        colorbar_title: property.to_string(),
        opacity: 0.7,
        line_width: 0.5,
        hover_template: format!("<b>%{{location}}</b><br>{property}: %{{z}}<extra></extra>"),
    };

    MapPayload {
        title: format!("Mapa de {} en Colombia", metric.title()),
        error: None,
        choropleth: Some(choropleth),
        markers: show_points.then(|| markers(&artifact.points)),
        view: view.clone(),
    }
}

fn markers(points: &[EducationRecord]) -> MarkerLayer {
    MarkerLayer {
        lat: points.iter().map(|p| p.latitude).collect(),
        lon: points.iter().map(|p| p.longitude).collect(),
        text: points.iter().map(|p| p.institution.clone()).collect(),
        hover: points
            .iter()
            .map(|p| {
                format!(
                    "<b>{}</b><br>Estudiantes: {}<br>Nivel: {}<extra></extra>",
                    p.institution, p.enrollment, p.level
                )
            })
            .collect(),
        color: "red".to_string(),
        size: 8,
        opacity: 0.7,
    }
}
