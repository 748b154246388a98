use std::collections::HashSet;

use geojson::{JsonObject, JsonValue};

use crate::error::GeoError;
use crate::region::Region;

/// Property names known to hold the department name, in priority order.
pub const DEPARTMENT_KEYS: [&str; 6] = [
    "DEPARTAMEN",
    "NOMBRE_DEP",
    "DPTO",
    "NAME_1",
    "DEPARTAMENTO",
    "NOM_DEPART",
];

/// Picks the property holding the department name in a boundary dataset.
#[derive(Clone, Debug)]
pub struct RegionKeyResolver {
    pub candidates: Vec<String>,
    // A name column must have strictly more distinct values than this
    pub min_distinct: usize,
}

impl Default for RegionKeyResolver {
    fn default() -> Self {
        Self {
            candidates: DEPARTMENT_KEYS.iter().map(|key| key.to_string()).collect(),
            min_distinct: 20,
        }
    }
}

impl RegionKeyResolver {
    /// Priority-list lookup against one region's properties.
    pub fn resolve_properties(&self, properties: &JsonObject) -> Option<String> {
        self.candidates
            .iter()
            .find(|key| properties.contains_key(key.as_str()))
            .cloned()
    }

    /// Priority list against the first region, then the string-column heuristic.
    pub fn resolve(&self, regions: &[Region]) -> Result<String, GeoError> {
        let first = regions.first().ok_or(GeoError::NoRegionKeyFound)?;
        if let Some(key) = self.resolve_properties(&first.properties) {
            return Ok(key);
        }
        first
            .properties
            .keys()
            .find(|key| self.looks_like_names(regions, key))
            .cloned()
            .ok_or(GeoError::NoRegionKeyFound)
    }

    fn looks_like_names(&self, regions: &[Region], key: &str) -> bool {
        let mut distinct = HashSet::new();
        for region in regions {
            match region.property(key) {
                None | Some(JsonValue::Null) => {}
                Some(JsonValue::String(value)) => {
                    distinct.insert(value.as_str());
                }
                Some(_) => return false,
            }
        }
        distinct.len() > self.min_distinct
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::region::tests::region;

    #[test]
    fn priority_list_wins_over_heuristic() {
        let regions = vec![region(0, json!({"DEPARTAMEN": "CAUCA", "OtherField": "x"}))];
        assert_eq!(
            RegionKeyResolver::default().resolve(&regions).unwrap(),
            "DEPARTAMEN"
        );
    }

    #[test]
    fn earlier_candidate_is_preferred() {
        let properties = json!({"NAME_1": "Cauca", "DPTO": "CAUCA"});
        let resolver = RegionKeyResolver::default();
        assert_eq!(
            resolver.resolve_properties(properties.as_object().unwrap()),
            Some("DPTO".to_string())
        );
    }

    #[test]
    fn heuristic_finds_high_cardinality_string_column() {
        let regions: Vec<Region> = (0..25)
            .map(|i| {
                region(
                    i,
                    json!({"CODIGO": i, "CLASE": "DEPTO", "NOMBRE": format!("DEPARTAMENTO {i}")}),
                )
            })
            .collect();
        assert_eq!(
            RegionKeyResolver::default().resolve(&regions).unwrap(),
            "NOMBRE"
        );
    }

    #[test]
    fn twenty_distinct_values_is_not_enough() {
        let regions: Vec<Region> = (0..20)
            .map(|i| region(i, json!({"NOMBRE": format!("D{i}")})))
            .collect();
        assert!(matches!(
            RegionKeyResolver::default().resolve(&regions),
            Err(GeoError::NoRegionKeyFound)
        ));
    }

    #[test]
    fn mixed_type_column_is_rejected() {
        let mut regions: Vec<Region> = (0..30)
            .map(|i| region(i, json!({"NOMBRE": format!("D{i}")})))
            .collect();
        regions.push(region(30, json!({"NOMBRE": 7})));
        assert!(RegionKeyResolver::default().resolve(&regions).is_err());
    }

    #[test]
    fn empty_dataset_has_no_key() {
        assert!(matches!(
            RegionKeyResolver::default().resolve(&[]),
            Err(GeoError::NoRegionKeyFound)
        ));
    }
}
