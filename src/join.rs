//! Attaches per-department enrollment totals to the boundary polygons.
//!
//! Records are grouped by department, then each region looks up its own
//! department name among the groups. Matching is case-insensitive only by
//! default, so "BOGOTA" and "BOGOTÁ" are different departments;
//! [`MatchMode::Folded`] also ignores accents and surrounding whitespace.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use enrollment::{DepartmentAggregate, EducationRecord};
use geojson::JsonValue;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::GeoError;
use crate::region::{Region, ENROLLMENT_PROPERTY, INSTITUTIONS_PROPERTY};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// Exact-string grouping, uppercase comparison.
    #[default]
    CaseInsensitive,
    /// Grouping and comparison on trimmed, accent-free uppercase names.
    Folded,
}

impl MatchMode {
    fn group_key(self, department: &str) -> String {
        match self {
            MatchMode::CaseInsensitive => department.to_string(),
            MatchMode::Folded => fold(department),
        }
    }

    fn match_key(self, name: &str) -> String {
        match self {
            MatchMode::CaseInsensitive => name.to_uppercase(),
            MatchMode::Folded => fold(name),
        }
    }
}

impl FromStr for MatchMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "case-insensitive" => Ok(MatchMode::CaseInsensitive),
            "folded" => Ok(MatchMode::Folded),
            other => anyhow::bail!("unknown match mode {other:?}"),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::CaseInsensitive => f.write_str("case-insensitive"),
            MatchMode::Folded => f.write_str("folded"),
        }
    }
}

/// Trims, strips diacritics, uppercases and collapses inner whitespace.
pub fn fold(name: &str) -> String {
    let stripped: String = name
        .trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    stripped
        .to_uppercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Group-and-sum of the records, sorted by department key.
pub fn aggregate(records: &[EducationRecord], mode: MatchMode) -> Vec<DepartmentAggregate> {
    let mut groups: BTreeMap<String, DepartmentAggregate> = BTreeMap::new();
    for record in records {
        let entry = groups
            .entry(mode.group_key(&record.department))
            .or_insert_with(|| DepartmentAggregate {
                department: record.department.clone(),
                total_enrollment: 0,
                institution_count: 0,
            });
        entry.total_enrollment += record.enrollment;
        entry.institution_count += 1;
    }
    groups.into_values().collect()
}

/// Match diagnostics for one join run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct JoinReport {
    pub matched: usize,
    /// Region names that received zeroes.
    pub unmatched_regions: Vec<String>,
    /// Departments in the records that no region claimed.
    pub unused_departments: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct JoinOutcome {
    pub regions: Vec<Region>,
    pub report: JoinReport,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct GeoJoinEngine {
    pub mode: MatchMode,
}

impl GeoJoinEngine {
    pub fn new(mode: MatchMode) -> Self {
        Self { mode }
    }

    /// Returns copies of `regions`, in the same order, with `Estudiantes` and
    /// `NumInstituciones` set. Regions without a matching department get 0.
    pub fn join(
        &self,
        regions: &[Region],
        records: &[EducationRecord],
        region_key: &str,
    ) -> Result<JoinOutcome, GeoError> {
        let aggregates = aggregate(records, self.mode);
        let keyed: Vec<(String, &DepartmentAggregate)> = aggregates
            .iter()
            .map(|aggregate| (self.mode.match_key(&aggregate.department), aggregate))
            .collect();
        let mut claimed = vec![false; keyed.len()];

        let mut report = JoinReport::default();
        let mut joined = Vec::with_capacity(regions.len());
        for region in regions {
            let name = region.name(region_key).ok_or_else(|| GeoError::MissingProperty {
                region_id: region.region_id,
                key: region_key.to_string(),
            })?;
            let wanted = self.mode.match_key(name);

            let mut region = region.clone();
            let (enrollment, institutions) =
                match keyed.iter().position(|(key, _)| *key == wanted) {
                    Some(index) => {
                        claimed[index] = true;
                        report.matched += 1;
                        let aggregate = keyed[index].1;
                        (aggregate.total_enrollment, aggregate.institution_count)
                    }
                    None => {
                        debug!(region = name, "no department aggregate for region");
                        report.unmatched_regions.push(name.to_string());
                        (0, 0)
                    }
                };
            region
                .properties
                .insert(ENROLLMENT_PROPERTY.to_string(), JsonValue::from(enrollment));
            region
                .properties
                .insert(INSTITUTIONS_PROPERTY.to_string(), JsonValue::from(institutions));
            joined.push(region);
        }

        report.unused_departments = keyed
            .iter()
            .zip(&claimed)
            .filter(|(_, used)| !**used)
            .map(|((_, aggregate), _)| aggregate.department.clone())
            .collect();

        if !report.unmatched_regions.is_empty() {
            warn!(
                count = report.unmatched_regions.len(),
                regions = ?report.unmatched_regions,
                "regions without enrollment data default to zero"
            );
        }
        info!(
            mode = %self.mode,
            matched = report.matched,
            regions = joined.len(),
            departments = aggregates.len(),
            "joined enrollment onto boundaries"
        );

        Ok(JoinOutcome {
            regions: joined,
            report,
        })
    }
}
