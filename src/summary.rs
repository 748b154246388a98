//! Headline figures and breakdowns over the whole record set.

use std::collections::{BTreeMap, HashSet};

use enrollment::EducationRecord;
use serde::Serialize;

pub const TOP_N: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Ranked {
    pub name: String,
    pub students: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub total_students: u64,
    pub institutions: usize,
    pub departments: usize,
    pub mean_students: f64,
    pub by_level: Vec<Ranked>,
    pub top_departments: Vec<Ranked>,
    pub top_institutions: Vec<Ranked>,
}

impl Summary {
    pub fn from_records(records: &[EducationRecord]) -> Self {
        let total_students: u64 = records.iter().map(|r| r.enrollment).sum();
        let mean_students = if records.is_empty() {
            0.0
        } else {
            total_students as f64 / records.len() as f64
        };

        Self {
            total_students,
            institutions: distinct(records, |r| r.institution.as_str()),
            departments: distinct(records, |r| r.department.as_str()),
            mean_students,
            by_level: totals(records, |r| r.level.as_str()),
            top_departments: top(totals(records, |r| r.department.as_str()), TOP_N),
            top_institutions: top(totals(records, |r| r.institution.as_str()), TOP_N),
        }
    }
}

fn distinct<'a>(records: &'a [EducationRecord], key: impl Fn(&'a EducationRecord) -> &'a str) -> usize {
    records.iter().map(key).collect::<HashSet<_>>().len()
}

/// Students per key, sorted by key.
fn totals<'a>(
    records: &'a [EducationRecord],
    key: impl Fn(&'a EducationRecord) -> &'a str,
) -> Vec<Ranked> {
    let mut sums: BTreeMap<&str, u64> = BTreeMap::new();
    for record in records {
        *sums.entry(key(record)).or_default() += record.enrollment;
    }
    sums.into_iter()
        .map(|(name, students)| Ranked {
            name: name.to_string(),
            students,
        })
        .collect()
}

/// Largest first; ties keep name order.
fn top(mut ranked: Vec<Ranked>, n: usize) -> Vec<Ranked> {
    ranked.sort_by(|a, b| b.students.cmp(&a.students));
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use enrollment::Level;

    use super::*;

    fn record(department: &str, institution: &str, level: Level, enrollment: u64) -> EducationRecord {
        EducationRecord {
            id: "1".to_string(),
            department: department.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            level,
            enrollment,
            institution: institution.to_string(),
        }
    }

    #[test]
    fn kpis_over_records() {
        let records = vec![
            record("CAUCA", "Universidad A", Level::Pregrado, 100),
            record("CAUCA", "Universidad B", Level::Posgrado, 50),
            record("META", "Universidad A", Level::Pregrado, 30),
        ];
        let summary = Summary::from_records(&records);
        assert_eq!(summary.total_students, 180);
        assert_eq!(summary.institutions, 2);
        assert_eq!(summary.departments, 2);
        assert!((summary.mean_students - 60.0).abs() < 1e-9);
        assert_eq!(
            summary.by_level,
            vec![
                Ranked {
                    name: "Posgrado".to_string(),
                    students: 50
                },
                Ranked {
                    name: "Pregrado".to_string(),
                    students: 130
                },
            ]
        );
        assert_eq!(summary.top_departments[0].name, "CAUCA");
        assert_eq!(summary.top_institutions[0].students, 130);
    }

    #[test]
    fn top_keeps_ten_and_breaks_ties_by_name() {
        let records: Vec<EducationRecord> = (0..12)
            .map(|i| record(&format!("D{i:02}"), "U", Level::Pregrado, if i < 2 { 5 } else { 1 }))
            .collect();
        let summary = Summary::from_records(&records);
        assert_eq!(summary.top_departments.len(), TOP_N);
        assert_eq!(summary.top_departments[0].name, "D00");
        assert_eq!(summary.top_departments[1].name, "D01");
        assert_eq!(summary.top_departments[2].name, "D02");
    }

    #[test]
    fn empty_records_have_zero_mean() {
        let summary = Summary::from_records(&[]);
        assert_eq!(summary.total_students, 0);
        assert_eq!(summary.mean_students, 0.0);
    }
}
