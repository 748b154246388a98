use std::collections::{BTreeMap, BTreeSet};

use enrollment::{EducationRecord, LevelAggregate};

/// Students per level for one department, sorted by level name. Unknown
/// departments give an empty list.
pub fn filter_by_department(department: &str, records: &[EducationRecord]) -> Vec<LevelAggregate> {
    let mut levels: BTreeMap<&str, LevelAggregate> = BTreeMap::new();
    for record in records.iter().filter(|r| r.department == department) {
        levels
            .entry(record.level.as_str())
            .or_insert_with(|| LevelAggregate {
                level: record.level.clone(),
                enrollment: 0,
            })
            .enrollment += record.enrollment;
    }
    levels.into_values().collect()
}

/// Sorted distinct departments, as offered by the selector.
pub fn departments(records: &[EducationRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.department.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
