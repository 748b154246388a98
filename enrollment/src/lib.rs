use std::fmt;

use serde::{Deserialize, Serialize};

/// One row of the higher-education dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EducationRecord {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Departamento")]
    pub department: String,
    #[serde(rename = "Latitud")]
    pub latitude: f64,
    #[serde(rename = "Longitud")]
    pub longitude: f64,
    #[serde(rename = "Nivel")]
    pub level: Level,
    // Enrolled students
    #[serde(rename = "Estudiantes")]
    pub enrollment: u64,
    #[serde(rename = "Institución")]
    pub institution: String,
}

/// Education level. Values outside the known set are kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Level {
    Pregrado,
    Posgrado,
    Profesional,
    Tecnico,
    Tecnologico,
    Other(String),
}

impl Level {
    pub fn as_str(&self) -> &str {
        match self {
            Level::Pregrado => "Pregrado",
            Level::Posgrado => "Posgrado",
            Level::Profesional => "Profesional",
            Level::Tecnico => "Técnico",
            Level::Tecnologico => "Tecnológico",
            Level::Other(name) => name,
        }
    }
}

impl From<&str> for Level {
    fn from(value: &str) -> Self {
        match value {
            "Pregrado" => Level::Pregrado,
            "Posgrado" => Level::Posgrado,
            "Profesional" => Level::Profesional,
            "Técnico" => Level::Tecnico,
            "Tecnológico" => Level::Tecnologico,
            other => Level::Other(other.to_string()),
        }
    }
}

impl From<String> for Level {
    fn from(value: String) -> Self {
        Level::from(value.as_str())
    }
}

impl From<Level> for String {
    fn from(level: Level) -> Self {
        level.as_str().to_string()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-department totals derived from the full record set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentAggregate {
    pub department: String,
    pub total_enrollment: u64,
    // Number of rows, i.e. institution entries, for the department
    pub institution_count: u64,
}

/// Students per level within a single department.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelAggregate {
    #[serde(rename = "Nivel")]
    pub level: Level,
    #[serde(rename = "Estudiantes")]
    pub enrollment: u64,
}
