use anyhow::{anyhow, bail, Context};
use enrollment::{EducationRecord, Level};
use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject, Value};
use polars::prelude::{DataFrame, DataType};

pub const COLUMNS: [&str; 7] = [
    "ID",
    "Departamento",
    "Latitud",
    "Longitud",
    "Nivel",
    "Estudiantes",
    "Institución",
];

/// Converts the raw table into records. Any bad cell fails the whole load.
pub fn from_dataframe(df: &DataFrame) -> anyhow::Result<Vec<EducationRecord>> {
    let absent: Vec<&str> = COLUMNS
        .iter()
        .copied()
        .filter(|name| df.column(name).is_err())
        .collect();
    if !absent.is_empty() {
        bail!("missing columns: {}", absent.join(", "));
    }

    let ids = text_column(df, "ID")?;
    let departments = text_column(df, "Departamento")?;
    let latitudes = float_column(df, "Latitud")?;
    let longitudes = float_column(df, "Longitud")?;
    let levels = text_column(df, "Nivel")?;
    let enrollments = int_column(df, "Estudiantes")?;
    let institutions = text_column(df, "Institución")?;

    let mut records = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let enrollment = enrollments[row];
        if enrollment < 0 {
            bail!("row {}: negative `Estudiantes` value {enrollment}", row + 1);
        }
        records.push(EducationRecord {
            id: ids[row].clone(),
            department: departments[row].clone(),
            latitude: latitudes[row],
            longitude: longitudes[row],
            level: Level::from(levels[row].as_str()),
            enrollment: enrollment as u64,
            institution: institutions[row].clone(),
        });
    }
    Ok(records)
}

fn column_cast(df: &DataFrame, name: &str, dtype: &DataType) -> anyhow::Result<polars::prelude::Series> {
    let column = df
        .column(name)
        .with_context(|| format!("missing column `{name}`"))?;
    Ok(column.cast(dtype)?)
}

fn missing(name: &str, row: usize) -> anyhow::Error {
    anyhow!("row {}: empty or invalid `{name}` value", row + 1)
}

fn text_column(df: &DataFrame, name: &str) -> anyhow::Result<Vec<String>> {
    let series = column_cast(df, name, &DataType::Utf8)?;
    series
        .utf8()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| value.map(str::to_string).ok_or_else(|| missing(name, row)))
        .collect()
}

fn float_column(df: &DataFrame, name: &str) -> anyhow::Result<Vec<f64>> {
    let series = column_cast(df, name, &DataType::Float64)?;
    series
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| value.ok_or_else(|| missing(name, row)))
        .collect()
}

/// Whole numbers only; the Int64 cast alone would truncate `100.7`.
fn int_column(df: &DataFrame, name: &str) -> anyhow::Result<Vec<i64>> {
    let values = column_cast(df, name, &DataType::Int64)?;
    let exact = column_cast(df, name, &DataType::Float64)?;
    values
        .i64()?
        .into_iter()
        .zip(exact.f64()?.into_iter())
        .enumerate()
        .map(|(row, pair)| match pair {
            (Some(value), Some(exact)) if exact.fract() == 0.0 => Ok(value),
            (Some(_), Some(exact)) => {
                bail!("row {}: `{name}` value {exact} is not a whole number", row + 1)
            }
            _ => Err(missing(name, row)),
        })
        .collect()
}

/// Point feature carrying every column of the record.
pub fn to_feature(index: usize, record: &EducationRecord) -> anyhow::Result<Feature> {
    let properties: JsonObject = match serde_json::to_value(record)? {
        serde_json::Value::Object(map) => map,
        _ => bail!("record did not serialize to an object"),
    };
    Ok(Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![
            record.longitude,
            record.latitude,
        ]))),
        id: Some(Id::Number(index.into())),
        properties: Some(properties),
        foreign_members: None,
    })
}

pub fn from_feature(feature: &Feature) -> anyhow::Result<EducationRecord> {
    let properties = feature
        .properties
        .clone()
        .ok_or_else(|| anyhow!("point feature has no properties"))?;
    Ok(serde_json::from_value(serde_json::Value::Object(properties))?)
}

pub fn to_collection(records: &[EducationRecord]) -> anyhow::Result<FeatureCollection> {
    let features = records
        .iter()
        .enumerate()
        .map(|(index, record)| to_feature(index, record))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(features.into_iter().collect())
}

pub fn from_collection(collection: &FeatureCollection) -> anyhow::Result<Vec<EducationRecord>> {
    collection
        .features
        .iter()
        .enumerate()
        .map(|(index, feature)| {
            from_feature(feature).with_context(|| format!("point feature {index}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use polars::prelude::{CsvReader, SerReader};

    use super::*;

    fn read(csv: &str) -> DataFrame {
        CsvReader::new(Cursor::new(csv.as_bytes().to_vec()))
            .has_header(true)
            .finish()
            .unwrap()
    }

    const HEADER: &str = "ID,Departamento,Latitud,Longitud,Nivel,Estudiantes,Institución\n";

    #[test]
    fn loads_all_columns() {
        let df = read(&format!(
            "{HEADER}1,ATLÁNTICO,10.96,-74.79,Técnico,2300,Universidad C\n\
             2,CAUCA,2.44,-76.61,Posgrado,800,Universidad B\n"
        ));
        let records = from_dataframe(&df).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "1");
        assert_eq!(records[0].department, "ATLÁNTICO");
        assert_eq!(records[0].level, Level::Tecnico);
        assert_eq!(records[0].enrollment, 2300);
        assert_eq!(records[1].institution, "Universidad B");
        assert!((records[1].longitude + 76.61).abs() < 1e-9);
    }

    #[test]
    fn missing_column_fails() {
        let df = read("ID,Departamento\n1,CAUCA\n");
        let err = from_dataframe(&df).unwrap_err();
        assert!(err.to_string().contains("Latitud"));
    }

    #[test]
    fn negative_enrollment_fails() {
        let df = read(&format!("{HEADER}1,CAUCA,2.4,-76.6,Pregrado,-3,Universidad B\n"));
        let err = from_dataframe(&df).unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn fractional_enrollment_fails() {
        let df = read(&format!(
            "{HEADER}1,CAUCA,2.4,-76.6,Pregrado,100.7,Universidad B\n\
             2,META,4.1,-73.6,Pregrado,12.0,Universidad A\n"
        ));
        let err = from_dataframe(&df).unwrap_err();
        assert!(err.to_string().contains("not a whole number"));
    }

    #[test]
    fn whole_float_enrollment_loads() {
        let df = read(&format!("{HEADER}1,META,4.1,-73.6,Pregrado,12.0,Universidad A\n"));
        assert_eq!(from_dataframe(&df).unwrap()[0].enrollment, 12);
    }

    #[test]
    fn non_numeric_coordinate_fails() {
        let df = read(&format!("{HEADER}1,CAUCA,norte,-76.6,Pregrado,3,Universidad B\n"));
        assert!(from_dataframe(&df).is_err());
    }

    #[test]
    fn point_feature_keeps_coordinates() {
        let record = EducationRecord {
            id: "9".to_string(),
            department: "CAUCA".to_string(),
            latitude: 2.44,
            longitude: -76.61,
            level: Level::Pregrado,
            enrollment: 40,
            institution: "Universidad B".to_string(),
        };
        let feature = to_feature(3, &record).unwrap();
        match &feature.geometry.as_ref().unwrap().value {
            Value::Point(coords) => assert_eq!(coords, &vec![-76.61, 2.44]),
            other => panic!("unexpected geometry {other:?}"),
        }
        assert_eq!(from_feature(&feature).unwrap(), record);
    }
}
