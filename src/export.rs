use anyhow::Context;
use polars::prelude::*;

use edumapa::{
    colombia::Colombia, config::Config, getter::Getter, join, records, region, state,
};

// Written next to each other so the CSV can be checked against the map
const AGGREGATES_PATH: &str = "data/departamentos.csv";
const JOINED_PATH: &str = "data/departamentos.geojson";

fn write_df(file_name: &str, df: &mut DataFrame) -> anyhow::Result<()> {
    let mut file = std::fs::File::create(file_name)?;
    CsvWriter::new(&mut file).finish(df)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();
    let args: Vec<String> = std::env::args().collect();
    let config = Config::from_env()?.apply_args(&args)?;
    let colombia = Colombia::new(config.boundaries.clone(), config.records.clone());
    std::fs::create_dir_all("data")?;

    // Education records
    let df = colombia.records().await?;
    let records = records::from_dataframe(&df)?;

    // Per-department aggregates
    let aggregates = join::aggregate(&records, config.match_mode);
    let mut aggregates_df = DataFrame::new(vec![
        Series::new(
            "Departamento",
            aggregates
                .iter()
                .map(|a| a.department.as_str())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "Estudiantes",
            aggregates.iter().map(|a| a.total_enrollment).collect::<Vec<_>>(),
        ),
        Series::new(
            "NumInstituciones",
            aggregates.iter().map(|a| a.institution_count).collect::<Vec<_>>(),
        ),
    ])?;
    println!("Departments:");
    println!("{}", aggregates_df);
    write_df(AGGREGATES_PATH, &mut aggregates_df)?;

    // Joined boundaries, through the cache like the server does
    let layer = state::load_geo(&colombia, &records, &config)
        .await
        .context("joining enrollment onto boundaries")?;
    if let Some(report) = &layer.report {
        println!("Unmatched regions: {:?}", report.unmatched_regions);
        println!("Unused departments: {:?}", report.unused_departments);
    }
    let out = geojson::GeoJson::from(region::to_collection(&layer.artifact.regions));
    std::fs::write(JOINED_PATH, out.to_string())?;

    Ok(())
}
