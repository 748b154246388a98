use std::fmt;
use std::io::{Cursor, Read};
use std::path::PathBuf;

use anyhow::{bail, Context};
use async_trait::async_trait;
use geojson::FeatureCollection;
use polars::prelude::{CsvReader, DataFrame, SerReader};

use crate::cache;
use crate::getter::Getter;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Where an input file lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    Path(PathBuf),
    Url(String),
}

impl Source {
    pub fn parse(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            Source::Url(value.to_string())
        } else {
            Source::Path(PathBuf::from(value))
        }
    }

    pub async fn bytes(&self) -> anyhow::Result<Vec<u8>> {
        match self {
            Source::Path(path) => tokio::fs::read(path)
                .await
                .with_context(|| format!("reading {}", path.display())),
            Source::Url(url) => {
                let response = reqwest::get(url).await?.error_for_status()?;
                Ok(response.bytes().await?.to_vec())
            }
        }
    }

    fn is_zip_name(&self) -> bool {
        let name = match self {
            Source::Path(path) => path.to_string_lossy().to_lowercase(),
            Source::Url(url) => url.to_lowercase(),
        };
        name.ends_with(".zip")
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Path(path) => write!(f, "{}", path.display()),
            Source::Url(url) => f.write_str(url),
        }
    }
}

/// Colombian higher-education records and department boundaries.
#[derive(Clone, Debug)]
pub struct Colombia {
    pub boundaries: Source,
    pub records: Source,
}

impl Colombia {
    pub fn new(boundaries: Source, records: Source) -> Self {
        Self {
            boundaries,
            records,
        }
    }
}

#[async_trait]
impl Getter for Colombia {
    async fn records(&self) -> anyhow::Result<DataFrame> {
        let data = self.records.bytes().await?;
        Ok(CsvReader::new(Cursor::new(data))
            .has_header(true)
            .finish()?)
    }

    async fn geojson(&self) -> anyhow::Result<FeatureCollection> {
        let data = self.boundaries.bytes().await?;
        let buffer = if self.boundaries.is_zip_name() || data.starts_with(ZIP_MAGIC) {
            geojson_from_zip(data)?
        } else {
            String::from_utf8(data).context("boundary file is not UTF-8")?
        };
        Ok(buffer.parse()?)
    }

    async fn fingerprint(&self) -> anyhow::Result<String> {
        let mut parts = Vec::with_capacity(2);
        for source in [&self.boundaries, &self.records] {
            // Remote sources are identified by URL only; downloading them just
            // to hash would defeat the cache.
            match source {
                Source::Path(_) => parts.push(source.bytes().await?),
                Source::Url(url) => parts.push(url.clone().into_bytes()),
            }
        }
        Ok(cache::fingerprint(&parts))
    }
}

/// Reads the first `.geojson` (or `.json`) member of a zip archive.
fn geojson_from_zip(data: Vec<u8>) -> anyhow::Result<String> {
    let mut zip = zip::ZipArchive::new(Cursor::new(data))?;
    for index in 0..zip.len() {
        let mut file = zip.by_index(index)?;
        let name = file.name().to_lowercase();
        if name.ends_with(".geojson") || name.ends_with(".json") {
            let mut buffer = String::from("");
            file.read_to_string(&mut buffer)?;
            return Ok(buffer);
        }
    }
    bail!("archive has no GeoJSON member")
}
