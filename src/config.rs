use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};

use crate::cache::{CacheValidation, POINTS_FILE, POLYGONS_FILE};
use crate::colombia::Source;
use crate::join::MatchMode;
use crate::map::MapView;

#[derive(Clone, Debug)]
pub struct Config {
    pub boundaries: Source,
    pub records: Source,
    pub polygons_cache: PathBuf,
    pub points_cache: PathBuf,
    pub match_mode: MatchMode,
    pub cache_validation: CacheValidation,
    pub host: String,
    pub port: u16,
    pub view: MapView,
}

pub const USAGE: &str = "Usage: edumapa [--host <addr>] [--port <n>] \
[--boundaries <path|url>] [--records <path|url>]\n\nEnvironment: EDUMAPA_BOUNDARIES, \
EDUMAPA_RECORDS, EDUMAPA_POLYGONS_CACHE, EDUMAPA_POINTS_CACHE, \
EDUMAPA_MATCH (case-insensitive|folded), EDUMAPA_CACHE_VALIDATION (presence|fingerprint), \
HOST, PORT";

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = var("PORT", "8050")
            .parse::<u16>()
            .with_context(|| "PORT must be a port number".to_string())?;
        let match_mode = var("EDUMAPA_MATCH", "case-insensitive").parse::<MatchMode>()?;
        let cache_validation =
            var("EDUMAPA_CACHE_VALIDATION", "presence").parse::<CacheValidation>()?;

        Ok(Self {
            boundaries: Source::parse(&var("EDUMAPA_BOUNDARIES", "COLOMBIA.geojson")),
            records: Source::parse(&var("EDUMAPA_RECORDS", "educacion_superior.csv")),
            polygons_cache: PathBuf::from(var("EDUMAPA_POLYGONS_CACHE", POLYGONS_FILE)),
            points_cache: PathBuf::from(var("EDUMAPA_POINTS_CACHE", POINTS_FILE)),
            match_mode,
            cache_validation,
            host: var("HOST", "0.0.0.0"),
            port,
            view: MapView::default(),
        })
    }

    /// Applies command-line overrides. `args[0]` is the program name.
    pub fn apply_args(mut self, args: &[String]) -> Result<Self> {
        let mut idx = 1;
        while idx < args.len() {
            let flag = args[idx].as_str();
            let value = || {
                args.get(idx + 1)
                    .cloned()
                    .ok_or_else(|| anyhow!("{flag} requires a value"))
            };
            match flag {
                "--host" => self.host = value()?,
                "--port" => {
                    self.port = value()?
                        .parse::<u16>()
                        .with_context(|| "--port must be a port number".to_string())?
                }
                "--boundaries" => self.boundaries = Source::parse(&value()?),
                "--records" => self.records = Source::parse(&value()?),
                "--help" | "-h" => bail!(USAGE),
                other => bail!("unknown argument {other:?}\n\n{USAGE}"),
            }
            idx += 2;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("edumapa")
            .chain(list.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn defaults_match_the_dashboard_layout() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8050);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.records, Source::Path(PathBuf::from("educacion_superior.csv")));
        assert_eq!(config.polygons_cache, PathBuf::from(POLYGONS_FILE));
        assert_eq!(config.match_mode, MatchMode::CaseInsensitive);
        assert_eq!(config.cache_validation, CacheValidation::Presence);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "9000"),
            ("EDUMAPA_MATCH", "folded"),
            ("EDUMAPA_CACHE_VALIDATION", "fingerprint"),
            ("EDUMAPA_BOUNDARIES", "https://example.org/colombia.zip"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.match_mode, MatchMode::Folded);
        assert_eq!(config.cache_validation, CacheValidation::Fingerprint);
        assert!(matches!(config.boundaries, Source::Url(_)));
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(Config::from_lookup(lookup(&[("PORT", "web")])).is_err());
    }

    #[test]
    fn flags_override_environment() {
        let config = Config::from_lookup(lookup(&[("PORT", "9000")]))
            .unwrap()
            .apply_args(&args(&["--port", "8080", "--host", "127.0.0.1"]))
            .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn flag_without_value_fails() {
        let err = Config::from_lookup(lookup(&[]))
            .unwrap()
            .apply_args(&args(&["--port"]))
            .unwrap_err();
        assert!(err.to_string().contains("--port requires a value"));
    }
}
