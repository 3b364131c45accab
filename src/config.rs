use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::orbit::ChecksumPolicy;
use crate::predict::SweepSettings;
use crate::tracker::{GroundStation, StationError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("station {id}: {source}")]
    Station { id: String, source: StationError },
    #[error("duplicate station id {0:?}")]
    DuplicateStation(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub stations: Vec<GroundStation>,
    #[serde(default)]
    pub predict: SweepSettings,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    /// Directory scanned for `.tle` and `.txt` files.
    pub tle_folder: Option<PathBuf>,
    #[serde(default)]
    pub checksum: ChecksumPolicy,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (index, station) in self.stations.iter().enumerate() {
            station.validate().map_err(|source| ConfigError::Station {
                id: station.id.clone(),
                source,
            })?;
            if self.stations[..index].iter().any(|s| s.id == station.id) {
                return Err(ConfigError::DuplicateStation(station.id.clone()));
            }
        }
        Ok(())
    }

    pub fn find_station(&self, id: &str) -> Option<&GroundStation> {
        self.stations.iter().find(|s| s.id == id)
    }
}

/// Parse a human-readable duration such as `5m`, `90s` or `1h 30m`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s.trim())
        .map_err(|e| e.to_string())
        .and_then(|d| Duration::from_std(d).map_err(|e| e.to_string()))
}

pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| e.to_string())
}

pub(crate) fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(serde::de::Error::custom)
}
