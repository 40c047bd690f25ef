//! Dashboard configuration: where the raw and cleaned CSV files live.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "remit_insights.json";

/// Environment variable that relocates all data files under one directory.
pub const DATA_DIR_ENV: &str = "REMIT_INSIGHTS_DATA_DIR";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Locations of the four CSV files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPaths {
    pub raw_users: PathBuf,
    pub raw_transactions: PathBuf,
    pub users: PathBuf,
    pub transactions: PathBuf,
}

impl DataPaths {
    /// Standard layout under `dir`: `raw/` for exports, `processed/` for cleaned files.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            raw_users: dir.join("raw").join("users.csv"),
            raw_transactions: dir.join("raw").join("transactions.csv"),
            users: dir.join("processed").join("users.csv"),
            transactions: dir.join("processed").join("transactions.csv"),
        }
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::in_dir(Path::new("data"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub data: DataPaths,
    /// Where `report --export` and the dashboard's export button write tables.
    pub export_dir: Option<PathBuf>,
}

impl DashboardConfig {
    /// Resolve configuration: an explicit file, else `remit_insights.json` in the
    /// working directory, else defaults. `REMIT_INSIGHTS_DATA_DIR` overrides the
    /// data paths in every case.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
            config.data = DataPaths::in_dir(Path::new(&dir));
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Directory for exported tables, defaulting to `exports/`.
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("exports"))
    }
}
