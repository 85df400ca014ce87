#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Workspace configuration loaded from `quakecast.toml`.
//!
//! Every section and key is optional; missing values fall back to the
//! defaults baked into this crate, so an empty (or absent) file yields a
//! fully working configuration.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name probed in the working directory by [`QuakecastConfig::load_or_default`].
pub const DEFAULT_CONFIG_FILE: &str = "quakecast.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse the configuration file
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuakecastConfig {
    pub data: DataConfig,
    pub artifacts: ArtifactConfig,
    pub server: ServerConfig,
    pub training: TrainingSettings,
}

impl QuakecastConfig {
    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// * If the file cannot be read
    /// * If the file is not valid TOML for this schema
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(toml::from_str(&fs::read_to_string(path)?)?)
    }

    /// Loads [`DEFAULT_CONFIG_FILE`] from the working directory when it
    /// exists, otherwise returns the built-in defaults.
    ///
    /// # Errors
    ///
    /// * If the file exists but cannot be read or parsed
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        if path.is_file() {
            Self::load(path)
        } else {
            log::debug!("No {DEFAULT_CONFIG_FILE} found, using defaults");
            Ok(Self::default())
        }
    }
}

/// Locations of catalog files on disk.
///
/// Relative paths resolve against [`DataConfig::dir`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub dir: PathBuf,
    pub raw_catalog: PathBuf,
    pub catalog: PathBuf,
    /// Optional province bounding-box table; the built-in table is used when
    /// absent.
    pub province_bounds: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            raw_catalog: PathBuf::from("raw_events.csv"),
            catalog: PathBuf::from("catalog.csv"),
            province_bounds: None,
        }
    }
}

impl DataConfig {
    #[must_use]
    pub fn raw_catalog_path(&self) -> PathBuf {
        self.resolve(&self.raw_catalog)
    }

    #[must_use]
    pub fn catalog_path(&self) -> PathBuf {
        self.resolve(&self.catalog)
    }

    #[must_use]
    pub fn province_bounds_path(&self) -> Option<PathBuf> {
        self.province_bounds.as_deref().map(|path| self.resolve(path))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.dir.join(path)
        }
    }
}

/// Location of trained model bundles on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub dir: PathBuf,
    /// File name of the bundle the server and predictor load.
    pub current: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts"),
            current: PathBuf::from("forecast.qcf"),
        }
    }
}

impl ArtifactConfig {
    #[must_use]
    pub fn current_path(&self) -> PathBuf {
        if self.current.is_absolute() {
            self.current.clone()
        } else {
            self.dir.join(&self.current)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// Applies the `BIND_ADDR` and `PORT` environment variables on top of the
    /// file-level values.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(bind) = env::var("BIND_ADDR") {
            self.bind = bind;
        }
        if let Ok(port) = env::var("PORT")
            && let Ok(port) = port.parse()
        {
            self.port = port;
        }
        self
    }

    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Knobs for the training pipeline.
///
/// The rolling-window sizes are deliberately not configurable: the feature
/// schema names them, so changing them would invalidate every saved bundle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSettings {
    pub holdout_fraction: f64,
    pub seed: u64,
    pub trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Catalog tail length handed to the predictor at serving time.
    pub recent_events: usize,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            holdout_fraction: 0.15,
            seed: 42,
            trees: 200,
            max_depth: 15,
            min_samples_split: 5,
            min_samples_leaf: 2,
            recent_events: 30,
        }
    }
}
