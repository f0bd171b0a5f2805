//! YAML job configuration.
//!
//! One file describes a whole job: the LSH constants every mapper and
//! reducer must agree on, the reducer policy, and local runner options.
//! Every section and field is optional and falls back to the baseline job.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "nightly near-dup sweep"
//!
//! lsh:
//!   shingles: 20000
//!   bands: 64          # or `hashes: 1024`, split into bands of `rows`
//!   rows: 16
//!   shingle_buckets: 20000
//!   band_buckets: 103549
//!   threshold: 0.9
//!   seed: 42
//!
//! candidates:
//!   dedup_video_ids: true
//!   skip_empty_sets: false
//!
//! local:
//!   parallel: true
//!   chunk_size: 4096
//!   store_map: "out/mapped.txt"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use candidates::CandidatePolicy;
use serde::{Deserialize, Serialize};
use signature::{LshConfig, LshError, DEFAULT_MAX_HASHES};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error(transparent)]
    Lsh(#[from] LshError),
}

/// Top-level YAML configuration for one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JobConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub lsh: LshYamlConfig,

    #[serde(default)]
    pub candidates: CandidatePolicy,

    #[serde(default)]
    pub local: LocalYamlConfig,
}

impl JobConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: JobConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.lsh.to_lsh_config()?.validate()?;
        self.local.validate()?;
        Ok(())
    }

    /// Resolved LSH constants.
    pub fn lsh_config(&self) -> Result<LshConfig, ConfigLoadError> {
        self.lsh.to_lsh_config()
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            lsh: LshYamlConfig::default(),
            candidates: CandidatePolicy::default(),
            local: LocalYamlConfig::default(),
        }
    }
}

/// `lsh` section. Mirrors [`LshConfig`] plus the `hashes` shorthand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LshYamlConfig {
    #[serde(default = "default_shingles")]
    pub shingles: u64,

    /// Number of bands. Ignored when `hashes` is given.
    #[serde(default = "default_bands")]
    pub bands: usize,

    #[serde(default = "default_rows")]
    pub rows: usize,

    /// Total hash count; must be a multiple of `rows`.
    #[serde(default)]
    pub hashes: Option<usize>,

    #[serde(default = "default_shingle_buckets")]
    pub shingle_buckets: u64,

    #[serde(default = "default_band_buckets")]
    pub band_buckets: u64,

    #[serde(default = "default_threshold")]
    pub threshold: f64,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_max_hashes")]
    pub max_hashes: usize,
}

impl LshYamlConfig {
    pub fn to_lsh_config(&self) -> Result<LshConfig, ConfigLoadError> {
        let base = match self.hashes {
            Some(hashes) => LshConfig::from_hashes(hashes, self.rows)?,
            None => LshConfig::new().with_bands(self.bands).with_rows(self.rows),
        };
        Ok(base
            .with_shingles(self.shingles)
            .with_shingle_buckets(self.shingle_buckets)
            .with_band_buckets(self.band_buckets)
            .with_threshold(self.threshold)
            .with_seed(self.seed)
            .with_max_hashes(self.max_hashes))
    }
}

impl Default for LshYamlConfig {
    fn default() -> Self {
        Self {
            shingles: default_shingles(),
            bands: default_bands(),
            rows: default_rows(),
            hashes: None,
            shingle_buckets: default_shingle_buckets(),
            band_buckets: default_band_buckets(),
            threshold: default_threshold(),
            seed: default_seed(),
            max_hashes: default_max_hashes(),
        }
    }
}

/// `local` section: options of the in-process runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalYamlConfig {
    #[serde(default = "true_value")]
    pub parallel: bool,

    /// Input records per mapper task.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default)]
    pub store_map: Option<PathBuf>,

    #[serde(default)]
    pub store_sort: Option<PathBuf>,

    #[serde(default)]
    pub store_reduce: Option<PathBuf>,
}

impl LocalYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.chunk_size == 0 {
            return Err(ConfigLoadError::Validation(
                "local.chunk_size must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LocalYamlConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            chunk_size: default_chunk_size(),
            store_map: None,
            store_sort: None,
            store_reduce: None,
        }
    }
}

// Helper functions for serde defaults
fn default_shingles() -> u64 {
    LshConfig::default().shingles
}
fn default_bands() -> usize {
    LshConfig::default().bands
}
fn default_rows() -> usize {
    LshConfig::default().rows
}
fn default_shingle_buckets() -> u64 {
    LshConfig::default().shingle_buckets
}
fn default_band_buckets() -> u64 {
    LshConfig::default().band_buckets
}
fn default_threshold() -> f64 {
    LshConfig::default().threshold
}
fn default_seed() -> u64 {
    LshConfig::default().seed
}
fn default_max_hashes() -> usize {
    DEFAULT_MAX_HASHES
}
fn default_chunk_size() -> usize {
    4096
}
fn true_value() -> bool {
    true
}
