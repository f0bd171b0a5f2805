//! Configuration and error types for MinHash signatures and LSH banding.
//!
//! Every mapper and reducer taking part in one job must run with an equal
//! [`LshConfig`]. The hash coefficients are derived from it and nothing
//! else, so two workers with equal configs agree on every bucket.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default hard ceiling on the number of hash functions (`bands * rows`).
pub const DEFAULT_MAX_HASHES: usize = 1024;

/// Largest accepted shingle space. The prime sieve holds one byte per odd
/// number below it.
pub const MAX_SHINGLES: u64 = 1 << 26;

/// Shared job constants for the signature and banding stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LshConfig {
    /// Size of the shingle id space. Shingles are expected in `[0, shingles)`.
    ///
    /// Also bounds the prime pool the shingle hash coefficients are drawn
    /// from.
    pub shingles: u64,
    /// Number of LSH bands.
    pub bands: usize,
    /// Number of signature rows per band.
    pub rows: usize,
    /// Modulus of the shingle hash functions. Signature entries lie in
    /// `[0, shingle_buckets)`; the value itself marks an empty minimum.
    pub shingle_buckets: u64,
    /// Modulus of the band hash functions.
    pub band_buckets: u64,
    /// Minimum estimated Jaccard similarity for a pair to be reported.
    pub threshold: f64,
    /// Seed every worker derives its coefficient tables from.
    pub seed: u64,
    /// Refuse configurations with more than this many hash functions.
    pub max_hashes: usize,
}

impl LshConfig {
    /// Create a configuration with the baseline job constants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from a total hash count instead of a band count.
    ///
    /// Fails when `hashes` cannot be split into whole bands of `rows`.
    pub fn from_hashes(hashes: usize, rows: usize) -> Result<Self, LshError> {
        if rows == 0 {
            return Err(LshError::InvalidConfigRows { rows });
        }
        if hashes % rows != 0 {
            return Err(LshError::UnevenBands { hashes, rows });
        }
        Ok(Self {
            bands: hashes / rows,
            rows,
            ..Self::default()
        })
    }

    pub fn with_shingles(mut self, shingles: u64) -> Self {
        self.shingles = shingles;
        self
    }

    pub fn with_bands(mut self, bands: usize) -> Self {
        self.bands = bands;
        self
    }

    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_shingle_buckets(mut self, buckets: u64) -> Self {
        self.shingle_buckets = buckets;
        self
    }

    pub fn with_band_buckets(mut self, buckets: u64) -> Self {
        self.band_buckets = buckets;
        self
    }

    /// Set the similarity threshold. Must lie in `[0, 1]`.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the shared seed. Every worker in a job must use the same value.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_hashes(mut self, max_hashes: usize) -> Self {
        self.max_hashes = max_hashes;
        self
    }

    /// Total number of hash functions, which is also the signature length.
    ///
    /// Saturates on overflow; [`LshConfig::validate`] rejects such configs.
    pub fn hashes(&self) -> usize {
        self.bands.saturating_mul(self.rows)
    }

    /// Validate the configuration.
    ///
    /// The prime pool size is checked separately by
    /// [`crate::HashFamily::new`], which has to build the pool anyway.
    pub fn validate(&self) -> Result<(), LshError> {
        if self.bands < 1 {
            return Err(LshError::InvalidConfigBands { bands: self.bands });
        }
        if self.rows < 1 {
            return Err(LshError::InvalidConfigRows { rows: self.rows });
        }
        let hashes =
            self.bands
                .checked_mul(self.rows)
                .ok_or(LshError::InvalidConfigHashLength {
                    bands: self.bands,
                    rows: self.rows,
                })?;
        if hashes > self.max_hashes {
            return Err(LshError::TooManyHashes {
                hashes,
                max: self.max_hashes,
            });
        }
        if !(3..=MAX_SHINGLES).contains(&self.shingles) {
            return Err(LshError::InvalidShingleSpace {
                shingles: self.shingles,
            });
        }
        if self.shingle_buckets < 1 || self.shingle_buckets > u64::from(u32::MAX) {
            return Err(LshError::InvalidBucketCount {
                name: "shingle_buckets",
                buckets: self.shingle_buckets,
            });
        }
        if self.band_buckets < 2 || self.band_buckets > u64::from(u32::MAX) {
            return Err(LshError::InvalidBucketCount {
                name: "band_buckets",
                buckets: self.band_buckets,
            });
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(LshError::InvalidThreshold {
                threshold: self.threshold,
            });
        }
        Ok(())
    }
}

impl Default for LshConfig {
    fn default() -> Self {
        Self {
            shingles: 20_000,
            bands: 64,
            rows: 16,
            shingle_buckets: 20_000,
            band_buckets: 103_549,
            threshold: 0.9,
            seed: 42,
            max_hashes: DEFAULT_MAX_HASHES,
        }
    }
}

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LshError {
    #[error("invalid config: bands must be >= 1 (got {bands})")]
    InvalidConfigBands { bands: usize },

    #[error("invalid config: rows must be >= 1 (got {rows})")]
    InvalidConfigRows { rows: usize },

    #[error("invalid config: hash count overflow for bands={bands} rows={rows}")]
    InvalidConfigHashLength { bands: usize, rows: usize },

    #[error("too many hash functions: {hashes} (max {max})")]
    TooManyHashes { hashes: usize, max: usize },

    #[error("invalid config: {hashes} hashes cannot be split into bands of {rows} rows")]
    UnevenBands { hashes: usize, rows: usize },

    #[error("invalid config: shingle space must be in [3, 2^26] (got {shingles})")]
    InvalidShingleSpace { shingles: u64 },

    #[error("invalid config: {name} out of range (got {buckets})")]
    InvalidBucketCount { name: &'static str, buckets: u64 },

    #[error("invalid config: threshold must be in [0, 1] (got {threshold})")]
    InvalidThreshold { threshold: f64 },

    #[error(
        "not enough primes below {shingles}: need {needed} distinct coefficients, found {available}"
    )]
    NotEnoughPrimes {
        shingles: u64,
        needed: usize,
        available: usize,
    },

    #[error("invalid coefficient table: {0}")]
    InvalidCoefficients(String),
}
