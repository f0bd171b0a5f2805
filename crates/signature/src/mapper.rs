//! Per-record mapper: one signature, one emission per band.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::band::{band_keys, BandKey};
use crate::config::{LshConfig, LshError};
use crate::family::HashFamily;
use crate::minhash::{build_signature, Signature};

/// Mapper input: a video id and its shingle tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: u64,
    pub shingles: Vec<u64>,
}

impl VideoRecord {
    pub fn new(video_id: u64, shingles: Vec<u64>) -> Self {
        Self { video_id, shingles }
    }
}

/// One mapper output record, keyed by `(band, bucket)`.
///
/// All emissions of one video share the same signature allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    pub key: BandKey,
    pub video_id: u64,
    pub signature: Arc<Signature>,
}

/// Stateless mapper holding the coefficient tables built at startup.
#[derive(Debug, Clone)]
pub struct Mapper {
    family: HashFamily,
}

impl Mapper {
    /// Validate `cfg` and derive the coefficient tables.
    pub fn new(cfg: &LshConfig) -> Result<Self, LshError> {
        Ok(Self::with_family(HashFamily::new(cfg)?))
    }

    pub fn with_family(family: HashFamily) -> Self {
        Self { family }
    }

    pub fn family(&self) -> &HashFamily {
        &self.family
    }

    /// Signature of one shingle set.
    pub fn signature(&self, shingles: &[u64]) -> Signature {
        build_signature(&self.family, shingles)
    }

    /// Map one video to exactly `bands` emissions, in band order.
    pub fn map(&self, video_id: u64, shingles: &[u64]) -> Vec<Emission> {
        let signature = Arc::new(self.signature(shingles));
        band_keys(&self.family, &signature)
            .map(|key| Emission {
                key,
                video_id,
                signature: Arc::clone(&signature),
            })
            .collect()
    }

    pub fn map_record(&self, record: &VideoRecord) -> Vec<Emission> {
        self.map(record.video_id, &record.shingles)
    }
}
