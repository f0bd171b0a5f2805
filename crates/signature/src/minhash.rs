//! MinHash signatures over integer shingle sets.
//!
//! Entry `i` of a signature is the minimum of hash function `i` over every
//! shingle of the video. Videos with no shingles get the sentinel value
//! `shingle_buckets` in every entry, which no real hash can produce.

use serde::{Deserialize, Serialize};

use crate::family::HashFamily;

/// Fixed-length MinHash signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(Vec<u64>);

impl Signature {
    pub fn from_values(values: Vec<u64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[u64] {
        &self.0
    }

    pub fn into_values(self) -> Vec<u64> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The `rows` entries of band `band`, or `None` past the end.
    pub fn band(&self, band: usize, rows: usize) -> Option<&[u64]> {
        let start = band.checked_mul(rows)?;
        self.0.get(start..start.checked_add(rows)?)
    }

    /// True when every entry is `sentinel`, i.e. the shingle set was empty.
    pub fn is_all_sentinel(&self, sentinel: u64) -> bool {
        !self.0.is_empty() && self.0.iter().all(|&v| v == sentinel)
    }
}

impl From<Vec<u64>> for Signature {
    fn from(values: Vec<u64>) -> Self {
        Self(values)
    }
}

/// Compute the MinHash signature of a shingle set.
///
/// Every hash function is evaluated against every shingle. Shingle order and
/// repeated shingles do not affect the result.
pub fn build_signature(family: &HashFamily, shingles: &[u64]) -> Signature {
    let sentinel = family.shingle_buckets();
    let values = (0..family.hashes())
        .map(|i| min_slot(family, i, shingles).unwrap_or(sentinel))
        .collect();
    Signature(values)
}

/// Minimum of hash function `i` over `shingles`, `None` for an empty set.
#[inline]
fn min_slot(family: &HashFamily, i: usize, shingles: &[u64]) -> Option<u64> {
    shingles.iter().map(|&s| family.hash_shingle(i, s)).min()
}
