//! LSH band hashing.
//!
//! A band is `rows` consecutive signature entries. Each band is folded into
//! a bucket id with per-row multipliers and a per-band offset:
//!
//! ```text
//! h = offset[band]
//! for j in band rows: h = (h + multiplier[j] * signature[j]) mod band_buckets
//! ```
//!
//! Equal bands always share a bucket. Bands differing in one entry collide
//! only when `multiplier[j] * delta` is a multiple of `band_buckets`, which
//! never happens for a prime `band_buckets` larger than `shingle_buckets`.

use serde::{Deserialize, Serialize};

use crate::family::HashFamily;
use crate::minhash::Signature;

/// Reducer key: a band index together with its bucket id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BandKey {
    pub band: usize,
    pub bucket: u64,
}

impl BandKey {
    pub fn new(band: usize, bucket: u64) -> Self {
        Self { band, bucket }
    }
}

/// Bucket id of band `band` of `signature`, in `[0, band_buckets)`.
///
/// # Panics
///
/// Panics if `band >= family.bands()` or the signature is shorter than
/// `family.hashes()`. Signatures built with the same family never are.
pub fn hash_band(family: &HashFamily, band: usize, signature: &Signature) -> u64 {
    let rows = family.rows();
    let start = band * rows;
    let m = family.band_buckets();
    let values = &signature.values()[start..start + rows];
    let multipliers = &family.band_multipliers()[start..start + rows];

    values
        .iter()
        .zip(multipliers)
        .fold(family.band_offsets()[band], |h, (&v, &c)| (h + c * v) % m)
}

/// Keys for every band of `signature`, in band order.
pub fn band_keys<'a>(
    family: &'a HashFamily,
    signature: &'a Signature,
) -> impl Iterator<Item = BandKey> + 'a {
    (0..family.bands()).map(move |band| BandKey::new(band, hash_band(family, band, signature)))
}
