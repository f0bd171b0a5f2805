//! # vidlsh signature stage
//!
//! MinHash signatures and LSH band keys for near-duplicate video detection.
//! This crate is the mapper half of the pipeline: it turns a video's set of
//! integer shingles into a fixed-length signature and one `(band, bucket)`
//! key per band.
//!
//! ## Contract
//!
//! - Everything is a pure function of `(shingles, LshConfig)`. No I/O, no
//!   clocks, no global state.
//! - Two workers built from equal [`LshConfig`]s derive byte-identical
//!   [`HashFamily`] tables and therefore agree on every bucket.
//! - Invalid configurations are rejected by [`HashFamily::new`] before any
//!   record is processed.
//!
//! ## Stages
//!
//! 1.  **Hash family**: `bands * rows` shingle hash functions
//!     `(a * s + b) mod shingle_buckets` with prime coefficients, plus
//!     per-row band multipliers and per-band offsets.
//! 2.  **MinHash**: entry `i` of the signature is the minimum of hash `i`
//!     over all shingles, or `shingle_buckets` for an empty set.
//! 3.  **Banding**: each run of `rows` entries is folded into a bucket id in
//!     `[0, band_buckets)`.
//!
//! ## Example
//!
//! ```
//! use signature::{LshConfig, Mapper};
//!
//! let cfg = LshConfig::new()
//!     .with_shingles(1_000)
//!     .with_shingle_buckets(1_000)
//!     .with_bands(8)
//!     .with_rows(4);
//! let mapper = Mapper::new(&cfg).unwrap();
//!
//! let a = mapper.map(1, &[1, 2, 3, 4, 5]);
//! let b = mapper.map(2, &[5, 4, 3, 2, 1]);
//!
//! assert_eq!(a.len(), 8);
//! assert_eq!(a[0].key, b[0].key);
//! assert_eq!(a[0].signature, b[0].signature);
//! ```
pub mod band;
pub mod config;
pub mod family;
pub mod mapper;
pub mod minhash;

pub use crate::band::{band_keys, hash_band, BandKey};
pub use crate::config::{LshConfig, LshError, DEFAULT_MAX_HASHES, MAX_SHINGLES};
pub use crate::family::{odd_primes_below, Coefficients, HashFamily};
pub use crate::mapper::{Emission, Mapper, VideoRecord};
pub use crate::minhash::{build_signature, Signature};
