//! # vidlsh candidate stage
//!
//! Reducer half of the pipeline. Consumes mapper records sorted by
//! `(band, bucket)` key, groups each contiguous key run, and reports every
//! pair of distinct videos in a group whose MinHash similarity estimate
//! reaches the configured threshold.
//!
//! A pair sharing several band buckets is reported once per qualifying
//! group; deduplicating the final pair stream is left to a later pass.
//!
//! ```
//! use candidates::{reduce_sorted, Candidate, CandidatePolicy, SimilarPair};
//! use signature::{BandKey, LshConfig, Signature};
//!
//! let cfg = LshConfig::new().with_bands(1).with_rows(4);
//! let key = BandKey::new(0, 42);
//! let sig = Signature::from_values(vec![1, 2, 3, 4]);
//! let records = vec![
//!     (key, Candidate::new(8, sig.clone())),
//!     (key, Candidate::new(3, sig)),
//! ];
//!
//! let (pairs, _) = reduce_sorted(&cfg, CandidatePolicy::default(), records).unwrap();
//! assert_eq!(pairs, vec![SimilarPair::new(3, 8)]);
//! ```
pub mod grouping;
pub mod reducer;
pub mod similarity;

pub use crate::grouping::{group_contiguous, Group, GroupState, Grouper, Groups};
pub use crate::reducer::{
    reduce_sorted, Candidate, CandidatePolicy, CandidateReducer, ReduceStats, SimilarPair,
};
pub use crate::similarity::estimate_similarity;
