//! Workspace umbrella crate for vidlsh, near-duplicate video detection with
//! MinHash signatures and LSH banding.
//!
//! The mapper stage ([`signature`]) turns each video's shingle set into a
//! signature and one `(band, bucket)` record per band. The reducer stage
//! ([`candidates`]) scores every pair of videos sharing a bucket. This crate
//! adds the line formats between the stages, YAML job configuration, stream
//! drivers, an in-process runner and evaluation against ground truth.
//!
//! ```
//! use vidlsh::{run_local, CandidatePolicy, LocalOptions, LshConfig, SimilarPair, VideoRecord};
//!
//! let cfg = LshConfig::new().with_bands(8).with_rows(8);
//! let records = vec![
//!     VideoRecord::new(1, vec![1, 2, 3, 4, 5]),
//!     VideoRecord::new(2, vec![5, 4, 3, 2, 1]),
//!     VideoRecord::new(3, vec![100, 101, 102, 103, 104]),
//! ];
//!
//! let (pairs, summary) =
//!     run_local(&cfg, CandidatePolicy::default(), &records, &LocalOptions::default()).unwrap();
//! assert!(pairs.iter().all(|p| *p == SimilarPair::new(1, 2)));
//! assert_eq!(summary.reduce.pairs, 8);
//! ```

pub mod codec;
pub mod config;
pub mod eval;
pub mod pipeline;

pub use candidates::{
    estimate_similarity, reduce_sorted, Candidate, CandidatePolicy, CandidateReducer,
    ReduceStats, SimilarPair,
};
pub use signature::{
    band_keys, build_signature, hash_band, BandKey, Emission, HashFamily, LshConfig, LshError,
    Mapper, Signature, VideoRecord, DEFAULT_MAX_HASHES, MAX_SHINGLES,
};

pub use crate::codec::{
    decode_signature, encode_signature, format_emission, format_pair, parse_emission, parse_pair,
    parse_video_line, CodecError,
};
pub use crate::config::{ConfigLoadError, JobConfig, LocalYamlConfig, LshYamlConfig};
pub use crate::eval::{evaluate, evaluate_files, read_pairs, EvalError, EvalReport};
pub use crate::pipeline::{
    map_stream, reduce_stream, run_local, run_local_lines, LocalOptions, MapSummary,
    PipelineError, ReduceSummary, RunSummary,
};
