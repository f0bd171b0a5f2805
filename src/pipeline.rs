//! Stream drivers for the mapper and reducer stages, plus an in-process
//! map, shuffle and reduce runner.
//!
//! The stream drivers read one record per line and write one record per
//! line. Malformed lines are logged, counted and skipped; only I/O failures
//! abort a stream.

use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use candidates::{
    reduce_sorted, Candidate, CandidatePolicy, CandidateReducer, ReduceStats, SimilarPair,
};
use serde::{Deserialize, Serialize};
use signature::{Emission, LshConfig, LshError, Mapper, VideoRecord};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::codec::{
    encode_signature, for_each_line, format_emission, format_pair, parse_emission,
    parse_video_line,
};
use crate::config::LocalYamlConfig;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid config: {0}")]
    Config(#[from] LshError),

    #[error("failed to write {}: {source}", path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Counters of one mapper stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSummary {
    pub records: u64,
    pub skipped: u64,
    pub emissions: u64,
}

/// Counters of one reducer stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReduceSummary {
    pub records: u64,
    pub skipped: u64,
    pub stats: ReduceStats,
}

/// Read video records, write one mapper record per band.
pub fn map_stream<R: BufRead, W: Write>(
    mapper: &Mapper,
    input: R,
    mut output: W,
) -> Result<MapSummary, PipelineError> {
    let mut summary = MapSummary::default();

    for_each_line(input, |lineno, line| {
        let record = match parse_video_line(line) {
            Ok(record) => record,
            Err(err) => {
                warn!(line = lineno, error = %err, "skipping malformed input record");
                summary.skipped += 1;
                return Ok(());
            }
        };
        summary.records += 1;

        let emissions = mapper.map_record(&record);
        let Some(first) = emissions.first() else {
            return Ok(());
        };
        let encoded = encode_signature(&first.signature);
        for emission in &emissions {
            trace!(
                video_id = emission.video_id,
                band = emission.key.band,
                bucket = emission.key.bucket,
                "band bucket"
            );
            writeln!(
                output,
                "{}",
                format_emission(emission.key, emission.video_id, &encoded)
            )?;
        }
        summary.emissions += emissions.len() as u64;
        Ok(())
    })?;

    output.flush()?;
    debug!(
        records = summary.records,
        skipped = summary.skipped,
        emissions = summary.emissions,
        "map stream finished"
    );
    Ok(summary)
}

/// Read key-grouped mapper records, write one line per similar pair found.
///
/// Records with equal keys must be contiguous; the order between keys does
/// not matter, so a plain lexicographic `sort` of mapper lines is enough.
pub fn reduce_stream<R: BufRead, W: Write>(
    cfg: &LshConfig,
    policy: CandidatePolicy,
    input: R,
    mut output: W,
) -> Result<ReduceSummary, PipelineError> {
    let mut reducer = CandidateReducer::new(cfg, policy)?;
    let mut summary = ReduceSummary::default();

    for_each_line(input, |lineno, line| {
        let (key, video_id, signature) = match parse_emission(line) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(line = lineno, error = %err, "skipping malformed mapper record");
                summary.skipped += 1;
                return Ok(());
            }
        };
        summary.records += 1;

        for pair in reducer.push(key, Candidate::new(video_id, signature)) {
            writeln!(output, "{}", format_pair(pair))?;
        }
        Ok(())
    })?;

    for pair in reducer.finish() {
        writeln!(output, "{}", format_pair(pair))?;
    }
    output.flush()?;

    summary.stats = reducer.stats().clone();
    debug!(
        records = summary.records,
        skipped = summary.skipped,
        groups = summary.stats.groups,
        pairs = summary.stats.pairs,
        "reduce stream finished"
    );
    Ok(summary)
}

/// Options of the in-process runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalOptions {
    /// Run mapper tasks on the rayon pool. Has no effect without the
    /// `parallel` feature.
    pub parallel: bool,
    /// Input records per mapper task.
    pub chunk_size: usize,
    /// Write the mapper output, in input order, to this file.
    pub store_map: Option<PathBuf>,
    /// Write the key-sorted reducer input to this file.
    pub store_sort: Option<PathBuf>,
    /// Write the reported pairs to this file.
    pub store_reduce: Option<PathBuf>,
}

impl Default for LocalOptions {
    fn default() -> Self {
        Self::from(&LocalYamlConfig::default())
    }
}

impl From<&LocalYamlConfig> for LocalOptions {
    fn from(cfg: &LocalYamlConfig) -> Self {
        Self {
            parallel: cfg.parallel,
            chunk_size: cfg.chunk_size,
            store_map: cfg.store_map.clone(),
            store_sort: cfg.store_sort.clone(),
            store_reduce: cfg.store_reduce.clone(),
        }
    }
}

/// Outcome of one local run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub records_in: u64,
    pub records_skipped: u64,
    pub emissions: u64,
    pub reduce: ReduceStats,
}

/// Map every record, shuffle by key, reduce the sorted run.
///
/// Within one key, emissions keep input order, so with id deduplication on
/// the first record of a repeated video wins.
pub fn run_local(
    cfg: &LshConfig,
    policy: CandidatePolicy,
    records: &[VideoRecord],
    options: &LocalOptions,
) -> Result<(Vec<SimilarPair>, RunSummary), PipelineError> {
    info!(
        records = records.len(),
        bands = cfg.bands,
        rows = cfg.rows,
        threshold = cfg.threshold,
        seed = cfg.seed,
        "starting local run"
    );
    let mapper = Mapper::new(cfg)?;

    let mut emissions = map_records(&mapper, records, options);
    if let Some(path) = &options.store_map {
        store_emissions(path, &emissions)?;
    }

    emissions.sort_by_key(|e| e.key);
    if let Some(path) = &options.store_sort {
        store_emissions(path, &emissions)?;
    }

    let emitted = emissions.len() as u64;
    let sorted = emissions
        .into_iter()
        .map(|e| (e.key, Candidate::new(e.video_id, e.signature)));
    let (pairs, stats) = reduce_sorted(cfg, policy, sorted)?;

    if let Some(path) = &options.store_reduce {
        store(path, |out| {
            for pair in &pairs {
                writeln!(out, "{}", format_pair(*pair))?;
            }
            Ok(())
        })?;
    }

    let summary = RunSummary {
        records_in: records.len() as u64,
        records_skipped: 0,
        emissions: emitted,
        reduce: stats,
    };
    info!(
        emissions = summary.emissions,
        groups = summary.reduce.groups,
        largest_group = summary.reduce.largest_group,
        pairs = summary.reduce.pairs,
        "local run finished"
    );
    Ok((pairs, summary))
}

/// Parse mapper input lines, then [`run_local`]. Malformed lines are
/// skipped and counted in [`RunSummary::records_skipped`].
pub fn run_local_lines<R: BufRead>(
    cfg: &LshConfig,
    policy: CandidatePolicy,
    input: R,
    options: &LocalOptions,
) -> Result<(Vec<SimilarPair>, RunSummary), PipelineError> {
    let mut records = Vec::new();
    let mut skipped = 0u64;
    for_each_line(input, |lineno, line| {
        match parse_video_line(line) {
            Ok(record) => records.push(record),
            Err(err) => {
                warn!(line = lineno, error = %err, "skipping malformed input record");
                skipped += 1;
            }
        }
        Ok(())
    })?;

    let (pairs, mut summary) = run_local(cfg, policy, &records, options)?;
    summary.records_skipped = skipped;
    Ok((pairs, summary))
}

fn map_records(mapper: &Mapper, records: &[VideoRecord], options: &LocalOptions) -> Vec<Emission> {
    let chunk_size = options.chunk_size.max(1);

    #[cfg(feature = "parallel")]
    if options.parallel {
        use rayon::prelude::*;
        return records
            .par_chunks(chunk_size)
            .flat_map_iter(|chunk| chunk.iter().flat_map(|r| mapper.map_record(r)))
            .collect();
    }

    records
        .chunks(chunk_size)
        .flat_map(|chunk| chunk.iter().flat_map(|r| mapper.map_record(r)))
        .collect()
}

fn store_emissions(path: &Path, emissions: &[Emission]) -> Result<(), PipelineError> {
    store(path, |out| {
        for e in emissions {
            let encoded = encode_signature(&e.signature);
            writeln!(out, "{}", format_emission(e.key, e.video_id, &encoded))?;
        }
        Ok(())
    })
}

fn store<F>(path: &Path, write: F) -> Result<(), PipelineError>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let to_store_err = |source| PipelineError::Store {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(to_store_err)?;
    let mut out = BufWriter::new(file);
    write(&mut out).map_err(to_store_err)?;
    out.flush().map_err(to_store_err)?;
    debug!(path = %path.display(), "stored intermediate output");
    Ok(())
}
