//! Score reported pairs against a ground-truth duplicates list.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use candidates::SimilarPair;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::codec::{for_each_line, parse_pair};

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Confusion counts and the derived scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalReport {
    pub predicted: usize,
    pub expected: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Compare two pair sets. Both sides are normalised and deduplicated first.
///
/// Precision is 1.0 when nothing is predicted and recall is 1.0 when
/// nothing is expected.
pub fn evaluate<P, E>(predicted: P, expected: E) -> EvalReport
where
    P: IntoIterator<Item = SimilarPair>,
    E: IntoIterator<Item = SimilarPair>,
{
    let normalise = |p: SimilarPair| SimilarPair::new(p.first, p.second);
    let predicted: BTreeSet<_> = predicted.into_iter().map(normalise).collect();
    let expected: BTreeSet<_> = expected.into_iter().map(normalise).collect();

    let tp = predicted.intersection(&expected).count();
    let fp = predicted.len() - tp;
    let fn_ = expected.len() - tp;

    let precision = ratio(tp, predicted.len());
    let recall = ratio(tp, expected.len());
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };

    EvalReport {
        predicted: predicted.len(),
        expected: expected.len(),
        true_positives: tp,
        false_positives: fp,
        false_negatives: fn_,
        precision,
        recall,
        f1,
    }
}

fn ratio(hits: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        hits as f64 / total as f64
    }
}

/// Read pairs in reducer output format. Malformed lines, including lines
/// that are not UTF-8, are skipped.
pub fn read_pairs<R: BufRead>(input: R) -> Result<Vec<SimilarPair>, EvalError> {
    let mut pairs = Vec::new();
    for_each_line(input, |lineno, line| {
        match parse_pair(line) {
            Ok(pair) => pairs.push(pair),
            Err(err) => warn!(line = lineno, error = %err, "skipping malformed pair"),
        }
        Ok(())
    })?;
    Ok(pairs)
}

fn read_pairs_file(path: &Path) -> Result<Vec<SimilarPair>, EvalError> {
    let to_read_err = |source| EvalError::Read {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(to_read_err)?;
    match read_pairs(BufReader::new(file)) {
        Err(EvalError::Io(source)) => Err(to_read_err(source)),
        other => other,
    }
}

/// Score a predicted pairs file against a ground-truth pairs file.
pub fn evaluate_files(predicted: &Path, expected: &Path) -> Result<EvalReport, EvalError> {
    let report = evaluate(read_pairs_file(predicted)?, read_pairs_file(expected)?);
    debug!(
        true_positives = report.true_positives,
        false_positives = report.false_positives,
        false_negatives = report.false_negatives,
        "evaluated pairs"
    );
    Ok(report)
}
