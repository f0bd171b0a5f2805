//! Line-oriented text formats between the stages.
//!
//! - Mapper input: a fixed-width video id field followed by whitespace
//!   separated shingles, e.g. `VIDEO_000000042 17 4 1033`. Columns
//!   `6..15` hold the nine-digit id; the prefix is not interpreted.
//! - Mapper output / reducer input: `(band,bucket), (video_id,s0.s1.s2...)`.
//!   `", "` separates key from value, `,` separates tuple fields and `.`
//!   separates signature entries.
//! - Reducer output: `first\tsecond`, smaller id first.

use std::io::{self, BufRead};

use candidates::SimilarPair;
use signature::{BandKey, Signature, VideoRecord};
use thiserror::Error;
use tracing::warn;

/// Columns of the video id within a mapper input line.
pub const VIDEO_ID_FIELD: std::ops::Range<usize> = 6..15;

/// Separates the key tuple from the value tuple.
pub const KEY_VALUE_DELIMITER: &str = ", ";

/// Separates signature entries inside the value tuple.
pub const SIGNATURE_DELIMITER: char = '.';

/// Separates the two ids of a reducer output line.
pub const PAIR_DELIMITER: char = '\t';

/// Malformed record errors. Streams skip such records; they are never fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("line too short for a video id field")]
    MissingVideoId,

    #[error("invalid video id {0:?}")]
    InvalidVideoId(String),

    #[error("invalid shingle {0:?}")]
    InvalidShingle(String),

    #[error("missing key/value delimiter")]
    MissingDelimiter,

    #[error("invalid key tuple {0:?}")]
    InvalidKey(String),

    #[error("invalid value tuple {0:?}")]
    InvalidValue(String),

    #[error("invalid signature entry {0:?}")]
    InvalidSignature(String),

    #[error("invalid pair {0:?}")]
    InvalidPair(String),
}

/// Parse one mapper input line.
pub fn parse_video_line(line: &str) -> Result<VideoRecord, CodecError> {
    let line = line.trim();
    let id_field = line
        .get(VIDEO_ID_FIELD)
        .ok_or(CodecError::MissingVideoId)?;
    let video_id = parse_digits(id_field)
        .ok_or_else(|| CodecError::InvalidVideoId(id_field.to_string()))?;

    let rest = &line[VIDEO_ID_FIELD.end..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return Err(CodecError::InvalidVideoId(format!("{id_field}{rest}")));
    }

    let shingles = rest
        .split_whitespace()
        .map(|tok| {
            tok.parse::<u64>()
                .map_err(|_| CodecError::InvalidShingle(tok.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(VideoRecord::new(video_id, shingles))
}

/// Text form of a signature, computed once per video and reused for every band.
pub fn encode_signature(signature: &Signature) -> String {
    signature
        .values()
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(SIGNATURE_DELIMITER.to_string().as_str())
}

/// Format one mapper output line from a pre-encoded signature.
pub fn format_emission(key: BandKey, video_id: u64, encoded_signature: &str) -> String {
    format!(
        "({},{}){KEY_VALUE_DELIMITER}({video_id},{encoded_signature})",
        key.band, key.bucket
    )
}

/// Parse one reducer input line into its key, video id and signature.
pub fn parse_emission(line: &str) -> Result<(BandKey, u64, Signature), CodecError> {
    let line = line.trim();
    let (key, value) = line
        .split_once(KEY_VALUE_DELIMITER)
        .ok_or(CodecError::MissingDelimiter)?;

    let (band, bucket) =
        split_tuple(key).ok_or_else(|| CodecError::InvalidKey(key.to_string()))?;
    let band = band
        .parse::<usize>()
        .map_err(|_| CodecError::InvalidKey(key.to_string()))?;
    let bucket = parse_digits(bucket).ok_or_else(|| CodecError::InvalidKey(key.to_string()))?;

    let (video_id, encoded) =
        split_tuple(value).ok_or_else(|| CodecError::InvalidValue(value.to_string()))?;
    let video_id =
        parse_digits(video_id).ok_or_else(|| CodecError::InvalidValue(value.to_string()))?;
    let signature = decode_signature(encoded)?;

    Ok((BandKey::new(band, bucket), video_id, signature))
}

/// Parse the `.`-joined signature text.
pub fn decode_signature(encoded: &str) -> Result<Signature, CodecError> {
    if encoded.is_empty() {
        return Err(CodecError::InvalidSignature(String::new()));
    }
    encoded
        .split(SIGNATURE_DELIMITER)
        .map(|tok| parse_digits(tok).ok_or_else(|| CodecError::InvalidSignature(tok.to_string())))
        .collect::<Result<Vec<_>, _>>()
        .map(Signature::from_values)
}

/// Format one reducer output line.
pub fn format_pair(pair: SimilarPair) -> String {
    format!("{}{PAIR_DELIMITER}{}", pair.first, pair.second)
}

/// Parse a pair line. Any whitespace separates the ids; order is normalised.
pub fn parse_pair(line: &str) -> Result<SimilarPair, CodecError> {
    let mut fields = line.split_whitespace();
    let parse = |f: Option<&str>| f.and_then(parse_digits);
    match (parse(fields.next()), parse(fields.next()), fields.next()) {
        (Some(a), Some(b), None) => Ok(SimilarPair::new(a, b)),
        _ => Err(CodecError::InvalidPair(line.trim().to_string())),
    }
}

/// `(a,b)` -> `("a", "b")`.
fn split_tuple(s: &str) -> Option<(&str, &str)> {
    s.strip_prefix('(')?.strip_suffix(')')?.split_once(',')
}

/// Unsigned decimal; rejects signs and empty strings that `parse` would
/// accept or report less clearly.
fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Call `f` with every non-blank line and its 1-based number.
///
/// Lines that are not UTF-8 are logged and skipped.
pub(crate) fn for_each_line<R, F>(mut input: R, mut f: F) -> io::Result<()>
where
    R: BufRead,
    F: FnMut(usize, &str) -> io::Result<()>,
{
    let mut buf = Vec::new();
    let mut lineno = 0usize;
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        lineno += 1;
        let Ok(line) = std::str::from_utf8(&buf) else {
            warn!(line = lineno, "skipping line that is not valid UTF-8");
            continue;
        };
        if line.trim().is_empty() {
            continue;
        }
        f(lineno, line)?;
    }
}
