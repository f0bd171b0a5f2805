//! Candidate reducer: pairwise scoring inside each `(band, bucket)` group.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use signature::{BandKey, LshConfig, LshError, Signature};

use crate::grouping::{Group, Grouper};
use crate::similarity::estimate_similarity;

/// One reducer input value: a video and its full signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub video_id: u64,
    pub signature: Arc<Signature>,
}

impl Candidate {
    pub fn new(video_id: u64, signature: impl Into<Arc<Signature>>) -> Self {
        Self {
            video_id,
            signature: signature.into(),
        }
    }
}

/// A reported near-duplicate pair, smaller id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimilarPair {
    pub first: u64,
    pub second: u64,
}

impl SimilarPair {
    /// Build a pair in canonical `(min, max)` order.
    pub fn new(a: u64, b: u64) -> Self {
        Self {
            first: a.min(b),
            second: a.max(b),
        }
    }
}

/// Policy knobs for inputs that different deployments treat differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidatePolicy {
    /// Treat repeated video ids within one group as a single candidate
    /// (first occurrence wins). When off, every record is compared, so a
    /// pair can be reported once per repetition.
    pub dedup_video_ids: bool,
    /// Drop videos with an empty shingle set (all-sentinel signature)
    /// before scoring. When off, two empty videos score 1.0 and are
    /// reported.
    pub skip_empty_sets: bool,
}

impl CandidatePolicy {
    pub fn with_dedup_video_ids(mut self, dedup: bool) -> Self {
        self.dedup_video_ids = dedup;
        self
    }

    pub fn with_skip_empty_sets(mut self, skip: bool) -> Self {
        self.skip_empty_sets = skip;
        self
    }
}

impl Default for CandidatePolicy {
    fn default() -> Self {
        Self {
            dedup_video_ids: true,
            skip_empty_sets: false,
        }
    }
}

/// Counters accumulated while reducing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReduceStats {
    pub records: u64,
    pub groups: u64,
    pub largest_group: usize,
    pub duplicate_ids: u64,
    pub empty_sets_skipped: u64,
    pub comparisons: u64,
    pub pairs: u64,
}

/// Streaming reducer over key-sorted `(BandKey, Candidate)` records.
#[derive(Debug, Clone)]
pub struct CandidateReducer {
    threshold: f64,
    sentinel: u64,
    policy: CandidatePolicy,
    grouper: Grouper<BandKey, Candidate>,
    stats: ReduceStats,
}

impl CandidateReducer {
    pub fn new(cfg: &LshConfig, policy: CandidatePolicy) -> Result<Self, LshError> {
        cfg.validate()?;
        Ok(Self {
            threshold: cfg.threshold,
            sentinel: cfg.shingle_buckets,
            policy,
            grouper: Grouper::new(),
            stats: ReduceStats::default(),
        })
    }

    pub fn policy(&self) -> CandidatePolicy {
        self.policy
    }

    pub fn stats(&self) -> &ReduceStats {
        &self.stats
    }

    /// Feed one record. Returns the pairs of the group this record closed,
    /// if any.
    pub fn push(&mut self, key: BandKey, candidate: Candidate) -> Vec<SimilarPair> {
        self.stats.records += 1;
        match self.grouper.push(key, candidate) {
            Some(group) => self.reduce_group(&group),
            None => Vec::new(),
        }
    }

    /// Flush the last open group at end of input.
    pub fn finish(&mut self) -> Vec<SimilarPair> {
        match self.grouper.finish() {
            Some(group) => self.reduce_group(&group),
            None => Vec::new(),
        }
    }

    /// Score every unordered pair of distinct videos in one group.
    pub fn reduce_group(&mut self, group: &Group<BandKey, Candidate>) -> Vec<SimilarPair> {
        self.stats.groups += 1;
        self.stats.largest_group = self.stats.largest_group.max(group.members.len());

        let mut members: Vec<&Candidate> = group.members.iter().collect();
        if self.policy.skip_empty_sets {
            let before = members.len();
            members.retain(|c| !c.signature.is_all_sentinel(self.sentinel));
            self.stats.empty_sets_skipped += (before - members.len()) as u64;
        }
        if self.policy.dedup_video_ids {
            let before = members.len();
            let mut seen = HashSet::with_capacity(members.len());
            members.retain(|c| seen.insert(c.video_id));
            self.stats.duplicate_ids += (before - members.len()) as u64;
        }
        members.sort_by_key(|c| c.video_id);

        let mut pairs = Vec::new();
        for (i, a) in members.iter().enumerate() {
            for b in &members[i + 1..] {
                if a.video_id == b.video_id {
                    continue;
                }
                self.stats.comparisons += 1;
                let similarity = estimate_similarity(a.signature.values(), b.signature.values());
                if similarity >= self.threshold {
                    pairs.push(SimilarPair::new(a.video_id, b.video_id));
                }
            }
        }
        self.stats.pairs += pairs.len() as u64;
        tracing::debug!(
            band = group.key.band,
            bucket = group.key.bucket,
            records = group.members.len(),
            candidates = members.len(),
            pairs = pairs.len(),
            "reduced candidate group"
        );
        pairs
    }
}

/// Reduce a complete key-sorted stream in one call.
pub fn reduce_sorted<I>(
    cfg: &LshConfig,
    policy: CandidatePolicy,
    records: I,
) -> Result<(Vec<SimilarPair>, ReduceStats), LshError>
where
    I: IntoIterator<Item = (BandKey, Candidate)>,
{
    let mut reducer = CandidateReducer::new(cfg, policy)?;
    let mut pairs = Vec::new();
    for (key, candidate) in records {
        pairs.extend(reducer.push(key, candidate));
    }
    pairs.extend(reducer.finish());
    Ok((pairs, reducer.stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> LshConfig {
        LshConfig::new()
            .with_shingles(1_000)
            .with_bands(1)
            .with_rows(10)
            .with_shingle_buckets(1_000)
            .with_threshold(0.9)
    }

    fn cand(id: u64, values: &[u64]) -> Candidate {
        Candidate::new(id, Signature::from_values(values.to_vec()))
    }

    const SIG_A: [u64; 10] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
    const SIG_A_NEAR: [u64; 10] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 0];
    const SIG_FAR: [u64; 10] = [0, 0, 0, 0, 0, 6, 7, 8, 9, 10];

    fn group(key: BandKey, members: Vec<Candidate>) -> Group<BandKey, Candidate> {
        Group { key, members }
    }

    #[test]
    fn similar_pair_is_ordered() {
        assert_eq!(SimilarPair::new(9, 3), SimilarPair { first: 3, second: 9 });
        assert_eq!(SimilarPair::new(3, 9), SimilarPair::new(9, 3));
    }

    #[test]
    fn pairs_at_or_above_threshold_are_reported() {
        let mut reducer = CandidateReducer::new(&cfg(), CandidatePolicy::default()).unwrap();
        let pairs = reducer.reduce_group(&group(
            BandKey::new(0, 1),
            vec![cand(5, &SIG_A), cand(2, &SIG_A_NEAR), cand(9, &SIG_FAR)],
        ));
        // 5 vs 2 agree on 9/10 = 0.9 >= 0.9; the far signature agrees on 5/10.
        assert_eq!(pairs, vec![SimilarPair::new(2, 5)]);
        assert_eq!(reducer.stats().comparisons, 3);
    }

    #[test]
    fn group_of_n_emits_at_most_n_choose_2() {
        let mut reducer = CandidateReducer::new(&cfg(), CandidatePolicy::default()).unwrap();
        let members = (0..6).map(|id| cand(id, &SIG_A)).collect();
        let pairs = reducer.reduce_group(&group(BandKey::new(0, 0), members));
        assert_eq!(pairs.len(), 15);
        let unique: HashSet<_> = pairs.iter().collect();
        assert_eq!(unique.len(), 15);
    }

    #[test]
    fn duplicate_ids_are_one_candidate_by_default() {
        let mut reducer = CandidateReducer::new(&cfg(), CandidatePolicy::default()).unwrap();
        let pairs = reducer.reduce_group(&group(
            BandKey::new(0, 0),
            vec![cand(1, &SIG_A), cand(1, &SIG_A), cand(2, &SIG_A)],
        ));
        assert_eq!(pairs, vec![SimilarPair::new(1, 2)]);
        assert_eq!(reducer.stats().duplicate_ids, 1);
    }

    #[test]
    fn duplicate_ids_repeat_pairs_without_dedup() {
        let policy = CandidatePolicy::default().with_dedup_video_ids(false);
        let mut reducer = CandidateReducer::new(&cfg(), policy).unwrap();
        let pairs = reducer.reduce_group(&group(
            BandKey::new(0, 0),
            vec![cand(1, &SIG_A), cand(1, &SIG_A), cand(2, &SIG_A)],
        ));
        // Never a self pair, but 1-2 is reported once per copy of video 1.
        assert_eq!(pairs, vec![SimilarPair::new(1, 2), SimilarPair::new(1, 2)]);
    }

    #[test]
    fn first_occurrence_wins_on_dedup() {
        let mut reducer = CandidateReducer::new(&cfg(), CandidatePolicy::default()).unwrap();
        let pairs = reducer.reduce_group(&group(
            BandKey::new(0, 0),
            vec![cand(1, &SIG_FAR), cand(1, &SIG_A), cand(2, &SIG_A)],
        ));
        assert!(pairs.is_empty());
    }

    #[test]
    fn empty_sets_pair_up_by_default() {
        let sentinel = [1_000u64; 10];
        let mut reducer = CandidateReducer::new(&cfg(), CandidatePolicy::default()).unwrap();
        let pairs = reducer.reduce_group(&group(
            BandKey::new(0, 0),
            vec![cand(3, &sentinel), cand(4, &sentinel)],
        ));
        assert_eq!(pairs, vec![SimilarPair::new(3, 4)]);
    }

    #[test]
    fn empty_sets_can_be_skipped() {
        let sentinel = [1_000u64; 10];
        let policy = CandidatePolicy::default().with_skip_empty_sets(true);
        let mut reducer = CandidateReducer::new(&cfg(), policy).unwrap();
        let pairs = reducer.reduce_group(&group(
            BandKey::new(0, 0),
            vec![cand(3, &sentinel), cand(4, &sentinel), cand(5, &SIG_A)],
        ));
        assert!(pairs.is_empty());
        assert_eq!(reducer.stats().empty_sets_skipped, 2);
        assert_eq!(reducer.stats().comparisons, 0);
    }

    #[test]
    fn groups_are_reduced_independently() {
        let k1 = BandKey::new(0, 11);
        let k2 = BandKey::new(1, 22);
        let records = vec![
            (k1, cand(1, &SIG_A)),
            (k1, cand(2, &SIG_FAR)),
            (k1, cand(3, &SIG_FAR)),
            (k2, cand(4, &SIG_A)),
            (k2, cand(5, &SIG_A_NEAR)),
        ];
        let (pairs, stats) = reduce_sorted(&cfg(), CandidatePolicy::default(), records).unwrap();

        // 1 and 4 share a signature but never a group.
        assert_eq!(pairs, vec![SimilarPair::new(2, 3), SimilarPair::new(4, 5)]);
        assert_eq!(stats.groups, 2);
        assert_eq!(stats.records, 5);
        assert_eq!(stats.largest_group, 3);
        assert_eq!(stats.comparisons, 3 + 1);
    }

    #[test]
    fn last_group_is_flushed_on_finish() {
        let mut reducer = CandidateReducer::new(&cfg(), CandidatePolicy::default()).unwrap();
        let key = BandKey::new(3, 3);
        assert!(reducer.push(key, cand(1, &SIG_A)).is_empty());
        assert!(reducer.push(key, cand(2, &SIG_A)).is_empty());
        assert_eq!(reducer.finish(), vec![SimilarPair::new(1, 2)]);
        assert!(reducer.finish().is_empty());
    }

    #[test]
    fn empty_stream_reports_nothing() {
        let (pairs, stats) = reduce_sorted(&cfg(), CandidatePolicy::default(), Vec::new()).unwrap();
        assert!(pairs.is_empty());
        assert_eq!(stats, ReduceStats::default());
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        assert!(matches!(
            CandidateReducer::new(&cfg().with_threshold(2.0), CandidatePolicy::default()),
            Err(LshError::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn policy_deserializes_with_defaults() {
        let policy: CandidatePolicy = serde_json::from_str(r#"{"skip_empty_sets": true}"#).unwrap();
        assert!(policy.dedup_video_ids);
        assert!(policy.skip_empty_sets);
    }
}
