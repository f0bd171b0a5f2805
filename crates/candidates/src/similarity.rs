//! MinHash estimate of Jaccard similarity.

/// Fraction of positions at which the two signatures agree.
///
/// Positions past the end of the shorter signature count as disagreements,
/// so signatures of different lengths never score 1.0. Two empty
/// signatures are identical and score 1.0.
pub fn estimate_similarity(a: &[u64], b: &[u64]) -> f64 {
    let len = a.len().max(b.len());
    if len == 0 {
        return 1.0;
    }
    let equal = a.iter().zip(b).filter(|(x, y)| x == y).count();
    equal as f64 / len as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_signatures_score_one() {
        assert_eq!(estimate_similarity(&[1, 2, 3, 4], &[1, 2, 3, 4]), 1.0);
    }

    #[test]
    fn fully_different_signatures_score_zero() {
        assert_eq!(estimate_similarity(&[1, 2, 3, 4], &[5, 6, 7, 8]), 0.0);
    }

    #[test]
    fn partial_agreement_is_a_fraction() {
        assert_eq!(estimate_similarity(&[1, 2, 3, 4], &[1, 2, 0, 0]), 0.5);
        assert_eq!(estimate_similarity(&[1, 2, 3, 4], &[0, 2, 3, 4]), 0.75);
    }

    #[test]
    fn one_iff_elementwise_identical() {
        let base = [9u64; 16];
        for i in 0..16 {
            let mut other = base;
            other[i] = 0;
            assert!(estimate_similarity(&base, &other) < 1.0);
            assert!(estimate_similarity(&base, &other) > 0.0);
        }
    }

    #[test]
    fn length_mismatch_counts_as_disagreement() {
        assert_eq!(estimate_similarity(&[1, 2], &[1, 2, 3, 4]), 0.5);
    }

    #[test]
    fn symmetric() {
        let a = [1, 5, 3, 8, 2];
        let b = [1, 4, 3, 7, 2];
        assert_eq!(estimate_similarity(&a, &b), estimate_similarity(&b, &a));
    }

    #[test]
    fn empty_signatures_are_identical() {
        assert_eq!(estimate_similarity(&[], &[]), 1.0);
    }
}
