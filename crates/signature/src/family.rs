//! Deterministic hash-coefficient tables.
//!
//! Two disjoint families are derived from [`LshConfig::seed`]:
//!
//! - the shingle family, `hashes` pairs `(a, b)` of distinct odd primes below
//!   `shingles`, drawn from a seeded shuffle of the prime pool;
//! - the band family, one multiplier per signature row in
//!   `[1, band_buckets)` and one additive offset per band in
//!   `[0, band_buckets)`, drawn from an independent stream.
//!
//! Both streams are `ChaCha8Rng`, whose output is reproducible across
//! platforms for a given seed, so independently started workers build
//! byte-identical tables.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{LshConfig, LshError};

/// Mixes the seed so the band stream never replays the shingle stream.
const BAND_STREAM_TAG: u64 = 0xB4D5_B4D5_0000_0001;

/// Coefficients of one pairwise-independent hash `(a * x + b) mod m`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Coefficients {
    pub a: u64,
    pub b: u64,
}

/// Coefficient tables shared by the signature builder and the band hasher.
///
/// Built once at process start and passed by reference; never global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashFamily {
    bands: usize,
    rows: usize,
    shingle_buckets: u64,
    band_buckets: u64,
    shingle: Vec<Coefficients>,
    band_multipliers: Vec<u64>,
    band_offsets: Vec<u64>,
}

impl HashFamily {
    /// Derive both coefficient tables from the configuration.
    pub fn new(cfg: &LshConfig) -> Result<Self, LshError> {
        cfg.validate()?;
        let hashes = cfg.hashes();

        let mut pool = odd_primes_below(cfg.shingles);
        let needed = hashes * 2;
        if pool.len() < needed {
            return Err(LshError::NotEnoughPrimes {
                shingles: cfg.shingles,
                needed,
                available: pool.len(),
            });
        }

        pool.shuffle(&mut ChaCha8Rng::seed_from_u64(cfg.seed));
        let shingle = (0..hashes)
            .map(|i| Coefficients {
                a: pool[i],
                b: pool[hashes + i],
            })
            .collect();

        let mut band_rng = ChaCha8Rng::seed_from_u64(band_seed(cfg.seed));
        let band_multipliers = (0..hashes)
            .map(|_| band_rng.gen_range(1..cfg.band_buckets))
            .collect();
        let band_offsets = (0..cfg.bands)
            .map(|_| band_rng.gen_range(0..cfg.band_buckets))
            .collect();

        Ok(Self {
            bands: cfg.bands,
            rows: cfg.rows,
            shingle_buckets: cfg.shingle_buckets,
            band_buckets: cfg.band_buckets,
            shingle,
            band_multipliers,
            band_offsets,
        })
    }

    /// Build a family from explicit tables, e.g. hand-picked test fixtures.
    ///
    /// Table lengths and ranges are checked against `cfg`; primality is not.
    pub fn from_tables(
        cfg: &LshConfig,
        shingle: Vec<Coefficients>,
        band_multipliers: Vec<u64>,
        band_offsets: Vec<u64>,
    ) -> Result<Self, LshError> {
        cfg.validate()?;
        let hashes = cfg.hashes();
        if shingle.len() != hashes || band_multipliers.len() != hashes {
            return Err(LshError::InvalidCoefficients(format!(
                "expected {hashes} shingle and row coefficients, got {} and {}",
                shingle.len(),
                band_multipliers.len()
            )));
        }
        if band_offsets.len() != cfg.bands {
            return Err(LshError::InvalidCoefficients(format!(
                "expected {} band offsets, got {}",
                cfg.bands,
                band_offsets.len()
            )));
        }
        let limit = u64::from(u32::MAX);
        if shingle.iter().any(|c| c.a > limit || c.b > limit)
            || band_multipliers.iter().any(|&c| c > limit)
            || band_offsets.iter().any(|&c| c > limit)
        {
            return Err(LshError::InvalidCoefficients(
                "coefficients must fit in 32 bits".into(),
            ));
        }

        Ok(Self {
            bands: cfg.bands,
            rows: cfg.rows,
            shingle_buckets: cfg.shingle_buckets,
            band_buckets: cfg.band_buckets,
            shingle,
            band_multipliers,
            band_offsets,
        })
    }

    /// Hash `shingle` with the `i`-th shingle function.
    ///
    /// The shingle is reduced modulo `shingle_buckets` first, which leaves
    /// the result unchanged mathematically and keeps the product in `u64`.
    #[inline]
    pub fn hash_shingle(&self, i: usize, shingle: u64) -> u64 {
        let c = self.shingle[i];
        let m = self.shingle_buckets;
        (c.a * (shingle % m) + c.b) % m
    }

    pub fn hashes(&self) -> usize {
        self.shingle.len()
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn shingle_buckets(&self) -> u64 {
        self.shingle_buckets
    }

    pub fn band_buckets(&self) -> u64 {
        self.band_buckets
    }

    pub fn shingle_coefficients(&self) -> &[Coefficients] {
        &self.shingle
    }

    pub fn band_multipliers(&self) -> &[u64] {
        &self.band_multipliers
    }

    pub fn band_offsets(&self) -> &[u64] {
        &self.band_offsets
    }
}

/// All odd primes `p` with `3 <= p < n`, ascending.
///
/// Odds-only sieve: slot `i` stands for `2 * i + 1`.
pub fn odd_primes_below(n: u64) -> Vec<u64> {
    let n = n as usize;
    if n <= 3 {
        return Vec::new();
    }
    let slots = n / 2;
    let mut composite = vec![false; slots];
    let mut i = 1;
    while (2 * i + 1) * (2 * i + 1) < n {
        if !composite[i] {
            let p = 2 * i + 1;
            let mut j = p * p / 2;
            while j < slots {
                composite[j] = true;
                j += p;
            }
        }
        i += 1;
    }
    (1..slots)
        .filter(|&i| !composite[i])
        .map(|i| (2 * i + 1) as u64)
        .collect()
}

/// Seed of the band stream, mixed so it never replays the shingle stream.
fn band_seed(seed: u64) -> u64 {
    splitmix64(seed ^ BAND_STREAM_TAG)
}

/// SplitMix64 output function.
#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn small_cfg() -> LshConfig {
        LshConfig::new()
            .with_shingles(1_000)
            .with_bands(8)
            .with_rows(4)
            .with_shingle_buckets(1_000)
            .with_band_buckets(10_007)
    }

    #[test]
    fn odd_primes_below_small_bounds() {
        assert!(odd_primes_below(0).is_empty());
        assert!(odd_primes_below(3).is_empty());
        assert_eq!(odd_primes_below(4), vec![3]);
        assert_eq!(odd_primes_below(30), vec![3, 5, 7, 11, 13, 17, 19, 23, 29]);
    }

    #[test]
    fn odd_primes_below_default_space() {
        // 2262 primes below 20000, minus 2.
        assert_eq!(odd_primes_below(20_000).len(), 2_261);
    }

    #[test]
    fn family_is_deterministic() {
        let a = HashFamily::new(&small_cfg()).unwrap();
        let b = HashFamily::new(&small_cfg()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn family_depends_on_seed() {
        let a = HashFamily::new(&small_cfg().with_seed(1)).unwrap();
        let b = HashFamily::new(&small_cfg().with_seed(2)).unwrap();
        assert_ne!(a.shingle_coefficients(), b.shingle_coefficients());
        assert_ne!(a.band_multipliers(), b.band_multipliers());
    }

    #[test]
    fn shingle_coefficients_are_distinct_primes() {
        let cfg = small_cfg();
        let family = HashFamily::new(&cfg).unwrap();
        let primes: HashSet<u64> = odd_primes_below(cfg.shingles).into_iter().collect();

        let mut seen = HashSet::new();
        for c in family.shingle_coefficients() {
            assert!(primes.contains(&c.a));
            assert!(primes.contains(&c.b));
            assert!(seen.insert(c.a));
            assert!(seen.insert(c.b));
        }
        assert_eq!(family.hashes(), cfg.hashes());
    }

    #[test]
    fn band_coefficients_in_range() {
        let cfg = small_cfg();
        let family = HashFamily::new(&cfg).unwrap();
        assert_eq!(family.band_multipliers().len(), cfg.hashes());
        assert_eq!(family.band_offsets().len(), cfg.bands);
        assert!(family
            .band_multipliers()
            .iter()
            .all(|&c| (1..cfg.band_buckets).contains(&c)));
        assert!(family
            .band_offsets()
            .iter()
            .all(|&c| c < cfg.band_buckets));
    }

    #[test]
    fn default_config_builds() {
        let family = HashFamily::new(&LshConfig::default()).unwrap();
        assert_eq!(family.hashes(), 1024);
        assert_eq!(family.bands(), 64);
        assert_eq!(family.rows(), 16);
    }

    #[test]
    fn too_few_primes_is_rejected() {
        let cfg = small_cfg().with_shingles(50);
        assert_eq!(
            HashFamily::new(&cfg),
            Err(LshError::NotEnoughPrimes {
                shingles: 50,
                needed: 64,
                available: 14
            })
        );
    }

    #[test]
    fn hash_count_over_ceiling_fails_fast() {
        let cfg = LshConfig::new().with_bands(128).with_rows(16);
        assert!(matches!(
            HashFamily::new(&cfg),
            Err(LshError::TooManyHashes { hashes: 2048, .. })
        ));
    }

    #[test]
    fn hash_shingle_stays_in_range() {
        let cfg = small_cfg().with_shingle_buckets(997);
        let family = HashFamily::new(&cfg).unwrap();
        for i in 0..family.hashes() {
            for s in [0u64, 1, 2, 500, 999, 1_000, u64::MAX] {
                assert!(family.hash_shingle(i, s) < 997);
            }
        }
    }

    #[test]
    fn from_tables_checks_lengths() {
        let cfg = LshConfig::new()
            .with_shingles(100)
            .with_bands(2)
            .with_rows(2)
            .with_shingle_buckets(100)
            .with_band_buckets(101);
        let coeffs = vec![Coefficients { a: 3, b: 5 }; 4];

        assert!(HashFamily::from_tables(&cfg, coeffs.clone(), vec![1; 4], vec![0; 2]).is_ok());
        assert!(matches!(
            HashFamily::from_tables(&cfg, coeffs.clone(), vec![1; 3], vec![0; 2]),
            Err(LshError::InvalidCoefficients(_))
        ));
        assert!(matches!(
            HashFamily::from_tables(&cfg, coeffs, vec![1; 4], vec![0; 1]),
            Err(LshError::InvalidCoefficients(_))
        ));
    }

    #[test]
    fn odd_primes_below_matches_trial_division() {
        let is_prime = |p: u64| p >= 2 && (2..).take_while(|d| d * d <= p).all(|d| p % d != 0);
        for n in [5u64, 9, 10, 11, 25, 26, 49, 50, 121, 1_000] {
            let expected: Vec<u64> = (3..n).filter(|&p| is_prime(p)).collect();
            assert_eq!(odd_primes_below(n), expected, "n = {n}");
        }
    }

    #[test]
    fn coefficients_follow_seeded_chacha_stream() {
        let cfg = small_cfg().with_seed(7);
        let family = HashFamily::new(&cfg).unwrap();
        let hashes = cfg.hashes();

        let mut pool = odd_primes_below(cfg.shingles);
        pool.shuffle(&mut ChaCha8Rng::seed_from_u64(7));
        for (i, c) in family.shingle_coefficients().iter().enumerate() {
            assert_eq!(c.a, pool[i]);
            assert_eq!(c.b, pool[hashes + i]);
        }

        let mut band_rng = ChaCha8Rng::seed_from_u64(band_seed(7));
        let multipliers: Vec<u64> = (0..hashes)
            .map(|_| band_rng.gen_range(1..cfg.band_buckets))
            .collect();
        assert_eq!(family.band_multipliers(), multipliers.as_slice());
    }
}
