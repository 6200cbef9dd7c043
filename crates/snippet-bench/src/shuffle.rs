//! Order randomization
//!
//! Drift over the course of a run (thermal throttling ramping up, the host's
//! adaptive optimizations kicking in) would otherwise be charged to whichever
//! snippets happen to run first or last.

use rand::Rng;

/// Fisher-Yates shuffle: every ordering of `items` is equally likely.
///
/// # Example
///
/// ```
/// use rand::{rngs::StdRng, SeedableRng};
/// use snippet_bench::shuffle::shuffle;
///
/// let mut items = vec![1, 2, 3, 4, 5];
/// shuffle(&mut items, &mut StdRng::seed_from_u64(7));
/// items.sort();
/// assert_eq!(items, vec![1, 2, 3, 4, 5]);
/// ```
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_shuffle_empty_and_single() {
        let mut rng = StdRng::seed_from_u64(1);

        let mut empty: Vec<u32> = Vec::new();
        shuffle(&mut empty, &mut rng);
        assert!(empty.is_empty());

        let mut single = vec![42];
        shuffle(&mut single, &mut rng);
        assert_eq!(single, vec![42]);
    }

    #[test]
    fn test_shuffle_is_deterministic_for_seed() {
        let mut a: Vec<u32> = (0..32).collect();
        let mut b = a.clone();
        shuffle(&mut a, &mut StdRng::seed_from_u64(99));
        shuffle(&mut b, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn test_shuffle_position_distribution_is_uniform() {
        const LEN: usize = 5;
        const TRIALS: usize = 50_000;
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut counts = [0usize; LEN];

        for _ in 0..TRIALS {
            let mut items: Vec<usize> = (0..LEN).collect();
            shuffle(&mut items, &mut rng);
            let pos = items.iter().position(|&x| x == 0).unwrap();
            counts[pos] += 1;
        }

        let expected = TRIALS as f64 / LEN as f64;
        for (pos, &count) in counts.iter().enumerate() {
            let deviation = (count as f64 - expected).abs() / expected;
            assert!(
                deviation < 0.05,
                "position {} drew {} times, expected ~{}",
                pos,
                count,
                expected
            );
        }
    }

    proptest! {
        #[test]
        fn prop_shuffle_is_permutation(mut items in proptest::collection::vec(any::<i32>(), 0..64), seed in any::<u64>()) {
            let mut expected = items.clone();
            shuffle(&mut items, &mut StdRng::seed_from_u64(seed));

            prop_assert_eq!(items.len(), expected.len());
            items.sort_unstable();
            expected.sort_unstable();
            prop_assert_eq!(items, expected);
        }
    }
}
