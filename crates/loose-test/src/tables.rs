//! Generated tables.
//!
//! Every generator takes a seed, so a failing property or benchmark input can
//! be reproduced exactly.

use loose_core::{Result, VecTable};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn generated<F>(rows: usize, width: usize, seed: u64, mut value: F) -> Result<VecTable<i64>>
where
    F: FnMut(&mut ChaCha8Rng) -> i64,
{
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let data = (0..rows)
        .map(|_| (0..width).map(|_| value(&mut rng)).collect())
        .collect();
    VecTable::with_numbered_attributes(width, data)
}

/// Table whose values are drawn uniformly from `1..=max_value`.
pub fn random_table(rows: usize, width: usize, max_value: i64, seed: u64) -> Result<VecTable<i64>> {
    generated(rows, width, seed, |rng| rng.random_range(1..=max_value))
}

/// Table with skewed values: with `coeff = 0.2`, about 80% of the draws land
/// in the lowest 20% of `0..max_value`.
pub fn self_similar_table(
    rows: usize,
    width: usize,
    coeff: f64,
    max_value: i64,
    seed: u64,
) -> Result<VecTable<i64>> {
    let exponent = coeff.ln() / (1.0 - coeff).ln();
    generated(rows, width, seed, |rng| {
        let u: f64 = rng.random();
        (max_value as f64 * u.powf(exponent)) as i64
    })
}

#[cfg(test)]
mod tests {
    use loose_core::Table;

    use super::*;

    #[test]
    fn test_random_table_is_seeded() {
        let a = random_table(20, 3, 5, 42).unwrap();
        let b = random_table(20, 3, 5, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 20);
        assert_eq!(a.width(), 3);
        assert!(a.rows().all(|(_, row)| row.iter().all(|v| (1..=5).contains(v))));
    }

    #[test]
    fn test_self_similar_skew() {
        let table = self_similar_table(500, 1, 0.2, 100, 3).unwrap();
        let low = table.rows().filter(|(_, row)| row[0] < 20).count();
        assert!(low > 300, "expected a skewed distribution, got {low} low values");
        assert!(table.rows().all(|(_, row)| (0..100).contains(&row[0])));
    }
}
