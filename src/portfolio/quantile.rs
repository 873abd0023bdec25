use crate::model::Strength;

/// Number of confidence tiers in the quantile vocabulary.
pub const QUANTILES: usize = Strength::ALL.len();

/// Bucket for the `rank`-th smallest of `n` values split into `k` tiers.
///
/// Buckets are assigned by rank fraction, so a group smaller than `k` spreads
/// to the outer tiers (two rows land in Very Low and Very High) instead of
/// silently dropping the remainder. All n rows get a bucket and bucket sizes
/// never differ by more than one.
fn bucket_index(rank: usize, n: usize, k: usize) -> usize {
    if n <= 1 {
        return k / 2;
    }
    let f = rank as f64 / (n - 1) as f64;
    ((f * k as f64) as usize).min(k - 1)
}

/// Assign a quintile label to every entry of one (year, week) cross-section,
/// sorted ascending by probability. Ties keep their original row order
/// (stable sort). The returned vector is indexed like the input.
pub fn assign_by_probability(probs: &[f64]) -> Vec<Strength> {
    let n = probs.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| probs[a].partial_cmp(&probs[b]).unwrap_or(std::cmp::Ordering::Equal));

    let mut buckets = vec![Strength::Medium; n];
    for (rank, &idx) in order.iter().enumerate() {
        let bucket = bucket_index(rank, n, QUANTILES);
        buckets[idx] = Strength::from_index(bucket).unwrap_or(Strength::VeryHigh);
    }
    buckets
}
