use expert_quant::model::Strength;
use expert_quant::portfolio::quantile::assign_by_probability;

#[test]
fn two_entries_land_in_outer_buckets() {
    let buckets = assign_by_probability(&[0.2, 0.9]);
    assert_eq!(buckets, vec![Strength::VeryLow, Strength::VeryHigh]);
}

#[test]
fn five_entries_fill_every_bucket() {
    let buckets = assign_by_probability(&[0.5, 0.1, 0.9, 0.3, 0.7]);
    assert_eq!(
        buckets,
        vec![
            Strength::Medium,
            Strength::VeryLow,
            Strength::VeryHigh,
            Strength::Low,
            Strength::High,
        ]
    );
}

#[test]
fn partition_is_complete_and_balanced() {
    for n in 2..=40 {
        let probs: Vec<f64> = (0..n).map(|i| i as f64 / n as f64).collect();
        let buckets = assign_by_probability(&probs);
        assert_eq!(buckets.len(), n, "all {n} rows must get a bucket");

        let mut sizes = [0usize; 5];
        for b in &buckets {
            sizes[b.index()] += 1;
        }
        assert_eq!(sizes.iter().sum::<usize>(), n);

        let max = sizes.iter().max().unwrap();
        let min = sizes.iter().min().unwrap();
        assert!(max - min <= 1, "n={n}: sizes {sizes:?} spread too wide");
    }
}

#[test]
fn ordering_follows_probability() {
    let buckets = assign_by_probability(&[0.9, 0.1, 0.5]);
    assert_eq!(buckets[1], Strength::VeryLow);
    assert_eq!(buckets[2], Strength::Medium);
    assert_eq!(buckets[0], Strength::VeryHigh);
}

#[test]
fn ties_keep_row_order() {
    let buckets = assign_by_probability(&[0.5; 5]);
    assert_eq!(
        buckets,
        vec![
            Strength::VeryLow,
            Strength::Low,
            Strength::Medium,
            Strength::High,
            Strength::VeryHigh,
        ]
    );
}

#[test]
fn single_entry_sits_in_the_middle() {
    assert_eq!(assign_by_probability(&[0.42]), vec![Strength::Medium]);
}

#[test]
fn empty_group_yields_no_buckets() {
    assert!(assign_by_probability(&[]).is_empty());
}
