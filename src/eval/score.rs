use std::collections::BTreeMap;

use crate::model::Label;

/// Classification quality of one component's raw predictions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scores {
    pub acc: f64,
    pub mcc: f64,
}

/// Accuracy and multi-class Matthews correlation over (truth, predicted)
/// pairs. Degenerate inputs (empty, or a single class on either side) yield
/// NaN for MCC rather than an error so callers can report the case.
pub fn classification_scores(pairs: &[(Label, Label)]) -> Scores {
    let n = pairs.len();
    if n == 0 {
        return Scores {
            acc: f64::NAN,
            mcc: f64::NAN,
        };
    }

    let correct = pairs.iter().filter(|(t, p)| t == p).count();
    let acc = correct as f64 / n as f64;

    let mut truth_counts: BTreeMap<&'static str, f64> = BTreeMap::new();
    let mut pred_counts: BTreeMap<&'static str, f64> = BTreeMap::new();
    for (t, p) in pairs {
        *truth_counts.entry(t.as_str()).or_insert(0.0) += 1.0;
        *pred_counts.entry(p.as_str()).or_insert(0.0) += 1.0;
    }

    let s = n as f64;
    let c = correct as f64;
    let sum_pt: f64 = truth_counts
        .iter()
        .map(|(k, t)| t * pred_counts.get(k).copied().unwrap_or(0.0))
        .sum();
    let sum_t2: f64 = truth_counts.values().map(|t| t * t).sum();
    let sum_p2: f64 = pred_counts.values().map(|p| p * p).sum();

    let denom = ((s * s - sum_p2) * (s * s - sum_t2)).sqrt();
    let mcc = if denom == 0.0 {
        f64::NAN
    } else {
        (c * s - sum_pt) / denom
    };

    Scores { acc, mcc }
}
