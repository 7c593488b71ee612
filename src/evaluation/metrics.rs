// Per-label precision, recall, and F1 against the closest cluster.
//
// Gold rows are inner-joined with the assignments by sentence id; gold
// sentences that never reached clustering do not count anywhere. For each
// label the closest cluster is the one holding most of its joined sentences
// (smallest id on ties, -1 when none joined). False positives are all
// assigned sentences in that cluster that do not carry the label, gold
// labeled or not. Zero denominators give NaN rather than an error.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::corpus::models::{Sentence, SentenceId};

/// Cluster id reported when no sentence with the label was clustered.
pub const NO_CLUSTER: i64 = -1;

#[derive(Debug, Clone, Serialize)]
pub struct LabelReport {
    pub label: String,
    pub closest_cluster: i64,
    pub true_positive: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub precision: f64,
    pub recall: f64,
    /// Rounded to three decimals
    pub f1: f64,
}

/// Cluster assignments keyed by sentence id, for sentences that have one.
pub fn assignments_from(sentences: &[Sentence]) -> BTreeMap<SentenceId, usize> {
    sentences
        .iter()
        .filter_map(|s| s.cluster.map(|c| (s.id(), c)))
        .collect()
}

/// One report per distinct gold label, sorted by label.
pub fn evaluate(
    assignments: &BTreeMap<SentenceId, usize>,
    gold: &BTreeMap<SentenceId, String>,
) -> Vec<LabelReport> {
    let joined: Vec<(&str, usize)> = gold
        .iter()
        .filter_map(|(id, label)| assignments.get(id).map(|&c| (label.as_str(), c)))
        .collect();
    debug!(gold = gold.len(), joined = joined.len(), "Joined gold labels with clusters");

    let labels: BTreeSet<&str> = gold.values().map(String::as_str).collect();

    labels
        .into_iter()
        .map(|label| {
            let mut per_cluster: BTreeMap<usize, usize> = BTreeMap::new();
            for &(l, cluster) in &joined {
                if l == label {
                    *per_cluster.entry(cluster).or_default() += 1;
                }
            }

            let mut closest: Option<(usize, usize)> = None;
            for (&cluster, &count) in &per_cluster {
                if closest.map_or(true, |(_, best)| count > best) {
                    closest = Some((cluster, count));
                }
            }

            let Some((cluster, tp)) = closest else {
                return LabelReport {
                    label: label.to_string(),
                    closest_cluster: NO_CLUSTER,
                    true_positive: 0,
                    false_positive: 0,
                    false_negative: 0,
                    precision: f64::NAN,
                    recall: f64::NAN,
                    f1: f64::NAN,
                };
            };

            let false_positive = assignments
                .iter()
                .filter(|(id, &c)| {
                    c == cluster && gold.get(*id).map_or(true, |l| l.as_str() != label)
                })
                .count();
            let labelled_total: usize = per_cluster.values().sum();
            let false_negative = labelled_total - tp;

            let precision = ratio(tp, tp + false_positive);
            let recall = ratio(tp, tp + false_negative);

            LabelReport {
                label: label.to_string(),
                closest_cluster: cluster as i64,
                true_positive: tp,
                false_positive,
                false_negative,
                precision,
                recall,
                f1: f1_score(precision, recall),
            }
        })
        .collect()
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        f64::NAN
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Harmonic mean rounded to three decimals; NaN when undefined.
pub fn f1_score(precision: f64, recall: f64) -> f64 {
    let sum = precision + recall;
    if precision.is_nan() || recall.is_nan() || sum == 0.0 {
        return f64::NAN;
    }
    (2.0 * precision * recall / sum * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: usize) -> SentenceId {
        SentenceId::new(0, n)
    }

    #[test]
    fn test_f1_rounding() {
        assert_eq!(f1_score(2.0 / 3.0, 1.0), 0.8);
        assert_eq!(f1_score(1.0, 1.0), 1.0);
        assert_eq!(f1_score(1.0 / 3.0, 1.0), 0.5);
        assert!(f1_score(0.0, 0.0).is_nan());
        assert!(f1_score(f64::NAN, 1.0).is_nan());
    }

    #[test]
    fn test_mode_tie_picks_smallest_cluster() {
        let gold = BTreeMap::from([(id(1), "A".to_string()), (id(2), "A".to_string())]);
        let assignments = BTreeMap::from([(id(1), 4), (id(2), 1)]);
        let report = evaluate(&assignments, &gold);
        assert_eq!(report[0].closest_cluster, 1);
        assert_eq!(report[0].true_positive, 1);
        assert_eq!(report[0].false_negative, 1);
    }

    #[test]
    fn test_unjoined_label_has_sentinel() {
        let gold = BTreeMap::from([(id(1), "A".to_string()), (id(9), "Z".to_string())]);
        let assignments = BTreeMap::from([(id(1), 0)]);
        let report = evaluate(&assignments, &gold);

        assert_eq!(report.len(), 2);
        let z = &report[1];
        assert_eq!(z.label, "Z");
        assert_eq!(z.closest_cluster, NO_CLUSTER);
        assert!(z.precision.is_nan());
        assert!(z.recall.is_nan());
        assert!(z.f1.is_nan());
    }

    #[test]
    fn test_other_label_counts_as_false_positive() {
        let gold = BTreeMap::from([
            (id(1), "A".to_string()),
            (id(2), "A".to_string()),
            (id(3), "B".to_string()),
        ]);
        let assignments = BTreeMap::from([(id(1), 0), (id(2), 0), (id(3), 0)]);
        let report = evaluate(&assignments, &gold);

        assert_eq!(report[0].false_positive, 1);
        assert_eq!(report[1].label, "B");
        assert_eq!(report[1].false_positive, 2);
        assert!((report[1].precision - 1.0 / 3.0).abs() < 1e-12);
    }
}
