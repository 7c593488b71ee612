// Silhouette score.
//
// For each point i:
//   a(i) = mean distance to the other members of its cluster
//   b(i) = smallest mean distance to the members of another cluster
//   s(i) = (b - a) / max(a, b), or 0 when i is alone in its cluster
//
// The score is the mean of s(i). It is only defined for 2..=n-1 distinct
// labels; otherwise `None` is returned and the caller decides what that
// means (the sweep skips the candidate).

use std::collections::HashMap;

use ndarray::Array2;

use super::distance::euclidean;

pub fn silhouette_score(data: &Array2<f64>, labels: &[usize]) -> Option<f64> {
    let n = data.nrows();
    if labels.len() != n {
        return None;
    }

    // Dense cluster indices in first-appearance order
    let mut index: HashMap<usize, usize> = HashMap::new();
    let dense: Vec<usize> = labels
        .iter()
        .map(|label| {
            let next = index.len();
            *index.entry(*label).or_insert(next)
        })
        .collect();
    let k = index.len();
    if k < 2 || k + 1 > n {
        return None;
    }

    let mut sizes = vec![0usize; k];
    for &c in &dense {
        sizes[c] += 1;
    }

    let mut total = 0.0;
    let mut sums = vec![0.0; k];
    for i in 0..n {
        sums.iter_mut().for_each(|s| *s = 0.0);
        for j in 0..n {
            if i != j {
                sums[dense[j]] += euclidean(data.row(i), data.row(j));
            }
        }

        let own = dense[i];
        if sizes[own] == 1 {
            continue;
        }
        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);

        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }

    Some(total / n as f64)
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn test_well_separated_clusters() {
        let data = array![[0.0, 0.0], [0.0, 0.1], [10.0, 10.0], [10.0, 10.1]];
        let score = silhouette_score(&data, &[0, 0, 1, 1]).unwrap();
        assert!(score > 0.9, "got {score}");
    }

    #[test]
    fn test_bad_assignment_scores_lower() {
        let data = array![[0.0, 0.0], [0.0, 0.1], [10.0, 10.0], [10.0, 10.1]];
        let good = silhouette_score(&data, &[0, 0, 1, 1]).unwrap();
        let bad = silhouette_score(&data, &[0, 1, 0, 1]).unwrap();
        assert!(bad < good);
        assert!(bad < 0.0);
    }

    #[test]
    fn test_known_value() {
        // Points 0, 1, 4 on a line; clusters {0, 1} and {4}
        // s(0) = (4 - 1) / 4, s(1) = (3 - 1) / 3, s(2) = 0 (singleton)
        let data = array![[0.0], [1.0], [4.0]];
        let expected = (0.75 + 2.0 / 3.0) / 3.0;
        let score = silhouette_score(&data, &[0, 0, 1]).unwrap();
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_undefined_label_counts() {
        let data = array![[0.0], [1.0], [2.0]];
        assert!(silhouette_score(&data, &[0, 0, 0]).is_none());
        assert!(silhouette_score(&data, &[0, 1, 2]).is_none());
        assert!(silhouette_score(&data, &[0, 1]).is_none());
    }

    #[test]
    fn test_label_values_need_not_be_dense() {
        let data = array![[0.0], [1.0], [4.0]];
        let a = silhouette_score(&data, &[0, 0, 1]).unwrap();
        let b = silhouette_score(&data, &[7, 7, 3]).unwrap();
        assert!((a - b).abs() < 1e-12);
    }
}
