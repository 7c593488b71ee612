// K-means strategy.
//
// Uses linfa's K-means with a Xoshiro generator seeded at 42, so identical
// input gives identical assignments on every run. Without an explicit k,
// candidates 2..min(n, 100) are swept by silhouette.

use linfa::prelude::*;
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2};
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use tracing::debug;

use super::distinct_rows;
use super::sweep::{sweep_select, CancelFlag, SweepPoint};
use crate::error::{PipelineError, Result};

pub const KMEANS_SEED: u64 = 42;

/// Exclusive upper bound of the automatic k search.
pub const MAX_K: usize = 100;

const MAX_ITERATIONS: u64 = 300;
const TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone)]
pub struct KMeansOutcome {
    pub labels: Vec<usize>,
    pub k: usize,
    /// Empty when k was given explicitly
    pub sweep: Vec<SweepPoint<usize>>,
}

/// Fit K-means with a fixed seed and return one label per row.
pub fn fit_kmeans(data: &Array2<f64>, k: usize) -> Result<Vec<usize>> {
    let dataset = DatasetBase::from(data.clone());
    let model = KMeans::params_with_rng(k, Xoshiro256Plus::seed_from_u64(KMEANS_SEED))
        .max_n_iterations(MAX_ITERATIONS)
        .tolerance(TOLERANCE)
        .fit(&dataset)
        .map_err(|e| PipelineError::Clustering(format!("K-means (k={k}): {e}")))?;

    let labels: Array1<usize> = model.predict(data);
    Ok(labels.to_vec())
}

/// Candidate k values for the automatic search.
pub fn k_candidates(n: usize) -> Vec<usize> {
    (2..n.min(MAX_K)).collect()
}

/// Cluster with K-means, sweeping k when none is given.
pub fn cluster_kmeans(
    data: &Array2<f64>,
    k: Option<usize>,
    cancel: &CancelFlag,
) -> Result<KMeansOutcome> {
    let distinct = distinct_rows(data);

    if let Some(k) = k {
        if data.nrows() == 0 {
            return Err(PipelineError::InsufficientData {
                needed: 1,
                found: 0,
            });
        }
        if k == 0 || k > distinct {
            return Err(PipelineError::invalid("k", k.to_string()));
        }
        let labels = fit_kmeans(data, k)?;
        debug!(k, "K-means with explicit k");
        return Ok(KMeansOutcome {
            labels,
            k,
            sweep: Vec::new(),
        });
    }

    let result = sweep_select(data, k_candidates(data.nrows()), cancel, "k-means", |k| {
        if k > distinct {
            return Ok(None);
        }
        fit_kmeans(data, k).map(Some)
    })?;

    Ok(KMeansOutcome {
        labels: result.labels,
        k: result.best,
        sweep: result.points,
    })
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn blobs() -> Array2<f64> {
        array![
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [10.0, 10.0],
            [10.1, 10.0],
            [10.0, 10.1],
        ]
    }

    #[test]
    fn test_k_candidates_range() {
        assert!(k_candidates(2).is_empty());
        assert_eq!(k_candidates(5), vec![2, 3, 4]);
        assert_eq!(k_candidates(500).last(), Some(&99));
    }

    #[test]
    fn test_explicit_k_separates_blobs() {
        let outcome = cluster_kmeans(&blobs(), Some(2), &CancelFlag::new()).unwrap();
        assert_eq!(outcome.k, 2);
        assert!(outcome.sweep.is_empty());
        let l = &outcome.labels;
        assert_eq!(l[0], l[1]);
        assert_eq!(l[0], l[2]);
        assert_eq!(l[3], l[4]);
        assert_ne!(l[0], l[3]);
    }

    #[test]
    fn test_explicit_k_out_of_range() {
        let data = array![[1.0], [1.0], [2.0]];
        assert!(matches!(
            cluster_kmeans(&data, Some(3), &CancelFlag::new()),
            Err(PipelineError::InvalidConfiguration { field: "k", .. })
        ));
        assert!(cluster_kmeans(&data, Some(0), &CancelFlag::new()).is_err());
    }

    #[test]
    fn test_sweep_finds_two_blobs() {
        let outcome = cluster_kmeans(&blobs(), None, &CancelFlag::new()).unwrap();
        assert_eq!(outcome.k, 2);
        assert_eq!(outcome.sweep.len(), 4);
    }

    #[test]
    fn test_too_few_vectors_for_sweep() {
        let data = array![[0.0], [1.0]];
        assert!(matches!(
            cluster_kmeans(&data, None, &CancelFlag::new()),
            Err(PipelineError::InsufficientData { .. })
        ));
    }
}
