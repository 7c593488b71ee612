// Distance metrics and pairwise distance matrices.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, ArrayView1};

use crate::error::PipelineError;

/// Metric used to build the HAC distance matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    /// `1 - cosine similarity`
    Cosine,
    Manhattan,
    Chebyshev,
}

impl FromStr for DistanceMetric {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "euclidean" | "l2" => Ok(DistanceMetric::Euclidean),
            "cosine" => Ok(DistanceMetric::Cosine),
            "manhattan" | "cityblock" | "l1" => Ok(DistanceMetric::Manhattan),
            "chebyshev" => Ok(DistanceMetric::Chebyshev),
            _ => Err(PipelineError::invalid("distance metric", s)),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Manhattan => "manhattan",
            DistanceMetric::Chebyshev => "chebyshev",
        };
        write!(f, "{name}")
    }
}

impl DistanceMetric {
    pub fn distance(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        match self {
            DistanceMetric::Euclidean => euclidean(a, b),
            DistanceMetric::Cosine => {
                let norm_a = a.dot(&a).sqrt();
                let norm_b = b.dot(&b).sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    // Zero vectors have similarity 0 with everything
                    return 1.0;
                }
                (1.0 - a.dot(&b) / (norm_a * norm_b)).max(0.0)
            }
            DistanceMetric::Manhattan => a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum(),
            DistanceMetric::Chebyshev => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y).abs())
                .fold(0.0, f64::max),
        }
    }
}

pub fn euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Symmetric `n x n` distance matrix over the rows of `data`, zero diagonal.
pub fn pairwise_distances(data: &Array2<f64>, metric: DistanceMetric) -> Array2<f64> {
    let n = data.nrows();
    let mut out = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let d = metric.distance(data.row(i), data.row(j));
            out[[i, j]] = d;
            out[[j, i]] = d;
        }
    }
    out
}
