// Clustering — K-means and Ward HAC over phrase vectors, each with a
// silhouette sweep for its free parameter.

pub mod distance;
pub mod hac;
pub mod kmeans;
pub mod silhouette;
pub mod sweep;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use serde::Serialize;

use self::distance::DistanceMetric;
use self::sweep::CancelFlag;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusteringMethod {
    #[default]
    KMeans,
    Hac,
}

impl FromStr for ClusteringMethod {
    type Err = PipelineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kmeans" | "k-means" => Ok(ClusteringMethod::KMeans),
            "hac" | "hierarchical" => Ok(ClusteringMethod::Hac),
            _ => Err(PipelineError::invalid("clustering method", s)),
        }
    }
}

impl fmt::Display for ClusteringMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusteringMethod::KMeans => write!(f, "kmeans"),
            ClusteringMethod::Hac => write!(f, "hac"),
        }
    }
}

/// A clustering method with its parameter, fixed or left to the sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClusteringStrategy {
    KMeans {
        k: Option<usize>,
    },
    Hac {
        metric: DistanceMetric,
        height: Option<f64>,
    },
}

/// The parameter a clustering run used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ClusterParameter {
    K(usize),
    Height(f64),
}

impl fmt::Display for ClusterParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterParameter::K(k) => write!(f, "k={k}"),
            ClusterParameter::Height(h) => write!(f, "height={h}"),
        }
    }
}

/// One sweep candidate, in a method-independent form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepScore {
    pub parameter: ClusterParameter,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterOutcome {
    /// One label per input row
    pub labels: Vec<usize>,
    pub parameter: ClusterParameter,
    /// Empty when the parameter was given explicitly
    pub sweep: Vec<SweepScore>,
}

impl ClusteringStrategy {
    pub fn method(&self) -> ClusteringMethod {
        match self {
            ClusteringStrategy::KMeans { .. } => ClusteringMethod::KMeans,
            ClusteringStrategy::Hac { .. } => ClusteringMethod::Hac,
        }
    }

    /// Whether the parameter is left to the silhouette sweep.
    pub fn is_auto(&self) -> bool {
        match self {
            ClusteringStrategy::KMeans { k } => k.is_none(),
            ClusteringStrategy::Hac { height, .. } => height.is_none(),
        }
    }

    /// The same strategy with its parameter fixed to `parameter`.
    pub fn with_parameter(self, parameter: ClusterParameter) -> Result<Self> {
        match (self, parameter) {
            (ClusteringStrategy::KMeans { .. }, ClusterParameter::K(k)) => {
                Ok(ClusteringStrategy::KMeans { k: Some(k) })
            }
            (ClusteringStrategy::Hac { metric, .. }, ClusterParameter::Height(h)) => {
                Ok(ClusteringStrategy::Hac {
                    metric,
                    height: Some(h),
                })
            }
            (strategy, parameter) => Err(PipelineError::invalid(
                "cluster parameter",
                format!("{parameter} for {}", strategy.method()),
            )),
        }
    }

    pub fn cluster(&self, data: &Array2<f64>, cancel: &CancelFlag) -> Result<ClusterOutcome> {
        match *self {
            ClusteringStrategy::KMeans { k } => {
                let outcome = kmeans::cluster_kmeans(data, k, cancel)?;
                Ok(ClusterOutcome {
                    labels: outcome.labels,
                    parameter: ClusterParameter::K(outcome.k),
                    sweep: outcome
                        .sweep
                        .into_iter()
                        .map(|p| SweepScore {
                            parameter: ClusterParameter::K(p.parameter),
                            score: p.score,
                        })
                        .collect(),
                })
            }
            ClusteringStrategy::Hac { metric, height } => {
                let outcome = hac::cluster_hac(data, metric, height, cancel)?;
                Ok(ClusterOutcome {
                    labels: outcome.labels,
                    parameter: ClusterParameter::Height(outcome.height),
                    sweep: outcome
                        .sweep
                        .into_iter()
                        .map(|p| SweepScore {
                            parameter: ClusterParameter::Height(p.parameter),
                            score: p.score,
                        })
                        .collect(),
                })
            }
        }
    }
}

/// Number of distinct rows (bitwise equality of the values).
pub fn distinct_rows(data: &Array2<f64>) -> usize {
    data.rows()
        .into_iter()
        .map(|row| row.iter().map(|x| x.to_bits()).collect::<Vec<u64>>())
        .collect::<HashSet<_>>()
        .len()
}
