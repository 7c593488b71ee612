// Parameter sweep shared by both clustering strategies.
//
// Each candidate parameter is clustered and scored by silhouette; the first
// candidate reaching the maximum wins (strict `>` while scanning in order).
// Candidates whose clustering leaves the silhouette undefined are recorded
// with no score and skipped. The cancel flag is checked before every
// candidate, which is the only place a long sweep can be interrupted.

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array2;
use serde::Serialize;
use tracing::{debug, info};

use super::distinct_rows;
use super::silhouette::silhouette_score;
use crate::error::{PipelineError, Result};

/// Minimum number of vectors for silhouette-based selection.
pub const MIN_SWEEP_VECTORS: usize = 3;

/// Shared cancellation signal, cheap to clone across threads.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Score of one candidate; `None` when the silhouette was undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepPoint<P> {
    pub parameter: P,
    pub score: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SweepResult<P> {
    pub best: P,
    pub best_score: f64,
    /// Labels produced for `best`, so the winner need not be refit
    pub labels: Vec<usize>,
    pub points: Vec<SweepPoint<P>>,
}

/// Cluster `data` once per candidate and keep the best silhouette.
///
/// `cluster_for` returns `Ok(None)` when a candidate cannot be evaluated
/// (for example k larger than the number of distinct vectors).
pub fn sweep_select<P, F>(
    data: &Array2<f64>,
    candidates: Vec<P>,
    cancel: &CancelFlag,
    label: &str,
    mut cluster_for: F,
) -> Result<SweepResult<P>>
where
    P: Copy + Display,
    F: FnMut(P) -> Result<Option<Vec<usize>>>,
{
    let n = data.nrows();
    if n < MIN_SWEEP_VECTORS {
        return Err(PipelineError::InsufficientData {
            needed: MIN_SWEEP_VECTORS,
            found: n,
        });
    }

    let pb = ProgressBar::new(candidates.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {msg} [{bar:30}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message(label.to_string());

    let mut points = Vec::with_capacity(candidates.len());
    let mut best: Option<(P, f64, Vec<usize>)> = None;

    for parameter in candidates {
        if cancel.is_cancelled() {
            pb.abandon();
            return Err(PipelineError::Cancelled);
        }

        let score = match cluster_for(parameter)? {
            Some(labels) => {
                let score = silhouette_score(data, &labels);
                if let Some(s) = score {
                    if best.as_ref().map_or(true, |(_, b, _)| s > *b) {
                        best = Some((parameter, s, labels));
                    }
                }
                score
            }
            None => None,
        };

        debug!(%parameter, ?score, "Sweep candidate");
        points.push(SweepPoint { parameter, score });
        pb.inc(1);
    }
    pb.finish_and_clear();

    let Some((best, best_score, labels)) = best else {
        return Err(PipelineError::InsufficientData {
            needed: MIN_SWEEP_VECTORS,
            found: distinct_rows(data),
        });
    };

    info!(sweep = label, %best, score = best_score, "Selected parameter");
    Ok(SweepResult {
        best,
        best_score,
        labels,
        points,
    })
}
