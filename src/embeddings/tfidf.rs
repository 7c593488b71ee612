// Term-matrix embedders: TF-IDF rows and their truncated SVD.
//
// A token's vector is its row in the term × document matrix (or in the
// reduced U·Σ matrix for SVD). Phrases are looked up as a bag of term ids,
// so a token repeated inside one phrase contributes its row once.
//
// The SVD is computed by power iteration on AᵀA with Gram-Schmidt
// deflation. The document dimension is the small one in practice, so the
// Gram matrix stays cheap. Starting vectors come from a fixed seed and each
// component's sign is normalized, which makes the output reproducible.

use std::collections::HashMap;

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use super::traits::Embedder;
use crate::error::{PipelineError, Result};
use crate::topics::tfidf::TfIdfMatrix;

/// Seed for the power-iteration starting vectors.
pub const SVD_SEED: u64 = 42;

const MAX_ITERATIONS: usize = 500;
const CONVERGENCE: f64 = 1e-10;
const ZERO_NORM: f64 = 1e-12;

/// Token vectors taken from rows of a term matrix.
#[derive(Debug, Clone)]
pub struct TermRowEmbedder {
    vocab: HashMap<String, usize>,
    rows: Array2<f64>,
}

impl TermRowEmbedder {
    /// Raw TF-IDF rows; dimension is the number of TF-IDF documents.
    pub fn from_tfidf(matrix: &TfIdfMatrix) -> Self {
        Self {
            vocab: matrix.vocabulary().clone(),
            rows: matrix.matrix().clone(),
        }
    }

    /// Rows of U·Σ from a rank-`dimensions` truncated SVD.
    pub fn svd(matrix: &TfIdfMatrix, dimensions: usize) -> Result<Self> {
        let rows = truncated_svd(matrix.matrix(), dimensions)?;
        Ok(Self {
            vocab: matrix.vocabulary().clone(),
            rows,
        })
    }
}

impl Embedder for TermRowEmbedder {
    fn dimension(&self) -> usize {
        self.rows.ncols()
    }

    fn token_vector(&self, token: &str) -> Option<ArrayView1<'_, f64>> {
        let id = *self.vocab.get(token)?;
        (id < self.rows.nrows()).then(|| self.rows.row(id))
    }

    fn distinct_tokens(&self) -> bool {
        true
    }
}

/// Project the rows of `a` onto its top `components` right singular vectors,
/// returning U·Σ.
///
/// The result has `min(components, rows, cols)` columns.
pub fn truncated_svd(a: &Array2<f64>, components: usize) -> Result<Array2<f64>> {
    if components == 0 {
        return Err(PipelineError::invalid("dimensions", "0"));
    }

    let (n_rows, n_cols) = a.dim();
    let rank = components.min(n_rows).min(n_cols);
    if rank == 0 {
        return Err(PipelineError::InsufficientData {
            needed: 1,
            found: 0,
        });
    }
    if rank < components {
        warn!(requested = components, used = rank, "SVD dimensions capped by matrix rank");
    }

    let gram = a.t().dot(a);
    let mut rng = StdRng::seed_from_u64(SVD_SEED);
    let mut basis: Vec<Array1<f64>> = Vec::with_capacity(rank);

    for component in 0..rank {
        let mut v: Array1<f64> = (0..n_cols).map(|_| rng.random_range(-1.0..1.0)).collect();
        orthogonalize(&mut v, &basis);
        normalize(&mut v);

        let mut iterations = 0;
        while iterations < MAX_ITERATIONS {
            iterations += 1;
            let mut next = gram.dot(&v);
            orthogonalize(&mut next, &basis);
            if !normalize(&mut next) {
                // Remaining spectrum is zero
                v = next;
                break;
            }
            let delta: f64 = (&next - &v).mapv(f64::abs).sum();
            v = next;
            if delta < CONVERGENCE {
                break;
            }
        }

        debug!(component, iterations, "SVD component converged");
        basis.push(v);
    }

    let mut projected = Array2::<f64>::zeros((n_rows, rank));
    for (c, v) in basis.iter().enumerate() {
        let mut column = a.dot(v);
        if let Some(&pivot) = column
            .iter()
            .max_by(|x, y| x.abs().total_cmp(&y.abs()))
        {
            if pivot < 0.0 {
                column.mapv_inplace(|x| -x);
            }
        }
        projected.column_mut(c).assign(&column);
    }

    Ok(projected)
}

fn orthogonalize(v: &mut Array1<f64>, basis: &[Array1<f64>]) {
    for b in basis {
        let projection = v.dot(b);
        v.scaled_add(-projection, b);
    }
}

/// Scale to unit length. Returns false (leaving zeros) for a null vector.
fn normalize(v: &mut Array1<f64>) -> bool {
    let norm = v.dot(v).sqrt();
    if norm < ZERO_NORM {
        v.fill(0.0);
        return false;
    }
    v.mapv_inplace(|x| x / norm);
    true
}
