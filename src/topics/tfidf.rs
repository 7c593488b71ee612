// Term × document TF-IDF matrix.
//
// Weighting follows the classic bag-of-words model: raw term count times
// log2(N / df), then each document column is L2-normalized. A term that
// occurs in every document gets weight zero everywhere but keeps its id, so
// vocabulary lookups still succeed for it.
//
// The matrix serves three consumers: the phrase scorer (document-specific or
// corpus-wide term importance), the TF-IDF and SVD embedders (term rows), and
// corpus statistics for diagnostics.

use std::collections::HashMap;

use ndarray::{Array2, ArrayView1, Axis};
use tracing::debug;

/// Dense TF-IDF weights with rows = terms and columns = documents.
#[derive(Debug, Clone)]
pub struct TfIdfMatrix {
    vocab: HashMap<String, usize>,
    terms: Vec<String>,
    weights: Array2<f64>,
}

impl TfIdfMatrix {
    /// Build the matrix from tokenized documents. Term ids follow first appearance.
    pub fn build(documents: &[Vec<String>]) -> Self {
        let mut vocab: HashMap<String, usize> = HashMap::new();
        let mut terms: Vec<String> = Vec::new();

        for doc in documents {
            for token in doc {
                if !vocab.contains_key(token) {
                    vocab.insert(token.clone(), terms.len());
                    terms.push(token.clone());
                }
            }
        }

        let n_terms = terms.len();
        let n_docs = documents.len();
        let mut counts = Array2::<f64>::zeros((n_terms, n_docs));
        for (doc_ix, doc) in documents.iter().enumerate() {
            for token in doc {
                counts[[vocab[token], doc_ix]] += 1.0;
            }
        }

        // Document frequency per term
        let df: Vec<f64> = counts
            .axis_iter(Axis(0))
            .map(|row| row.iter().filter(|&&c| c > 0.0).count() as f64)
            .collect();

        let mut weights = counts;
        for (term_ix, mut row) in weights.axis_iter_mut(Axis(0)).enumerate() {
            let idf = if df[term_ix] > 0.0 {
                (n_docs as f64 / df[term_ix]).log2()
            } else {
                0.0
            };
            row.mapv_inplace(|count| count * idf);
        }

        for mut column in weights.axis_iter_mut(Axis(1)) {
            let norm = column.iter().map(|w| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                column.mapv_inplace(|w| w / norm);
            }
        }

        debug!(terms = n_terms, documents = n_docs, "Built TF-IDF matrix");

        Self {
            vocab,
            terms,
            weights,
        }
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn num_docs(&self) -> usize {
        self.weights.ncols()
    }

    pub fn term_id(&self, token: &str) -> Option<usize> {
        self.vocab.get(token).copied()
    }

    pub fn term(&self, term_id: usize) -> Option<&str> {
        self.terms.get(term_id).map(String::as_str)
    }

    pub fn vocabulary(&self) -> &HashMap<String, usize> {
        &self.vocab
    }

    /// TF-IDF weight of a term in one document. Out-of-range ids give 0.
    pub fn weight(&self, term_id: usize, doc_id: usize) -> f64 {
        self.weights.get((term_id, doc_id)).copied().unwrap_or(0.0)
    }

    /// The term's weights across every document.
    pub fn row(&self, term_id: usize) -> ArrayView1<'_, f64> {
        self.weights.row(term_id)
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.weights
    }

    /// Highest weight each term reaches in any document.
    pub fn term_max(&self) -> Vec<f64> {
        self.weights
            .axis_iter(Axis(0))
            .map(|row| row.iter().copied().fold(0.0_f64, f64::max))
            .collect()
    }

    /// Mean weight of each term across all documents.
    pub fn term_mean(&self) -> Vec<f64> {
        let n_docs = self.num_docs();
        if n_docs == 0 {
            return vec![0.0; self.num_terms()];
        }
        self.weights
            .axis_iter(Axis(0))
            .map(|row| row.sum() / n_docs as f64)
            .collect()
    }
}
