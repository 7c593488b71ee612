// Embedder trait — the token-vector lookup every backend provides.

use ndarray::ArrayView1;

/// Maps a token to a fixed-dimension vector.
pub trait Embedder {
    /// Length of every vector this embedder returns.
    fn dimension(&self) -> usize;

    /// Vector for `token`, or `None` when it is out of vocabulary.
    fn token_vector(&self, token: &str) -> Option<ArrayView1<'_, f64>>;

    /// Whether a token repeated within one phrase is counted once.
    ///
    /// Term-matrix backends look phrases up as a bag of term ids, so repeats
    /// collapse. Word-vector backends sum every occurrence.
    fn distinct_tokens(&self) -> bool {
        false
    }
}
