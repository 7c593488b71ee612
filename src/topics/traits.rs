// Topic extractor trait — swap-ready abstraction.
//
// Cluster and document labels only need "the top n terms of these token
// lists". The default implementation ranks terms with TF-IDF; an LDA or
// embeddings-based labeler can replace it without changing the pipeline.

use anyhow::Result;

/// Trait for picking representative terms from a group of tokenized texts.
pub trait TopicExtractor {
    /// Return up to `n` terms, most representative first.
    fn top_terms(&self, token_lists: &[Vec<String>], n: usize) -> Result<Vec<String>>;
}
