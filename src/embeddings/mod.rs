// Embeddings — token vectors and the phrase vectors summed from them.
//
// Every backend answers one question: "what is the vector for this token?"
// The assembler turns those answers into one vector per sentence phrase.

pub mod assemble;
pub mod local;
pub mod tfidf;
pub mod traits;
pub mod word2vec;

use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;

/// Which token-vector backend to use.
///
/// `umap` is a known method name for a backend this crate does not ship, so
/// it is rejected like any other unknown name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingMethod {
    /// Rows of the TF-IDF matrix
    #[default]
    Tfidf,
    /// Truncated SVD of the TF-IDF matrix
    Svd,
    /// Word vectors loaded from a word2vec file
    Pretrained,
    /// Skip-gram word vectors trained on the input documents
    Local,
}

impl FromStr for EmbeddingMethod {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tfidf" | "tf-idf" => Ok(EmbeddingMethod::Tfidf),
            "svd" => Ok(EmbeddingMethod::Svd),
            "pretrained" => Ok(EmbeddingMethod::Pretrained),
            "local" => Ok(EmbeddingMethod::Local),
            _ => Err(PipelineError::invalid("embedding method", s)),
        }
    }
}

impl fmt::Display for EmbeddingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EmbeddingMethod::Tfidf => "tfidf",
            EmbeddingMethod::Svd => "svd",
            EmbeddingMethod::Pretrained => "pretrained",
            EmbeddingMethod::Local => "local",
        };
        write!(f, "{name}")
    }
}
