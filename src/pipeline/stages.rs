// Individual pipeline stages.
//
// TF-IDF corpus: input documents first (when included), then the background
// corpus. With the input first, a sentence's doc_id is also its TF-IDF
// column, which is what document-specific term weights rely on.

use anyhow::Context;
use tracing::{debug, info};

use crate::clustering::sweep::CancelFlag;
use crate::clustering::{ClusterOutcome, ClusteringStrategy};
use crate::config::{EmbeddingConfig, PipelineConfig};
use crate::corpus::models::{Corpus, Sentence};
use crate::embeddings::assemble::{filter_zero_vectors, vector_matrix, Aggregation, FilterOutcome, VectorAssembler};
use crate::embeddings::local;
use crate::embeddings::tfidf::TermRowEmbedder;
use crate::embeddings::traits::Embedder;
use crate::embeddings::word2vec::WordVectors;
use crate::error::{PipelineError, Result};
use crate::scoring::phrase::{PhraseScorer, TermWeights};
use crate::scoring::sentiment::SentimentScorer;
use crate::topics::tfidf::TfIdfMatrix;

/// Build the TF-IDF matrix over the input and/or background documents.
pub fn build_tfidf(
    input: &Corpus,
    background: Option<&Corpus>,
    include_input: bool,
) -> Result<TfIdfMatrix> {
    let mut documents = Vec::new();
    if include_input {
        documents.extend(input.document_tokens());
    }
    match background {
        Some(corpus) => documents.extend(corpus.document_tokens()),
        None if !include_input => {
            return Err(PipelineError::MissingDependency(
                "TF-IDF corpus (input documents are excluded from TF-IDF)".into(),
            ))
        }
        None => {}
    }

    if documents.is_empty() {
        return Err(PipelineError::InsufficientData {
            needed: 1,
            found: 0,
        });
    }

    let matrix = TfIdfMatrix::build(&documents);
    info!(
        terms = matrix.num_terms(),
        documents = matrix.num_docs(),
        include_input,
        "TF-IDF matrix ready"
    );
    Ok(matrix)
}

/// Attach the best phrase to each sentence.
pub fn score_phrases(
    sentences: Vec<Sentence>,
    matrix: &TfIdfMatrix,
    config: &PipelineConfig,
    sentiment: &dyn SentimentScorer,
) -> Vec<Sentence> {
    let weights = if config.include_input_in_tfidf {
        TermWeights::document_specific(matrix)
    } else {
        TermWeights::corpus_wide(matrix, config.term_statistic)
    };

    let scored = PhraseScorer::new(&weights, sentiment).score_all(sentences, config.window);
    let with_phrase = scored.iter().filter(|s| s.phrase.is_some()).count();
    info!(sentences = scored.len(), with_phrase, "Phrases scored");
    scored
}

/// Construct the configured token-vector backend. `documents` are the input
/// documents' tokens, which local word vectors are trained on.
pub fn build_embedder(
    embedding: &EmbeddingConfig,
    matrix: &TfIdfMatrix,
    documents: &[Vec<String>],
    cancel: &CancelFlag,
) -> anyhow::Result<Box<dyn Embedder>> {
    let embedder: Box<dyn Embedder> = match embedding {
        EmbeddingConfig::Tfidf => Box::new(TermRowEmbedder::from_tfidf(matrix)),
        EmbeddingConfig::Svd { dimensions } => Box::new(
            TermRowEmbedder::svd(matrix, *dimensions).context("Truncated SVD failed")?,
        ),
        EmbeddingConfig::Pretrained { path } => Box::new(WordVectors::load(path)?),
        EmbeddingConfig::Local { params } => Box::new(local::train(documents, *params, cancel)?),
    };
    debug!(method = %embedding.method(), dimension = embedder.dimension(), "Embedder ready");
    Ok(embedder)
}

/// Assemble phrase vectors and drop the sentences whose vector is zero.
pub fn embed_phrases(
    sentences: Vec<Sentence>,
    embedder: &dyn Embedder,
    aggregation: Aggregation,
) -> FilterOutcome {
    let assembler = VectorAssembler::new(embedder, aggregation);
    filter_zero_vectors(assembler.assemble_all(sentences))
}

/// Cluster sentence vectors and attach the labels.
pub fn cluster_sentences(
    sentences: Vec<Sentence>,
    strategy: &ClusteringStrategy,
    cancel: &CancelFlag,
) -> Result<(Vec<Sentence>, ClusterOutcome)> {
    let data = vector_matrix(&sentences)?;
    let outcome = strategy.cluster(&data, cancel)?;

    let clustered: Vec<Sentence> = sentences
        .into_iter()
        .zip(&outcome.labels)
        .map(|(sent, &label)| sent.with_cluster(Some(label)))
        .collect();

    let clusters = outcome
        .labels
        .iter()
        .collect::<std::collections::BTreeSet<_>>()
        .len();
    info!(
        method = %strategy.method(),
        parameter = %outcome.parameter,
        clusters,
        sentences = clustered.len(),
        "Clustering complete"
    );
    Ok((clustered, outcome))
}

/// Re-run clustering on sentences that already carry vectors, replacing any
/// earlier assignment. Sentences without a phrase or vector are dropped.
pub fn reassign_clusters(
    sentences: Vec<Sentence>,
    strategy: &ClusteringStrategy,
    cancel: &CancelFlag,
) -> Result<(Vec<Sentence>, ClusterOutcome)> {
    let surviving: Vec<Sentence> = sentences
        .into_iter()
        .filter(|s| s.phrase.is_some() && s.vector.is_some())
        .map(|s| s.with_cluster(None))
        .collect();
    cluster_sentences(surviving, strategy, cancel)
}
