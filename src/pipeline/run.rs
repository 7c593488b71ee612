// End-to-end run: TF-IDF → phrases → vectors → clusters → topic labels.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::info;

use super::stages;
use crate::clustering::sweep::CancelFlag;
use crate::clustering::{ClusterOutcome, ClusterParameter};
use crate::config::PipelineConfig;
use crate::corpus::models::{Corpus, Sentence};
use crate::error::PipelineError;
use crate::scoring::sentiment::SentimentScorer;
use crate::topics::labels::{cluster_topics, doc_topics};
use crate::topics::traits::TopicExtractor;

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Sentences that reached clustering, each with phrase, vector, and cluster
    pub clustered: Vec<Sentence>,
    pub total_sentences: usize,
    pub with_phrase: usize,
    /// Sentences dropped for having a zero phrase vector (or no phrase)
    pub removed: usize,
    pub outcome: ClusterOutcome,
    pub cluster_topics: BTreeMap<usize, Vec<String>>,
    pub doc_topics: BTreeMap<usize, Vec<String>>,
}

impl RunResult {
    pub fn cluster_count(&self) -> usize {
        self.cluster_topics.len()
    }

    /// Sentences of one cluster, in corpus order.
    pub fn cluster_members(&self, cluster: usize) -> impl Iterator<Item = &Sentence> {
        self.clustered
            .iter()
            .filter(move |s| s.cluster == Some(cluster))
    }
}

/// The collaborators a run needs besides its configuration.
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    sentiment: &'a dyn SentimentScorer,
    extractor: &'a dyn TopicExtractor,
    cancel: CancelFlag,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        sentiment: &'a dyn SentimentScorer,
        extractor: &'a dyn TopicExtractor,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            config,
            sentiment,
            extractor,
            cancel,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        self.config
    }

    /// Run every stage over `corpus`, using `background` as the TF-IDF
    /// corpus (together with the input when configured).
    pub fn run(&self, corpus: &Corpus, background: Option<&Corpus>) -> Result<RunResult> {
        let matrix = stages::build_tfidf(corpus, background, self.config.include_input_in_tfidf)?;

        let scored = stages::score_phrases(
            corpus.sentences.clone(),
            &matrix,
            self.config,
            self.sentiment,
        );
        let total_sentences = scored.len();
        let with_phrase = scored.iter().filter(|s| s.phrase.is_some()).count();

        self.check_cancelled()?;
        let embedder = stages::build_embedder(
            &self.config.embedding,
            &matrix,
            &corpus.document_tokens(),
            &self.cancel,
        )?;
        self.check_cancelled()?;
        let filtered = stages::embed_phrases(scored, embedder.as_ref(), self.config.aggregation);
        info!(removed = filtered.removed, "{} sentences removed", filtered.removed);

        self.check_cancelled()?;
        let (clustered, outcome) =
            stages::cluster_sentences(filtered.kept, &self.config.clustering, &self.cancel)
                .context("Clustering failed")?;

        self.check_cancelled()?;
        self.label(corpus, clustered, outcome, total_sentences, with_phrase, filtered.removed)
    }

    /// Re-cluster the sentences of an earlier run with a fixed parameter.
    pub fn recluster(&self, corpus: &Corpus, previous: RunResult, parameter: ClusterParameter) -> Result<RunResult> {
        let strategy = self.config.clustering.with_parameter(parameter)?;
        self.check_cancelled()?;
        let (clustered, outcome) =
            stages::reassign_clusters(previous.clustered, &strategy, &self.cancel)
                .context("Re-clustering failed")?;

        self.check_cancelled()?;
        self.label(
            corpus,
            clustered,
            outcome,
            previous.total_sentences,
            previous.with_phrase,
            previous.removed,
        )
    }

    fn label(
        &self,
        corpus: &Corpus,
        clustered: Vec<Sentence>,
        outcome: ClusterOutcome,
        total_sentences: usize,
        with_phrase: usize,
        removed: usize,
    ) -> Result<RunResult> {
        let n = self.config.topic_terms;
        let cluster_topics = cluster_topics(&clustered, self.extractor, n)?;
        let doc_topics = doc_topics(&corpus.sentences, self.extractor, n)?;

        Ok(RunResult {
            clustered,
            total_sentences,
            with_phrase,
            removed,
            outcome,
            cluster_topics,
            doc_topics,
        })
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled.into());
        }
        Ok(())
    }
}
