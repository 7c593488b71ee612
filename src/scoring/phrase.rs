// Sliding-window phrase selection.
//
// For every start offset, a window of `window_size` tokens is scored as
//
//   (sum of term importance, x3 for adjectives/adverbs) * (1 + |polarity|)
//
// and the highest-scoring window becomes the sentence's phrase. Tokens
// missing from the term vocabulary contribute nothing. Comparison is strict,
// so on a tie the earliest window wins.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use super::sentiment::SentimentScorer;
use crate::corpus::models::{Phrase, Sentence};
use crate::error::PipelineError;
use crate::topics::tfidf::TfIdfMatrix;

/// Penn tags that receive the part-of-speech boost.
pub const ADJ_ADV_TAGS: &[&str] = &["JJ", "JJR", "JJS", "RB", "RBR", "RBS"];

/// Multiplier applied to adjective/adverb term importance.
pub const POS_BOOST: f64 = 3.0;

pub const DEFAULT_WINDOW_SIZE: usize = 6;

/// How much of a sentence a phrase may cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSize {
    /// Slide a window of exactly this many tokens
    Fixed(usize),
    /// The phrase is the whole token list
    WholeSentence,
}

impl Default for WindowSize {
    fn default() -> Self {
        WindowSize::Fixed(DEFAULT_WINDOW_SIZE)
    }
}

/// Which corpus-wide statistic stands in for a term's importance when the
/// input documents are not part of the TF-IDF corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TermStatistic {
    #[default]
    Max,
    Mean,
}

impl FromStr for TermStatistic {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "max" => Ok(TermStatistic::Max),
            "mean" | "avg" | "average" => Ok(TermStatistic::Mean),
            _ => Err(PipelineError::invalid("term statistic", s)),
        }
    }
}

impl fmt::Display for TermStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermStatistic::Max => write!(f, "max"),
            TermStatistic::Mean => write!(f, "mean"),
        }
    }
}

/// Source of per-token importance for phrase scoring.
pub trait TermImportance {
    /// Importance of `token` in document `doc_id`, or `None` when the token
    /// is not in the vocabulary.
    fn importance(&self, token: &str, doc_id: usize) -> Option<f64>;
}

enum WeightSource {
    Document,
    Corpus(Vec<f64>),
}

/// Term importance backed by a TF-IDF matrix.
pub struct TermWeights<'a> {
    matrix: &'a TfIdfMatrix,
    source: WeightSource,
}

impl<'a> TermWeights<'a> {
    /// Exact TF-IDF cell for `(token, doc_id)`. Only meaningful when the input
    /// documents are the first columns of the matrix.
    pub fn document_specific(matrix: &'a TfIdfMatrix) -> Self {
        Self {
            matrix,
            source: WeightSource::Document,
        }
    }

    /// One precomputed value per term, ignoring the document.
    pub fn corpus_wide(matrix: &'a TfIdfMatrix, statistic: TermStatistic) -> Self {
        let stats = match statistic {
            TermStatistic::Max => matrix.term_max(),
            TermStatistic::Mean => matrix.term_mean(),
        };
        Self {
            matrix,
            source: WeightSource::Corpus(stats),
        }
    }
}

impl TermImportance for TermWeights<'_> {
    fn importance(&self, token: &str, doc_id: usize) -> Option<f64> {
        let term_id = self.matrix.term_id(token)?;
        match &self.source {
            WeightSource::Document => Some(self.matrix.weight(term_id, doc_id)),
            WeightSource::Corpus(stats) => stats.get(term_id).copied(),
        }
    }
}

/// Picks the best phrase for each sentence.
pub struct PhraseScorer<'a> {
    importance: &'a dyn TermImportance,
    sentiment: &'a dyn SentimentScorer,
}

impl<'a> PhraseScorer<'a> {
    pub fn new(importance: &'a dyn TermImportance, sentiment: &'a dyn SentimentScorer) -> Self {
        Self {
            importance,
            sentiment,
        }
    }

    /// Score one candidate window.
    pub fn score_window(&self, tokens: &[String], pos_tags: &[String], doc_id: usize) -> f64 {
        let weight = 1.0 + self.sentiment.polarity(&tokens.join(" ")).abs();

        let raw: f64 = tokens
            .iter()
            .zip(pos_tags)
            .filter_map(|(token, tag)| {
                let importance = self.importance.importance(token, doc_id)?;
                let multiplier = if ADJ_ADV_TAGS.contains(&tag.as_str()) {
                    POS_BOOST
                } else {
                    1.0
                };
                Some(importance * multiplier)
            })
            .sum();

        raw * weight
    }

    /// Find the highest-scoring window of a sentence.
    ///
    /// Returns `None` when the sentence is shorter than the window (or empty
    /// in whole-sentence mode).
    pub fn score_sentence(
        &self,
        tokens: &[String],
        pos_tags: &[String],
        window: WindowSize,
        doc_id: usize,
    ) -> Option<Phrase> {
        let window_size = match window {
            WindowSize::Fixed(size) => size,
            WindowSize::WholeSentence => tokens.len(),
        };
        if window_size == 0 || tokens.len() < window_size || pos_tags.len() != tokens.len() {
            return None;
        }

        let mut best: Option<Phrase> = None;

        for offset in 0..=tokens.len() - window_size {
            let span = offset..offset + window_size;
            let score = self.score_window(&tokens[span.clone()], &pos_tags[span.clone()], doc_id);

            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(Phrase {
                    tokens: tokens[span.clone()].to_vec(),
                    pos_tags: pos_tags[span].to_vec(),
                    offset,
                    score,
                });
            }
        }

        best
    }

    /// Attach a phrase to every sentence, returning a new collection.
    pub fn score_all(&self, sentences: Vec<Sentence>, window: WindowSize) -> Vec<Sentence> {
        let scored: Vec<Sentence> = sentences
            .into_iter()
            .map(|sent| {
                let phrase = self.score_sentence(&sent.tokens, &sent.pos_tags, window, sent.doc_id);
                sent.with_phrase(phrase)
            })
            .collect();

        let with_phrase = scored.iter().filter(|s| s.phrase.is_some()).count();
        debug!(
            sentences = scored.len(),
            with_phrase,
            ?window,
            "Scored phrases"
        );

        scored
    }
}
