// Data models — the records that flow through the pipeline.
//
// A Sentence is created once at import and never mutated afterwards. Later
// stages attach their results (phrase, vector, cluster) by building a new
// value with `with_*`, so every stage can return a fresh collection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Globally unique sentence identifier, rendered as `doc.{doc_id}.sent.{sent_id}`.
///
/// This is the join key between cluster assignments and gold labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SentenceId {
    pub doc_id: usize,
    pub sent_id: usize,
}

impl SentenceId {
    pub fn new(doc_id: usize, sent_id: usize) -> Self {
        Self { doc_id, sent_id }
    }
}

impl fmt::Display for SentenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc.{}.sent.{}", self.doc_id, self.sent_id)
    }
}

impl FromStr for SentenceId {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        match parts.as_slice() {
            ["doc", doc, "sent", sent] => {
                let doc_id = doc.parse().map_err(|_| PipelineError::invalid("sentence id", s))?;
                let sent_id = sent.parse().map_err(|_| PipelineError::invalid("sentence id", s))?;
                Ok(Self::new(doc_id, sent_id))
            }
            _ => Err(PipelineError::invalid("sentence id", s)),
        }
    }
}

/// One imported document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: usize,
    /// File path or name column the document came from
    pub name: String,
    pub text: String,
}

/// The highest-scoring token window of a sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    pub tokens: Vec<String>,
    pub pos_tags: Vec<String>,
    /// Start offset of the window within the sentence's tokens
    pub offset: usize,
    pub score: f64,
}

impl Phrase {
    pub fn text(&self) -> String {
        self.tokens.join(" ")
    }
}

/// A tokenized sentence plus whatever the downstream stages have attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sentence {
    pub doc_id: usize,
    pub sent_id: usize,
    pub tokens: Vec<String>,
    /// Penn Treebank tag per token, parallel to `tokens`
    pub pos_tags: Vec<String>,
    /// Original sentence text (whitespace condensed)
    pub text: String,
    pub phrase: Option<Phrase>,
    pub vector: Option<Vec<f64>>,
    pub cluster: Option<usize>,
}

impl Sentence {
    /// Build a sentence, enforcing that tokens and tags line up.
    pub fn new(
        doc_id: usize,
        sent_id: usize,
        tokens: Vec<String>,
        pos_tags: Vec<String>,
        text: String,
    ) -> Result<Self> {
        if tokens.len() != pos_tags.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: tokens.len(),
                found: pos_tags.len(),
            });
        }
        Ok(Self {
            doc_id,
            sent_id,
            tokens,
            pos_tags,
            text,
            phrase: None,
            vector: None,
            cluster: None,
        })
    }

    pub fn id(&self) -> SentenceId {
        SentenceId::new(self.doc_id, self.sent_id)
    }

    pub fn with_phrase(self, phrase: Option<Phrase>) -> Self {
        Self { phrase, ..self }
    }

    pub fn with_vector(self, vector: Option<Vec<f64>>) -> Self {
        Self { vector, ..self }
    }

    pub fn with_cluster(self, cluster: Option<usize>) -> Self {
        Self { cluster, ..self }
    }

    /// Phrase text, or an empty string when no phrase was found.
    pub fn phrase_text(&self) -> String {
        self.phrase.as_ref().map(Phrase::text).unwrap_or_default()
    }
}

/// Imported documents and their sentences, in document then sentence order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    pub documents: Vec<Document>,
    pub sentences: Vec<Sentence>,
}

impl Corpus {
    /// Tokens per document, concatenated across sentences.
    pub fn document_tokens(&self) -> Vec<Vec<String>> {
        let mut docs = vec![Vec::new(); self.documents.len()];
        for sent in &self.sentences {
            if let Some(doc) = docs.get_mut(sent.doc_id) {
                doc.extend(sent.tokens.iter().cloned());
            }
        }
        docs
    }

    pub fn document_name(&self, doc_id: usize) -> &str {
        self.documents
            .get(doc_id)
            .map(|d| d.name.as_str())
            .unwrap_or("")
    }
}

/// Mean number of tokens per sentence, averaged per document first.
///
/// Documents without sentences are skipped in the per-document mean but
/// still count toward the divisor.
pub fn average_sentence_length(sentences: &[Sentence], doc_count: usize) -> f64 {
    if doc_count == 0 {
        return 0.0;
    }

    let mut per_doc: Vec<(usize, usize)> = vec![(0, 0); doc_count];
    for sent in sentences {
        if let Some(entry) = per_doc.get_mut(sent.doc_id) {
            entry.0 += sent.tokens.len();
            entry.1 += 1;
        }
    }

    let total: f64 = per_doc
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(tokens, count)| *tokens as f64 / *count as f64)
        .sum();

    total / doc_count as f64
}
