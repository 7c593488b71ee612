// TF-IDF keyword ranking for topic labels.
//
// Uses the `keyword_extraction` crate. Each token list (one sentence) is
// treated as a separate document for IDF computation, so terms that appear
// in every sentence of a cluster get downweighted while terms distinctive to
// a few sentences are boosted.

use anyhow::Result;
use keyword_extraction::tf_idf::{TfIdf, TfIdfParams};
use stop_words::{get, LANGUAGE};
use tracing::debug;

use super::traits::TopicExtractor;

/// TF-IDF based topic extractor — the default labeler.
///
/// Zero model files, runs locally, deterministic for identical input.
pub struct KeywordExtractor {
    stop_words: Vec<String>,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self {
            stop_words: get(LANGUAGE::English),
        }
    }
}

impl TopicExtractor for KeywordExtractor {
    fn top_terms(&self, token_lists: &[Vec<String>], n: usize) -> Result<Vec<String>> {
        let documents: Vec<String> = token_lists
            .iter()
            .filter(|tokens| !tokens.is_empty())
            .map(|tokens| tokens.join(" "))
            .collect();

        if documents.is_empty() || n == 0 {
            return Ok(Vec::new());
        }

        let params = TfIdfParams::UnprocessedDocuments(&documents, &self.stop_words, None);
        let tfidf = TfIdf::new(params);
        let ranked: Vec<(String, f32)> = tfidf.get_ranked_word_scores(n);

        debug!(
            documents = documents.len(),
            terms = ranked.len(),
            "Ranked topic terms"
        );

        Ok(ranked.into_iter().map(|(word, _)| word).collect())
    }
}
