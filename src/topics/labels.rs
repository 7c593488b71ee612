// Topic labels for clusters and documents.
//
// A cluster's label is derived from the union of its sentences' tokens; a
// document's label from all of its sentences. Sentences without a cluster
// contribute to document labels but not to cluster labels.

use std::collections::BTreeMap;

use anyhow::Result;
use tracing::debug;

use super::traits::TopicExtractor;
use crate::corpus::models::Sentence;

/// Top `n` terms per cluster id, ascending by cluster id.
pub fn cluster_topics(
    sentences: &[Sentence],
    extractor: &dyn TopicExtractor,
    n: usize,
) -> Result<BTreeMap<usize, Vec<String>>> {
    let mut grouped: BTreeMap<usize, Vec<Vec<String>>> = BTreeMap::new();
    for sent in sentences {
        if let Some(cluster) = sent.cluster {
            grouped.entry(cluster).or_default().push(sent.tokens.clone());
        }
    }

    let mut topics = BTreeMap::new();
    for (cluster, token_lists) in grouped {
        let terms = extractor.top_terms(&token_lists, n)?;
        debug!(cluster, sentences = token_lists.len(), terms = ?terms, "Cluster topics");
        topics.insert(cluster, terms);
    }
    Ok(topics)
}

/// Top `n` terms per document id, ascending by document id.
pub fn doc_topics(
    sentences: &[Sentence],
    extractor: &dyn TopicExtractor,
    n: usize,
) -> Result<BTreeMap<usize, Vec<String>>> {
    let mut grouped: BTreeMap<usize, Vec<Vec<String>>> = BTreeMap::new();
    for sent in sentences {
        grouped
            .entry(sent.doc_id)
            .or_default()
            .push(sent.tokens.clone());
    }

    let mut topics = BTreeMap::new();
    for (doc_id, token_lists) in grouped {
        topics.insert(doc_id, extractor.top_terms(&token_lists, n)?);
    }
    Ok(topics)
}
