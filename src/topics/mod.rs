// Topic extraction — TF-IDF term weighting and topic labels for clusters
// and documents.

pub mod keywords;
pub mod labels;
pub mod tfidf;
pub mod traits;
