// Corpus — documents, sentences, and the tokenization that produces them.

pub mod import;
pub mod models;
pub mod preprocess;
pub mod traits;
