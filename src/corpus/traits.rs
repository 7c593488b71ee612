// Tokenizer trait — swap-ready abstraction over text preprocessing.
//
// The pipeline only needs parallel token / part-of-speech sequences per
// sentence. The default implementation in `preprocess` is rule-based; a
// model-backed tagger can be dropped in without touching the later stages.

/// One sentence as produced by a tokenizer.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizedSentence {
    /// Normalized tokens (lemmatized, lowercase, stop words removed)
    pub tokens: Vec<String>,
    /// `(surface word, Penn tag)` per kept token, parallel to `tokens`
    pub pos_tags: Vec<(String, String)>,
    /// The original sentence text
    pub raw: String,
}

impl TokenizedSentence {
    /// Just the tag column of `pos_tags`.
    pub fn tags(&self) -> Vec<String> {
        self.pos_tags.iter().map(|(_, tag)| tag.clone()).collect()
    }
}

/// Trait for splitting raw document text into tokenized sentences.
pub trait Tokenizer {
    fn tokenize(&self, raw_text: &str) -> Vec<TokenizedSentence>;
}
