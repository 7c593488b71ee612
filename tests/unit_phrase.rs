// Unit tests for phrase scoring.
//
// Covers the window scan (how many windows, which one wins), the
// adjective/adverb boost, sentiment weighting, and the two term-importance
// policies backed by a TF-IDF matrix.

use std::cell::Cell;
use std::collections::HashMap;

use medtop::scoring::phrase::{
    PhraseScorer, TermImportance, TermStatistic, TermWeights, WindowSize, ADJ_ADV_TAGS,
};
use medtop::scoring::sentiment::{LexiconSentiment, NeutralSentiment, SentimentScorer};
use medtop::topics::tfidf::TfIdfMatrix;

/// Neutral scorer that counts how often it is asked.
struct CountingSentiment {
    calls: Cell<usize>,
}

impl SentimentScorer for CountingSentiment {
    fn polarity(&self, _text: &str) -> f64 {
        self.calls.set(self.calls.get() + 1);
        0.0
    }
}

struct Fixed(HashMap<&'static str, f64>);

impl TermImportance for Fixed {
    fn importance(&self, token: &str, _doc_id: usize) -> Option<f64> {
        self.0.get(token).copied()
    }
}

fn strings(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

fn nouns(n: usize) -> Vec<String> {
    vec!["NN".to_string(); n]
}

// ============================================================
// Window scan
// ============================================================

#[test]
fn evaluates_exactly_l_minus_w_plus_one_windows() {
    let importance = Fixed(HashMap::new());
    let tokens = strings(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"]);

    for window in 1..=tokens.len() {
        let sentiment = CountingSentiment { calls: Cell::new(0) };
        let scorer = PhraseScorer::new(&importance, &sentiment);
        let phrase = scorer.score_sentence(&tokens, &nouns(tokens.len()), WindowSize::Fixed(window), 0);

        assert!(phrase.is_some());
        assert_eq!(sentiment.calls.get(), tokens.len() - window + 1, "window {window}");
    }
}

#[test]
fn window_longer_than_sentence_gives_no_phrase() {
    let importance = Fixed(HashMap::from([("pain", 5.0)]));
    let sentiment = CountingSentiment { calls: Cell::new(0) };
    let scorer = PhraseScorer::new(&importance, &sentiment);
    let tokens = strings(&["severe", "pain"]);

    let phrase = scorer.score_sentence(&tokens, &nouns(2), WindowSize::Fixed(6), 0);
    assert!(phrase.is_none());
    assert_eq!(sentiment.calls.get(), 0);
}

#[test]
fn phrase_has_window_length_and_offset() {
    let importance = Fixed(HashMap::from([("chest", 1.0), ("pain", 2.0)]));
    let scorer = PhraseScorer::new(&importance, &NeutralSentiment);
    let tokens = strings(&["nurse", "said", "chest", "pain", "was", "better"]);

    let phrase = scorer
        .score_sentence(&tokens, &nouns(6), WindowSize::Fixed(3), 0)
        .unwrap();
    assert_eq!(phrase.tokens.len(), 3);
    assert_eq!(phrase.pos_tags.len(), 3);
    assert_eq!(&tokens[phrase.offset..phrase.offset + 3], phrase.tokens.as_slice());
    assert!((phrase.score - 3.0).abs() < 1e-12);
}

#[test]
fn equal_scores_keep_lowest_offset() {
    let importance = Fixed(HashMap::from([("pain", 1.0)]));
    let scorer = PhraseScorer::new(&importance, &NeutralSentiment);
    let tokens = strings(&["pain", "x", "y", "pain"]);

    let phrase = scorer
        .score_sentence(&tokens, &nouns(4), WindowSize::Fixed(2), 0)
        .unwrap();
    assert_eq!(phrase.offset, 0);
}

// ============================================================
// Part-of-speech boost and sentiment weight
// ============================================================

#[test]
fn adjective_or_adverb_tag_never_lowers_score() {
    let importance = Fixed(HashMap::from([("calm", 0.4), ("room", 0.2)]));
    let scorer = PhraseScorer::new(&importance, &NeutralSentiment);
    let tokens = strings(&["calm", "room"]);

    for tag in ADJ_ADV_TAGS {
        let boosted = scorer.score_window(&tokens, &strings(&[tag, "NN"]), 0);
        let plain = scorer.score_window(&tokens, &strings(&["NN", "NN"]), 0);
        assert!(boosted >= plain, "{tag}: {boosted} < {plain}");
        assert!((boosted - (0.4 * 3.0 + 0.2)).abs() < 1e-12);
    }
}

#[test]
fn sentiment_weight_multiplies_raw_score() {
    let importance = Fixed(HashMap::from([("night", 1.0), ("terrible", 1.0)]));
    let lexicon = LexiconSentiment::default();
    let scorer = PhraseScorer::new(&importance, &lexicon);

    let neutral = scorer.score_window(&strings(&["night"]), &nouns(1), 0);
    let charged = scorer.score_window(&strings(&["terrible", "night"]), &nouns(2), 0);

    assert!((neutral - 1.0).abs() < 1e-12);
    // raw 2.0, weight 1 + |-0.9|
    assert!((charged - 2.0 * 1.9).abs() < 1e-12);
}

#[test]
fn out_of_vocabulary_tokens_contribute_nothing() {
    let importance = Fixed(HashMap::from([("pain", 1.0)]));
    let scorer = PhraseScorer::new(&importance, &NeutralSentiment);
    let score = scorer.score_window(&strings(&["pain", "zzz", "qqq"]), &nouns(3), 0);
    assert!((score - 1.0).abs() < 1e-12);
}

// ============================================================
// Term importance policies
// ============================================================

fn matrix() -> TfIdfMatrix {
    let docs = vec![
        strings(&["pain", "pain", "nurse"]),
        strings(&["family", "nurse"]),
        strings(&["pain", "chaplain"]),
    ];
    TfIdfMatrix::build(&docs)
}

#[test]
fn document_specific_weights_follow_doc_id() {
    let m = matrix();
    let weights = TermWeights::document_specific(&m);

    let in_doc0 = weights.importance("pain", 0).unwrap();
    let in_doc1 = weights.importance("pain", 1).unwrap();
    assert!(in_doc0 > 0.0);
    assert_eq!(in_doc1, 0.0);
    assert!(weights.importance("surgeon", 0).is_none());
}

#[test]
fn corpus_wide_weights_ignore_doc_id() {
    let m = matrix();
    let max = TermWeights::corpus_wide(&m, TermStatistic::Max);
    let mean = TermWeights::corpus_wide(&m, TermStatistic::Mean);

    let a = max.importance("pain", 0).unwrap();
    let b = max.importance("pain", 1).unwrap();
    assert_eq!(a, b);
    assert!(mean.importance("pain", 0).unwrap() < a);
}

#[test]
fn whole_sentence_window_takes_every_token() {
    let importance = Fixed(HashMap::new());
    let scorer = PhraseScorer::new(&importance, &NeutralSentiment);
    let tokens = strings(&["a", "b", "c", "d"]);
    let phrase = scorer
        .score_sentence(&tokens, &nouns(4), WindowSize::WholeSentence, 0)
        .unwrap();
    assert_eq!(phrase.tokens, tokens);
    assert_eq!(phrase.offset, 0);
}
