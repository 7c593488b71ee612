// Rule-based text preprocessing — the default Tokenizer.
//
// Splits a document into sentences, expands contractions, strips
// punctuation, tags each surface word with a Penn Treebank part of speech,
// lemmatizes, and drops stop words. Tagging and lemmatization are
// deliberately lightweight: the phrase scorer only cares whether a token is
// an adjective/adverb, and the downstream vocabularies only need consistent
// token forms.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex_lite::Regex;
use stop_words::{get, LANGUAGE};

use super::traits::{TokenizedSentence, Tokenizer};

/// Domain stop words layered on top of the English list. Clinical notes are
/// full of these and they carry no topical signal.
pub const DOMAIN_STOP_WORDS: &[&str] = &[
    "patient", "mrs", "hi", "ob", "1am", "4month", "o2", "ed", "ecmo", "m3", "ha", "3rd", "ai",
    "csicu", "wa", "first", "second", "third", "fourth", "etc", "eg", "thus", "say", "many",
    "things", "new", "much", "get", "really", "since", "way", "also", "one", "two", "three",
    "four", "five", "six", "week", "day", "month", "year", "would", "could", "should", "like",
    "im", "thing", "v", "u", "d", "g",
];

static SENTENCE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[.!?]+["')\]]*\s+|\n\s*\n"#).expect("static sentence pattern")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static whitespace pattern"));

static CONTRACTIONS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"won't", "will not"),
        (r"can't", "can not"),
        (r"hadn't", "had not"),
        (r"\bdoesnt\b", "does not"),
        (r"\byoure\b", "you are"),
        (r"\bdont\b", "do not"),
        (r"\bim\s", "i am "),
        (r"\bive\s", "i have "),
        (r"n't", " not"),
        (r"'re", " are"),
        (r"'s", " is"),
        (r"'d", " would"),
        (r"'ll", " will"),
        (r"'t", " not"),
        (r"'ve", " have"),
        (r"'m", " am"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("static contraction pattern"),
            replacement,
        )
    })
    .collect()
});

/// Expand contractions and turn slashes into spaces.
pub fn decontract(text: &str) -> String {
    let mut out = text.replace('\u{2019}', "'");
    for (pattern, replacement) in CONTRACTIONS.iter() {
        out = pattern.replace_all(&out, *replacement).into_owned();
    }
    out.replace('/', " ")
}

/// Split raw text into sentences with condensed whitespace.
///
/// Empty fragments are dropped, but a sentence whose tokens are later all
/// filtered out is kept so sentence numbering matches the raw text.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in SENTENCE_BREAK.find_iter(text) {
        push_sentence(&mut sentences, &text[start..m.end()]);
        start = m.end();
    }
    push_sentence(&mut sentences, &text[start..]);

    sentences
}

fn push_sentence(out: &mut Vec<String>, fragment: &str) {
    let condensed = WHITESPACE.replace_all(fragment, " ");
    let trimmed = condensed.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn strip_punctuation(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_ascii_punctuation() && *c != '\u{201c}' && *c != '\u{201d}')
        .collect()
}

const DETERMINERS: &[&str] = &[
    "the", "a", "an", "this", "that", "these", "those", "every", "each", "some", "any", "no",
];
const PREPOSITIONS: &[&str] = &[
    "of", "in", "on", "at", "by", "for", "with", "from", "about", "into", "over", "after",
    "before", "under", "during", "without", "through", "until", "upon", "within", "between",
];
const CONJUNCTIONS: &[&str] = &["and", "or", "but", "nor", "yet"];
const PRONOUNS: &[&str] = &[
    "i", "you", "he", "she", "it", "we", "they", "me", "him", "her", "us", "them",
];
const POSSESSIVES: &[&str] = &["my", "your", "his", "its", "our", "their"];
const MODALS: &[&str] = &[
    "can", "could", "will", "would", "shall", "should", "may", "might", "must",
];
const ADVERBS: &[&str] = &[
    "not", "very", "also", "never", "always", "often", "still", "well", "now", "then", "here",
    "there", "too", "quite", "rather", "almost", "already", "again", "soon", "just", "even",
];
const ADVERBS_COMPARATIVE: &[&str] = &["more", "less"];
const ADVERBS_SUPERLATIVE: &[&str] = &["most", "least"];
const ADJECTIVES: &[&str] = &[
    "good", "bad", "severe", "mild", "acute", "chronic", "old", "high", "low", "normal",
    "abnormal", "stable", "unstable", "great", "small", "large", "big", "little", "long", "short",
    "difficult", "hard", "easy", "sick", "ill", "sad", "happy", "scared", "afraid", "anxious",
    "angry", "upset", "worried", "grateful", "thankful", "kind", "nice", "terrible", "awful",
    "critical", "serious", "poor", "weak", "strong", "tired", "positive", "negative", "sudden",
    "frequent", "rare", "swollen", "sore", "fine", "okay", "sweet", "warm", "cold", "calm",
    "brave", "proud", "lonely", "quiet", "busy", "safe", "sorry", "glad", "alive", "dead",
];
const ADJECTIVES_COMPARATIVE: &[&str] = &[
    "better", "worse", "greater", "higher", "lower", "larger", "smaller", "fewer", "older",
];
const ADJECTIVES_SUPERLATIVE: &[&str] = &[
    "best", "worst", "greatest", "highest", "lowest", "largest", "smallest", "oldest",
];
const ADJECTIVE_SUFFIXES: &[&str] = &["ous", "ful", "ive", "able", "ible", "less", "ical"];

/// Assign a Penn Treebank tag to one surface word.
///
/// `index` is the word's position in its sentence; capitalized words after
/// the first position are treated as proper nouns.
pub fn tag_word(word: &str, index: usize) -> &'static str {
    let lower = word.to_lowercase();
    let w = lower.as_str();

    if w.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return "CD";
    }

    let lookup: &[(&[&str], &'static str)] = &[
        (DETERMINERS, "DT"),
        (PREPOSITIONS, "IN"),
        (CONJUNCTIONS, "CC"),
        (PRONOUNS, "PRP"),
        (POSSESSIVES, "PRP$"),
        (MODALS, "MD"),
        (ADVERBS, "RB"),
        (ADVERBS_COMPARATIVE, "RBR"),
        (ADVERBS_SUPERLATIVE, "RBS"),
        (ADJECTIVES, "JJ"),
        (ADJECTIVES_COMPARATIVE, "JJR"),
        (ADJECTIVES_SUPERLATIVE, "JJS"),
    ];
    for (words, tag) in lookup {
        if words.contains(&w) {
            return tag;
        }
    }
    if w == "to" {
        return "TO";
    }

    let len = w.chars().count();
    if w.ends_with("ly") && len > 4 {
        return "RB";
    }
    if len > 5 && ADJECTIVE_SUFFIXES.iter().any(|suffix| w.ends_with(suffix)) {
        return "JJ";
    }
    if w.ends_with("ing") && len > 4 {
        return "VBG";
    }
    if w.ends_with("ed") && len > 3 {
        return "VBD";
    }

    let capitalized = word.chars().next().is_some_and(|c| c.is_uppercase());
    if capitalized && index > 0 {
        return "NNP";
    }
    if w.ends_with('s') && !w.ends_with("ss") && len > 3 {
        return "NNS";
    }
    "NN"
}

/// Reduce a word to a lowercase base form (regular noun plurals only).
pub fn lemmatize(word: &str) -> String {
    let w = word.to_lowercase();
    let len = w.chars().count();

    if len > 4 && w.ends_with("ies") {
        return format!("{}y", &w[..w.len() - 3]);
    }
    if w.ends_with("sses") {
        return w[..w.len() - 2].to_string();
    }
    if len > 3
        && w.ends_with('s')
        && !w.ends_with("ss")
        && !w.ends_with("us")
        && !w.ends_with("is")
    {
        return w[..w.len() - 1].to_string();
    }
    w
}

/// Default tokenizer: regex sentence splitting, rule-based tagging, and
/// stop-word filtering.
pub struct RuleTokenizer {
    stop_words: HashSet<String>,
}

impl Default for RuleTokenizer {
    fn default() -> Self {
        let mut stop_words: HashSet<String> = get(LANGUAGE::English).into_iter().collect();
        stop_words.extend(DOMAIN_STOP_WORDS.iter().map(|w| w.to_string()));
        Self { stop_words }
    }
}

impl RuleTokenizer {
    /// Keep tokens that start with a letter and are not stop words.
    pub fn keep_token(&self, token: &str) -> bool {
        token.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            && !self.stop_words.contains(token)
    }

    /// Tokenize one already-split sentence.
    pub fn tokenize_sentence(&self, sentence: &str) -> TokenizedSentence {
        let cleaned = strip_punctuation(&decontract(sentence));

        let mut tokens = Vec::new();
        let mut pos_tags = Vec::new();

        for (index, word) in cleaned.split_whitespace().enumerate() {
            let lemma = lemmatize(word);
            if !self.keep_token(&lemma) {
                continue;
            }
            pos_tags.push((word.to_string(), tag_word(word, index).to_string()));
            tokens.push(lemma);
        }

        TokenizedSentence {
            tokens,
            pos_tags,
            raw: sentence.to_string(),
        }
    }
}

impl Tokenizer for RuleTokenizer {
    fn tokenize(&self, raw_text: &str) -> Vec<TokenizedSentence> {
        split_sentences(raw_text)
            .iter()
            .map(|s| self.tokenize_sentence(s))
            .collect()
    }
}
