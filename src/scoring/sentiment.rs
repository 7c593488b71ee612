// Sentiment scorer trait and the default lexicon implementation.
//
// The phrase scorer weights each candidate window by `1 + |polarity|`, so
// emotionally loaded windows (strongly positive or strongly negative) rise
// above neutral ones. Polarity is in [-1, 1].

use std::collections::HashMap;

/// Trait for scoring the polarity of a short span of text.
pub trait SentimentScorer {
    /// Polarity from -1.0 (very negative) to 1.0 (very positive).
    fn polarity(&self, text: &str) -> f64;
}

/// Scorer that treats every text as neutral. Phrase selection then depends
/// on term importance alone.
pub struct NeutralSentiment;

impl SentimentScorer for NeutralSentiment {
    fn polarity(&self, _text: &str) -> f64 {
        0.0
    }
}

const NEGATIONS: &[&str] = &["not", "no", "never", "without"];
const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("extremely", 1.5),
    ("really", 1.2),
    ("so", 1.2),
    ("slightly", 0.5),
];

/// Word-list polarity scorer.
///
/// Polarity is the mean of the matched words' polarities. A negation right
/// before a word flips and halves it; an intensifier right before a word
/// scales it. The result is clamped to [-1, 1].
pub struct LexiconSentiment {
    lexicon: HashMap<String, f64>,
}

impl LexiconSentiment {
    pub fn new() -> Self {
        Self {
            lexicon: HashMap::new(),
        }
    }

    pub fn add(&mut self, word: &str, polarity: f64) {
        self.lexicon
            .insert(word.to_lowercase(), polarity.clamp(-1.0, 1.0));
    }

    pub fn len(&self) -> usize {
        self.lexicon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexicon.is_empty()
    }
}

impl Default for LexiconSentiment {
    fn default() -> Self {
        let mut lexicon = Self::new();

        let groups: &[(&[&str], f64)] = &[
            (
                &[
                    "excellent", "wonderful", "amazing", "perfect", "outstanding", "best",
                    "fantastic", "incredible",
                ],
                0.9,
            ),
            (
                &[
                    "good", "great", "happy", "grateful", "thankful", "kind", "caring",
                    "compassionate", "helpful", "supportive", "comfortable", "hopeful",
                    "relieved", "better", "nice", "gentle", "love", "loved", "beautiful",
                ],
                0.6,
            ),
            (
                &["okay", "fine", "stable", "calm", "safe", "improving", "improved", "positive"],
                0.3,
            ),
            (
                &["uncertain", "unclear", "tired", "uncomfortable", "confused", "busy"],
                -0.3,
            ),
            (
                &[
                    "bad", "sad", "scared", "afraid", "anxious", "worried", "upset", "angry",
                    "painful", "sick", "worse", "difficult", "hard", "frustrated", "lonely",
                    "weak", "sore", "negative", "unstable",
                ],
                -0.6,
            ),
            (
                &[
                    "terrible", "awful", "horrible", "worst", "devastating", "devastated",
                    "critical", "severe", "unbearable", "dying", "dead", "terrified",
                ],
                -0.9,
            ),
        ];

        for (words, polarity) in groups {
            for word in *words {
                lexicon.add(word, *polarity);
            }
        }

        lexicon
    }
}

impl SentimentScorer for LexiconSentiment {
    fn polarity(&self, text: &str) -> f64 {
        let words: Vec<String> = text
            .split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .collect();

        let mut total = 0.0;
        let mut hits = 0usize;

        for (i, word) in words.iter().enumerate() {
            let Some(&base) = self.lexicon.get(word) else {
                continue;
            };

            let mut value = base;
            if let Some(prev) = i.checked_sub(1).map(|p| words[p].as_str()) {
                if NEGATIONS.contains(&prev) {
                    value *= -0.5;
                } else if let Some((_, factor)) = INTENSIFIERS.iter().find(|(w, _)| *w == prev) {
                    value *= factor;
                }
            }

            total += value;
            hits += 1;
        }

        if hits == 0 {
            0.0
        } else {
            (total / hits as f64).clamp(-1.0, 1.0)
        }
    }
}
