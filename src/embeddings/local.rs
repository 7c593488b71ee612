// Corpus-trained word vectors: skip-gram with negative sampling.
//
// Each input document is one training sequence (its sentences' tokens
// concatenated). For every position, each word inside a randomly shrunk
// window learns to predict the centre word against NEGATIVE_SAMPLES words
// drawn from the unigram distribution raised to 3/4. The learning rate
// decays linearly over the whole run. Training is seeded and
// single-threaded, so the same corpus always yields the same vectors.

use std::collections::HashMap;

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use super::word2vec::WordVectors;
use crate::clustering::sweep::CancelFlag;
use crate::error::{PipelineError, Result};

/// Seed for vector initialization, window shrinking, and negative draws.
pub const LOCAL_SEED: u64 = 42;

pub const DEFAULT_LOCAL_DIMENSIONS: usize = 10;
pub const DEFAULT_LOCAL_WINDOW: usize = 6;
pub const DEFAULT_LOCAL_EPOCHS: usize = 500;

const NEGATIVE_SAMPLES: usize = 5;
const START_ALPHA: f64 = 0.025;
const MIN_ALPHA: f64 = 0.0001;
const UNIGRAM_POWER: f64 = 0.75;
const MAX_EXP: f64 = 6.0;

/// Shape of the model and length of training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipGramParams {
    pub dimensions: usize,
    /// Largest distance between a word and its context words
    pub window: usize,
    /// Passes over the whole corpus
    pub epochs: usize,
}

impl Default for SkipGramParams {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_LOCAL_DIMENSIONS,
            window: DEFAULT_LOCAL_WINDOW,
            epochs: DEFAULT_LOCAL_EPOCHS,
        }
    }
}

/// Train word vectors on `documents`. Every token that occurs at least once
/// gets a vector. Cancellation is checked between epochs.
pub fn train(
    documents: &[Vec<String>],
    params: SkipGramParams,
    cancel: &CancelFlag,
) -> Result<WordVectors> {
    if params.dimensions == 0 {
        return Err(PipelineError::invalid("dimensions", "0"));
    }
    if params.window == 0 {
        return Err(PipelineError::invalid("training window", "0"));
    }

    let vocab = Vocabulary::build(documents);
    if vocab.is_empty() {
        return Err(PipelineError::InsufficientData {
            needed: 1,
            found: 0,
        });
    }
    let sequences: Vec<Vec<usize>> = documents
        .iter()
        .map(|doc| doc.iter().filter_map(|t| vocab.index.get(t).copied()).collect())
        .collect();
    let total_tokens: usize = sequences.iter().map(Vec::len).sum();

    let dim = params.dimensions;
    let mut rng = StdRng::seed_from_u64(LOCAL_SEED);
    let mut input = Array2::from_shape_fn((vocab.len(), dim), |_| {
        (rng.random::<f64>() - 0.5) / dim as f64
    });
    let mut output = Array2::<f64>::zeros((vocab.len(), dim));
    let table = NegativeTable::new(&vocab.counts);

    info!(
        words = vocab.len(),
        tokens = total_tokens,
        dimensions = dim,
        epochs = params.epochs,
        "Training local word vectors"
    );

    let pb = ProgressBar::new(params.epochs as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {msg} [{bar:30}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message("skip-gram");

    let total_steps = (params.epochs * total_tokens).max(1) as f64;
    let mut step = 0usize;
    let mut gradient = Array1::<f64>::zeros(dim);

    for epoch in 0..params.epochs {
        if cancel.is_cancelled() {
            pb.abandon();
            return Err(PipelineError::Cancelled);
        }

        for seq in &sequences {
            for (pos, &centre) in seq.iter().enumerate() {
                let alpha = (START_ALPHA * (1.0 - step as f64 / total_steps)).max(MIN_ALPHA);
                step += 1;

                let reach = rng.random_range(1..=params.window);
                let lo = pos.saturating_sub(reach);
                let hi = (pos + reach + 1).min(seq.len());

                for (ctx_pos, &context) in seq.iter().enumerate().take(hi).skip(lo) {
                    if ctx_pos == pos {
                        continue;
                    }
                    gradient.fill(0.0);

                    for draw in 0..=NEGATIVE_SAMPLES {
                        let (target, label) = if draw == 0 {
                            (centre, 1.0)
                        } else {
                            let target = table.sample(&mut rng);
                            if target == centre {
                                continue;
                            }
                            (target, 0.0)
                        };

                        let f = input.row(context).dot(&output.row(target));
                        let g = (label - sigmoid(f)) * alpha;
                        gradient.scaled_add(g, &output.row(target));
                        output.row_mut(target).scaled_add(g, &input.row(context));
                    }

                    input.row_mut(context).scaled_add(1.0, &gradient);
                }
            }
        }

        debug!(epoch, "Skip-gram epoch done");
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(WordVectors::from_rows(vocab.words, input))
}

fn sigmoid(x: f64) -> f64 {
    if x > MAX_EXP {
        1.0
    } else if x < -MAX_EXP {
        0.0
    } else {
        1.0 / (1.0 + (-x).exp())
    }
}

/// Distinct tokens in first-seen order, with their corpus counts.
struct Vocabulary {
    words: Vec<String>,
    counts: Vec<usize>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    fn build(documents: &[Vec<String>]) -> Self {
        let mut vocab = Self {
            words: Vec::new(),
            counts: Vec::new(),
            index: HashMap::new(),
        };
        for token in documents.iter().flatten() {
            match vocab.index.get(token) {
                Some(&ix) => vocab.counts[ix] += 1,
                None => {
                    vocab.index.insert(token.clone(), vocab.words.len());
                    vocab.words.push(token.clone());
                    vocab.counts.push(1);
                }
            }
        }
        vocab
    }

    fn len(&self) -> usize {
        self.words.len()
    }

    fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Cumulative unigram^0.75 weights, sampled by binary search.
struct NegativeTable {
    cumulative: Vec<f64>,
}

impl NegativeTable {
    fn new(counts: &[usize]) -> Self {
        let mut total = 0.0;
        let cumulative = counts
            .iter()
            .map(|&c| {
                total += (c as f64).powf(UNIGRAM_POWER);
                total
            })
            .collect();
        Self { cumulative }
    }

    fn sample(&self, rng: &mut StdRng) -> usize {
        let total = self.cumulative.last().copied().unwrap_or(0.0);
        let r = rng.random::<f64>() * total;
        self.cumulative
            .partition_point(|&c| c <= r)
            .min(self.cumulative.len().saturating_sub(1))
    }
}
