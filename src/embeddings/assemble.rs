// Phrase vectors: sum (or average) the token vectors of each phrase, then
// drop the sentences whose vector came out as all zeros.
//
// A zero vector means none of the phrase's tokens were in the embedding
// vocabulary (or the sentence had no phrase at all). Those sentences are
// removed before clustering and the count is reported, never clustered into
// an arbitrary group.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2};
use tracing::info;

use super::traits::Embedder;
use crate::corpus::models::{Phrase, Sentence};
use crate::error::{PipelineError, Result};

/// How token vectors combine into one phrase vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregation {
    #[default]
    Sum,
    /// Sum divided by the number of in-vocabulary tokens
    Mean,
}

impl FromStr for Aggregation {
    type Err = PipelineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(Aggregation::Sum),
            "mean" | "average" => Ok(Aggregation::Mean),
            _ => Err(PipelineError::invalid("aggregation", s)),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Sum => write!(f, "sum"),
            Aggregation::Mean => write!(f, "mean"),
        }
    }
}

pub struct VectorAssembler<'a> {
    embedder: &'a dyn Embedder,
    aggregation: Aggregation,
}

impl<'a> VectorAssembler<'a> {
    pub fn new(embedder: &'a dyn Embedder, aggregation: Aggregation) -> Self {
        Self {
            embedder,
            aggregation,
        }
    }

    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Phrase vector for one phrase. No phrase gives the zero vector.
    pub fn assemble(&self, phrase: Option<&Phrase>) -> Array1<f64> {
        let mut sum = Array1::<f64>::zeros(self.embedder.dimension());
        let Some(phrase) = phrase else {
            return sum;
        };

        let mut seen: HashSet<&str> = HashSet::new();
        let mut hits = 0usize;
        for token in &phrase.tokens {
            if self.embedder.distinct_tokens() && !seen.insert(token.as_str()) {
                continue;
            }
            if let Some(vector) = self.embedder.token_vector(token) {
                sum += &vector;
                hits += 1;
            }
        }

        if self.aggregation == Aggregation::Mean && hits > 0 {
            sum.mapv_inplace(|x| x / hits as f64);
        }
        sum
    }

    /// Attach a vector to every sentence, returning a new collection.
    pub fn assemble_all(&self, sentences: Vec<Sentence>) -> Vec<Sentence> {
        sentences
            .into_iter()
            .map(|sent| {
                let vector = self.assemble(sent.phrase.as_ref());
                sent.with_vector(Some(vector.to_vec()))
            })
            .collect()
    }
}

/// Sentences that survived the zero-vector filter, plus how many did not.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub kept: Vec<Sentence>,
    pub removed: usize,
}

/// Keep only sentences with a phrase and a vector that is not all zeros.
pub fn filter_zero_vectors(sentences: Vec<Sentence>) -> FilterOutcome {
    let total = sentences.len();
    let kept: Vec<Sentence> = sentences
        .into_iter()
        .filter(|sent| {
            sent.phrase.is_some()
                && sent
                    .vector
                    .as_ref()
                    .is_some_and(|v| v.iter().any(|&x| x != 0.0))
        })
        .collect();

    let removed = total - kept.len();
    info!(kept = kept.len(), removed, "Filtered zero phrase vectors");
    FilterOutcome { kept, removed }
}

/// Stack sentence vectors into an observation matrix, one row per sentence.
pub fn vector_matrix(sentences: &[Sentence]) -> Result<Array2<f64>> {
    let dim = sentences
        .iter()
        .find_map(|s| s.vector.as_ref().map(Vec::len))
        .unwrap_or(0);

    let mut data = Vec::with_capacity(sentences.len() * dim);
    for sent in sentences {
        let vector = sent
            .vector
            .as_ref()
            .ok_or_else(|| PipelineError::MissingDependency(format!("vector for {}", sent.id())))?;
        if vector.len() != dim {
            return Err(PipelineError::DimensionMismatch {
                expected: dim,
                found: vector.len(),
            });
        }
        data.extend_from_slice(vector);
    }

    Array2::from_shape_vec((sentences.len(), dim), data)
        .map_err(|e| PipelineError::Clustering(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use ndarray::ArrayView1;

    use super::*;

    struct Table {
        rows: HashMap<&'static str, Array1<f64>>,
        distinct: bool,
    }

    impl Embedder for Table {
        fn dimension(&self) -> usize {
            2
        }

        fn token_vector(&self, token: &str) -> Option<ArrayView1<'_, f64>> {
            self.rows.get(token).map(|v| v.view())
        }

        fn distinct_tokens(&self) -> bool {
            self.distinct
        }
    }

    fn table(distinct: bool) -> Table {
        Table {
            rows: HashMap::from([
                ("pain", Array1::from(vec![1.0, 0.0])),
                ("severe", Array1::from(vec![0.0, 2.0])),
            ]),
            distinct,
        }
    }

    fn phrase(tokens: &[&str]) -> Phrase {
        Phrase {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            pos_tags: vec!["NN".to_string(); tokens.len()],
            offset: 0,
            score: 1.0,
        }
    }

    fn sentence(sent_id: usize, tokens: &[&str]) -> Sentence {
        let owned: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        let tags = vec!["NN".to_string(); owned.len()];
        Sentence::new(0, sent_id, owned, tags, tokens.join(" "))
            .unwrap()
            .with_phrase(Some(phrase(tokens)))
    }

    #[test]
    fn test_sum_skips_unknown_tokens() {
        let t = table(false);
        let assembler = VectorAssembler::new(&t, Aggregation::Sum);
        let v = assembler.assemble(Some(&phrase(&["severe", "chest", "pain"])));
        assert_eq!(v.to_vec(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_repeated_tokens() {
        let p = phrase(&["pain", "pain"]);
        let every = table(false);
        let once = table(true);
        assert_eq!(
            VectorAssembler::new(&every, Aggregation::Sum).assemble(Some(&p)).to_vec(),
            vec![2.0, 0.0]
        );
        assert_eq!(
            VectorAssembler::new(&once, Aggregation::Sum).assemble(Some(&p)).to_vec(),
            vec![1.0, 0.0]
        );
    }

    #[test]
    fn test_mean_aggregation() {
        let t = table(false);
        let assembler = VectorAssembler::new(&t, Aggregation::Mean);
        let v = assembler.assemble(Some(&phrase(&["severe", "pain", "chest"])));
        assert_eq!(v.to_vec(), vec![0.5, 1.0]);
    }

    #[test]
    fn test_no_phrase_is_zero_vector() {
        let t = table(false);
        let assembler = VectorAssembler::new(&t, Aggregation::Sum);
        assert_eq!(assembler.assemble(None).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_filter_drops_zero_and_phraseless() {
        let t = table(false);
        let assembler = VectorAssembler::new(&t, Aggregation::Sum);
        let sentences = vec![
            sentence(0, &["pain"]),
            sentence(1, &["chest"]),
            sentence(2, &["short"]).with_phrase(None),
        ];

        let outcome = filter_zero_vectors(assembler.assemble_all(sentences));
        assert_eq!(outcome.removed, 2);
        assert_eq!(outcome.kept.len(), 1);
        assert_eq!(outcome.kept[0].sent_id, 0);
    }

    #[test]
    fn test_vector_matrix_shape() {
        let t = table(false);
        let assembler = VectorAssembler::new(&t, Aggregation::Sum);
        let sentences = assembler.assemble_all(vec![sentence(0, &["pain"]), sentence(1, &["severe"])]);
        let m = vector_matrix(&sentences).unwrap();
        assert_eq!(m.dim(), (2, 2));
        assert_eq!(m[[1, 1]], 2.0);
    }

    #[test]
    fn test_vector_matrix_rejects_ragged() {
        let a = sentence(0, &["pain"]).with_vector(Some(vec![1.0, 0.0]));
        let b = sentence(1, &["pain"]).with_vector(Some(vec![1.0]));
        assert!(matches!(
            vector_matrix(&[a, b]),
            Err(PipelineError::DimensionMismatch { expected: 2, found: 1 })
        ));
    }
}
