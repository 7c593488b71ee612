use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::clustering::distance::DistanceMetric;
use crate::clustering::{ClusteringMethod, ClusteringStrategy};
use crate::embeddings::assemble::Aggregation;
use crate::embeddings::local::SkipGramParams;
use crate::embeddings::EmbeddingMethod;
use crate::error::{self, PipelineError};
use crate::scoring::phrase::{TermStatistic, WindowSize, DEFAULT_WINDOW_SIZE};

/// SVD components when none are requested.
pub const DEFAULT_SVD_DIMENSIONS: usize = 2;

/// Topic terms shown per cluster and per document.
pub const DEFAULT_TOPIC_TERMS: usize = 5;

/// Settings loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy. CLI flags
/// override everything here.
pub struct Config {
    /// Directory exports are written to (MEDTOP_OUTPUT_DIR)
    pub output_dir: PathBuf,
    /// File name prefix for exports (MEDTOP_PREFIX)
    pub prefix: String,
    /// Pretrained word2vec file (MEDTOP_VECTORS)
    pub vectors_path: Option<PathBuf>,
    /// Phrase window size (MEDTOP_WINDOW_SIZE)
    pub window_size: usize,
}

impl Config {
    /// Load configuration from environment variables. Every value has a default.
    pub fn load() -> Result<Self> {
        let window_size = match env::var("MEDTOP_WINDOW_SIZE") {
            Ok(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("MEDTOP_WINDOW_SIZE must be a number, got '{raw}'"))?,
            Err(_) => DEFAULT_WINDOW_SIZE,
        };

        Ok(Self {
            output_dir: env::var("MEDTOP_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./output")),
            prefix: env::var("MEDTOP_PREFIX").unwrap_or_else(|_| "medtop".to_string()),
            vectors_path: env::var("MEDTOP_VECTORS")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            window_size,
        })
    }
}

/// Token-vector backend with everything it needs.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingConfig {
    Tfidf,
    Svd { dimensions: usize },
    Pretrained { path: PathBuf },
    Local { params: SkipGramParams },
}

impl EmbeddingConfig {
    pub fn method(&self) -> EmbeddingMethod {
        match self {
            EmbeddingConfig::Tfidf => EmbeddingMethod::Tfidf,
            EmbeddingConfig::Svd { .. } => EmbeddingMethod::Svd,
            EmbeddingConfig::Pretrained { .. } => EmbeddingMethod::Pretrained,
            EmbeddingConfig::Local { .. } => EmbeddingMethod::Local,
        }
    }
}

/// A validated pipeline configuration. Built only through
/// [`PipelineConfigBuilder`], so every method name has already been parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub window: WindowSize,
    pub aggregation: Aggregation,
    pub include_input_in_tfidf: bool,
    pub term_statistic: TermStatistic,
    pub embedding: EmbeddingConfig,
    pub clustering: ClusteringStrategy,
    pub topic_terms: usize,
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Collects raw settings (as typed on the command line) and validates them
/// all at once in [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    window_size: Option<usize>,
    whole_sentence: bool,
    aggregation: Option<String>,
    include_input_in_tfidf: bool,
    term_statistic: Option<String>,
    embedding: Option<String>,
    dimensions: Option<usize>,
    epochs: Option<usize>,
    vectors: Option<PathBuf>,
    clustering: Option<String>,
    k: Option<usize>,
    height: Option<f64>,
    metric: Option<String>,
    topic_terms: Option<usize>,
}

impl PipelineConfigBuilder {
    pub fn window_size(mut self, size: usize) -> Self {
        self.window_size = Some(size);
        self
    }

    pub fn whole_sentence(mut self, enabled: bool) -> Self {
        self.whole_sentence = enabled;
        self
    }

    pub fn aggregation(mut self, name: impl Into<String>) -> Self {
        self.aggregation = Some(name.into());
        self
    }

    pub fn include_input_in_tfidf(mut self, include: bool) -> Self {
        self.include_input_in_tfidf = include;
        self
    }

    pub fn term_statistic(mut self, name: impl Into<String>) -> Self {
        self.term_statistic = Some(name.into());
        self
    }

    pub fn embedding(mut self, name: impl Into<String>) -> Self {
        self.embedding = Some(name.into());
        self
    }

    pub fn dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Training passes for local word vectors.
    pub fn epochs(mut self, epochs: usize) -> Self {
        self.epochs = Some(epochs);
        self
    }

    pub fn vectors(mut self, path: impl Into<PathBuf>) -> Self {
        self.vectors = Some(path.into());
        self
    }

    pub fn clustering(mut self, name: impl Into<String>) -> Self {
        self.clustering = Some(name.into());
        self
    }

    pub fn k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    pub fn height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    pub fn metric(mut self, name: impl Into<String>) -> Self {
        self.metric = Some(name.into());
        self
    }

    pub fn topic_terms(mut self, n: usize) -> Self {
        self.topic_terms = Some(n);
        self
    }

    /// Parse every method name and check that each method has what it needs.
    pub fn build(self) -> error::Result<PipelineConfig> {
        let aggregation = self
            .aggregation
            .as_deref()
            .map(str::parse::<Aggregation>)
            .transpose()?;

        let (window, aggregation) = if self.whole_sentence {
            // Whole-sentence phrases have no implied aggregation
            let aggregation =
                aggregation.ok_or_else(|| PipelineError::MissingDependency("aggregation".into()))?;
            (WindowSize::WholeSentence, aggregation)
        } else {
            let size = self.window_size.unwrap_or(DEFAULT_WINDOW_SIZE);
            if size == 0 {
                return Err(PipelineError::invalid("window size", "0"));
            }
            (WindowSize::Fixed(size), aggregation.unwrap_or_default())
        };

        let term_statistic = self
            .term_statistic
            .as_deref()
            .map(str::parse::<TermStatistic>)
            .transpose()?
            .unwrap_or_default();

        let method = self
            .embedding
            .as_deref()
            .map(str::parse::<EmbeddingMethod>)
            .transpose()?
            .unwrap_or_default();
        let embedding = match method {
            EmbeddingMethod::Tfidf => EmbeddingConfig::Tfidf,
            EmbeddingMethod::Svd => {
                let dimensions = self.dimensions.unwrap_or(DEFAULT_SVD_DIMENSIONS);
                if dimensions == 0 {
                    return Err(PipelineError::invalid("dimensions", "0"));
                }
                EmbeddingConfig::Svd { dimensions }
            }
            EmbeddingMethod::Pretrained => {
                let path = self.vectors.ok_or_else(|| {
                    PipelineError::MissingDependency("vectors path for pretrained embeddings".into())
                })?;
                EmbeddingConfig::Pretrained { path }
            }
            EmbeddingMethod::Local => {
                let defaults = SkipGramParams::default();
                let params = SkipGramParams {
                    dimensions: self.dimensions.unwrap_or(defaults.dimensions),
                    epochs: self.epochs.unwrap_or(defaults.epochs),
                    ..defaults
                };
                if params.dimensions == 0 {
                    return Err(PipelineError::invalid("dimensions", "0"));
                }
                if params.epochs == 0 {
                    return Err(PipelineError::invalid("epochs", "0"));
                }
                EmbeddingConfig::Local { params }
            }
        };
        if self.epochs.is_some() && method != EmbeddingMethod::Local {
            return Err(PipelineError::invalid("epochs", format!("with {method} embeddings")));
        }

        let clustering_method = self
            .clustering
            .as_deref()
            .map(str::parse::<ClusteringMethod>)
            .transpose()?
            .unwrap_or_default();
        let metric = self
            .metric
            .as_deref()
            .map(str::parse::<DistanceMetric>)
            .transpose()?;

        let clustering = match clustering_method {
            ClusteringMethod::KMeans => {
                if let Some(height) = self.height {
                    return Err(PipelineError::invalid("height", format!("{height} with kmeans")));
                }
                if let Some(metric) = metric.filter(|m| *m != DistanceMetric::Euclidean) {
                    return Err(PipelineError::invalid("distance metric", format!("{metric} with kmeans")));
                }
                ClusteringStrategy::KMeans { k: self.k }
            }
            ClusteringMethod::Hac => {
                if let Some(k) = self.k {
                    return Err(PipelineError::invalid("k", format!("{k} with hac")));
                }
                ClusteringStrategy::Hac {
                    metric: metric.unwrap_or_default(),
                    height: self.height,
                }
            }
        };

        Ok(PipelineConfig {
            window,
            aggregation,
            include_input_in_tfidf: self.include_input_in_tfidf,
            term_statistic,
            embedding,
            clustering,
            topic_terms: self.topic_terms.unwrap_or(DEFAULT_TOPIC_TERMS),
        })
    }
}
