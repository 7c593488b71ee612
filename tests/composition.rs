// Composition tests — verifying that the stages chain together correctly.
//
// These tests run the whole flow on small hand-built corpora:
//   corpus -> TF-IDF -> phrases -> vectors -> clusters -> exports -> evaluation
// using a whitespace tokenizer so every token and tag is predictable. The
// only filesystem side effects are inside temporary directories.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use medtop::clustering::sweep::CancelFlag;
use medtop::clustering::ClusterParameter;
use medtop::config::PipelineConfig;
use medtop::corpus::import::build_corpus;
use medtop::corpus::models::{Corpus, SentenceId};
use medtop::corpus::traits::{TokenizedSentence, Tokenizer};
use medtop::error::PipelineError;
use medtop::evaluation::gold::load_gold;
use medtop::evaluation::metrics::{assignments_from, evaluate};
use medtop::output::export::{
    clusters_to_disk, load_assignments, manifest_to_disk, phrases_to_disk, sentences_to_disk,
    OutputPaths, RunManifest, PHRASES_HEADER,
};
use medtop::pipeline::run::{Pipeline, RunResult};
use medtop::pipeline::stages::{build_embedder, build_tfidf, embed_phrases, score_phrases};
use medtop::scoring::sentiment::NeutralSentiment;
use medtop::topics::keywords::KeywordExtractor;

/// Splits on periods and whitespace; every token is tagged NN.
struct PlainTokenizer;

impl Tokenizer for PlainTokenizer {
    fn tokenize(&self, raw_text: &str) -> Vec<TokenizedSentence> {
        raw_text
            .split('.')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                let tokens: Vec<String> = s.split_whitespace().map(str::to_lowercase).collect();
                let pos_tags = tokens.iter().map(|t| (t.clone(), "NN".to_string())).collect();
                TokenizedSentence {
                    tokens,
                    pos_tags,
                    raw: s.to_string(),
                }
            })
            .collect()
    }
}

fn input_corpus() -> Corpus {
    build_corpus(
        vec![
            (
                "first.txt".to_string(),
                "pain medication. family visit. pain.".to_string(),
            ),
            (
                "second.txt".to_string(),
                "medication pain. visit family. unknown words.".to_string(),
            ),
            (
                "third.txt".to_string(),
                "pain medication. family chaplain.".to_string(),
            ),
        ],
        &PlainTokenizer,
    )
    .unwrap()
}

fn background_corpus() -> Corpus {
    build_corpus(
        vec![
            ("a".to_string(), "pain medication".to_string()),
            ("b".to_string(), "family visit".to_string()),
            ("c".to_string(), "chaplain".to_string()),
        ],
        &PlainTokenizer,
    )
    .unwrap()
}

fn write_vectors(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("vectors.txt");
    fs::write(
        &path,
        "5 2\npain 1 0\nmedication 0.9 0.1\nfamily 0 1\nvisit 0.1 0.9\nchaplain 0 1\n",
    )
    .unwrap();
    path
}

fn pretrained_config(dir: &Path) -> PipelineConfig {
    PipelineConfig::builder()
        .window_size(2)
        .include_input_in_tfidf(true)
        .embedding("pretrained")
        .vectors(write_vectors(dir))
        .build()
        .unwrap()
}

fn local_config() -> PipelineConfig {
    PipelineConfig::builder()
        .window_size(2)
        .include_input_in_tfidf(true)
        .embedding("local")
        .dimensions(4)
        .epochs(50)
        .build()
        .unwrap()
}

fn run(config: &PipelineConfig, corpus: &Corpus, background: Option<&Corpus>) -> RunResult {
    let extractor = KeywordExtractor::default();
    Pipeline::new(config, &NeutralSentiment, &extractor, CancelFlag::new())
        .run(corpus, background)
        .unwrap()
}

fn cluster_of(result: &RunResult, doc: usize, sent: usize) -> usize {
    result
        .clustered
        .iter()
        .find(|s| s.id() == SentenceId::new(doc, sent))
        .and_then(|s| s.cluster)
        .unwrap_or_else(|| panic!("doc.{doc}.sent.{sent} was not clustered"))
}

// ============================================================
// Chain: corpus -> phrases -> vectors -> K-means sweep
// ============================================================

#[test]
fn pretrained_vectors_separate_two_topics() {
    let dir = TempDir::new().unwrap();
    let config = pretrained_config(dir.path());
    let corpus = input_corpus();
    let result = run(&config, &corpus, None);

    assert_eq!(result.total_sentences, 8);
    assert_eq!(result.with_phrase, 7);
    assert_eq!(result.removed, 2);
    assert_eq!(result.clustered.len(), 6);

    assert_eq!(result.outcome.parameter, ClusterParameter::K(2));
    assert_eq!(result.cluster_count(), 2);

    let pain = cluster_of(&result, 0, 0);
    assert_eq!(cluster_of(&result, 1, 0), pain);
    assert_eq!(cluster_of(&result, 2, 0), pain);

    let family = cluster_of(&result, 0, 1);
    assert_ne!(family, pain);
    assert_eq!(cluster_of(&result, 1, 1), family);
    assert_eq!(cluster_of(&result, 2, 1), family);

    assert_eq!(result.doc_topics.len(), 3);
}

#[test]
fn background_tfidf_vectors_keep_pain_sentences_together() {
    let config = PipelineConfig::builder()
        .window_size(2)
        .term_statistic("max")
        .build()
        .unwrap();
    let corpus = input_corpus();
    let background = background_corpus();
    let result = run(&config, &corpus, Some(&background));

    assert_eq!(result.removed, 2);
    let pain = cluster_of(&result, 0, 0);
    assert_eq!(cluster_of(&result, 1, 0), pain);
    assert_eq!(cluster_of(&result, 2, 0), pain);
    assert_ne!(cluster_of(&result, 0, 1), pain);
    assert_eq!(cluster_of(&result, 0, 1), cluster_of(&result, 1, 1));
}

#[test]
fn local_vectors_cover_every_input_token() {
    let corpus = input_corpus();
    let result = run(&local_config(), &corpus, None);

    // Trained on the input itself, so only the one-token sentence (too short
    // for the window) is dropped; "unknown words" keeps its vector
    assert_eq!(result.with_phrase, 7);
    assert_eq!(result.removed, 1);
    assert_eq!(result.clustered.len(), result.with_phrase);
    assert!(result.clustered.iter().any(|s| s.id() == SentenceId::new(1, 2)));
    assert!(result.cluster_count() >= 2);
    assert!(result.clustered.iter().all(|s| s.vector.as_ref().map(Vec::len) == Some(4)));
}

#[test]
fn hac_with_large_height_gives_one_cluster() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig::builder()
        .window_size(2)
        .include_input_in_tfidf(true)
        .embedding("pretrained")
        .vectors(write_vectors(dir.path()))
        .clustering("hac")
        .height(1e6)
        .build()
        .unwrap();
    let result = run(&config, &input_corpus(), None);

    assert_eq!(result.cluster_count(), 1);
    assert!(result.outcome.sweep.is_empty());
    assert_eq!(result.outcome.parameter, ClusterParameter::Height(1e6));
}

#[test]
fn recluster_with_fixed_k() {
    let dir = TempDir::new().unwrap();
    let config = pretrained_config(dir.path());
    let corpus = input_corpus();
    let extractor = KeywordExtractor::default();
    let pipeline = Pipeline::new(&config, &NeutralSentiment, &extractor, CancelFlag::new());

    let first = pipeline.run(&corpus, None).unwrap();
    let second = pipeline
        .recluster(&corpus, first, ClusterParameter::K(3))
        .unwrap();

    assert_eq!(second.outcome.parameter, ClusterParameter::K(3));
    assert!(second.outcome.sweep.is_empty());
    assert_eq!(second.cluster_count(), 3);
    assert_eq!(second.clustered.len(), 6);
    assert_eq!(second.removed, 2);
}

#[test]
fn cancelled_run_reports_cancellation() {
    let dir = TempDir::new().unwrap();
    let config = pretrained_config(dir.path());
    let extractor = KeywordExtractor::default();
    let cancel = CancelFlag::new();
    cancel.cancel();

    let err = Pipeline::new(&config, &NeutralSentiment, &extractor, cancel)
        .run(&input_corpus(), None)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Cancelled)
    ));
}

#[test]
fn cancel_after_run_stops_recluster() {
    let dir = TempDir::new().unwrap();
    let config = pretrained_config(dir.path());
    let corpus = input_corpus();
    let extractor = KeywordExtractor::default();
    let cancel = CancelFlag::new();
    let pipeline = Pipeline::new(&config, &NeutralSentiment, &extractor, cancel.clone());

    let first = pipeline.run(&corpus, None).unwrap();
    cancel.cancel();
    let err = pipeline
        .recluster(&corpus, first, ClusterParameter::K(2))
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Cancelled)
    ));
}

#[test]
fn cancelled_local_training_reports_cancellation() {
    let config = local_config();
    let corpus = input_corpus();
    let matrix = build_tfidf(&corpus, None, true).unwrap();
    let cancel = CancelFlag::new();
    cancel.cancel();

    let err = build_embedder(&config.embedding, &matrix, &corpus.document_tokens(), &cancel)
        .err()
        .unwrap();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Cancelled)
    ));
}

#[test]
fn excluded_input_without_background_fails() {
    let config = PipelineConfig::builder().build().unwrap();
    let extractor = KeywordExtractor::default();
    let err = Pipeline::new(&config, &NeutralSentiment, &extractor, CancelFlag::new())
        .run(&input_corpus(), None)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::MissingDependency(_))
    ));
}

// ============================================================
// Chain: phrases -> vectors -> zero-vector filter
// ============================================================

#[test]
fn zero_vector_filter_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let config = pretrained_config(dir.path());
    let corpus = input_corpus();

    let matrix = build_tfidf(&corpus, None, true).unwrap();
    let scored = score_phrases(corpus.sentences.clone(), &matrix, &config, &NeutralSentiment);
    let embedder =
        build_embedder(&config.embedding, &matrix, &corpus.document_tokens(), &CancelFlag::new())
            .unwrap();

    let once = embed_phrases(scored, embedder.as_ref(), config.aggregation);
    let twice = embed_phrases(once.kept.clone(), embedder.as_ref(), config.aggregation);

    assert_eq!(once.removed, 2);
    assert_eq!(twice.removed, 0);
    let once_ids: Vec<SentenceId> = once.kept.iter().map(|s| s.id()).collect();
    let twice_ids: Vec<SentenceId> = twice.kept.iter().map(|s| s.id()).collect();
    assert_eq!(once_ids, twice_ids);
    for (a, b) in once.kept.iter().zip(&twice.kept) {
        assert_eq!(a.vector, b.vector);
    }
}

// ============================================================
// Chain: run -> exports -> evaluation
// ============================================================

#[test]
fn exported_phrase_table_round_trips_into_evaluation() {
    let dir = TempDir::new().unwrap();
    let config = pretrained_config(dir.path());
    let corpus = input_corpus();
    let result = run(&config, &corpus, None);

    let paths = OutputPaths::new(&dir.path().join("out"), "test");
    sentences_to_disk(&corpus, &paths.sentences).unwrap();
    phrases_to_disk(&result.clustered, &corpus, &paths.phrases).unwrap();
    clusters_to_disk(&result.clustered, &corpus, &result.cluster_topics, &paths.clusters).unwrap();
    manifest_to_disk(&RunManifest::new(&config, &result), &paths.manifest).unwrap();

    let table = fs::read_to_string(&paths.phrases).unwrap();
    assert_eq!(table.lines().next(), Some(PHRASES_HEADER));
    assert_eq!(table.lines().count(), 1 + result.clustered.len());

    let sentences = fs::read_to_string(&paths.sentences).unwrap();
    assert_eq!(sentences.lines().count(), 1 + corpus.sentences.len());

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&paths.manifest).unwrap()).unwrap();
    assert_eq!(manifest["clusters"], 2);
    assert_eq!(manifest["parameter"]["kind"], "k");

    let loaded = load_assignments(&paths.phrases).unwrap();
    assert_eq!(loaded, assignments_from(&result.clustered));

    let gold_path = dir.path().join("gold.tsv");
    fs::write(
        &gold_path,
        "Sentence ID\tLabel\n\
         doc.0.sent.0\tpain\n\
         doc.1.sent.0\tpain\n\
         doc.2.sent.0\tpain\n\
         doc.0.sent.1\tfamily\n\
         doc.1.sent.1\tfamily\n\
         doc.2.sent.1\tfamily\n\
         doc.1.sent.2\tfamily\n",
    )
    .unwrap();
    let gold = load_gold(&gold_path).unwrap();

    let reports = evaluate(&loaded, &gold);
    assert_eq!(reports.len(), 2);
    for r in &reports {
        assert_eq!(r.f1, 1.0, "{}", r.label);
        assert_eq!(r.false_negative, 0);
    }
}
