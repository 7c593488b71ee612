use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{debug, info, warn};

use medtop::clustering::sweep::CancelFlag;
use medtop::config::{Config, PipelineConfig};
use medtop::corpus::import::{import_docs, import_tsv};
use medtop::corpus::models::{average_sentence_length, Corpus};
use medtop::corpus::preprocess::RuleTokenizer;
use medtop::error::PipelineError;
use medtop::evaluation::gold::load_gold;
use medtop::evaluation::metrics::{assignments_from, evaluate};
use medtop::output::export::{self, OutputPaths, RunManifest};
use medtop::output::terminal;
use medtop::pipeline::run::Pipeline;
use medtop::scoring::sentiment::LexiconSentiment;
use medtop::topics::keywords::KeywordExtractor;

/// medtop: find the phrases that matter in clinical narratives and group
/// them into topics.
///
/// Scores a sliding window over every sentence, embeds the best phrase,
/// clusters the phrase vectors, and labels each cluster with its top terms.
#[derive(Parser)]
#[command(name = "medtop", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import documents and write every sentence with its id
    Sentences {
        /// File listing one document path per line
        #[arg(long)]
        docs: PathBuf,

        /// Output file (default: <out-dir>/<prefix>_sentences.tsv)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Run the full pipeline: phrases, vectors, clusters, topics
    Run {
        /// File listing one document path per line (or a TSV with --tsv)
        #[arg(long)]
        docs: PathBuf,

        /// Treat --docs as a `doc_name<TAB>text` table
        #[arg(long)]
        tsv: bool,

        /// File listing background documents for the TF-IDF matrix
        #[arg(long)]
        tfidf_corpus: Option<PathBuf>,

        /// Add the input documents to the TF-IDF corpus
        #[arg(long)]
        include_input: bool,

        /// Phrase window size in tokens (default: 6, or MEDTOP_WINDOW_SIZE)
        #[arg(long, conflicts_with = "whole_sentence")]
        window: Option<usize>,

        /// Use each whole sentence as its phrase (requires --aggregation)
        #[arg(long)]
        whole_sentence: bool,

        /// How token vectors combine: sum or mean
        #[arg(long)]
        aggregation: Option<String>,

        /// Corpus-wide term importance when input is excluded: max or mean
        #[arg(long)]
        term_stat: Option<String>,

        /// Token vectors: tfidf, svd, pretrained, or local
        #[arg(long, default_value = "tfidf")]
        embedding: String,

        /// SVD components or local vector size (default: 2 for svd, 10 for local)
        #[arg(long)]
        dimensions: Option<usize>,

        /// Training passes for local word vectors (default: 500)
        #[arg(long)]
        epochs: Option<usize>,

        /// Pretrained word2vec file (or MEDTOP_VECTORS)
        #[arg(long)]
        vectors: Option<PathBuf>,

        /// Clustering method: kmeans or hac
        #[arg(long, default_value = "kmeans")]
        clustering: String,

        /// Number of K-means clusters (default: chosen by silhouette)
        #[arg(long)]
        k: Option<usize>,

        /// HAC cut height (default: chosen by silhouette)
        #[arg(long)]
        height: Option<f64>,

        /// HAC distance metric: euclidean, cosine, manhattan, chebyshev
        #[arg(long)]
        metric: Option<String>,

        /// Topic terms per cluster and document (default: 5)
        #[arg(long)]
        topics: Option<usize>,

        /// Gold label file to evaluate the clusters against
        #[arg(long)]
        gold: Option<PathBuf>,

        /// Output directory (default: ./output, or MEDTOP_OUTPUT_DIR)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Output file prefix (default: medtop, or MEDTOP_PREFIX)
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Evaluate a saved phrase table against gold labels
    Evaluate {
        /// Phrase table written by `run`
        #[arg(long)]
        phrases: PathBuf,

        /// Gold label file (`doc.N.sent.M<TAB>label`)
        #[arg(long)]
        gold: PathBuf,

        /// Print the report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("medtop=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Sentences { docs, out } => {
            let corpus = import_docs(&docs, &RuleTokenizer::default())?;
            let path = out.unwrap_or_else(|| {
                OutputPaths::new(&config.output_dir, &config.prefix).sentences
            });
            export::sentences_to_disk(&corpus, &path)?;

            let avg = average_sentence_length(&corpus.sentences, corpus.documents.len());
            println!(
                "Wrote {} sentences from {} documents to {}",
                corpus.sentences.len(),
                corpus.documents.len(),
                path.display()
            );
            println!("  Average sentence length: {avg:.1} tokens");
        }

        Commands::Run {
            docs,
            tsv,
            tfidf_corpus,
            include_input,
            window,
            whole_sentence,
            aggregation,
            term_stat,
            embedding,
            dimensions,
            epochs,
            vectors,
            clustering,
            k,
            height,
            metric,
            topics,
            gold,
            out_dir,
            prefix,
        } => {
            // Build (and validate) the configuration before touching any file
            let mut builder = PipelineConfig::builder()
                .window_size(window.unwrap_or(config.window_size))
                .whole_sentence(whole_sentence)
                .include_input_in_tfidf(include_input)
                .embedding(embedding)
                .clustering(clustering);
            if let Some(name) = aggregation {
                builder = builder.aggregation(name);
            }
            if let Some(name) = term_stat {
                builder = builder.term_statistic(name);
            }
            if let Some(d) = dimensions {
                builder = builder.dimensions(d);
            }
            if let Some(n) = epochs {
                builder = builder.epochs(n);
            }
            if let Some(path) = vectors.or(config.vectors_path.clone()) {
                builder = builder.vectors(path);
            }
            if let Some(k) = k {
                builder = builder.k(k);
            }
            if let Some(h) = height {
                builder = builder.height(h);
            }
            if let Some(name) = metric {
                builder = builder.metric(name);
            }
            if let Some(n) = topics {
                builder = builder.topic_terms(n);
            }
            let pipeline_config = builder.build()?;

            let tokenizer = RuleTokenizer::default();
            let corpus = if tsv {
                import_tsv(&docs, &tokenizer)?
            } else {
                import_docs(&docs, &tokenizer)?
            };
            let background = tfidf_corpus
                .as_deref()
                .map(|path| import_docs(path, &tokenizer))
                .transpose()?;
            info!(
                documents = corpus.documents.len(),
                sentences = corpus.sentences.len(),
                "Corpus imported"
            );

            let cancel = CancelFlag::new();
            spawn_cancel_listener(cancel.clone());
            let watch = cancel.clone();

            let run_config = pipeline_config.clone();
            let run_corpus = corpus.clone();
            let result = tokio::task::spawn_blocking(move || {
                let sentiment = LexiconSentiment::default();
                debug!(words = sentiment.len(), "Sentiment lexicon ready");
                let extractor = KeywordExtractor::default();
                Pipeline::new(&run_config, &sentiment, &extractor, cancel)
                    .run(&run_corpus, background.as_ref())
            })
            .await
            .context("Pipeline thread panicked")?;

            let result = match result {
                Ok(result) => result,
                Err(e) if is_cancelled(&e) => {
                    println!("{}", "Cancelled. No files were written.".yellow());
                    return Ok(());
                }
                Err(e) => return Err(e),
            };
            // An interrupt during the last stage still wins over the result
            if watch.is_cancelled() {
                println!("{}", "Cancelled. No files were written.".yellow());
                return Ok(());
            }

            terminal::display_sweep(&result.outcome);
            terminal::display_clusters(&result, 3);
            terminal::display_doc_topics(&result, &corpus);

            let out_dir = out_dir.unwrap_or_else(|| config.output_dir.clone());
            let prefix = prefix.unwrap_or_else(|| config.prefix.clone());
            let paths = OutputPaths::new(&out_dir, &prefix);
            write_outputs(&paths, &corpus, &pipeline_config, &result)?;

            if let Some(gold_path) = gold {
                let gold = load_gold(&gold_path)?;
                let reports = evaluate(&assignments_from(&result.clustered), &gold);
                terminal::display_evaluation(&reports);
            }
        }

        Commands::Evaluate {
            phrases,
            gold,
            json,
        } => {
            let assignments = export::load_assignments(&phrases)?;
            let gold = load_gold(&gold)?;
            let reports = evaluate(&assignments, &gold);

            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                terminal::display_evaluation(&reports);
            }
        }
    }

    Ok(())
}

/// Flip the cancel flag on Ctrl-C. The running pipeline stops at its next
/// stage boundary or sweep candidate.
fn spawn_cancel_listener(cancel: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current step");
            cancel.cancel();
        }
    });
}

fn is_cancelled(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Cancelled)
    )
}

fn write_outputs(
    paths: &OutputPaths,
    corpus: &Corpus,
    config: &PipelineConfig,
    result: &medtop::pipeline::run::RunResult,
) -> Result<()> {
    export::sentences_to_disk(corpus, &paths.sentences)?;
    export::phrases_to_disk(&result.clustered, corpus, &paths.phrases)?;
    export::clusters_to_disk(&result.clustered, corpus, &result.cluster_topics, &paths.clusters)?;
    export::manifest_to_disk(&RunManifest::new(config, result), &paths.manifest)?;

    println!();
    for path in [&paths.sentences, &paths.phrases, &paths.clusters, &paths.manifest] {
        println!("  Wrote {}", path.display().to_string().dimmed());
    }
    Ok(())
}
