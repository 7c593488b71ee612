// Tab-separated exports and the JSON run manifest.
//
// Every row is keyed by the `doc.{d}.sent.{s}` sentence id. Tabs and line
// breaks inside text fields are replaced with spaces so each record stays
// on one line.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::clustering::{ClusterParameter, SweepScore};
use crate::config::PipelineConfig;
use crate::corpus::models::{Corpus, Sentence, SentenceId};
use crate::pipeline::run::RunResult;

pub const SENTENCES_HEADER: &str = "Sentence ID\tSentence Text";
pub const PHRASES_HEADER: &str = "id\tdocument\ttext\tphrase\tcluster";

/// Where one run's files go.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub sentences: PathBuf,
    pub phrases: PathBuf,
    pub clusters: PathBuf,
    pub manifest: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: &Path, prefix: &str) -> Self {
        Self {
            sentences: dir.join(format!("{prefix}_sentences.tsv")),
            phrases: dir.join(format!("{prefix}_phrases.tsv")),
            clusters: dir.join(format!("{prefix}_clusters.txt")),
            manifest: dir.join(format!("{prefix}_manifest.json")),
        }
    }
}

/// Summary of a run, written next to the tables.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub generated_at: DateTime<Utc>,
    pub embedding: String,
    pub clustering: String,
    pub window: String,
    pub aggregation: String,
    pub include_input_in_tfidf: bool,
    pub parameter: ClusterParameter,
    pub sweep: Vec<SweepScore>,
    pub sentences: usize,
    pub with_phrase: usize,
    pub removed: usize,
    pub clustered: usize,
    pub clusters: usize,
}

impl RunManifest {
    pub fn new(config: &PipelineConfig, result: &RunResult) -> Self {
        Self {
            generated_at: Utc::now(),
            embedding: config.embedding.method().to_string(),
            clustering: config.clustering.method().to_string(),
            window: format!("{:?}", config.window),
            aggregation: config.aggregation.to_string(),
            include_input_in_tfidf: config.include_input_in_tfidf,
            parameter: result.outcome.parameter,
            sweep: result.outcome.sweep.clone(),
            sentences: result.total_sentences,
            with_phrase: result.with_phrase,
            removed: result.removed,
            clustered: result.clustered.len(),
            clusters: result.cluster_count(),
        }
    }
}

fn clean(text: &str) -> String {
    text.replace(['\t', '\n', '\r'], " ")
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// One row per imported sentence: id and raw text.
pub fn sentences_to_disk(corpus: &Corpus, path: &Path) -> Result<()> {
    let mut out = create(path)?;
    writeln!(out, "{SENTENCES_HEADER}")?;
    for sent in &corpus.sentences {
        writeln!(out, "{}\t{}", sent.id(), clean(&sent.text))?;
    }
    out.flush()?;
    info!(rows = corpus.sentences.len(), path = %path.display(), "Wrote sentences");
    Ok(())
}

fn phrase_row(sent: &Sentence, corpus: &Corpus) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        sent.id(),
        clean(corpus.document_name(sent.doc_id)),
        clean(&sent.text),
        clean(&sent.phrase_text()),
    )
}

/// The phrase table: one row per clustered sentence.
pub fn phrases_to_disk(sentences: &[Sentence], corpus: &Corpus, path: &Path) -> Result<()> {
    let mut out = create(path)?;
    writeln!(out, "{PHRASES_HEADER}")?;
    let mut rows = 0;
    for sent in sentences {
        let Some(cluster) = sent.cluster else { continue };
        writeln!(out, "{}\t{cluster}", phrase_row(sent, corpus))?;
        rows += 1;
    }
    out.flush()?;
    info!(rows, path = %path.display(), "Wrote phrase table");
    Ok(())
}

/// Sentences grouped by cluster, each group headed by its topic terms.
pub fn clusters_to_disk(
    sentences: &[Sentence],
    corpus: &Corpus,
    topics: &BTreeMap<usize, Vec<String>>,
    path: &Path,
) -> Result<()> {
    let mut grouped: BTreeMap<usize, Vec<&Sentence>> = BTreeMap::new();
    for sent in sentences {
        if let Some(cluster) = sent.cluster {
            grouped.entry(cluster).or_default().push(sent);
        }
    }

    let mut out = create(path)?;
    for (cluster, members) in &grouped {
        let terms = topics.get(cluster).map(|t| t.join(", ")).unwrap_or_default();
        writeln!(out, "Cluster {cluster}: {terms}")?;
        for sent in members {
            writeln!(out, "{}", phrase_row(sent, corpus))?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    info!(clusters = grouped.len(), path = %path.display(), "Wrote cluster file");
    Ok(())
}

pub fn manifest_to_disk(manifest: &RunManifest, path: &Path) -> Result<()> {
    let mut out = create(path)?;
    serde_json::to_writer_pretty(&mut out, manifest)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Read sentence id → cluster back from a phrase table.
pub fn load_assignments(path: &Path) -> Result<BTreeMap<SentenceId, usize>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open phrase table at {}", path.display()))?;

    let mut assignments = BTreeMap::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || (line_no == 0 && line.starts_with("id\t")) {
            continue;
        }

        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() < 2 {
            bail!("{}:{}: expected tab-separated columns", path.display(), line_no + 1);
        }
        let id: SentenceId = columns[0]
            .parse()
            .with_context(|| format!("{}:{}", path.display(), line_no + 1))?;
        let cluster: usize = columns[columns.len() - 1]
            .trim()
            .parse()
            .with_context(|| format!("{}:{}: bad cluster id", path.display(), line_no + 1))?;
        assignments.insert(id, cluster);
    }

    info!(rows = assignments.len(), path = %path.display(), "Loaded cluster assignments");
    Ok(assignments)
}
