// Corpus import — read raw documents from disk and tokenize them.
//
// Two input shapes are supported: a text file listing one document path per
// line (each file is one document), or a two-column TSV of
// `doc_name<TAB>text` rows.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::models::{Corpus, Document, Sentence};
use super::traits::Tokenizer;

/// Read a file list and return the non-empty paths it names.
pub fn read_file_list(path_to_file_list: &Path) -> Result<Vec<String>> {
    let listing = fs::read_to_string(path_to_file_list).with_context(|| {
        format!("Failed to read file list {}", path_to_file_list.display())
    })?;

    Ok(listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Import every document named in a file list.
pub fn import_docs(path_to_file_list: &Path, tokenizer: &dyn Tokenizer) -> Result<Corpus> {
    let file_list = read_file_list(path_to_file_list)?;

    let mut raw = Vec::with_capacity(file_list.len());
    for file_path in file_list {
        let text = fs::read_to_string(&file_path)
            .with_context(|| format!("Failed to read document {file_path}"))?;
        raw.push((file_path, text));
    }

    let corpus = build_corpus(raw, tokenizer)?;
    info!(
        documents = corpus.documents.len(),
        sentences = corpus.sentences.len(),
        "Imported documents from file list"
    );
    Ok(corpus)
}

/// Import documents from a `doc_name<TAB>text` file.
///
/// A leading `doc_name<TAB>text` header row is skipped. Rows without a tab
/// are rejected rather than guessed at.
pub fn import_tsv(path: &Path, tokenizer: &dyn Tokenizer) -> Result<Corpus> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read document table {}", path.display()))?;

    let mut raw = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let Some((name, text)) = line.split_once('\t') else {
            anyhow::bail!(
                "{}:{}: expected `doc_name<TAB>text`",
                path.display(),
                line_no + 1
            );
        };
        if line_no == 0 && name.trim() == "doc_name" && text.trim() == "text" {
            continue;
        }
        raw.push((name.trim().to_string(), text.to_string()));
    }

    let corpus = build_corpus(raw, tokenizer)?;
    info!(
        documents = corpus.documents.len(),
        sentences = corpus.sentences.len(),
        "Imported documents from table"
    );
    Ok(corpus)
}

/// Tokenize `(name, text)` pairs into a corpus. Document ids follow input order.
pub fn build_corpus(raw: Vec<(String, String)>, tokenizer: &dyn Tokenizer) -> Result<Corpus> {
    let mut corpus = Corpus::default();

    for (doc_id, (name, text)) in raw.into_iter().enumerate() {
        for (sent_id, tokenized) in tokenizer.tokenize(&text).into_iter().enumerate() {
            let tags = tokenized.tags();
            let sentence = Sentence::new(doc_id, sent_id, tokenized.tokens, tags, tokenized.raw)
                .with_context(|| format!("Tokenizer misaligned tags in {name}"))?;
            corpus.sentences.push(sentence);
        }
        corpus.documents.push(Document {
            id: doc_id,
            name,
            text,
        });
    }

    Ok(corpus)
}
