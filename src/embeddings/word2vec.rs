// Pretrained word vectors in the word2vec formats.
//
// Binary files (`.bin`) start with an ASCII header `<count> <dim>\n`, then
// each entry is the word, a single space, and `dim` little-endian f32
// values, optionally followed by a newline. Text files hold one
// `word v1 v2 ...` line per entry, with the same header optionally first.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context, Result};
use ndarray::{Array2, ArrayView1};
use tracing::{debug, info};

use super::traits::Embedder;

/// Largest vector width accepted from a binary header.
const MAX_DIMENSION: usize = 1 << 16;

/// Entries and values preallocated before the file proves it holds more.
const PREALLOCATE_ENTRIES: usize = 1 << 16;
const PREALLOCATE_VALUES: usize = 1 << 22;

/// Token vectors looked up by surface form.
#[derive(Debug, Clone)]
pub struct WordVectors {
    vocab: HashMap<String, usize>,
    vectors: Array2<f64>,
}

impl WordVectors {
    /// Load from disk, choosing the binary reader for `.bin` files.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("Word vector file not found: {}", path.display());
        }
        let file = File::open(path)
            .with_context(|| format!("Failed to open word vectors at {}", path.display()))?;
        let reader = BufReader::new(file);

        let binary = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("bin"));
        let vectors = if binary {
            Self::from_binary(reader)
        } else {
            Self::from_text(reader)
        }
        .with_context(|| format!("Failed to parse word vectors at {}", path.display()))?;

        info!(
            words = vectors.len(),
            dimension = vectors.dimension(),
            path = %path.display(),
            "Loaded word vectors"
        );
        Ok(vectors)
    }

    pub fn from_binary<R: BufRead>(mut reader: R) -> Result<Self> {
        let mut header = String::new();
        reader.read_line(&mut header).context("Missing header")?;
        let Some((count, dim)) = parse_header(&header) else {
            bail!("Malformed header: {:?}", header.trim());
        };
        if dim == 0 || dim > MAX_DIMENSION {
            bail!("Implausible vector dimension {dim} in header");
        }
        let Some(values) = count.checked_mul(dim) else {
            bail!("Header {count} x {dim} overflows");
        };

        // The header is untrusted, so growth beyond this is driven by the data
        let mut words = Vec::with_capacity(count.min(PREALLOCATE_ENTRIES));
        let mut data = Vec::with_capacity(values.min(PREALLOCATE_VALUES));
        let mut raw = vec![0u8; dim * 4];

        for entry in 0..count {
            let mut word_bytes = Vec::new();
            reader.read_until(b' ', &mut word_bytes)?;
            let word = String::from_utf8_lossy(&word_bytes)
                .trim_matches(|c: char| c == '\n' || c == ' ')
                .to_string();
            if word.is_empty() {
                bail!("Truncated file: expected {count} words, found {entry}");
            }

            reader
                .read_exact(&mut raw)
                .with_context(|| format!("Truncated vector for '{word}'"))?;
            data.extend(
                raw.chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64),
            );
            words.push(word);
        }

        Self::from_parts(words, data, dim)
    }

    pub fn from_text<R: BufRead>(reader: R) -> Result<Self> {
        let mut words = Vec::new();
        let mut data = Vec::new();
        let mut dim: Option<usize> = None;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line_no == 0 {
                if let Some((_, header_dim)) = parse_header(line) {
                    dim = Some(header_dim);
                    continue;
                }
            }

            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else { continue };
            let values: Vec<f64> = fields
                .map(str::parse::<f64>)
                .collect::<std::result::Result<_, _>>()
                .with_context(|| format!("Bad number on line {}", line_no + 1))?;

            let expected = *dim.get_or_insert(values.len());
            if values.len() != expected {
                bail!(
                    "Line {} has {} values, expected {expected}",
                    line_no + 1,
                    values.len()
                );
            }
            words.push(word.to_string());
            data.extend(values);
        }

        Self::from_parts(words, data, dim.unwrap_or(0))
    }

    fn from_parts(words: Vec<String>, data: Vec<f64>, dim: usize) -> Result<Self> {
        let vectors = Array2::from_shape_vec((words.len(), dim), data)?;
        let parsed = Self::from_rows(words, vectors);
        debug!(words = parsed.len(), dim, "Parsed word vectors");
        Ok(parsed)
    }

    /// One row of `vectors` per entry of `words`.
    pub(crate) fn from_rows(words: Vec<String>, vectors: Array2<f64>) -> Self {
        let mut vocab = HashMap::with_capacity(words.len());
        for (ix, word) in words.into_iter().enumerate() {
            // First occurrence wins
            vocab.entry(word).or_insert(ix);
        }
        Self { vocab, vectors }
    }

    pub fn len(&self) -> usize {
        self.vocab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocab.is_empty()
    }
}

impl Embedder for WordVectors {
    fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    fn token_vector(&self, token: &str) -> Option<ArrayView1<'_, f64>> {
        self.vocab.get(token).map(|&ix| self.vectors.row(ix))
    }
}

fn parse_header(line: &str) -> Option<(usize, usize)> {
    let mut fields = line.split_whitespace();
    let count = fields.next()?.parse().ok()?;
    let dim = fields.next()?.parse().ok()?;
    fields.next().is_none().then_some((count, dim))
}
