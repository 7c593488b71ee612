// Gold label files: `SentenceId<TAB>label` per line.
//
// A first line whose id column does not parse is taken as a header and
// skipped. Later malformed lines are errors, since a silently dropped gold
// row would skew every metric for its label.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::corpus::models::SentenceId;

pub type GoldLabels = BTreeMap<SentenceId, String>;

pub fn load_gold(path: &Path) -> Result<GoldLabels> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open gold labels at {}", path.display()))?;
    let gold = parse_gold(BufReader::new(file))
        .with_context(|| format!("Failed to parse gold labels at {}", path.display()))?;
    info!(labels = gold.len(), path = %path.display(), "Loaded gold labels");
    Ok(gold)
}

pub fn parse_gold<R: BufRead>(reader: R) -> Result<GoldLabels> {
    let mut gold = GoldLabels::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let mut columns = line.splitn(2, '\t');
        let id_col = columns.next().unwrap_or_default();
        let label = columns.next().map(str::trim).unwrap_or_default();

        let id: SentenceId = match id_col.parse() {
            Ok(id) => id,
            Err(_) if line_no == 0 => continue,
            Err(e) => bail!("Line {}: {e}", line_no + 1),
        };
        if label.is_empty() {
            bail!("Line {}: missing label for {id}", line_no + 1);
        }

        if let Some(previous) = gold.insert(id, label.to_string()) {
            warn!(%id, previous, label, "Duplicate gold label, keeping the later one");
        }
    }

    Ok(gold)
}
