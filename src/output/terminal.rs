// Colored terminal output for sweeps, clusters, and evaluation reports.
//
// This module handles all terminal-specific formatting. The main.rs
// commands delegate here.

use colored::Colorize;

use crate::clustering::{ClusterOutcome, SweepScore};
use crate::corpus::models::Corpus;
use crate::evaluation::metrics::LabelReport;
use crate::pipeline::run::RunResult;

/// Display the silhouette score of every sweep candidate, marking the winner.
pub fn display_sweep(outcome: &ClusterOutcome) {
    if outcome.sweep.is_empty() {
        println!("  Parameter given explicitly: {}", outcome.parameter);
        return;
    }

    println!("\n{}", "=== Silhouette Sweep ===".bold());
    println!(
        "  {:<14} {:>8}",
        "Parameter".dimmed(),
        "Score".dimmed()
    );
    println!("  {}", "-".repeat(24).dimmed());

    for SweepScore { parameter, score } in &outcome.sweep {
        let chosen = *parameter == outcome.parameter;
        let score_str = match score {
            Some(s) => format!("{s:>8.4}"),
            None => format!("{:>8}", "n/a"),
        };
        let row = format!("  {:<14} {}", parameter.to_string(), score_str);
        if chosen {
            println!("{}  {}", row.green().bold(), "<- selected".green());
        } else if score.is_none() {
            println!("{}", row.dimmed());
        } else {
            println!("{row}");
        }
    }
}

/// Display the run summary and each cluster with its topic terms and a few
/// sample phrases.
pub fn display_clusters(result: &RunResult, samples: usize) {
    println!(
        "\n{}",
        format!(
            "=== Clusters ({} clusters, {}) ===",
            result.cluster_count(),
            result.outcome.parameter
        )
        .bold()
    );
    println!(
        "  {} sentences, {} with a phrase, {} clustered, {} removed",
        result.total_sentences,
        result.with_phrase,
        result.clustered.len(),
        result.removed.to_string().yellow(),
    );
    println!();

    for (cluster, terms) in &result.cluster_topics {
        let members: Vec<_> = result.cluster_members(*cluster).collect();
        println!(
            "  {} {:>4} sentences  {}",
            format!("Cluster {cluster:>3}:").cyan().bold(),
            members.len(),
            terms.join(", ")
        );
        for sent in members.iter().take(samples) {
            let preview = super::truncate_chars(&sent.phrase_text(), 80);
            println!("      {} {}", sent.id().to_string().dimmed(), preview);
        }
    }
}

/// Display the top terms of each document.
pub fn display_doc_topics(result: &RunResult, corpus: &Corpus) {
    if result.doc_topics.is_empty() {
        return;
    }
    println!("\n{}", "=== Document Topics ===".bold());
    for (doc_id, terms) in &result.doc_topics {
        let name = super::truncate_chars(corpus.document_name(*doc_id), 40);
        println!("  {:<43} {}", name, terms.join(", ").dimmed());
    }
}

/// Display the per-label evaluation table.
pub fn display_evaluation(reports: &[LabelReport]) {
    if reports.is_empty() {
        println!("No gold labels matched. Check that sentence ids use doc.N.sent.M.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Evaluation ({} labels) ===", reports.len()).bold()
    );
    println!(
        "  {:<20} {:>7} {:>4} {:>4} {:>4} {:>9} {:>7} {:>6}",
        "Label".dimmed(),
        "Cluster".dimmed(),
        "TP".dimmed(),
        "FP".dimmed(),
        "FN".dimmed(),
        "Precision".dimmed(),
        "Recall".dimmed(),
        "F1".dimmed(),
    );
    println!("  {}", "-".repeat(68).dimmed());

    for r in reports {
        println!(
            "  {:<20} {:>7} {:>4} {:>4} {:>4} {:>9} {:>7} {:>6}",
            super::truncate_chars(&r.label, 17),
            r.closest_cluster,
            r.true_positive,
            r.false_positive,
            r.false_negative,
            format_metric(r.precision),
            format_metric(r.recall),
            colorize_f1(r.f1),
        );
    }
}

fn format_metric(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{value:.3}")
    }
}

/// Colorize an F1 score by quality band.
fn colorize_f1(f1: f64) -> colored::ColoredString {
    let text = format_metric(f1);
    if f1.is_nan() {
        text.dimmed()
    } else if f1 >= 0.7 {
        text.green()
    } else if f1 >= 0.4 {
        text.yellow()
    } else {
        text.red()
    }
}
