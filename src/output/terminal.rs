// Colored terminal output for fingerprints, matches, and dumps.
//
// main.rs and the pipeline delegate all terminal formatting here.

use std::collections::HashMap;
use std::path::PathBuf;

use colored::{ColoredString, Colorize};

use super::truncate_chars;
use crate::db::models::{ClusterFingerprint, ClusterMatch, LinkEmbedding, SectionFingerprint, SectionMatch};

/// Show the section fingerprints that were just built.
pub fn display_fingerprints(fingerprints: &[SectionFingerprint]) {
    println!(
        "\n{}",
        format!("=== Section Fingerprints ({} sections) ===", fingerprints.len()).bold()
    );
    for fp in fingerprints {
        println!(
            "  {:<24} {:>6} links  {}-dim",
            fp.section.bold(),
            fp.member_count,
            fp.embedding.len()
        );
    }
}

/// Show cluster fingerprints grouped by section.
pub fn display_clusters(clusters: &[ClusterFingerprint]) {
    println!(
        "\n{}",
        format!("=== Cluster Fingerprints ({} centroids) ===", clusters.len()).bold()
    );
    let mut current = "";
    for c in clusters {
        if c.section != current {
            current = c.section.as_str();
            println!("  {}", c.section.bold());
        }
        println!(
            "      cluster {:<3} {:>6} links",
            c.cluster_id,
            c.member_count
        );
    }
}

/// Print single-centroid matches, one line per (candidate, section).
pub fn display_section_matches(
    matches: &[SectionMatch],
    candidates: &[LinkEmbedding],
    threshold: f64,
    top_k: usize,
) {
    println!(
        "\n{}",
        format!("=== Top {top_k} matches per candidate (threshold={threshold}) ===").bold()
    );
    if matches.is_empty() {
        println!("  {}", "No candidate fell within the threshold.".dimmed());
        return;
    }

    let urls: HashMap<&str, &str> = candidates
        .iter()
        .filter_map(|c| c.url.as_deref().map(|u| (c.id.as_str(), u)))
        .collect();

    println!(
        "  {:<24} {:>4}  {:<20} {:>8}",
        "Candidate".dimmed(),
        "Rank".dimmed(),
        "Section".dimmed(),
        "Distance".dimmed(),
    );
    println!("  {}", "-".repeat(62).dimmed());

    let mut last_candidate = "";
    for m in matches {
        let id_col = if m.candidate_id == last_candidate {
            String::new()
        } else {
            truncate_chars(&m.candidate_id, 24)
        };
        last_candidate = m.candidate_id.as_str();
        println!(
            "  {:<24} {:>4}  {:<20} {:>8}",
            id_col,
            m.rank,
            m.section,
            colorize_distance(m.cosine_distance),
        );
        if m.rank == 1 {
            if let Some(url) = urls.get(m.candidate_id.as_str()) {
                println!("  {}", truncate_chars(url, 76).dimmed());
            }
        }
    }
    println!("\n  Returned {} matches", matches.len());
}

/// Print clustered matches grouped by section.
pub fn display_cluster_matches(matches: &[ClusterMatch], limit: usize) {
    if matches.is_empty() {
        println!("  {}", "No clustered matches stored.".dimmed());
        return;
    }
    let mut current = "";
    let mut shown = 0;
    for m in matches {
        if m.section != current {
            current = m.section.as_str();
            shown = 0;
            println!("\n  {}", m.section.bold());
        }
        if shown >= limit {
            continue;
        }
        shown += 1;
        println!(
            "    {} {:<24} cluster {:<3} {}",
            colorize_distance(m.cosine_distance),
            truncate_chars(&m.candidate_id, 24),
            m.cluster_id,
            m.url.as_deref().unwrap_or("").dimmed(),
        );
        if !m.summary.is_empty() {
            println!("      {}", truncate_chars(&m.summary, 100).dimmed());
        }
    }
}

/// Report the files a dump wrote.
pub fn display_dump_summary(written: &[(PathBuf, usize)], label: &str) {
    for (path, count) in written {
        println!(
            "  {} Wrote {} {} to {}",
            "✓".green(),
            count,
            label,
            path.display()
        );
    }
}

/// Color a cosine distance: close matches green, borderline yellow.
pub fn colorize_distance(d: f64) -> ColoredString {
    let s = format!("{d:.4}");
    if d <= 0.25 {
        s.green()
    } else if d <= 0.40 {
        s.yellow()
    } else {
        s.normal()
    }
}
