// System status display: database size, link counts per section,
// fingerprint and match table sizes.

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use crate::db::models::StoreCounts;

/// Display system status to the terminal.
pub async fn show(db_path: &str) -> Result<()> {
    if !Path::new(db_path).exists() {
        println!("Database: not initialized");
        println!("\nRun `sectionmatch init` to set up the database.");
        return Ok(());
    }

    let file_size = std::fs::metadata(db_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", db_path, file_size);

    let db = crate::db::open_sqlite(db_path)?;
    let counts = db.store_counts().await?;
    print_counts(&counts);

    match db.get_meta(crate::ingest::LAST_IMPORT_KEY).await? {
        Some(at) => println!("Last import: {}", format_timestamp(&at)),
        None => println!("Last import: never"),
    }
    Ok(())
}

fn print_counts(counts: &StoreCounts) {
    println!(
        "Links: {} historical, {} candidates",
        counts.historical_count(),
        counts.candidate_count()
    );
    if counts.links_by_section.is_empty() {
        println!("  Run `sectionmatch import --file links.jsonl` to load links");
    }
    for (section, n) in &counts.links_by_section {
        println!("  {:<24} {:>6}", section, n);
    }
    if counts.links_without_embedding > 0 {
        println!(
            "  {}",
            format!("{} links have no embedding and are skipped", counts.links_without_embedding)
                .yellow()
        );
    }

    match counts.fingerprints_built_at {
        Some(ref at) => println!(
            "Section fingerprints: {} (built {})",
            counts.section_fingerprints, at
        ),
        None => {
            println!("Section fingerprints: not yet built");
            println!("  Run `sectionmatch fingerprint` to build them");
        }
    }
    println!("Cluster fingerprints: {}", counts.cluster_fingerprints);
    println!(
        "Matches: {} single-centroid, {} clustered",
        counts.section_matches, counts.cluster_matches
    );
}

/// Show an RFC 3339 timestamp as "YYYY-MM-DD HH:MM UTC".
fn format_timestamp(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&chrono::Utc).format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
