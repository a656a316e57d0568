// Single-centroid annotation: match every candidate against the section
// fingerprints, store the matches, and optionally dump them per section.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::db::models::{LinkEmbedding, SectionMatch};
use crate::db::Database;
use crate::matching::sections::{match_candidates, SectionMatchParams};
use crate::output::json;

#[derive(Debug, Clone)]
pub struct AnnotateOptions {
    pub params: SectionMatchParams,
    /// Where to write per-section dumps; `None` skips dumping
    pub per_section_json_dir: Option<PathBuf>,
    pub summary_char_limit: usize,
}

/// What one annotate run produced.
#[derive(Debug)]
pub struct AnnotateReport {
    pub candidates: Vec<LinkEmbedding>,
    pub matches: Vec<SectionMatch>,
    /// (file, entry count) for each dump written
    pub dumped: Vec<(PathBuf, usize)>,
}

pub async fn run(db: &Arc<dyn Database>, opts: &AnnotateOptions) -> Result<AnnotateReport> {
    let fingerprints = db.get_section_fingerprints().await?;
    if fingerprints.is_empty() {
        anyhow::bail!("No section fingerprints found. Run `sectionmatch fingerprint` first.");
    }
    let candidates = db.get_candidates().await?;
    info!(
        candidates = candidates.len(),
        sections = fingerprints.len(),
        threshold = opts.params.similarity_threshold,
        top_k = opts.params.top_k,
        "Annotating candidates"
    );

    let params = opts.params;
    let (candidates, matches) = tokio::task::spawn_blocking(move || {
        let matches = match_candidates(&candidates, &fingerprints, params);
        (candidates, matches)
    })
    .await
    .context("Matching task panicked")?;

    db.replace_section_matches(&matches).await?;
    info!(matches = matches.len(), "Section matches stored");

    let dumped = match opts.per_section_json_dir {
        Some(ref dir) => {
            let dumps = json::section_entries(&matches, &candidates, opts.summary_char_limit);
            json::write_section_dumps(dir, &dumps)?
        }
        None => Vec::new(),
    };

    Ok(AnnotateReport {
        candidates,
        matches,
        dumped,
    })
}
