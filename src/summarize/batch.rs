// Summarize hand-picked candidates.
//
// Editors drop JSON arrays of candidate ids into the selected-ids
// directories, one file per section. Every id is looked up, summarized,
// and the results land in two files under the summaries directory: one
// for single-centroid picks, one for clustered picks.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::traits::Summarizer;
use crate::db::Database;

pub const SINGLE_OUTPUT: &str = "summarized_candidates.json";
pub const CLUSTER_OUTPUT: &str = "summarized_candidates_cluster.json";

/// Requests in flight at once; the rate limiter still paces them.
const CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub id: String,
    pub url: Option<String>,
    pub section: String,
    pub summary: String,
}

/// One section's worth of selected ids.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub section: String,
    pub ids: Vec<String>,
}

#[derive(Debug)]
pub struct SummarizeReport {
    pub single: (PathBuf, usize),
    pub clustered: (PathBuf, usize),
}

/// Read every `*.json` id list in `dir`, sorted by file name.
/// Unreadable or malformed files are warned about and skipped; a missing
/// directory has no selections.
pub fn read_selections(dir: &Path) -> Result<Vec<Selection>> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "Selected-ids directory not found");
        return Ok(Vec::new());
    }
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    paths.sort();

    let mut selections = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let parsed = std::fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|raw| Ok(serde_json::from_str::<Vec<String>>(&raw)?));
        match parsed {
            Ok(ids) => selections.push(Selection {
                section: stem.to_uppercase(),
                ids,
            }),
            Err(e) => warn!(file = %path.display(), error = %e, "Skipping unreadable id file"),
        }
    }
    Ok(selections)
}

/// Summarize every known id in `selections`, preserving input order.
/// Generator failures are recorded as `[ERROR: ...]` summaries.
pub async fn summarize_selections(
    db: &Arc<dyn Database>,
    summarizer: &dyn Summarizer,
    selections: &[Selection],
    char_limit: usize,
) -> Result<Vec<CandidateSummary>> {
    let mut work = Vec::new();
    for selection in selections {
        for id in &selection.ids {
            match db.get_link(id).await? {
                Some(link) => work.push((selection.section.clone(), link)),
                None => warn!(id = %id, section = %selection.section, "Unknown candidate id, skipping"),
            }
        }
    }

    let pb = ProgressBar::new(work.len() as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("  Summarizing [{bar:30}] {pos}/{len} ({eta})")
    {
        pb.set_style(style);
    }

    let summaries: Vec<CandidateSummary> = stream::iter(work)
        .map(|(section, link)| {
            let pb = &pb;
            async move {
                let summary = match link.content.as_deref().map(str::trim) {
                    Some(content) if !content.is_empty() => {
                        match summarizer.summarize(content, char_limit).await {
                            Ok(text) => text,
                            Err(e) => {
                                warn!(id = %link.id, error = %e, "Summary failed");
                                format!("[ERROR: {e}]")
                            }
                        }
                    }
                    _ => "[ERROR: candidate has no content]".to_string(),
                };
                pb.inc(1);
                CandidateSummary {
                    id: link.id,
                    url: link.url,
                    section,
                    summary,
                }
            }
        })
        .buffered(CONCURRENCY)
        .collect()
        .await;
    pb.finish_and_clear();

    Ok(summaries)
}

fn write_summaries(path: &Path, summaries: &[CandidateSummary]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(summaries)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Summarize both selection directories and write both output files.
pub async fn run(
    db: &Arc<dyn Database>,
    summarizer: &dyn Summarizer,
    single_dir: &Path,
    clustered_dir: &Path,
    out_dir: &Path,
    char_limit: usize,
) -> Result<SummarizeReport> {
    let mut written = Vec::with_capacity(2);
    for (dir, file) in [(single_dir, SINGLE_OUTPUT), (clustered_dir, CLUSTER_OUTPUT)] {
        let selections = read_selections(dir)?;
        info!(dir = %dir.display(), sections = selections.len(), "Summarizing selections");
        let summaries = summarize_selections(db, summarizer, &selections, char_limit).await?;
        let path = out_dir.join(file);
        write_summaries(&path, &summaries)?;
        written.push((path, summaries.len()));
    }

    let clustered = written.pop().context("missing clustered output")?;
    let single = written.pop().context("missing single output")?;
    Ok(SummarizeReport { single, clustered })
}
