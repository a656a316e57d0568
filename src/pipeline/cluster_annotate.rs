// Clustered annotation: best candidates per section through each section's
// nearest cluster centroid.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::db::models::ClusterMatch;
use crate::db::Database;
use crate::matching::clusters::match_candidates_to_clusters;
use crate::output::json;

#[derive(Debug, Clone)]
pub struct ClusterAnnotateOptions {
    pub top_k: usize,
    /// Resolved dump directory (flag or CLUSTER_MATCH_OUTPUT_DIR)
    pub per_section_json_dir: Option<PathBuf>,
    pub summary_char_limit: usize,
}

#[derive(Debug)]
pub struct ClusterAnnotateReport {
    pub candidate_count: usize,
    pub matches: Vec<ClusterMatch>,
    pub dumped: Vec<(PathBuf, usize)>,
}

pub async fn run(
    db: &Arc<dyn Database>,
    opts: &ClusterAnnotateOptions,
) -> Result<ClusterAnnotateReport> {
    let clusters = db.get_cluster_fingerprints().await?;
    if clusters.is_empty() {
        anyhow::bail!(
            "No cluster fingerprints found. Run `sectionmatch cluster-fingerprints` first."
        );
    }
    let candidates = db.get_candidates().await?;
    let candidate_count = candidates.len();
    info!(
        candidates = candidate_count,
        centroids = clusters.len(),
        top_k = opts.top_k,
        "Annotating candidates against clusters"
    );

    let (top_k, limit) = (opts.top_k, opts.summary_char_limit);
    let matches = tokio::task::spawn_blocking(move || {
        match_candidates_to_clusters(&candidates, &clusters, top_k, limit)
    })
    .await
    .context("Cluster matching task panicked")?;

    db.replace_cluster_matches(&matches).await?;
    info!(matches = matches.len(), "Cluster matches stored");

    let dumped = match opts.per_section_json_dir {
        Some(ref dir) => json::write_section_dumps(dir, &json::cluster_entries(&matches))?,
        None => Vec::new(),
    };

    Ok(ClusterAnnotateReport {
        candidate_count,
        matches,
        dumped,
    })
}
