// Fingerprint stages: rebuild section means and section clusters from the
// historical links currently in the store.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::db::models::{ClusterFingerprint, SectionFingerprint};
use crate::db::Database;
use crate::fingerprint::builder;

/// Rebuild `section_fingerprints` from every historical link.
///
/// The table is replaced wholesale, so running this twice is harmless.
pub async fn build_sections(db: &Arc<dyn Database>) -> Result<Vec<SectionFingerprint>> {
    let links = db.get_historical_links().await?;
    info!(links = links.len(), "Loaded historical links");
    if links.is_empty() {
        warn!("No historical links with embeddings, nothing to fingerprint");
    }

    let fingerprints = tokio::task::spawn_blocking(move || {
        builder::build_section_fingerprints(&links)
    })
    .await
    .context("Fingerprint task panicked")??;

    db.replace_section_fingerprints(&fingerprints).await?;
    Ok(fingerprints)
}

/// Rebuild `section_cluster_fingerprints` with `k` centroids per section.
pub async fn build_clusters(
    db: &Arc<dyn Database>,
    k: usize,
    seed: u64,
) -> Result<Vec<ClusterFingerprint>> {
    let links = db.get_historical_links().await?;
    info!(links = links.len(), k, seed, "Clustering historical links");

    let clusters = tokio::task::spawn_blocking(move || {
        builder::build_cluster_fingerprints(&links, k, seed)
    })
    .await
    .context("Clustering task panicked")??;

    db.replace_cluster_fingerprints(&clusters).await?;
    Ok(clusters)
}
