// Build section fingerprints (one mean per section) and cluster
// fingerprints (k centroids per section) from historical links.

use std::collections::BTreeMap;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use super::kmeans::KMeans;
use super::vector::mean_vector;
use crate::db::models::{ClusterFingerprint, LinkEmbedding, SectionFingerprint};

/// Group embedded, non-candidate links by upper-cased section name.
pub fn group_by_section(links: &[LinkEmbedding]) -> BTreeMap<String, Vec<Vec<f64>>> {
    let mut groups: BTreeMap<String, Vec<Vec<f64>>> = BTreeMap::new();
    for link in links {
        if link.is_candidate() {
            continue;
        }
        if let Some(ref emb) = link.embedding {
            groups
                .entry(link.section.trim().to_uppercase())
                .or_default()
                .push(emb.clone());
        }
    }
    groups
}

/// One fingerprint per section: the mean of its historical embeddings.
/// Returned in section order.
pub fn build_section_fingerprints(links: &[LinkEmbedding]) -> Result<Vec<SectionFingerprint>> {
    let groups = group_by_section(links);
    let pb = progress_bar(groups.len(), "Fingerprinting");

    let mut fingerprints = Vec::with_capacity(groups.len());
    for (section, vectors) in groups {
        let embedding = mean_vector(&vectors)
            .map_err(|e| anyhow::anyhow!("Section {section}: {e}"))?;
        debug!(section = %section, members = vectors.len(), "Built section fingerprint");
        fingerprints.push(SectionFingerprint {
            section,
            embedding,
            member_count: vectors.len() as u32,
        });
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(sections = fingerprints.len(), "Section fingerprints built");
    Ok(fingerprints)
}

/// Up to `k` centroids per section.
///
/// Sections with fewer than `k` embeddings fall back to a single cluster
/// (id 0) holding their mean, since k-means can't produce more centroids
/// than points.
pub fn build_cluster_fingerprints(
    links: &[LinkEmbedding],
    k: usize,
    seed: u64,
) -> Result<Vec<ClusterFingerprint>> {
    if k == 0 {
        anyhow::bail!("SECTION_CLUSTER_K must be at least 1");
    }

    let groups = group_by_section(links);
    let pb = progress_bar(groups.len(), "Clustering");

    let mut fingerprints = Vec::new();
    for (section, vectors) in groups {
        if vectors.len() < k {
            let embedding = mean_vector(&vectors)
                .map_err(|e| anyhow::anyhow!("Section {section}: {e}"))?;
            debug!(
                section = %section,
                members = vectors.len(),
                k,
                "Too few samples to cluster, using mean"
            );
            fingerprints.push(ClusterFingerprint {
                section,
                cluster_id: 0,
                embedding,
                member_count: vectors.len() as u32,
            });
        } else {
            let result = KMeans::new(k)
                .with_seed(seed)
                .fit(&vectors)
                .map_err(|e| anyhow::anyhow!("Section {section}: {e}"))?;
            let counts = result.member_counts();
            for (i, centroid) in result.centroids.into_iter().enumerate() {
                fingerprints.push(ClusterFingerprint {
                    section: section.clone(),
                    cluster_id: i as u32,
                    embedding: centroid,
                    member_count: counts[i] as u32,
                });
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        clusters = fingerprints.len(),
        k, "Cluster fingerprints built"
    );
    Ok(fingerprints)
}

fn progress_bar(len: usize, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let template = format!("  {label} [{{bar:30}}] {{pos}}/{{len}} sections");
    if let Ok(style) = ProgressStyle::default_bar().template(&template) {
        pb.set_style(style);
    }
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(id: &str, section: &str, embedding: Option<Vec<f64>>) -> LinkEmbedding {
        LinkEmbedding {
            id: id.into(),
            url: None,
            filename: None,
            section: section.into(),
            content: None,
            embedding,
        }
    }

    #[test]
    fn test_group_by_section_normalizes_and_skips() {
        let links = vec![
            link("1", "ai", Some(vec![1.0])),
            link("2", " AI ", Some(vec![3.0])),
            link("3", "CANDIDATE", Some(vec![9.0])),
            link("4", "tools", None),
        ];
        let groups = group_by_section(&links);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["AI"], vec![vec![1.0], vec![3.0]]);
    }

    #[test]
    fn test_section_fingerprint_is_mean() {
        let links = vec![
            link("1", "AI", Some(vec![1.0, 0.0])),
            link("2", "AI", Some(vec![0.0, 1.0])),
            link("3", "TOOLS", Some(vec![2.0, 2.0])),
        ];
        let fps = build_section_fingerprints(&links).unwrap();
        assert_eq!(fps.len(), 2);
        assert_eq!(fps[0].section, "AI");
        assert_eq!(fps[0].embedding, vec![0.5, 0.5]);
        assert_eq!(fps[0].member_count, 2);
        assert_eq!(fps[1].section, "TOOLS");
    }

    #[test]
    fn test_small_section_falls_back_to_mean() {
        let links = vec![
            link("1", "AI", Some(vec![1.0, 0.0])),
            link("2", "AI", Some(vec![0.0, 1.0])),
        ];
        let fps = build_cluster_fingerprints(&links, 3, 42).unwrap();
        assert_eq!(fps.len(), 1);
        assert_eq!(fps[0].cluster_id, 0);
        assert_eq!(fps[0].embedding, vec![0.5, 0.5]);
        assert_eq!(fps[0].member_count, 2);
    }

    #[test]
    fn test_large_section_gets_k_clusters() {
        let links: Vec<LinkEmbedding> = (0..6)
            .map(|i| {
                let base = if i < 3 { 0.0 } else { 10.0 };
                link(&i.to_string(), "AI", Some(vec![base + i as f64 * 0.01, base]))
            })
            .collect();
        let fps = build_cluster_fingerprints(&links, 2, 42).unwrap();
        assert_eq!(fps.len(), 2);
        let ids: Vec<u32> = fps.iter().map(|f| f.cluster_id).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(fps.iter().map(|f| f.member_count).sum::<u32>(), 6);
    }

    #[test]
    fn test_zero_k_rejected() {
        assert!(build_cluster_fingerprints(&[], 0, 42).is_err());
    }
}
