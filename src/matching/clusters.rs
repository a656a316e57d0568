// Clustered matching: candidates against every section's cluster centroids.
//
// A candidate's distance to a section is its distance to that section's
// nearest centroid. Each section then keeps its `top_k` closest candidates,
// so the output answers "what are the best picks for this section?" rather
// than "where does this candidate belong?". A candidate appears at most
// once per section.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use indicatif::{ProgressBar, ProgressStyle};

use super::snippet::summary_snippet;
use crate::db::models::{ClusterFingerprint, ClusterMatch, LinkEmbedding};
use crate::fingerprint::vector::{cosine_distance, round4};

/// Pick the top candidates per section through their nearest cluster.
///
/// Output is ordered by section, then distance, then candidate id.
/// Distances are rounded to 4 decimals, matching the JSON dumps.
pub fn match_candidates_to_clusters(
    candidates: &[LinkEmbedding],
    clusters: &[ClusterFingerprint],
    top_k: usize,
    summary_char_limit: usize,
) -> Vec<ClusterMatch> {
    let mut centroids_by_section: BTreeMap<&str, Vec<&ClusterFingerprint>> = BTreeMap::new();
    for c in clusters {
        centroids_by_section.entry(c.section.as_str()).or_default().push(c);
    }

    let pb = ProgressBar::new(candidates.len() as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("  Matching [{bar:30}] {pos}/{len} candidates")
    {
        pb.set_style(style);
    }

    // section -> (distance, candidate, cluster id)
    let mut scored: BTreeMap<&str, Vec<(f64, &LinkEmbedding, u32)>> = BTreeMap::new();
    for cand in candidates {
        pb.inc(1);
        let Some(ref emb) = cand.embedding else {
            continue;
        };
        for (section, centroids) in &centroids_by_section {
            let nearest = centroids
                .iter()
                .map(|c| (cosine_distance(emb, &c.embedding), c.cluster_id))
                .min_by(|a, b| {
                    a.0.partial_cmp(&b.0)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| a.1.cmp(&b.1))
                });
            if let Some((distance, cluster_id)) = nearest {
                scored
                    .entry(*section)
                    .or_default()
                    .push((distance, cand, cluster_id));
            }
        }
    }
    pb.finish_and_clear();

    let mut out = Vec::new();
    for (section, mut entries) in scored {
        entries.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.id.cmp(&b.1.id))
        });
        for (distance, cand, cluster_id) in entries.into_iter().take(top_k) {
            out.push(ClusterMatch {
                candidate_id: cand.id.clone(),
                section: section.to_string(),
                cluster_id,
                cosine_distance: round4(distance),
                url: cand.url.clone(),
                filename: cand.filename.clone(),
                summary: summary_snippet(cand.content.as_deref(), summary_char_limit),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, emb: Vec<f64>) -> LinkEmbedding {
        LinkEmbedding {
            id: id.into(),
            url: Some(format!("https://x/{id}")),
            filename: None,
            section: "CANDIDATE".into(),
            content: Some(format!("about {id}")),
            embedding: Some(emb),
        }
    }

    fn cluster(section: &str, id: u32, emb: Vec<f64>) -> ClusterFingerprint {
        ClusterFingerprint {
            section: section.into(),
            cluster_id: id,
            embedding: emb,
            member_count: 1,
        }
    }

    #[test]
    fn test_nearest_cluster_recorded_once_per_section() {
        let clusters = vec![
            cluster("AI", 0, vec![1.0, 0.0]),
            cluster("AI", 1, vec![0.0, 1.0]),
        ];
        let matches =
            match_candidates_to_clusters(&[candidate("c", vec![0.1, 1.0])], &clusters, 5, 280);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].cluster_id, 1);
        assert_eq!(matches[0].summary, "about c");
    }

    #[test]
    fn test_top_k_per_section() {
        let clusters = vec![cluster("AI", 0, vec![1.0, 0.0]), cluster("OPS", 0, vec![0.0, 1.0])];
        let cands = vec![
            candidate("a", vec![1.0, 0.0]),
            candidate("b", vec![1.0, 0.5]),
            candidate("c", vec![0.0, 1.0]),
        ];
        let matches = match_candidates_to_clusters(&cands, &clusters, 2, 280);
        let ai: Vec<&str> = matches
            .iter()
            .filter(|m| m.section == "AI")
            .map(|m| m.candidate_id.as_str())
            .collect();
        assert_eq!(ai, vec!["a", "b"]);
        let ops: Vec<&str> = matches
            .iter()
            .filter(|m| m.section == "OPS")
            .map(|m| m.candidate_id.as_str())
            .collect();
        assert_eq!(ops, vec!["c", "b"]);
    }

    #[test]
    fn test_distances_rounded() {
        let clusters = vec![cluster("AI", 0, vec![1.0, 0.0])];
        let matches =
            match_candidates_to_clusters(&[candidate("a", vec![1.0, 0.3])], &clusters, 1, 280);
        let d = matches[0].cosine_distance;
        assert_eq!(d, round4(d));
    }
}
