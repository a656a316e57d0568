// Single-centroid matching: each candidate against every section fingerprint.
//
// A candidate keeps the `top_k` closest sections whose cosine distance is
// within the threshold. Candidates that match nothing are simply absent
// from the output; the caller reports how many were considered.

use std::cmp::Ordering;

use indicatif::{ProgressBar, ProgressStyle};

use crate::db::models::{LinkEmbedding, SectionFingerprint, SectionMatch, CANDIDATE_SECTION};
use crate::fingerprint::vector::cosine_distance;

/// Knobs for single-centroid matching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionMatchParams {
    /// Maximum cosine distance for a section to count as a match
    pub similarity_threshold: f64,
    /// Matches kept per candidate
    pub top_k: usize,
}

impl Default for SectionMatchParams {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.40,
            top_k: 3,
        }
    }
}

/// Rank sections for every embedded candidate.
///
/// Output is ordered by candidate id, then rank (1-based).
pub fn match_candidates(
    candidates: &[LinkEmbedding],
    fingerprints: &[SectionFingerprint],
    params: SectionMatchParams,
) -> Vec<SectionMatch> {
    let targets: Vec<&SectionFingerprint> = fingerprints
        .iter()
        .filter(|f| !f.section.eq_ignore_ascii_case(CANDIDATE_SECTION))
        .collect();

    let mut ordered: Vec<&LinkEmbedding> = candidates.iter().collect();
    ordered.sort_by(|a, b| a.id.cmp(&b.id));

    let pb = ProgressBar::new(ordered.len() as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("  Matching [{bar:30}] {pos}/{len} candidates")
    {
        pb.set_style(style);
    }

    let mut out = Vec::new();
    for cand in ordered {
        pb.inc(1);
        let Some(ref emb) = cand.embedding else {
            continue;
        };

        let mut scored: Vec<(&str, f64)> = targets
            .iter()
            .map(|f| (f.section.as_str(), cosine_distance(emb, &f.embedding)))
            .filter(|(_, d)| *d <= params.similarity_threshold)
            .collect();
        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });

        for (i, (section, distance)) in scored.into_iter().take(params.top_k).enumerate() {
            out.push(SectionMatch {
                candidate_id: cand.id.clone(),
                section: section.to_string(),
                rank: i as u32 + 1,
                cosine_distance: distance,
            });
        }
    }
    pb.finish_and_clear();

    out
}
