// Data models: Rust structs that map to database rows.
//
// These are the types that flow through the pipeline. They're separate
// from the queries so the matching and fingerprint code can use them
// without depending on rusqlite.

use serde::{Deserialize, Serialize};

/// Pseudo-section marking links that still need to be placed.
pub const CANDIDATE_SECTION: &str = "CANDIDATE";

/// A link with its embedding: either historical (has a real section)
/// or a candidate waiting to be matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkEmbedding {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    pub section: String,
    #[serde(default)]
    pub content: Option<String>,
    /// Missing embeddings are kept in the table but skipped by every stage
    #[serde(default)]
    pub embedding: Option<Vec<f64>>,
}

impl LinkEmbedding {
    pub fn is_candidate(&self) -> bool {
        self.section.trim().eq_ignore_ascii_case(CANDIDATE_SECTION)
    }
}

/// Mean embedding of one section's historical links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionFingerprint {
    pub section: String,
    pub embedding: Vec<f64>,
    pub member_count: u32,
}

/// One k-means centroid of a section's embeddings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterFingerprint {
    pub section: String,
    pub cluster_id: u32,
    pub embedding: Vec<f64>,
    pub member_count: u32,
}

/// A candidate matched to a section fingerprint (single-centroid mode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionMatch {
    pub candidate_id: String,
    pub section: String,
    /// 1-based position among this candidate's matches
    pub rank: u32,
    pub cosine_distance: f64,
}

/// A candidate matched to a section through its nearest cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterMatch {
    pub candidate_id: String,
    pub section: String,
    pub cluster_id: u32,
    pub cosine_distance: f64,
    pub url: Option<String>,
    pub filename: Option<String>,
    pub summary: String,
}

/// Row counts shown by `status` and `/api/status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreCounts {
    /// (section, link count) ordered by section; includes CANDIDATE
    pub links_by_section: Vec<(String, i64)>,
    pub links_without_embedding: i64,
    pub section_fingerprints: i64,
    pub cluster_fingerprints: i64,
    pub section_matches: i64,
    pub cluster_matches: i64,
    pub fingerprints_built_at: Option<String>,
}

impl StoreCounts {
    pub fn candidate_count(&self) -> i64 {
        self.links_by_section
            .iter()
            .filter(|(s, _)| s.eq_ignore_ascii_case(CANDIDATE_SECTION))
            .map(|(_, n)| n)
            .sum()
    }

    pub fn historical_count(&self) -> i64 {
        self.links_by_section
            .iter()
            .filter(|(s, _)| !s.eq_ignore_ascii_case(CANDIDATE_SECTION))
            .map(|(_, n)| n)
            .sum()
    }
}
