// Database trait: async interface for all DB operations.
//
// Implementor: SqliteDatabase (wraps rusqlite behind a tokio Mutex).
// The trait mirrors the queries.rs function signatures, so the pipeline
// and the web handlers can share one `Arc<dyn Database>`.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{
    ClusterFingerprint, ClusterMatch, LinkEmbedding, SectionFingerprint, SectionMatch, StoreCounts,
};

#[async_trait]
pub trait Database: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    /// Read a store metadata value (e.g. "embedding_dim").
    async fn get_meta(&self, key: &str) -> Result<Option<String>>;

    /// Set a store metadata value (upsert).
    async fn set_meta(&self, key: &str, value: &str) -> Result<()>;

    // --- Links ---

    /// Insert or update links by id, in one transaction.
    async fn upsert_links(&self, links: &[LinkEmbedding]) -> Result<usize>;

    /// Links with a real section.
    async fn get_historical_links(&self) -> Result<Vec<LinkEmbedding>>;

    /// Links in the CANDIDATE pseudo-section, ordered by id.
    async fn get_candidates(&self) -> Result<Vec<LinkEmbedding>>;

    async fn get_link(&self, id: &str) -> Result<Option<LinkEmbedding>>;

    // --- Fingerprints ---

    async fn replace_section_fingerprints(&self, fingerprints: &[SectionFingerprint])
        -> Result<()>;

    async fn get_section_fingerprints(&self) -> Result<Vec<SectionFingerprint>>;

    async fn replace_cluster_fingerprints(&self, fingerprints: &[ClusterFingerprint])
        -> Result<()>;

    async fn get_cluster_fingerprints(&self) -> Result<Vec<ClusterFingerprint>>;

    // --- Matches ---

    async fn replace_section_matches(&self, matches: &[SectionMatch]) -> Result<()>;

    async fn get_section_matches(&self) -> Result<Vec<SectionMatch>>;

    async fn replace_cluster_matches(&self, matches: &[ClusterMatch]) -> Result<()>;

    async fn get_cluster_matches(&self) -> Result<Vec<ClusterMatch>>;

    // --- Status ---

    async fn store_counts(&self) -> Result<StoreCounts>;
}
