// SqliteDatabase: rusqlite backend implementing the Database trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Sync.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// The lock is never held across .await points.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::{
    ClusterFingerprint, ClusterMatch, LinkEmbedding, SectionFingerprint, SectionMatch, StoreCounts,
};
use super::queries;
use super::traits::Database;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        queries::get_meta(&conn, key)
    }

    async fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        queries::set_meta(&conn, key, value)
    }

    async fn upsert_links(&self, links: &[LinkEmbedding]) -> Result<usize> {
        let conn = self.conn.lock().await;
        queries::upsert_links(&conn, links)
    }

    async fn get_historical_links(&self) -> Result<Vec<LinkEmbedding>> {
        let conn = self.conn.lock().await;
        queries::get_historical_links(&conn)
    }

    async fn get_candidates(&self) -> Result<Vec<LinkEmbedding>> {
        let conn = self.conn.lock().await;
        queries::get_candidates(&conn)
    }

    async fn get_link(&self, id: &str) -> Result<Option<LinkEmbedding>> {
        let conn = self.conn.lock().await;
        queries::get_link(&conn, id)
    }

    async fn replace_section_fingerprints(
        &self,
        fingerprints: &[SectionFingerprint],
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        queries::replace_section_fingerprints(&conn, fingerprints)
    }

    async fn get_section_fingerprints(&self) -> Result<Vec<SectionFingerprint>> {
        let conn = self.conn.lock().await;
        queries::get_section_fingerprints(&conn)
    }

    async fn replace_cluster_fingerprints(
        &self,
        fingerprints: &[ClusterFingerprint],
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        queries::replace_cluster_fingerprints(&conn, fingerprints)
    }

    async fn get_cluster_fingerprints(&self) -> Result<Vec<ClusterFingerprint>> {
        let conn = self.conn.lock().await;
        queries::get_cluster_fingerprints(&conn)
    }

    async fn replace_section_matches(&self, matches: &[SectionMatch]) -> Result<()> {
        let conn = self.conn.lock().await;
        queries::replace_section_matches(&conn, matches)
    }

    async fn get_section_matches(&self) -> Result<Vec<SectionMatch>> {
        let conn = self.conn.lock().await;
        queries::get_section_matches(&conn)
    }

    async fn replace_cluster_matches(&self, matches: &[ClusterMatch]) -> Result<()> {
        let conn = self.conn.lock().await;
        queries::replace_cluster_matches(&conn, matches)
    }

    async fn get_cluster_matches(&self) -> Result<Vec<ClusterMatch>> {
        let conn = self.conn.lock().await;
        queries::get_cluster_matches(&conn)
    }

    async fn store_counts(&self) -> Result<StoreCounts> {
        let conn = self.conn.lock().await;
        queries::store_counts(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;

    fn test_db() -> SqliteDatabase {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        SqliteDatabase::new(conn)
    }

    #[tokio::test]
    async fn test_trait_table_count() {
        let db = test_db();
        assert_eq!(db.table_count().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_trait_links_roundtrip() {
        let db = test_db();
        let links = vec![
            LinkEmbedding {
                id: "h1".into(),
                url: Some("https://a.example".into()),
                filename: None,
                section: "AI".into(),
                content: Some("model release".into()),
                embedding: Some(vec![0.1, 0.2, 0.3]),
            },
            LinkEmbedding {
                id: "c1".into(),
                url: None,
                filename: None,
                section: "CANDIDATE".into(),
                content: None,
                embedding: Some(vec![0.3, 0.2, 0.1]),
            },
        ];
        assert_eq!(db.upsert_links(&links).await.unwrap(), 2);
        assert_eq!(db.get_historical_links().await.unwrap(), links[..1].to_vec());
        assert_eq!(db.get_candidates().await.unwrap(), links[1..].to_vec());
        assert_eq!(db.get_link("c1").await.unwrap(), Some(links[1].clone()));
    }

    #[tokio::test]
    async fn test_trait_cluster_matches_replace() {
        let db = test_db();
        let m = ClusterMatch {
            candidate_id: "c1".into(),
            section: "AI".into(),
            cluster_id: 2,
            cosine_distance: 0.1234,
            url: Some("https://a.example".into()),
            filename: Some("a.md".into()),
            summary: "short".into(),
        };
        db.replace_cluster_matches(std::slice::from_ref(&m))
            .await
            .unwrap();
        db.replace_cluster_matches(std::slice::from_ref(&m))
            .await
            .unwrap();
        assert_eq!(db.get_cluster_matches().await.unwrap(), vec![m]);
        assert_eq!(db.store_counts().await.unwrap().cluster_matches, 1);
    }
}
