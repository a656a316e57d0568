// Database schema: table creation and migrations.
//
// A `schema_version` table tracks which migrations have run, and each
// migration is a function that executes SQL statements. Embeddings are
// stored as JSON arrays of floats in TEXT columns.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet.
///
/// This is idempotent: safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Historical links (real section) and candidates (section = 'CANDIDATE')
        CREATE TABLE IF NOT EXISTS link_embeddings (
            id TEXT PRIMARY KEY,
            url TEXT,
            filename TEXT,
            section TEXT NOT NULL,
            content TEXT,
            embedding TEXT,                    -- JSON array, NULL when not embedded yet
            imported_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One mean vector per section
        CREATE TABLE IF NOT EXISTS section_fingerprints (
            section TEXT PRIMARY KEY,
            embedding TEXT NOT NULL,
            member_count INTEGER NOT NULL,
            built_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- k-means centroids per section
        CREATE TABLE IF NOT EXISTS section_cluster_fingerprints (
            section TEXT NOT NULL,
            cluster_id INTEGER NOT NULL,
            embedding TEXT NOT NULL,
            member_count INTEGER NOT NULL,
            built_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (section, cluster_id)
        );

        -- Single-centroid matches, top-k per candidate
        CREATE TABLE IF NOT EXISTS candidate_section_matches (
            candidate_id TEXT NOT NULL,
            section TEXT NOT NULL,
            rank INTEGER NOT NULL,
            cosine_distance REAL NOT NULL,
            PRIMARY KEY (candidate_id, section)
        );

        -- Clustered matches, top-k per section
        CREATE TABLE IF NOT EXISTS candidate_cluster_section_matches (
            candidate_id TEXT NOT NULL,
            section TEXT NOT NULL,
            cluster_id INTEGER NOT NULL,
            cosine_distance REAL NOT NULL,
            url TEXT,
            filename TEXT,
            summary TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (candidate_id, section)
        );

        CREATE INDEX IF NOT EXISTS idx_links_section
            ON link_embeddings(section);

        CREATE INDEX IF NOT EXISTS idx_section_matches_section
            ON candidate_section_matches(section);

        CREATE INDEX IF NOT EXISTS idx_cluster_matches_section
            ON candidate_cluster_section_matches(section);
        ",
    )
    .context("Failed to create database tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    // Migration v2: record which embedding dimension the store was built
    // with, so a later EMBEDDING_DIM change is caught instead of silently
    // mixing vector sizes.
    run_migration(conn, 2, |c| {
        c.execute_batch(
            "CREATE TABLE IF NOT EXISTS store_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
    })?;

    Ok(())
}

/// Run a migration if it hasn't been applied yet.
fn run_migration<F>(conn: &Connection, version: i64, migrate: F) -> Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<()>,
{
    let already_applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;

    if !already_applied {
        migrate(conn).with_context(|| format!("Migration v{version} failed"))?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

/// Count the number of tables in the database (shown by `init`).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
    }

    #[test]
    fn test_table_count() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        // schema_version, link_embeddings, section_fingerprints,
        // section_cluster_fingerprints, candidate_section_matches,
        // candidate_cluster_section_matches, store_meta = 7 tables
        assert_eq!(table_count(&conn).unwrap(), 7);
    }

    #[test]
    fn test_migrations_recorded_once() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();

        let versions: Vec<i64> = conn
            .prepare("SELECT version FROM schema_version ORDER BY version")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(versions, vec![1, 2]);
    }
}
