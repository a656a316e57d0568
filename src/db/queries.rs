// Database queries: CRUD operations for all tables.
//
// Every database interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.
// The `replace_*` functions swap a table's contents inside one transaction,
// so a rebuild is all-or-nothing.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::{
    ClusterFingerprint, ClusterMatch, LinkEmbedding, SectionFingerprint, SectionMatch, StoreCounts,
};

const CANDIDATE_FILTER: &str = "UPPER(TRIM(section)) = 'CANDIDATE'";

// --- Store metadata ---

pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM store_meta WHERE key = ?1")?;
    let result = stmt.query_row(params![key], |row| row.get(0)).optional()?;
    Ok(result)
}

pub fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO store_meta (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

// --- Links ---

/// Insert or replace a link by id.
pub fn upsert_link(conn: &Connection, link: &LinkEmbedding) -> Result<()> {
    let embedding_json = link
        .embedding
        .as_ref()
        .map(|e| serde_json::to_string(e))
        .transpose()?;
    conn.execute(
        "INSERT INTO link_embeddings (id, url, filename, section, content, embedding, imported_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))
         ON CONFLICT(id) DO UPDATE SET
            url = ?2,
            filename = ?3,
            section = ?4,
            content = ?5,
            embedding = ?6,
            imported_at = datetime('now')",
        params![
            link.id,
            link.url,
            link.filename,
            link.section,
            link.content,
            embedding_json,
        ],
    )?;
    Ok(())
}

/// Insert many links in a single transaction.
pub fn upsert_links(conn: &Connection, links: &[LinkEmbedding]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    for link in links {
        upsert_link(&tx, link)?;
    }
    tx.commit()?;
    Ok(links.len())
}

/// All links that belong to a real section (not candidates).
pub fn get_historical_links(conn: &Connection) -> Result<Vec<LinkEmbedding>> {
    query_links(
        conn,
        &format!(
            "SELECT id, url, filename, section, content, embedding FROM link_embeddings
             WHERE NOT ({CANDIDATE_FILTER}) ORDER BY id"
        ),
    )
}

/// All candidate links, ordered by id.
pub fn get_candidates(conn: &Connection) -> Result<Vec<LinkEmbedding>> {
    query_links(
        conn,
        &format!(
            "SELECT id, url, filename, section, content, embedding FROM link_embeddings
             WHERE {CANDIDATE_FILTER} ORDER BY id"
        ),
    )
}

/// Look up a single link by id.
pub fn get_link(conn: &Connection, id: &str) -> Result<Option<LinkEmbedding>> {
    let mut stmt = conn.prepare(
        "SELECT id, url, filename, section, content, embedding FROM link_embeddings WHERE id = ?1",
    )?;
    let raw = stmt.query_row(params![id], raw_link).optional()?;
    raw.map(decode_link).transpose()
}

fn query_links(conn: &Connection, sql: &str) -> Result<Vec<LinkEmbedding>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], raw_link)?;
    let mut links = Vec::new();
    for row in rows {
        links.push(decode_link(row?)?);
    }
    Ok(links)
}

type RawLink = (
    String,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
);

fn raw_link(row: &Row<'_>) -> rusqlite::Result<RawLink> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn decode_link(raw: RawLink) -> Result<LinkEmbedding> {
    let (id, url, filename, section, content, embedding) = raw;
    let embedding = embedding
        .map(|json| decode_embedding(&json))
        .transpose()
        .with_context(|| format!("Corrupt embedding for link {id}"))?;
    Ok(LinkEmbedding {
        id,
        url,
        filename,
        section,
        content,
        embedding,
    })
}

fn decode_embedding(json: &str) -> Result<Vec<f64>> {
    Ok(serde_json::from_str(json)?)
}

// --- Fingerprints ---

/// Replace every section fingerprint with the given set.
pub fn replace_section_fingerprints(
    conn: &Connection,
    fingerprints: &[SectionFingerprint],
) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM section_fingerprints", [])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO section_fingerprints (section, embedding, member_count)
             VALUES (?1, ?2, ?3)",
        )?;
        for fp in fingerprints {
            stmt.execute(params![
                fp.section,
                serde_json::to_string(&fp.embedding)?,
                fp.member_count
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn get_section_fingerprints(conn: &Connection) -> Result<Vec<SectionFingerprint>> {
    let mut stmt = conn.prepare(
        "SELECT section, embedding, member_count FROM section_fingerprints ORDER BY section",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, u32>(2)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (section, json, member_count) = row?;
        out.push(SectionFingerprint {
            embedding: decode_embedding(&json)
                .with_context(|| format!("Corrupt fingerprint for section {section}"))?,
            section,
            member_count,
        });
    }
    Ok(out)
}

/// Replace every cluster fingerprint with the given set.
pub fn replace_cluster_fingerprints(
    conn: &Connection,
    fingerprints: &[ClusterFingerprint],
) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM section_cluster_fingerprints", [])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO section_cluster_fingerprints (section, cluster_id, embedding, member_count)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for fp in fingerprints {
            stmt.execute(params![
                fp.section,
                fp.cluster_id,
                serde_json::to_string(&fp.embedding)?,
                fp.member_count
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn get_cluster_fingerprints(conn: &Connection) -> Result<Vec<ClusterFingerprint>> {
    let mut stmt = conn.prepare(
        "SELECT section, cluster_id, embedding, member_count
         FROM section_cluster_fingerprints
         ORDER BY section, cluster_id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, u32>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, u32>(3)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (section, cluster_id, json, member_count) = row?;
        out.push(ClusterFingerprint {
            embedding: decode_embedding(&json).with_context(|| {
                format!("Corrupt cluster fingerprint for {section}/{cluster_id}")
            })?,
            section,
            cluster_id,
            member_count,
        });
    }
    Ok(out)
}

// --- Matches ---

pub fn replace_section_matches(conn: &Connection, matches: &[SectionMatch]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM candidate_section_matches", [])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO candidate_section_matches (candidate_id, section, rank, cosine_distance)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for m in matches {
            stmt.execute(params![m.candidate_id, m.section, m.rank, m.cosine_distance])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// All single-centroid matches, ordered by candidate then rank.
pub fn get_section_matches(conn: &Connection) -> Result<Vec<SectionMatch>> {
    let mut stmt = conn.prepare(
        "SELECT candidate_id, section, rank, cosine_distance
         FROM candidate_section_matches
         ORDER BY candidate_id, rank",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(SectionMatch {
            candidate_id: row.get(0)?,
            section: row.get(1)?,
            rank: row.get(2)?,
            cosine_distance: row.get(3)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn replace_cluster_matches(conn: &Connection, matches: &[ClusterMatch]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM candidate_cluster_section_matches", [])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO candidate_cluster_section_matches
                (candidate_id, section, cluster_id, cosine_distance, url, filename, summary)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for m in matches {
            stmt.execute(params![
                m.candidate_id,
                m.section,
                m.cluster_id,
                m.cosine_distance,
                m.url,
                m.filename,
                m.summary,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// All clustered matches, ordered by section then distance.
pub fn get_cluster_matches(conn: &Connection) -> Result<Vec<ClusterMatch>> {
    let mut stmt = conn.prepare(
        "SELECT candidate_id, section, cluster_id, cosine_distance, url, filename, summary
         FROM candidate_cluster_section_matches
         ORDER BY section, cosine_distance, candidate_id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(ClusterMatch {
            candidate_id: row.get(0)?,
            section: row.get(1)?,
            cluster_id: row.get(2)?,
            cosine_distance: row.get(3)?,
            url: row.get(4)?,
            filename: row.get(5)?,
            summary: row.get(6)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

// --- Status ---

pub fn store_counts(conn: &Connection) -> Result<StoreCounts> {
    let mut stmt = conn.prepare(
        "SELECT UPPER(TRIM(section)) AS s, COUNT(*) FROM link_embeddings GROUP BY s ORDER BY s",
    )?;
    let links_by_section = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<(String, i64)>>>()?;

    let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |row| row.get(0))?) };

    Ok(StoreCounts {
        links_by_section,
        links_without_embedding: count(
            "SELECT COUNT(*) FROM link_embeddings WHERE embedding IS NULL",
        )?,
        section_fingerprints: count("SELECT COUNT(*) FROM section_fingerprints")?,
        cluster_fingerprints: count("SELECT COUNT(*) FROM section_cluster_fingerprints")?,
        section_matches: count("SELECT COUNT(*) FROM candidate_section_matches")?,
        cluster_matches: count("SELECT COUNT(*) FROM candidate_cluster_section_matches")?,
        fingerprints_built_at: conn
            .query_row("SELECT MAX(built_at) FROM section_fingerprints", [], |row| {
                row.get::<_, Option<String>>(0)
            })
            .optional()?
            .flatten(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    fn link(id: &str, section: &str, embedding: Option<Vec<f64>>) -> LinkEmbedding {
        LinkEmbedding {
            id: id.to_string(),
            url: Some(format!("https://example.com/{id}")),
            filename: Some(format!("{id}.md")),
            section: section.to_string(),
            content: Some(format!("content of {id}")),
            embedding,
        }
    }

    #[test]
    fn test_link_upsert_and_split() {
        let conn = test_conn();
        upsert_links(
            &conn,
            &[
                link("a", "AI", Some(vec![1.0, 0.0])),
                link("b", "candidate", Some(vec![0.0, 1.0])),
                link("c", "CANDIDATE", None),
            ],
        )
        .unwrap();

        let historical = get_historical_links(&conn).unwrap();
        assert_eq!(historical.len(), 1);
        assert_eq!(historical[0].embedding, Some(vec![1.0, 0.0]));

        let candidates = get_candidates(&conn).unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(candidates[1].embedding.is_none());
    }

    #[test]
    fn test_link_upsert_overwrites() {
        let conn = test_conn();
        upsert_link(&conn, &link("a", "AI", Some(vec![1.0]))).unwrap();
        upsert_link(&conn, &link("a", "TOOLS", Some(vec![2.0]))).unwrap();
        let found = get_link(&conn, "a").unwrap().unwrap();
        assert_eq!(found.section, "TOOLS");
        assert_eq!(found.embedding, Some(vec![2.0]));
        assert!(get_link(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn test_replace_section_fingerprints() {
        let conn = test_conn();
        let first = vec![
            SectionFingerprint {
                section: "AI".into(),
                embedding: vec![0.5, 0.5],
                member_count: 2,
            },
            SectionFingerprint {
                section: "TOOLS".into(),
                embedding: vec![1.0, 0.0],
                member_count: 1,
            },
        ];
        replace_section_fingerprints(&conn, &first).unwrap();
        assert_eq!(get_section_fingerprints(&conn).unwrap(), first);

        // A rebuild drops sections that no longer exist
        replace_section_fingerprints(&conn, &first[..1]).unwrap();
        assert_eq!(get_section_fingerprints(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_replace_cluster_fingerprints_ordered() {
        let conn = test_conn();
        let fps = vec![
            ClusterFingerprint {
                section: "TOOLS".into(),
                cluster_id: 0,
                embedding: vec![1.0],
                member_count: 3,
            },
            ClusterFingerprint {
                section: "AI".into(),
                cluster_id: 1,
                embedding: vec![2.0],
                member_count: 2,
            },
            ClusterFingerprint {
                section: "AI".into(),
                cluster_id: 0,
                embedding: vec![3.0],
                member_count: 4,
            },
        ];
        replace_cluster_fingerprints(&conn, &fps).unwrap();
        let loaded = get_cluster_fingerprints(&conn).unwrap();
        let keys: Vec<(String, u32)> = loaded
            .iter()
            .map(|f| (f.section.clone(), f.cluster_id))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("AI".to_string(), 0),
                ("AI".to_string(), 1),
                ("TOOLS".to_string(), 0)
            ]
        );
    }

    #[test]
    fn test_section_matches_ordered_by_candidate_and_rank() {
        let conn = test_conn();
        replace_section_matches(
            &conn,
            &[
                SectionMatch {
                    candidate_id: "b".into(),
                    section: "AI".into(),
                    rank: 1,
                    cosine_distance: 0.1,
                },
                SectionMatch {
                    candidate_id: "a".into(),
                    section: "TOOLS".into(),
                    rank: 2,
                    cosine_distance: 0.3,
                },
                SectionMatch {
                    candidate_id: "a".into(),
                    section: "AI".into(),
                    rank: 1,
                    cosine_distance: 0.2,
                },
            ],
        )
        .unwrap();
        let loaded = get_section_matches(&conn).unwrap();
        let order: Vec<(&str, u32)> = loaded
            .iter()
            .map(|m| (m.candidate_id.as_str(), m.rank))
            .collect();
        assert_eq!(order, vec![("a", 1), ("a", 2), ("b", 1)]);
    }

    #[test]
    fn test_meta_roundtrip() {
        let conn = test_conn();
        assert!(get_meta(&conn, "embedding_dim").unwrap().is_none());
        set_meta(&conn, "embedding_dim", "768").unwrap();
        set_meta(&conn, "embedding_dim", "384").unwrap();
        assert_eq!(
            get_meta(&conn, "embedding_dim").unwrap(),
            Some("384".to_string())
        );
    }

    #[test]
    fn test_store_counts() {
        let conn = test_conn();
        upsert_links(
            &conn,
            &[
                link("a", "ai", Some(vec![1.0])),
                link("b", "AI", Some(vec![1.0])),
                link("c", "CANDIDATE", None),
            ],
        )
        .unwrap();
        let counts = store_counts(&conn).unwrap();
        assert_eq!(
            counts.links_by_section,
            vec![("AI".to_string(), 2), ("CANDIDATE".to_string(), 1)]
        );
        assert_eq!(counts.links_without_embedding, 1);
        assert_eq!(counts.section_fingerprints, 0);
        assert!(counts.fingerprints_built_at.is_none());
    }
}
