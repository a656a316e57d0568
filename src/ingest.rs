// JSON Lines import: one LinkEmbedding object per line, upserted by id.
//
// Embeddings arrive pre-computed. A store holds a single dimension, recorded
// in store_meta on the first import; later imports must agree with it.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::db::models::LinkEmbedding;
use crate::db::Database;

const DIM_KEY: &str = "embedding_dim";
pub const LAST_IMPORT_KEY: &str = "last_import_at";

/// Counts from one import run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportReport {
    pub imported: usize,
    pub malformed: usize,
    pub wrong_dimension: usize,
    /// Rows with no embedding; stored, but skipped by every stage
    pub without_embedding: usize,
}

impl ImportReport {
    pub fn skipped(&self) -> usize {
        self.malformed + self.wrong_dimension
    }
}

/// Parse JSONL text, keeping rows whose vector has `dim` entries.
pub fn parse_links(content: &str, dim: usize) -> (Vec<LinkEmbedding>, ImportReport) {
    let mut links = Vec::new();
    let mut report = ImportReport::default();

    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let link: LinkEmbedding = match serde_json::from_str(line) {
            Ok(l) => l,
            Err(e) => {
                warn!(line = i + 1, error = %e, "Skipping malformed line");
                report.malformed += 1;
                continue;
            }
        };
        match link.embedding {
            Some(ref emb) if emb.len() != dim => {
                warn!(
                    line = i + 1,
                    id = %link.id,
                    got = emb.len(),
                    expected = dim,
                    "Skipping embedding with wrong dimension"
                );
                report.wrong_dimension += 1;
                continue;
            }
            None => report.without_embedding += 1,
            Some(_) => {}
        }
        links.push(link);
    }
    (links, report)
}

/// Import a JSONL file into the store.
pub async fn import_file(db: &Arc<dyn Database>, path: &Path, dim: usize) -> Result<ImportReport> {
    if let Some(stored) = db.get_meta(DIM_KEY).await? {
        if stored != dim.to_string() {
            anyhow::bail!(
                "Store holds {stored}-dim embeddings but EMBEDDING_DIM is {dim}.\n\
                 Use a fresh SECTIONMATCH_DB_PATH or fix EMBEDDING_DIM."
            );
        }
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let (links, mut report) = parse_links(&content, dim);

    report.imported = db.upsert_links(&links).await?;
    db.set_meta(DIM_KEY, &dim.to_string()).await?;
    db.set_meta(LAST_IMPORT_KEY, &chrono::Utc::now().to_rfc3339())
        .await?;

    info!(
        file = %path.display(),
        imported = report.imported,
        skipped = report.skipped(),
        "Import finished"
    );
    Ok(report)
}
