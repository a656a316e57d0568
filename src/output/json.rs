// Per-section JSON dumps: the hand-off format between the matcher and
// the dashboard.
//
// A dump directory holds one `<section>.json` per section (lower-cased
// file name), each a pretty-printed array of match entries sorted by
// distance. Writing a dump first deletes every `*.json` in the directory,
// so sections that no longer have matches don't linger from an older run.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::models::{ClusterMatch, LinkEmbedding, SectionMatch};
use crate::fingerprint::vector::round4;
use crate::matching::snippet::summary_snippet;

/// One element of a section dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEntry {
    pub candidate_id: String,
    pub url: Option<String>,
    pub filename: Option<String>,
    /// Present in clustered dumps only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<u32>,
    pub cosine_distance: f64,
    pub summary: String,
}

/// Section dumps keyed by section name.
pub type SectionDumps = BTreeMap<String, Vec<MatchEntry>>;

/// Build dump entries from single-centroid matches, joining in the
/// candidate's url, filename and content preview.
pub fn section_entries(
    matches: &[SectionMatch],
    candidates: &[LinkEmbedding],
    summary_char_limit: usize,
) -> SectionDumps {
    let lookup: HashMap<&str, &LinkEmbedding> =
        candidates.iter().map(|c| (c.id.as_str(), c)).collect();

    let mut dumps = SectionDumps::new();
    for m in matches {
        let cand = lookup.get(m.candidate_id.as_str());
        dumps.entry(m.section.clone()).or_default().push(MatchEntry {
            candidate_id: m.candidate_id.clone(),
            url: cand.and_then(|c| c.url.clone()),
            filename: cand.and_then(|c| c.filename.clone()),
            cluster_id: None,
            cosine_distance: round4(m.cosine_distance),
            summary: summary_snippet(cand.and_then(|c| c.content.as_deref()), summary_char_limit),
        });
    }
    sort_entries(&mut dumps);
    dumps
}

/// Build dump entries from clustered matches.
pub fn cluster_entries(matches: &[ClusterMatch]) -> SectionDumps {
    let mut dumps = SectionDumps::new();
    for m in matches {
        dumps.entry(m.section.clone()).or_default().push(MatchEntry {
            candidate_id: m.candidate_id.clone(),
            url: m.url.clone(),
            filename: m.filename.clone(),
            cluster_id: Some(m.cluster_id),
            cosine_distance: m.cosine_distance,
            summary: m.summary.clone(),
        });
    }
    sort_entries(&mut dumps);
    dumps
}

fn sort_entries(dumps: &mut SectionDumps) {
    for entries in dumps.values_mut() {
        entries.sort_by(|a, b| {
            a.cosine_distance
                .total_cmp(&b.cosine_distance)
                .then_with(|| a.candidate_id.cmp(&b.candidate_id))
        });
    }
}

/// Delete every `*.json` file directly inside `dir`. Returns how many were removed.
pub fn clear_json_files(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && has_json_extension(&path) {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Write one file per section into `dir`, replacing any previous dump.
///
/// Returns (path, entry count) for each file written, in section order.
pub fn write_section_dumps(dir: &Path, dumps: &SectionDumps) -> Result<Vec<(PathBuf, usize)>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create dump directory {}", dir.display()))?;
    let removed = clear_json_files(dir)?;
    debug!(dir = %dir.display(), removed, "Cleared previous dumps");

    let mut written = Vec::with_capacity(dumps.len());
    for (section, entries) in dumps {
        let path = dir.join(format!("{}.json", section.to_lowercase()));
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        written.push((path, entries.len()));
    }
    Ok(written)
}

/// Section names available in a dump directory (upper-cased stems, sorted).
/// A missing directory has no sections.
pub fn list_section_files(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut sections = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && has_json_extension(&path) {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                sections.push(stem.to_uppercase());
            }
        }
    }
    sections.sort();
    Ok(sections)
}

/// Load one section's dump. The section is looked up among the files that
/// exist, never joined onto the path directly.
pub fn read_section_dump(dir: &Path, section: &str) -> Result<Option<Vec<MatchEntry>>> {
    let wanted = section.to_uppercase();
    if !list_section_files(dir)?.contains(&wanted) {
        return Ok(None);
    }
    let path = dir.join(format!("{}.json", wanted.to_lowercase()));
    let path = if path.is_file() {
        path
    } else {
        // Stem had mixed case on disk
        find_by_stem(dir, &wanted)?.with_context(|| format!("Dump for {wanted} vanished"))?
    };
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let entries = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid dump file {}", path.display()))?;
    Ok(Some(entries))
}

fn find_by_stem(dir: &Path, wanted_upper: &str) -> Result<Option<PathBuf>> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.to_uppercase() == wanted_upper);
        if matches && has_json_extension(&path) {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

fn has_json_extension(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, d: f64) -> MatchEntry {
        MatchEntry {
            candidate_id: id.into(),
            url: None,
            filename: None,
            cluster_id: None,
            cosine_distance: d,
            summary: String::new(),
        }
    }

    #[test]
    fn test_write_clears_stale_dumps() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old.json"), "[]").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        let mut dumps = SectionDumps::new();
        dumps.insert("AI".into(), vec![entry("a", 0.1)]);
        let written = write_section_dumps(dir.path(), &dumps).unwrap();

        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, dir.path().join("ai.json"));
        assert!(!dir.path().join("old.json").exists());
        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(list_section_files(dir.path()).unwrap(), vec!["AI"]);
    }

    #[test]
    fn test_read_section_dump_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let mut dumps = SectionDumps::new();
        dumps.insert("Tools".into(), vec![entry("x", 0.2)]);
        write_section_dumps(dir.path(), &dumps).unwrap();

        let loaded = read_section_dump(dir.path(), "tools").unwrap().unwrap();
        assert_eq!(loaded, vec![entry("x", 0.2)]);
        assert!(read_section_dump(dir.path(), "AI").unwrap().is_none());
        assert!(read_section_dump(dir.path(), "../etc/passwd").unwrap().is_none());
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_section_files(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_section_entries_join_and_sort() {
        let candidates = vec![LinkEmbedding {
            id: "c1".into(),
            url: Some("https://a".into()),
            filename: Some("a.md".into()),
            section: "CANDIDATE".into(),
            content: Some("hello\nworld".into()),
            embedding: None,
        }];
        let matches = vec![
            SectionMatch {
                candidate_id: "c1".into(),
                section: "AI".into(),
                rank: 2,
                cosine_distance: 0.333333,
            },
            SectionMatch {
                candidate_id: "c2".into(),
                section: "AI".into(),
                rank: 1,
                cosine_distance: 0.1,
            },
        ];
        let dumps = section_entries(&matches, &candidates, 280);
        let ai = &dumps["AI"];
        assert_eq!(ai[0].candidate_id, "c2");
        assert_eq!(ai[1].cosine_distance, 0.3333);
        assert_eq!(ai[1].summary, "hello world");
        assert_eq!(ai[1].url.as_deref(), Some("https://a"));
    }

    #[test]
    fn test_cluster_id_only_serialized_when_present() {
        let json = serde_json::to_string(&entry("a", 0.1)).unwrap();
        assert!(!json.contains("cluster_id"));
        let mut clustered = entry("a", 0.1);
        clustered.cluster_id = Some(2);
        assert!(serde_json::to_string(&clustered).unwrap().contains("\"cluster_id\":2"));
    }
}
